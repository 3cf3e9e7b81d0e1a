//! Presentation adapters over a [`Projection`]: currency formatting, CSV
//! export, HTML table fragments and chart series.

mod chart;
mod csv_export;
mod html;
mod inr;

use thiserror::Error;

use crate::core::{Ledger, Projection, SplitYearRow, YearRow};

pub use chart::{ChartSeries, chart_series};
pub use csv_export::{CsvStyle, UTF8_BOM, csv_bytes, write_csv};
pub use html::render_table;
pub use inr::{CURRENCY_PREFIX, PLACEHOLDER, format_inr, format_optional_inr};

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

const INTEGRATED_HEADERS: [&str; 10] = [
    "Year",
    "Beginning Balance (₹)",
    "Monthly SIP Investment (₹)",
    "SIP Invested (Annual ₹)",
    "Cumulative SIP Invested (₹)",
    "Monthly SWP Withdrawal (₹)",
    "Annual SWP Withdrawal (₹)",
    "Cumulative SWP Withdrawals (₹)",
    "Interest Earned (Annual ₹)",
    "Combined Total (₹)",
];

const SPLIT_HEADERS: [&str; 12] = [
    "Year",
    "Monthly SIP Investment (₹)",
    "SIP Invested (Annual ₹)",
    "Cumulative SIP Invested (₹)",
    "SIP Interest (₹)",
    "SIP Total (₹)",
    "Inflation Adjusted After Tax SIP Total (₹)",
    "SWP Begin (₹)",
    "SWP Interest (₹)",
    "SWP Monthly Withdrawal (₹)",
    "SWP Annual Withdrawal (₹)",
    "SWP End (₹)",
];

pub(crate) fn headers(projection: &Projection) -> &'static [&'static str] {
    match projection.ledger {
        Ledger::Integrated(_) => &INTEGRATED_HEADERS,
        Ledger::Split(_) => &SPLIT_HEADERS,
    }
}

/// One table line: the year plus its monetary cells in header order. `None`
/// marks a cell outside the contribution or withdrawal window.
pub(crate) struct ReportLine {
    pub year: u32,
    pub amounts: Vec<Option<f64>>,
}

pub(crate) fn report_lines(projection: &Projection) -> Vec<ReportLine> {
    match &projection.ledger {
        Ledger::Integrated(rows) => rows.iter().map(integrated_line).collect(),
        Ledger::Split(rows) => rows.iter().map(split_line).collect(),
    }
}

fn integrated_line(row: &YearRow) -> ReportLine {
    let withdrawing = row.monthly_withdrawal.is_some();
    ReportLine {
        year: row.year,
        amounts: vec![
            Some(row.begin_balance),
            row.monthly_contribution,
            Some(row.annual_contribution),
            Some(row.cumulative_contributed),
            row.monthly_withdrawal,
            withdrawing.then_some(row.annual_withdrawal),
            withdrawing.then_some(row.cumulative_withdrawn),
            Some(row.interest_earned),
            Some(row.end_balance),
        ],
    }
}

fn split_line(row: &SplitYearRow) -> ReportLine {
    ReportLine {
        year: row.year,
        amounts: vec![
            row.sip_monthly,
            row.sip_invested,
            Some(row.cumulative_invested),
            row.sip_interest,
            Some(row.sip_total),
            Some(row.sip_adjusted_total),
            row.swp_begin,
            row.swp_interest,
            row.swp_monthly_withdrawal,
            row.swp_annual_withdrawal,
            row.swp_end,
        ],
    }
}
