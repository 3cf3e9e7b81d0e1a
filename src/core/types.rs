use serde::Serialize;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WithdrawalCapPolicy {
    /// Subtract the nominal withdrawal every month; the balance may go negative.
    Uncapped,
    /// Never withdraw more than the balance holds after that month's contribution.
    CapToAvailableBalance,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReportMode {
    /// One running balance fed by contributions and drained by withdrawals.
    Integrated,
    /// A pure SIP ledger, then a SWP ledger seeded from its tax and inflation
    /// adjusted total, merged by year.
    SplitLedger,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WithdrawalStart {
    Year(u32),
    AfterContributions,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Horizon {
    /// `max(contribution_years, withdrawal_start + K - 1)`
    FixedExtension(u32),
    /// `contribution_years + n`
    WithdrawalYears(u32),
}

#[derive(Debug, Clone)]
pub struct SimulationParams {
    pub monthly_contribution: f64,
    pub contribution_years: u32,
    pub annual_rate_percent: f64,
    pub contribution_step_up_percent: f64,
    pub withdrawal_start: WithdrawalStart,
    pub monthly_withdrawal: f64,
    pub withdrawal_step_up_percent: f64,
    pub horizon: Horizon,
    pub withdrawal_cap_policy: WithdrawalCapPolicy,
    pub report_mode: ReportMode,
    pub tax_percent: f64,
    pub inflation_percent: f64,
}

/// Withdrawal start year and total horizon after the start and horizon
/// policies have been applied.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub withdrawal_start: u32,
    pub simulation_years: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRow {
    pub year: u32,
    pub begin_balance: f64,
    pub monthly_contribution: Option<f64>,
    pub annual_contribution: f64,
    pub cumulative_contributed: f64,
    pub monthly_withdrawal: Option<f64>,
    pub annual_withdrawal: f64,
    pub cumulative_withdrawn: f64,
    pub interest_earned: f64,
    pub end_balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitYearRow {
    pub year: u32,
    pub sip_monthly: Option<f64>,
    pub sip_invested: Option<f64>,
    pub cumulative_invested: f64,
    pub sip_interest: Option<f64>,
    pub sip_total: f64,
    pub sip_adjusted_total: f64,
    pub swp_begin: Option<f64>,
    pub swp_interest: Option<f64>,
    pub swp_monthly_withdrawal: Option<f64>,
    pub swp_annual_withdrawal: Option<f64>,
    pub swp_end: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "rows", rename_all = "camelCase")]
pub enum Ledger {
    Integrated(Vec<YearRow>),
    Split(Vec<SplitYearRow>),
}

impl Ledger {
    pub fn len(&self) -> usize {
        match self {
            Ledger::Integrated(rows) => rows.len(),
            Ledger::Split(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub schedule: Schedule,
    pub ledger: Ledger,
}
