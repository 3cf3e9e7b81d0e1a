use serde::Serialize;

use crate::core::{Ledger, Projection};

/// Parallel arrays backing the invested-vs-balance line chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub years: Vec<u32>,
    pub invested: Vec<f64>,
    pub balance: Vec<f64>,
}

pub fn chart_series(projection: &Projection) -> ChartSeries {
    let mut series = ChartSeries::default();
    match &projection.ledger {
        Ledger::Integrated(rows) => {
            for row in rows {
                series.years.push(row.year);
                series.invested.push(row.cumulative_contributed);
                series.balance.push(row.end_balance);
            }
        }
        Ledger::Split(rows) => {
            for row in rows {
                series.years.push(row.year);
                series.invested.push(row.cumulative_invested);
                series.balance.push(row.sip_total);
            }
        }
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        Horizon, ReportMode, SimulationParams, WithdrawalCapPolicy, WithdrawalStart, project,
    };

    #[test]
    fn series_are_parallel_and_follow_the_ledger() {
        let params = SimulationParams {
            monthly_contribution: 1_000.0,
            contribution_years: 3,
            annual_rate_percent: 12.0,
            contribution_step_up_percent: 10.0,
            withdrawal_start: WithdrawalStart::AfterContributions,
            monthly_withdrawal: 1_000.0,
            withdrawal_step_up_percent: 10.0,
            horizon: Horizon::WithdrawalYears(4),
            withdrawal_cap_policy: WithdrawalCapPolicy::CapToAvailableBalance,
            report_mode: ReportMode::Integrated,
            tax_percent: 0.0,
            inflation_percent: 0.0,
        };
        let projection = project(&params).expect("valid params");
        let series = chart_series(&projection);

        assert_eq!(series.years, vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(series.invested.len(), 7);
        assert_eq!(series.balance.len(), 7);
        assert_eq!(series.invested[3], series.invested[2]);

        let Ledger::Integrated(rows) = &projection.ledger else {
            panic!("expected integrated ledger");
        };
        assert_eq!(series.balance[6], rows[6].end_balance);

        let json = serde_json::to_string(&series).expect("series should serialize");
        assert!(json.starts_with("{\"years\":[1,2,3,4,5,6,7],\"invested\":["));
    }
}
