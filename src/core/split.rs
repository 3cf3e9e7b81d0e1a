use super::engine::{MONTHS_PER_YEAR, round_whole, stepped_monthly_amount};
use super::error::ConfigurationError;
use super::types::{Schedule, SimulationParams, SplitYearRow, WithdrawalCapPolicy};

#[derive(Debug, Clone, Copy)]
struct SipYear {
    monthly: f64,
    invested: f64,
    interest: f64,
    total: f64,
}

#[derive(Debug, Clone, Copy)]
struct SwpYear {
    begin: f64,
    interest: f64,
    monthly_withdrawal: f64,
    annual_withdrawal: f64,
    end: f64,
}

/// Runs the SIP ledger over the contribution years, seeds a separate SWP
/// ledger from the tax and inflation adjusted SIP total, and merges both by
/// year.
///
/// Both ledgers apply the stepped monthly amount rounded to cents, the same
/// figure shown in the monthly columns, rather than compounding the unrounded
/// step-up. Totals can therefore differ by a few rupees from a calculation
/// that carries full precision through the step-ups.
pub fn simulate_split(params: &SimulationParams) -> Result<Vec<SplitYearRow>, ConfigurationError> {
    let schedule = params.validate()?;
    Ok(run_split(params, schedule))
}

pub(crate) fn run_split(params: &SimulationParams, schedule: Schedule) -> Vec<SplitYearRow> {
    let sip_years = run_sip_ledger(params);
    let swp_years = if params.monthly_withdrawal > 0.0 {
        let seed = swp_seed(params, schedule, &sip_years);
        run_swp_ledger(params, schedule, seed)
    } else {
        Vec::new()
    };

    let mut rows = Vec::with_capacity(schedule.simulation_years as usize);
    let mut cumulative_invested = 0.0;
    let mut last_sip_total = 0.0;
    for year in 1..=schedule.simulation_years {
        let sip = sip_years.get(year as usize - 1).copied();
        if let Some(sip) = sip {
            cumulative_invested += sip.invested;
            last_sip_total = sip.total;
        }
        let swp = year
            .checked_sub(schedule.withdrawal_start)
            .and_then(|offset| swp_years.get(offset as usize))
            .copied();

        rows.push(SplitYearRow {
            year,
            sip_monthly: sip.map(|s| s.monthly),
            sip_invested: sip.map(|s| s.invested),
            cumulative_invested,
            sip_interest: sip.map(|s| s.interest),
            sip_total: last_sip_total,
            sip_adjusted_total: round_whole(after_tax_real_value(params, last_sip_total, year)),
            swp_begin: swp.map(|s| s.begin),
            swp_interest: swp.map(|s| s.interest),
            swp_monthly_withdrawal: swp.map(|s| s.monthly_withdrawal),
            swp_annual_withdrawal: swp.map(|s| s.annual_withdrawal),
            swp_end: swp.map(|s| s.end),
        });
    }
    rows
}

fn run_sip_ledger(params: &SimulationParams) -> Vec<SipYear> {
    let monthly_rate = params.monthly_rate();
    let mut total = 0.0_f64;
    let mut years = Vec::with_capacity(params.contribution_years as usize);
    for year in 1..=params.contribution_years {
        let monthly = stepped_monthly_amount(
            params.monthly_contribution,
            params.contribution_step_up_percent,
            year - 1,
        );
        let begin = total;
        for _ in 0..MONTHS_PER_YEAR {
            total = (total + monthly) * (1.0 + monthly_rate);
        }
        let invested = monthly * MONTHS_PER_YEAR as f64;
        years.push(SipYear {
            monthly,
            invested: round_whole(invested),
            interest: round_whole(total - begin - invested),
            total: round_whole(total),
        });
    }
    years
}

/// Opening SWP balance. Starting in year one leaves nothing to draw on; a start
/// inside the contribution window uses the prior year's SIP total, and a later
/// start uses the final SIP total discounted over the contribution years.
fn swp_seed(params: &SimulationParams, schedule: Schedule, sip_years: &[SipYear]) -> f64 {
    let start = schedule.withdrawal_start;
    if start <= 1 {
        return 0.0;
    }
    let (total, years) = if start <= params.contribution_years {
        (sip_years[start as usize - 2].total, start - 1)
    } else {
        match sip_years.last() {
            Some(last) => (last.total, params.contribution_years),
            None => return 0.0,
        }
    };
    round_whole(after_tax_real_value(params, total, years))
}

fn after_tax_real_value(params: &SimulationParams, nominal: f64, years: u32) -> f64 {
    nominal * (1.0 - params.tax_percent / 100.0)
        / (1.0 + params.inflation_percent / 100.0).powi(years as i32)
}

fn run_swp_ledger(params: &SimulationParams, schedule: Schedule, seed: f64) -> Vec<SwpYear> {
    let monthly_rate = params.monthly_rate();
    let mut balance = seed;
    let mut years = Vec::new();
    for year in schedule.withdrawal_start..=schedule.simulation_years {
        let monthly_withdrawal = stepped_monthly_amount(
            params.monthly_withdrawal,
            params.withdrawal_step_up_percent,
            year - schedule.withdrawal_start,
        );
        let begin = balance;
        let mut interest = 0.0;
        let mut withdrawn = 0.0;
        for _ in 0..MONTHS_PER_YEAR {
            let credited = balance * monthly_rate;
            balance += credited;
            interest += credited;
            let taken = match params.withdrawal_cap_policy {
                WithdrawalCapPolicy::CapToAvailableBalance if balance < monthly_withdrawal => {
                    balance.max(0.0)
                }
                _ => monthly_withdrawal,
            };
            balance -= taken;
            withdrawn += taken;
        }
        years.push(SwpYear {
            begin: round_whole(begin),
            interest: round_whole(interest),
            monthly_withdrawal,
            annual_withdrawal: round_whole(withdrawn),
            end: round_whole(balance),
        });
    }
    years
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Horizon, ReportMode, WithdrawalStart};
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn flat_params() -> SimulationParams {
        SimulationParams {
            monthly_contribution: 1_000.0,
            contribution_years: 2,
            annual_rate_percent: 0.0,
            contribution_step_up_percent: 0.0,
            withdrawal_start: WithdrawalStart::Year(3),
            monthly_withdrawal: 1_000.0,
            withdrawal_step_up_percent: 0.0,
            horizon: Horizon::FixedExtension(2),
            withdrawal_cap_policy: WithdrawalCapPolicy::CapToAvailableBalance,
            report_mode: ReportMode::SplitLedger,
            tax_percent: 0.0,
            inflation_percent: 0.0,
        }
    }

    #[test]
    fn oracle_zero_rate_split_ledger_matches_hand_calculation() {
        let rows = simulate_split(&flat_params()).expect("valid params");
        assert_eq!(rows.len(), 4);

        assert_eq!(rows[0].sip_monthly, Some(1_000.0));
        assert_eq!(rows[0].sip_invested, Some(12_000.0));
        assert_approx(rows[1].cumulative_invested, 24_000.0);
        assert_approx(rows[1].sip_total, 24_000.0);
        assert_eq!(rows[1].swp_begin, None);

        assert_eq!(rows[2].sip_monthly, None);
        assert_eq!(rows[2].sip_interest, None);
        assert_approx(rows[2].cumulative_invested, 24_000.0);
        assert_approx(rows[2].sip_total, 24_000.0);
        assert_eq!(rows[2].swp_begin, Some(24_000.0));
        assert_eq!(rows[2].swp_annual_withdrawal, Some(12_000.0));
        assert_eq!(rows[2].swp_end, Some(12_000.0));
        assert_eq!(rows[3].swp_begin, Some(12_000.0));
        assert_eq!(rows[3].swp_end, Some(0.0));
    }

    #[test]
    fn seed_inside_contribution_window_uses_prior_year_total() {
        let mut params = flat_params();
        params.contribution_years = 3;
        params.withdrawal_start = WithdrawalStart::Year(2);
        params.tax_percent = 12.5;
        params.inflation_percent = 6.0;

        // 12000 * 0.875 / 1.06 = 9905.66
        let rows = simulate_split(&params).expect("valid params");
        assert_eq!(rows[1].swp_begin, Some(9_906.0));
        assert_eq!(rows[0].swp_begin, None);
    }

    #[test]
    fn seed_after_contribution_window_discounts_over_contribution_years() {
        let mut params = flat_params();
        params.withdrawal_start = WithdrawalStart::Year(5);
        params.tax_percent = 12.5;
        params.inflation_percent = 6.0;

        // 24000 * 0.875 / 1.06^2 = 18689.93
        let rows = simulate_split(&params).expect("valid params");
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[4].swp_begin, Some(18_690.0));
        assert_eq!(rows[3].swp_begin, None);
    }

    #[test]
    fn first_year_start_has_nothing_to_draw() {
        let mut params = flat_params();
        params.withdrawal_start = WithdrawalStart::Year(1);

        let rows = simulate_split(&params).expect("valid params");
        assert_eq!(rows[0].swp_begin, Some(0.0));
        assert_eq!(rows[0].swp_annual_withdrawal, Some(0.0));
        assert!(rows.iter().all(|row| row.swp_end == Some(0.0)));
    }

    #[test]
    fn capped_swp_never_overdraws() {
        let mut params = flat_params();
        params.monthly_withdrawal = 5_000.0;
        params.annual_rate_percent = 12.0;
        params.horizon = Horizon::FixedExtension(3);

        let rows = simulate_split(&params).expect("valid params");
        for row in &rows[2..] {
            assert!(row.swp_end.expect("swp year") >= 0.0);
        }
        let first = &rows[2];
        assert!(first.swp_annual_withdrawal.expect("swp year") < 60_000.0);
        assert_eq!(rows.last().and_then(|row| row.swp_end), Some(0.0));
    }

    #[test]
    fn uncapped_swp_goes_negative() {
        let mut params = flat_params();
        params.monthly_withdrawal = 5_000.0;
        params.withdrawal_cap_policy = WithdrawalCapPolicy::Uncapped;

        let rows = simulate_split(&params).expect("valid params");
        assert_eq!(rows[2].swp_annual_withdrawal, Some(60_000.0));
        assert_eq!(rows[2].swp_end, Some(-36_000.0));
    }

    #[test]
    fn swp_interest_is_credited_before_withdrawal() {
        let mut params = flat_params();
        params.annual_rate_percent = 12.0;
        params.monthly_withdrawal = 500.0;

        let rows = simulate_split(&params).expect("valid params");
        for row in &rows[2..] {
            let begin = row.swp_begin.expect("swp year");
            let interest = row.swp_interest.expect("swp year");
            let withdrawn = row.swp_annual_withdrawal.expect("swp year");
            let end = row.swp_end.expect("swp year");
            assert!(interest > 0.0);
            assert!((begin + interest - withdrawn - end).abs() <= 2.0);
        }
    }

    #[test]
    fn adjusted_total_discounts_by_row_year() {
        let mut params = flat_params();
        params.tax_percent = 10.0;
        params.inflation_percent = 5.0;

        let rows = simulate_split(&params).expect("valid params");
        // 12000 * 0.9 / 1.05 = 10285.71
        assert_approx(rows[0].sip_adjusted_total, 10_286.0);
        // 24000 * 0.9 / 1.05^4 = 17770.46
        assert_approx(rows[3].sip_adjusted_total, 17_770.0);
    }

    #[test]
    fn zero_withdrawal_skips_the_swp_ledger() {
        let mut params = flat_params();
        params.monthly_withdrawal = 0.0;

        let rows = simulate_split(&params).expect("valid params");
        assert!(rows.iter().all(|row| row.swp_begin.is_none()));
        assert!(rows.iter().all(|row| row.swp_end.is_none()));
    }

    #[test]
    fn split_sip_monthly_follows_rounded_step_up() {
        let mut params = flat_params();
        params.monthly_contribution = 1_000.0;
        params.contribution_years = 6;
        params.contribution_step_up_percent = 10.0;
        params.withdrawal_start = WithdrawalStart::Year(7);

        let rows = simulate_split(&params).expect("valid params");
        assert_eq!(rows[4].sip_monthly, Some(1_464.1));
        assert_eq!(rows[5].sip_monthly, Some(1_610.51));
        assert_eq!(rows[4].sip_invested, Some(17_569.0));
    }

    #[test]
    fn swp_withdrawal_steps_up_from_its_own_start_year() {
        let mut params = flat_params();
        params.monthly_withdrawal = 100.0;
        params.withdrawal_step_up_percent = 10.0;
        params.horizon = Horizon::FixedExtension(3);

        let rows = simulate_split(&params).expect("valid params");
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[1].swp_monthly_withdrawal, None);
        assert_eq!(rows[2].swp_monthly_withdrawal, Some(100.0));
        assert_eq!(rows[3].swp_monthly_withdrawal, Some(110.0));
        assert_eq!(rows[4].swp_monthly_withdrawal, Some(121.0));
        assert_eq!(rows[2].swp_annual_withdrawal, Some(1_200.0));
        assert_eq!(rows[3].swp_annual_withdrawal, Some(1_320.0));
        assert_eq!(rows[4].swp_annual_withdrawal, Some(1_452.0));
        assert_eq!(rows[2].swp_end, Some(22_800.0));
        assert_eq!(rows[3].swp_end, Some(21_480.0));
        assert_eq!(rows[4].swp_end, Some(20_028.0));
    }

    #[test]
    fn swp_step_up_inside_contribution_window_counts_from_start() {
        let mut params = flat_params();
        params.contribution_years = 3;
        params.withdrawal_start = WithdrawalStart::Year(2);
        params.monthly_withdrawal = 100.0;
        params.withdrawal_step_up_percent = 10.0;

        let rows = simulate_split(&params).expect("valid params");
        assert_eq!(rows[0].swp_monthly_withdrawal, None);
        assert_eq!(rows[1].swp_monthly_withdrawal, Some(100.0));
        assert_eq!(rows[2].swp_monthly_withdrawal, Some(110.0));
        assert_eq!(rows[1].sip_monthly, Some(1_000.0));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_split_ledger_invariants_hold(
            contribution in 0u32..50_000,
            contribution_years in 1u32..30,
            rate_bp in 0u32..2_000,
            step_up_bp in 0u32..2_500,
            withdrawal_start in 1u32..40,
            withdrawal in 1u32..200_000,
            withdrawal_step_up_bp in 0u32..2_500,
            extension in 1u32..25,
            tax_bp in 0u32..10_000,
            inflation_bp in 0u32..1_500,
        ) {
            let params = SimulationParams {
                monthly_contribution: contribution as f64,
                contribution_years,
                annual_rate_percent: rate_bp as f64 / 100.0,
                contribution_step_up_percent: step_up_bp as f64 / 100.0,
                withdrawal_start: WithdrawalStart::Year(withdrawal_start),
                monthly_withdrawal: withdrawal as f64,
                withdrawal_step_up_percent: withdrawal_step_up_bp as f64 / 100.0,
                horizon: Horizon::FixedExtension(extension),
                withdrawal_cap_policy: WithdrawalCapPolicy::CapToAvailableBalance,
                report_mode: ReportMode::SplitLedger,
                tax_percent: tax_bp as f64 / 100.0,
                inflation_percent: inflation_bp as f64 / 100.0,
            };
            let schedule = params.schedule();
            let rows = simulate_split(&params).expect("generated params are valid");
            prop_assert_eq!(rows.len(), schedule.simulation_years as usize);

            let window = contribution_years as usize;
            let final_invested = rows[window - 1].cumulative_invested;
            let final_total = rows[window - 1].sip_total;
            for (index, row) in rows.iter().enumerate() {
                prop_assert_eq!(row.year as usize, index + 1);
                let contributing = row.year <= contribution_years;
                prop_assert_eq!(row.sip_monthly.is_some(), contributing);
                if !contributing {
                    prop_assert_eq!(row.cumulative_invested, final_invested);
                    prop_assert_eq!(row.sip_total, final_total);
                }

                let withdrawing = row.year >= schedule.withdrawal_start;
                prop_assert_eq!(row.swp_end.is_some(), withdrawing);
                if let Some(end) = row.swp_end {
                    prop_assert!(end >= 0.0, "year {} swp_end {}", row.year, end);
                }
            }
        }
    }
}
