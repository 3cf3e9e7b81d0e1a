use super::error::ConfigurationError;
use super::split::run_split;
use super::types::{
    Horizon, Ledger, Projection, ReportMode, Schedule, SimulationParams, WithdrawalCapPolicy,
    WithdrawalStart, YearRow,
};

pub(crate) const MONTHS_PER_YEAR: u32 = 12;
pub(crate) const MAX_SIMULATION_YEARS: u32 = 200;

impl SimulationParams {
    pub fn schedule(&self) -> Schedule {
        let withdrawal_start = match self.withdrawal_start {
            WithdrawalStart::Year(year) => year,
            WithdrawalStart::AfterContributions => self.contribution_years.saturating_add(1),
        };
        let simulation_years = match self.horizon {
            Horizon::FixedExtension(extension) => self
                .contribution_years
                .max(withdrawal_start.saturating_add(extension).saturating_sub(1)),
            Horizon::WithdrawalYears(years) => self.contribution_years.saturating_add(years),
        };
        Schedule {
            withdrawal_start,
            simulation_years,
        }
    }

    pub fn monthly_rate(&self) -> f64 {
        self.annual_rate_percent / 100.0 / MONTHS_PER_YEAR as f64
    }

    pub fn validate(&self) -> Result<Schedule, ConfigurationError> {
        for (field, value) in [
            ("monthly contribution", self.monthly_contribution),
            ("annual interest rate", self.annual_rate_percent),
            ("contribution step-up", self.contribution_step_up_percent),
            ("monthly withdrawal", self.monthly_withdrawal),
            ("withdrawal step-up", self.withdrawal_step_up_percent),
            ("tax percentage", self.tax_percent),
            ("inflation percentage", self.inflation_percent),
        ] {
            if !value.is_finite() {
                return Err(ConfigurationError::NotFinite { field });
            }
            if value < 0.0 {
                return Err(ConfigurationError::Negative { field, value });
            }
        }

        if self.tax_percent > 100.0 {
            return Err(ConfigurationError::PercentOutOfRange {
                field: "tax percentage",
                value: self.tax_percent,
            });
        }

        if let WithdrawalStart::Year(year) = self.withdrawal_start {
            if year < 1 {
                return Err(ConfigurationError::WithdrawalStart(year));
            }
        }

        let schedule = self.schedule();
        if schedule.simulation_years < 1 {
            return Err(ConfigurationError::EmptyHorizon);
        }
        if self.contribution_years < 1 {
            return Err(ConfigurationError::ContributionYears(self.contribution_years));
        }
        if schedule.simulation_years > MAX_SIMULATION_YEARS {
            return Err(ConfigurationError::HorizonTooLong {
                years: schedule.simulation_years,
                max: MAX_SIMULATION_YEARS,
            });
        }
        Ok(schedule)
    }
}

/// Monthly amount for a year that is `years_elapsed` step-ups past the base
/// year, rounded to cents. The rounded figure is the one applied to all twelve
/// months of that year.
pub fn stepped_monthly_amount(base: f64, step_up_percent: f64, years_elapsed: u32) -> f64 {
    let grown = base * (1.0 + step_up_percent / 100.0).powi(years_elapsed as i32);
    round_to_cents(grown)
}

pub(crate) fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn project(params: &SimulationParams) -> Result<Projection, ConfigurationError> {
    let schedule = params.validate()?;
    let ledger = match params.report_mode {
        ReportMode::Integrated => Ledger::Integrated(run_integrated(params, schedule)),
        ReportMode::SplitLedger => Ledger::Split(run_split(params, schedule)),
    };
    Ok(Projection { schedule, ledger })
}

pub fn simulate(params: &SimulationParams) -> Result<Vec<YearRow>, ConfigurationError> {
    let schedule = params.validate()?;
    Ok(run_integrated(params, schedule))
}

#[derive(Debug, Clone, Copy)]
struct MonthOutcome {
    withdrawn: f64,
}

fn apply_month(
    balance: &mut f64,
    contribution: f64,
    nominal_withdrawal: f64,
    monthly_rate: f64,
    policy: WithdrawalCapPolicy,
) -> MonthOutcome {
    *balance += contribution;
    let withdrawn = match policy {
        WithdrawalCapPolicy::Uncapped => nominal_withdrawal,
        WithdrawalCapPolicy::CapToAvailableBalance => nominal_withdrawal.min(*balance).max(0.0),
    };
    *balance -= withdrawn;
    *balance *= 1.0 + monthly_rate;
    MonthOutcome { withdrawn }
}

fn run_integrated(params: &SimulationParams, schedule: Schedule) -> Vec<YearRow> {
    let monthly_rate = params.monthly_rate();
    let mut balance = 0.0_f64;
    let mut cumulative_contributed = 0.0_f64;
    let mut cumulative_withdrawn = 0.0_f64;
    let mut rows = Vec::with_capacity(schedule.simulation_years as usize);

    for year in 1..=schedule.simulation_years {
        let contributing = year <= params.contribution_years;
        let withdrawing = year >= schedule.withdrawal_start;

        let monthly_contribution = if contributing {
            stepped_monthly_amount(
                params.monthly_contribution,
                params.contribution_step_up_percent,
                year - 1,
            )
        } else {
            0.0
        };
        let monthly_withdrawal = if withdrawing {
            stepped_monthly_amount(
                params.monthly_withdrawal,
                params.withdrawal_step_up_percent,
                year - schedule.withdrawal_start,
            )
        } else {
            0.0
        };

        let begin_balance = balance;
        let mut annual_withdrawal = 0.0;
        for _ in 0..MONTHS_PER_YEAR {
            let outcome = apply_month(
                &mut balance,
                monthly_contribution,
                monthly_withdrawal,
                monthly_rate,
                params.withdrawal_cap_policy,
            );
            annual_withdrawal += outcome.withdrawn;
        }

        let annual_contribution = monthly_contribution * MONTHS_PER_YEAR as f64;
        // Residual growth, so begin + flows + interest reconciles with end.
        let interest_earned = balance - (begin_balance + annual_contribution - annual_withdrawal);
        cumulative_contributed += annual_contribution;
        if withdrawing {
            cumulative_withdrawn += annual_withdrawal;
        }

        rows.push(YearRow {
            year,
            begin_balance: round_whole(begin_balance),
            monthly_contribution: contributing.then_some(monthly_contribution),
            annual_contribution: round_whole(annual_contribution),
            cumulative_contributed: round_whole(cumulative_contributed),
            monthly_withdrawal: withdrawing.then_some(monthly_withdrawal),
            annual_withdrawal: round_whole(annual_withdrawal),
            cumulative_withdrawn: round_whole(cumulative_withdrawn),
            interest_earned: round_whole(interest_earned),
            end_balance: round_whole(balance),
        });
    }
    rows
}

/// Rounds to a whole currency unit, normalizing `-0.0` to `0.0`.
pub(crate) fn round_whole(value: f64) -> f64 {
    let rounded = value.round();
    if rounded == 0.0 { 0.0 } else { rounded }
}
