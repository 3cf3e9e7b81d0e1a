mod engine;
mod error;
mod split;
mod types;

pub use engine::{project, simulate, stepped_monthly_amount};
pub use error::ConfigurationError;
pub use split::simulate_split;
pub use types::{
    Horizon, Ledger, Projection, ReportMode, Schedule, SimulationParams, SplitYearRow,
    WithdrawalCapPolicy, WithdrawalStart, YearRow,
};
