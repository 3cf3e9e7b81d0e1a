use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("contribution years must be >= 1, got {0}")]
    ContributionYears(u32),
    #[error("withdrawal start year must be >= 1, got {0}")]
    WithdrawalStart(u32),
    #[error("simulation horizon resolves to zero years")]
    EmptyHorizon,
    #[error(
        "simulation horizon of {years} years exceeds the supported maximum of {max} years; \
         shorten the contribution or withdrawal period"
    )]
    HorizonTooLong { years: u32, max: u32 },
    #[error("{field} must be >= 0, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },
    #[error("{field} must be between 0 and 100, got {value}")]
    PercentOutOfRange { field: &'static str, value: f64 },
}
