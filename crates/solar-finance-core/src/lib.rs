pub mod config;
pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "solar")]
pub mod solar;

#[cfg(feature = "messaging")]
pub mod messaging;

#[cfg(feature = "workbook")]
pub mod workbook;

pub use config::ModelConfig;
pub use error::{FieldIssue, SolarFinanceError, ValidationFailure};
pub use types::*;

/// Standard result type for all solar-finance operations
pub type SolarFinanceResult<T> = Result<T, SolarFinanceError>;
