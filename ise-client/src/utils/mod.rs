/// Logging setup
pub mod logging;

/// Aggregated application error
pub mod error;

pub use error::{AppError, AppResult, ErrorCode, ErrorContext};
pub use logging::init_logging;
