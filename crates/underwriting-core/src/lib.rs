pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "underwriting")]
pub mod underwriting;

#[cfg(feature = "debt_sizing")]
pub mod debt_sizing;

#[cfg(feature = "waterfall")]
pub mod waterfall;

pub use error::UnderwritingError;
pub use types::*;

/// Standard result type for all engine operations
pub type EngineResult<T> = Result<T, UnderwritingError>;
