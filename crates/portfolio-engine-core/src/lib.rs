pub mod constraints;
pub mod context;
pub mod covariance;
pub mod error;
pub mod frontier;
pub mod matrix;
pub mod metrics;
pub mod optimizer;
pub mod solver;
pub mod types;

#[cfg(feature = "background")]
pub mod background;

pub use error::EngineError;
pub use types::*;

/// Standard result type for all engine operations
pub type EngineResult<T> = Result<T, EngineError>;
