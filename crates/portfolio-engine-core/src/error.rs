use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Singular matrix: pivot magnitude {pivot} below threshold at column {column}")]
    SingularMatrix { column: usize, pivot: Decimal },

    #[error("Degenerate optimization: {0}")]
    DegenerateOptimization(String),

    #[error("Task cancelled")]
    TaskCancelled,

    #[error("Background execution failure: {0}")]
    Execution(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl EngineError {
    /// Stable machine-readable tag, carried on task failure events.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidInput { .. } => "invalid_input",
            EngineError::InsufficientData(_) => "insufficient_data",
            EngineError::SingularMatrix { .. } => "singular_matrix",
            EngineError::DegenerateOptimization(_) => "degenerate_optimization",
            EngineError::TaskCancelled => "task_cancelled",
            EngineError::Execution(_) => "execution",
            EngineError::SerializationError(_) => "serialization",
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::SerializationError(e.to_string())
    }
}
