//! Domain errors for the grading core and persistence layer.

/// Errors raised by the library. The CLI wraps these in `anyhow`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GradeError {
    /// Out-of-range percentage, negative count, or malformed record
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unknown inspection, area, or item id
    #[error("{0} not found")]
    NotFound(String),

    /// Threshold table failed validation
    #[error("Invalid grade table: {0}")]
    InvalidTable(String),

    /// Persistence backend failure
    #[error("Storage error: {0}")]
    Storage(String),
}

pub type GradeResult<T> = std::result::Result<T, GradeError>;
