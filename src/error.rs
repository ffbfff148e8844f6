use thiserror::Error;

/// Mount alignment error types
///
/// Only construction and input-shape problems are errors. Numerical
/// degeneracy and skipped observations are reported through return values.
#[derive(Error, Debug)]
pub enum AlignError {
    #[error("Filter coefficients must not be empty")]
    EmptyCoefficients,

    #[error("Filter coefficients must have the same length (b: {b_len}, a: {a_len})")]
    CoefficientLengthMismatch { b_len: usize, a_len: usize },

    #[error("Invalid filter design: {0}")]
    InvalidFilterDesign(String),

    #[error("Table shape error: {0}")]
    TableShape(String),

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for alignment operations
pub type AlignResult<T> = Result<T, AlignError>;
