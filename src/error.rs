//! Error type shared by every algorithm in the crate

use std::time::Duration;
use thiserror::Error;

/// Errors returned by graph construction, clustering and sense induction.
#[derive(Debug, Error)]
pub enum Error {
    /// A builder received a parameter it cannot run with.
    #[error("invalid configuration {name}: {message}")]
    InvalidConfiguration {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: String,
    },

    /// An edge weight is zero, negative or not finite where a positive weight is
    /// required, or too small for the chosen vote weighting.
    #[error("invalid edge weight {weight}: not usable as a positive vote weight")]
    InvalidWeight {
        /// The offending weight.
        weight: f64,
    },

    /// Matrix iteration collapsed a column to zero mass.
    #[error("numeric divergence: column {column} sums to zero after inflation in iteration {iteration}")]
    NumericDivergence {
        /// Column index inside the component matrix.
        column: usize,
        /// Iteration (1-based) in which the column collapsed.
        iteration: usize,
    },

    /// The external clustering executable failed to launch, exited abnormally,
    /// or produced output that cannot be parsed.
    #[error("external tool failure: {message}")]
    ExternalToolFailure {
        /// What went wrong.
        message: String,
        /// Captured standard output and standard error of the process.
        output: String,
    },

    /// The external clustering executable exceeded the caller deadline.
    #[error("external tool timed out after {limit:?}")]
    Timeout {
        /// The configured deadline.
        limit: Duration,
    },

    /// Malformed input in one of the line-based formats.
    #[error("format error at line {line}: {message}")]
    Format {
        /// Line number (1-based).
        line: usize,
        /// Human-readable explanation.
        message: String,
    },

    /// I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_configuration(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            name,
            message: message.into(),
        }
    }
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Reject weights that are not strictly positive and finite.
pub(crate) fn require_positive_weight(weight: f64) -> Result<f64> {
    if weight.is_finite() && weight > 0.0 {
        Ok(weight)
    } else {
        Err(Error::InvalidWeight { weight })
    }
}
