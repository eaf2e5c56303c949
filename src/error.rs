//! Error types.
//!
//! Two layers:
//!
//! - [`Error`]: typed library errors returned by configuration, payoff-table
//!   construction and I/O helpers.
//! - [`AppError`]: what the binary reports, carrying a process exit code.
//!
//! Infeasible grid cells, optimizer non-convergence and degenerate objective
//! ranges are *not* errors; they are represented as data on the outcomes.

/// Library error type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// An objective name outside the closed metric set.
    #[error("unknown objective '{0}' (expected one of: Cost, Carbon, Efficiency, QualityRobustness, RelativeDensity, EnergyDensity)")]
    UnknownObjective(String),

    /// An unknown optimization direction.
    #[error("unknown direction '{0}' (expected 'min' or 'max')")]
    UnknownDirection(String),

    /// The objective list is empty, has duplicates, or cannot drive a grid run.
    #[error("invalid objective set: {0}")]
    InvalidObjectiveSet(String),

    /// A decision variable has inverted or non-finite bounds.
    #[error("invalid bounds for variable {index}: low ({low}) must be finite and <= high ({high})")]
    InvalidBounds {
        /// Position of the variable in the decision vector.
        index: usize,
        /// Lower bound.
        low: f64,
        /// Upper bound.
        high: f64,
    },

    /// A numeric setting outside its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No payoff row could be obtained for an objective, even via surrogate fallback.
    #[error("no feasible payoff row for objective '{objective}' and no surrogate row available")]
    UnrecoverablePayoffFailure {
        /// Objective whose standalone optimization failed.
        objective: String,
    },

    /// File system failure.
    #[error("i/o error: {0}")]
    Io(String),

    /// Run-file or export (de)serialization failure.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Convenience alias for library results.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let exit_code = match err {
            Error::UnknownObjective(_)
            | Error::UnknownDirection(_)
            | Error::InvalidObjectiveSet(_)
            | Error::InvalidBounds { .. }
            | Error::InvalidConfig(_)
            | Error::Parse(_) => 2,
            Error::UnrecoverablePayoffFailure { .. } => 3,
            Error::Io(_) => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
