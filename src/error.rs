//! Error types surfaced at the crate boundary.

use std::error;
use std::fmt;

/// Errors returned by problem construction and the solver entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The problem data is malformed. Collects every violation found so a
    /// caller can report them all at once.
    Validation { errors: Vec<String> },
    /// An internal invariant was violated while solving.
    Solve { reason: String },
    /// An optional feature that is deliberately not wired up was requested.
    NotImplemented { function: String },
}

impl Error {
    pub fn validation(errors: Vec<String>) -> Self {
        Error::Validation { errors }
    }

    pub fn solve(reason: impl Into<String>) -> Self {
        Error::Solve {
            reason: reason.into(),
        }
    }

    pub fn not_implemented(function: impl Into<String>) -> Self {
        Error::NotImplemented {
            function: function.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation { errors } => {
                write!(f, "invalid problem data: {}", errors.join("; "))
            }
            Error::Solve { reason } => write!(f, "solve failed: {}", reason),
            Error::NotImplemented { function } => {
                write!(f, "not implemented: {}", function)
            }
        }
    }
}

impl error::Error for Error {}
