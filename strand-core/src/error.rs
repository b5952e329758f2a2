//! Error types for Strand core operations.
//!
//! Constructors of validated types return these errors; higher layers wrap
//! them into their own configuration errors.

use std::fmt;

/// The result type for Strand core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing core values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An invalid argument was provided.
    InvalidArgument {
        /// The name of the argument.
        name: &'static str,
        /// Why it was invalid.
        reason: &'static str,
    },

    /// A value fell outside its allowed range.
    OutOfRange {
        /// The name of the value.
        name: &'static str,
        /// The smallest allowed value.
        min: i64,
        /// The largest allowed value.
        max: i64,
        /// The value that was provided.
        actual: i64,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument { name, reason } => {
                write!(f, "invalid argument '{name}': {reason}")
            }
            Self::OutOfRange {
                name,
                min,
                max,
                actual,
            } => {
                write!(f, "{name} out of range: {actual} not in [{min}, {max}]")
            }
        }
    }
}

impl std::error::Error for Error {}
