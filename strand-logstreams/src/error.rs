//! Error types for the partition registry.

use strand_log::LogError;

/// Result type for registry operations.
pub type LogStreamsResult<T> = std::result::Result<T, LogStreamsError>;

/// Errors that can occur when creating partition logs.
#[derive(Debug, thiserror::Error)]
pub enum LogStreamsError {
    /// The registry or the requested partition is misconfigured.
    ///
    /// This is a startup fault and is never worth retrying.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the problem.
        message: String,
    },

    /// The partition log could not be opened.
    #[error("storage error: {0}")]
    Storage(#[from] LogError),
}

impl From<strand_core::Error> for LogStreamsError {
    fn from(err: strand_core::Error) -> Self {
        Self::Configuration {
            message: err.to_string(),
        }
    }
}

impl LogStreamsError {
    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_core::PartitionId;

    #[test]
    fn test_core_error_maps_to_configuration() {
        let err: LogStreamsError = PartitionId::new(40_000).unwrap_err().into();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("partition id"));
    }

    #[test]
    fn test_log_error_maps_to_storage() {
        let err: LogStreamsError = LogError::SegmentFull { reason: "test" }.into();
        assert!(matches!(err, LogStreamsError::Storage(_)));
        assert!(!err.is_configuration());
    }
}
