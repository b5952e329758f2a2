//! Broker error types.

use strand_cluster::ClusterError;
use strand_logstreams::LogStreamsError;
use strand_runtime::SchedulerError;
use thiserror::Error;

/// Result type for broker operations.
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Errors that can occur while starting or stopping a broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Invalid broker configuration.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// A partition log could not be created or closed.
    #[error(transparent)]
    LogStreams(#[from] LogStreamsError),

    /// The cluster context could not be wired.
    #[error(transparent)]
    Cluster(#[from] ClusterError),

    /// A processor could not be scheduled.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

impl From<strand_core::Error> for BrokerError {
    fn from(err: strand_core::Error) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}
