//! Error types for cluster wiring.

use thiserror::Error;

/// Result type for cluster operations.
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Errors that can occur while wiring the cluster context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    /// A required dependency was not provided before `build`.
    #[error("cluster context is missing its {name}")]
    MissingDependency {
        /// Name of the missing dependency.
        name: &'static str,
    },
}
