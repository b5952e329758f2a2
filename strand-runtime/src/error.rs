//! Error types for runtime resources.

use thiserror::Error;

/// Errors from the actor scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// The scheduler has been shut down.
    #[error("scheduler is shut down")]
    ShutDown,
}

/// Errors from offering to a send buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendBufferError {
    /// The buffer is full. Retry later.
    #[error("send buffer full (capacity {capacity})")]
    Full {
        /// Buffer capacity.
        capacity: usize,
    },

    /// The receiving side is gone.
    #[error("send buffer closed")]
    Closed,
}

impl SendBufferError {
    /// Returns true if the offer may succeed later.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        matches!(self, Self::Full { .. })
    }
}

/// Result type for connection pool operations.
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Errors from the connection pool.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Failed to connect to a peer.
    #[error("failed to connect to {addr}: {source}")]
    ConnectFailed {
        /// The peer address.
        addr: String,
        /// The underlying error.
        source: std::io::Error,
    },

    /// Connecting took longer than the configured timeout.
    #[error("timed out connecting to {addr}")]
    Timeout {
        /// The peer address.
        addr: String,
    },

    /// The pool is at capacity.
    #[error("connection pool exhausted ({max} connections)")]
    PoolExhausted {
        /// Maximum number of connections.
        max: usize,
    },

    /// Writing to a connection failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The payload does not fit in a frame.
    #[error("frame too large: {size} bytes")]
    FrameTooLarge {
        /// Payload size in bytes.
        size: usize,
    },

    /// The pool has been closed.
    #[error("connection pool closed")]
    Closed,
}
