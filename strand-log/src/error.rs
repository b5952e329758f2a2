//! Log error types.
//!
//! Failures fall in two families: storage I/O ([`LogError::Io`]) and data
//! corruption ([`LogError::is_corruption`]). Neither is retried here.

use strand_core::Position;
use thiserror::Error;

/// Result type for log operations.
pub type LogResult<T> = Result<T, LogError>;

/// Errors that can occur during log operations.
#[derive(Debug, Error)]
pub enum LogError {
    /// Entry payload exceeds maximum size.
    #[error("entry too large: {size} bytes exceeds max {max} bytes")]
    EntryTooLarge {
        /// Actual size in bytes.
        size: u32,
        /// Maximum allowed size.
        max: u32,
    },

    /// Segment cannot take the entry (size or entry count limit reached).
    #[error("segment full: {reason}")]
    SegmentFull {
        /// Why the segment is full.
        reason: &'static str,
    },

    /// CRC checksum mismatch indicates corruption.
    #[error("checksum mismatch at offset {offset}: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        /// Byte offset where corruption was detected.
        offset: u64,
        /// Expected CRC32 value.
        expected: u32,
        /// Actual CRC32 value found.
        actual: u32,
    },

    /// Entry or segment header is invalid.
    #[error("invalid header at offset {offset}: {reason}")]
    InvalidHeader {
        /// Byte offset of the header.
        offset: u64,
        /// Why the header is invalid.
        reason: &'static str,
    },

    /// An entry was cut short (torn write).
    #[error("truncated entry at offset {offset}: expected {expected} bytes, found {found} bytes")]
    TruncatedEntry {
        /// Offset of the truncated entry.
        offset: u64,
        /// Expected payload size.
        expected: u32,
        /// Bytes actually present.
        found: u32,
    },

    /// Position is below the first retained entry.
    #[error("position {position} out of range (first retained {first})")]
    PositionOutOfRange {
        /// Requested position.
        position: Position,
        /// First position held by the log.
        first: Position,
    },

    /// The payload at a position could not be decoded into a record.
    #[error("failed to decode entry at {position}: {reason}")]
    Decode {
        /// Position of the entry.
        position: Position,
        /// Decoder message.
        reason: String,
    },

    /// I/O error from underlying storage.
    #[error("I/O error: {operation}: {message}")]
    Io {
        /// What operation was being performed.
        operation: &'static str,
        /// Error message.
        message: String,
    },

    /// The log has been closed.
    #[error("log {log_name} is closed")]
    Closed {
        /// Name of the closed log.
        log_name: String,
    },
}

impl LogError {
    /// Creates an I/O error.
    pub fn io(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Io {
            operation,
            message: err.to_string(),
        }
    }

    /// Returns true if this error indicates unreadable or corrupt data.
    #[must_use]
    pub const fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::ChecksumMismatch { .. }
                | Self::InvalidHeader { .. }
                | Self::TruncatedEntry { .. }
                | Self::Decode { .. }
        )
    }
}
