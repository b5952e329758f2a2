//! Decoded entry records.
//!
//! A record is the caller-owned target an entry is decoded into. Readers
//! reuse one record across many reads, so `decode` overwrites any previous
//! contents.

use bytes::BytesMut;
use strand_core::Position;

use crate::error::LogResult;

/// A reusable target for decoding log entries.
pub trait EntryRecord {
    /// Decodes the payload of the entry at `position` into `self`.
    ///
    /// # Errors
    /// Returns [`LogError::Decode`](crate::LogError::Decode) if the payload
    /// is not a valid record.
    fn decode(&mut self, position: Position, payload: &[u8]) -> LogResult<()>;
}

/// A record holding the raw entry payload.
///
/// The payload buffer is retained between decodes, so steady-state reads
/// do not allocate.
#[derive(Debug, Default, Clone)]
pub struct RawRecord {
    position: Position,
    payload: BytesMut,
}

impl RawRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty record with room for `capacity` payload bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            position: Position::ZERO,
            payload: BytesMut::with_capacity(capacity),
        }
    }

    /// Returns the position of the last decoded entry.
    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Returns the payload of the last decoded entry.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns the payload length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns true if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl EntryRecord for RawRecord {
    fn decode(&mut self, position: Position, payload: &[u8]) -> LogResult<()> {
        self.position = position;
        self.payload.clear();
        self.payload.extend_from_slice(payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_record_overwrites_previous_payload() {
        let mut record = RawRecord::with_capacity(16);

        record.decode(Position::new(1), b"first payload").unwrap();
        assert_eq!(record.payload(), b"first payload");

        record.decode(Position::new(2), b"two").unwrap();
        assert_eq!(record.position(), Position::new(2));
        assert_eq!(record.payload(), b"two");
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn test_raw_record_empty_payload() {
        let mut record = RawRecord::new();
        record.decode(Position::new(9), b"").unwrap();
        assert!(record.is_empty());
        assert_eq!(record.position(), Position::new(9));
    }
}
