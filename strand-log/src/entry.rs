//! Log entry format.
//!
//! Each entry in a segment has the following binary format:
//!
//! ```text
//! +----------+----------+----------+----------+
//! |  CRC32   |  Length  | Position | Payload  |
//! | (4 bytes)| (4 bytes)| (8 bytes)| (N bytes)|
//! +----------+----------+----------+----------+
//! ```
//!
//! - CRC32: checksum of Length + Position + Payload
//! - Length: payload length in bytes (not including header)
//! - Position: position of this entry within its partition
//!
//! All integers are stored in little-endian format.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use strand_core::limits::ENTRY_PAYLOAD_SIZE_BYTES_MAX;
use strand_core::Position;

use crate::error::{LogError, LogResult};

/// Size of the entry header in bytes.
pub const ENTRY_HEADER_SIZE: usize = 16; // 4 + 4 + 8

/// Entry header containing metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    /// CRC32 checksum of the rest of the entry.
    pub crc: u32,
    /// Length of the payload in bytes.
    pub length: u32,
    /// Position of this entry.
    pub position: Position,
}

impl EntryHeader {
    /// Creates a new entry header, computing the CRC over the payload.
    ///
    /// # Errors
    /// Returns an error if the payload is too large.
    pub fn new(position: Position, payload: &[u8]) -> LogResult<Self> {
        let length = u32::try_from(payload.len())
            .ok()
            .filter(|len| *len <= ENTRY_PAYLOAD_SIZE_BYTES_MAX)
            .ok_or(LogError::EntryTooLarge {
                size: u32::try_from(payload.len()).unwrap_or(u32::MAX),
                max: ENTRY_PAYLOAD_SIZE_BYTES_MAX,
            })?;

        let crc = Self::compute_crc(length, position, payload);

        Ok(Self {
            crc,
            length,
            position,
        })
    }

    fn compute_crc(length: u32, position: Position, payload: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&length.to_le_bytes());
        hasher.update(&position.get().to_le_bytes());
        hasher.update(payload);
        hasher.finalize()
    }

    /// Verifies the CRC matches the payload.
    ///
    /// # Errors
    /// Returns `ChecksumMismatch` if the CRC doesn't match.
    pub fn verify(&self, payload: &[u8], offset: u64) -> LogResult<()> {
        let expected = Self::compute_crc(self.length, self.position, payload);
        if expected != self.crc {
            return Err(LogError::ChecksumMismatch {
                offset,
                expected,
                actual: self.crc,
            });
        }
        Ok(())
    }

    /// Encodes the header to bytes.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.crc);
        buf.put_u32_le(self.length);
        buf.put_u64_le(self.position.get());
    }

    /// Decodes a header from bytes.
    ///
    /// # Errors
    /// Returns an error if the buffer is too small or the length is invalid.
    pub fn decode(buf: &mut impl Buf, offset: u64) -> LogResult<Self> {
        if buf.remaining() < ENTRY_HEADER_SIZE {
            return Err(LogError::InvalidHeader {
                offset,
                reason: "buffer too small for header",
            });
        }

        let crc = buf.get_u32_le();
        let length = buf.get_u32_le();
        let position = Position::new(buf.get_u64_le());

        if length > ENTRY_PAYLOAD_SIZE_BYTES_MAX {
            return Err(LogError::InvalidHeader {
                offset,
                reason: "length exceeds maximum",
            });
        }

        Ok(Self {
            crc,
            length,
            position,
        })
    }

    /// Returns the total size of the entry (header + payload).
    #[must_use]
    pub const fn total_size(&self) -> u64 {
        ENTRY_HEADER_SIZE as u64 + self.length as u64
    }
}

/// A complete log entry (header + payload).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Entry header with metadata.
    pub header: EntryHeader,
    /// Entry payload.
    pub payload: Bytes,
}

impl Entry {
    /// Creates a new entry.
    ///
    /// # Errors
    /// Returns an error if the payload is too large.
    pub fn new(position: Position, payload: Bytes) -> LogResult<Self> {
        let header = EntryHeader::new(position, &payload)?;
        Ok(Self { header, payload })
    }

    /// Returns the position of this entry.
    #[must_use]
    pub const fn position(&self) -> Position {
        self.header.position
    }

    /// Returns the payload length.
    #[must_use]
    pub const fn payload_len(&self) -> u32 {
        self.header.length
    }

    /// Returns the total size (header + payload).
    #[must_use]
    pub const fn total_size(&self) -> u64 {
        self.header.total_size()
    }

    /// Encodes the entire entry to bytes.
    pub fn encode(&self, buf: &mut BytesMut) {
        self.header.encode(buf);
        buf.put_slice(&self.payload);
    }

    /// Decodes an entry from bytes.
    ///
    /// # Errors
    /// Returns an error if the data is truncated or corrupted.
    pub fn decode(buf: &mut impl Buf, offset: u64) -> LogResult<Self> {
        let header = EntryHeader::decode(buf, offset)?;

        if buf.remaining() < header.length as usize {
            return Err(LogError::TruncatedEntry {
                offset,
                expected: header.length,
                found: u32::try_from(buf.remaining()).unwrap_or(u32::MAX),
            });
        }

        let payload = buf.copy_to_bytes(header.length as usize);
        header.verify(&payload, offset)?;

        Ok(Self { header, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_roundtrip() {
        let payload = Bytes::from("hello, world!");
        let entry = Entry::new(Position::new(42), payload.clone()).unwrap();

        assert_eq!(entry.position(), Position::new(42));
        assert_eq!(entry.payload, payload);

        let mut buf = BytesMut::new();
        entry.encode(&mut buf);
        assert_eq!(buf.len() as u64, entry.total_size());

        let decoded = Entry::decode(&mut buf.freeze(), 0).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_entry_checksum_detects_corruption() {
        let entry = Entry::new(Position::new(1), Bytes::from("test")).unwrap();

        let mut buf = BytesMut::new();
        entry.encode(&mut buf);

        let len = buf.len();
        buf[len - 1] ^= 0xFF;

        let result = Entry::decode(&mut buf.freeze(), 0);
        assert!(matches!(result, Err(LogError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_entry_position_is_covered_by_checksum() {
        let entry = Entry::new(Position::new(7), Bytes::from("payload")).unwrap();

        let mut buf = BytesMut::new();
        entry.encode(&mut buf);
        // Position occupies bytes 8..16.
        buf[8] ^= 0x01;

        let result = Entry::decode(&mut buf.freeze(), 0);
        assert!(matches!(result, Err(LogError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_entry_truncated_payload() {
        let entry = Entry::new(Position::new(1), Bytes::from("a longer payload")).unwrap();

        let mut buf = BytesMut::new();
        entry.encode(&mut buf);
        buf.truncate(ENTRY_HEADER_SIZE + 3);

        let result = Entry::decode(&mut buf.freeze(), 64);
        assert!(matches!(
            result,
            Err(LogError::TruncatedEntry {
                offset: 64,
                found: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_entry_too_large() {
        let payload = Bytes::from(vec![0u8; ENTRY_PAYLOAD_SIZE_BYTES_MAX as usize + 1]);
        let result = Entry::new(Position::ZERO, payload);
        assert!(matches!(result, Err(LogError::EntryTooLarge { .. })));
    }
}
