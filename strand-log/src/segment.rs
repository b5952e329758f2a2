//! Log segment management.
//!
//! A segment is a single file holding a contiguous run of entries.
//! Segments are append-only and rolled when they reach their size limit.
//!
//! # Segment File Format
//!
//! ```text
//! +-------------------+
//! | Segment Header    |  (32 bytes)
//! +-------------------+
//! | Entry 1           |
//! +-------------------+
//! | Entry 2           |
//! +-------------------+
//! | ...               |
//! +-------------------+
//! ```
//!
//! Segment header:
//! - Magic (8 bytes): "STRANDLG"
//! - Version (4 bytes): Format version
//! - Segment ID (8 bytes): Unique segment identifier
//! - First Position (8 bytes): Position of the first entry in this segment
//! - Reserved (4 bytes)

use bytes::{Buf, BufMut, Bytes, BytesMut};
use strand_core::limits::{ENTRIES_PER_SEGMENT_MAX, SEGMENT_SIZE_BYTES_MAX, SEGMENT_SIZE_BYTES_MIN};
use strand_core::Position;

use crate::entry::{Entry, ENTRY_HEADER_SIZE};
use crate::error::{LogError, LogResult};

/// Segment header size in bytes.
pub const SEGMENT_HEADER_SIZE: usize = 32;

const SEGMENT_MAGIC: &[u8; 8] = b"STRANDLG";

const SEGMENT_VERSION: u32 = 1;

/// Default segment size (512 MiB).
const SEGMENT_SIZE_BYTES_DEFAULT: u64 = 512 * 1024 * 1024;

/// Unique identifier for a segment within one log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentId(u64);

impl SegmentId {
    /// Creates a new segment ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the next segment ID.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Returns the file name used for this segment.
    #[must_use]
    pub fn file_name(self) -> String {
        format!("segment-{:08}.log", self.0)
    }
}

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "seg-{:08}", self.0)
    }
}

/// Configuration for a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentConfig {
    /// Maximum size of the segment in bytes, header included.
    pub max_size_bytes: u64,
    /// Maximum number of entries in the segment.
    pub max_entries: u64,
}

impl SegmentConfig {
    /// Creates a new segment configuration with defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_size_bytes: SEGMENT_SIZE_BYTES_DEFAULT,
            max_entries: ENTRIES_PER_SEGMENT_MAX,
        }
    }

    /// Sets the maximum size in bytes.
    ///
    /// # Panics
    /// Panics if size is outside the valid range.
    #[must_use]
    pub const fn with_max_size(mut self, size: u64) -> Self {
        assert!(
            size >= SEGMENT_SIZE_BYTES_MIN && size <= SEGMENT_SIZE_BYTES_MAX,
            "segment size out of range"
        );
        self.max_size_bytes = size;
        self
    }

    /// Sets the maximum number of entries per segment.
    ///
    /// # Panics
    /// Panics if entries is 0 or exceeds `ENTRIES_PER_SEGMENT_MAX`.
    #[must_use]
    pub const fn with_max_entries(mut self, entries: u64) -> Self {
        assert!(entries > 0, "max_entries must be positive");
        assert!(
            entries <= ENTRIES_PER_SEGMENT_MAX,
            "max_entries exceeds limit"
        );
        self.max_entries = entries;
        self
    }

    /// Returns true if `size` is an acceptable segment size.
    #[must_use]
    pub const fn is_valid_size(size: u64) -> bool {
        size >= SEGMENT_SIZE_BYTES_MIN && size <= SEGMENT_SIZE_BYTES_MAX
    }
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Segment header stored at the beginning of each segment file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    /// Format version.
    pub version: u32,
    /// Unique segment identifier.
    pub segment_id: SegmentId,
    /// Position of the first entry in this segment.
    pub first_position: Position,
}

impl SegmentHeader {
    /// Creates a new segment header.
    #[must_use]
    pub const fn new(segment_id: SegmentId, first_position: Position) -> Self {
        Self {
            version: SEGMENT_VERSION,
            segment_id,
            first_position,
        }
    }

    /// Encodes the header to bytes.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(SEGMENT_MAGIC);
        buf.put_u32_le(self.version);
        buf.put_u64_le(self.segment_id.get());
        buf.put_u64_le(self.first_position.get());
        buf.put_u32_le(0);
    }

    /// Decodes a header from bytes.
    ///
    /// # Errors
    /// Returns an error if the data is invalid.
    pub fn decode(buf: &mut impl Buf) -> LogResult<Self> {
        if buf.remaining() < SEGMENT_HEADER_SIZE {
            return Err(LogError::InvalidHeader {
                offset: 0,
                reason: "segment header too small",
            });
        }

        let mut magic = [0u8; 8];
        buf.copy_to_slice(&mut magic);
        if &magic != SEGMENT_MAGIC {
            return Err(LogError::InvalidHeader {
                offset: 0,
                reason: "invalid segment magic",
            });
        }

        let version = buf.get_u32_le();
        if version != SEGMENT_VERSION {
            return Err(LogError::InvalidHeader {
                offset: 0,
                reason: "unsupported segment version",
            });
        }

        let segment_id = SegmentId::new(buf.get_u64_le());
        let first_position = Position::new(buf.get_u64_le());
        let _reserved = buf.get_u32_le();

        Ok(Self {
            version,
            segment_id,
            first_position,
        })
    }
}

/// An in-memory copy of a segment's entries.
#[derive(Debug, Clone)]
pub struct Segment {
    header: SegmentHeader,
    config: SegmentConfig,
    entries: Vec<Entry>,
    /// Current size in bytes (header + entries).
    size_bytes: u64,
}

impl Segment {
    /// Creates a new empty segment.
    #[must_use]
    pub const fn new(segment_id: SegmentId, first_position: Position, config: SegmentConfig) -> Self {
        Self {
            header: SegmentHeader::new(segment_id, first_position),
            config,
            entries: Vec::new(),
            size_bytes: SEGMENT_HEADER_SIZE as u64,
        }
    }

    /// Returns the segment header.
    #[must_use]
    pub const fn header(&self) -> &SegmentHeader {
        &self.header
    }

    /// Returns the segment ID.
    #[must_use]
    pub const fn id(&self) -> SegmentId {
        self.header.segment_id
    }

    /// Returns the position of the first entry in this segment.
    #[must_use]
    pub const fn first_position(&self) -> Position {
        self.header.first_position
    }

    /// Returns the position the next appended entry must carry.
    #[must_use]
    pub fn next_position(&self) -> Position {
        Position::new(self.header.first_position.get() + self.entry_count())
    }

    /// Returns the position of the last entry, or None if empty.
    #[must_use]
    pub fn last_position(&self) -> Option<Position> {
        self.entries.last().map(Entry::position)
    }

    /// Returns the number of entries in this segment.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.entries.len() as u64
    }

    /// Returns the current size in bytes.
    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Returns true if the segment has room for an entry of the given payload size.
    #[must_use]
    pub fn has_space_for(&self, payload_size: u32) -> bool {
        let entry_size = ENTRY_HEADER_SIZE as u64 + u64::from(payload_size);
        self.size_bytes + entry_size <= self.config.max_size_bytes
            && self.entry_count() < self.config.max_entries
    }

    /// Appends an entry to the segment.
    ///
    /// # Panics
    /// Panics if the entry position is not the segment's next position.
    ///
    /// # Errors
    /// Returns an error if the segment is full.
    pub fn append(&mut self, entry: Entry) -> LogResult<()> {
        assert_eq!(
            entry.position(),
            self.next_position(),
            "entry position must be sequential"
        );

        if self.size_bytes + entry.total_size() > self.config.max_size_bytes {
            return Err(LogError::SegmentFull {
                reason: "size limit reached",
            });
        }
        if self.entry_count() >= self.config.max_entries {
            return Err(LogError::SegmentFull {
                reason: "entry count limit reached",
            });
        }

        self.size_bytes += entry.total_size();
        self.entries.push(entry);
        Ok(())
    }

    /// Reads the entry at the given position.
    ///
    /// # Errors
    /// Returns an error if the position is outside this segment.
    pub fn read(&self, position: Position) -> LogResult<&Entry> {
        position
            .get()
            .checked_sub(self.first_position().get())
            .and_then(|idx| usize::try_from(idx).ok())
            .and_then(|idx| self.entries.get(idx))
            .ok_or(LogError::PositionOutOfRange {
                position,
                first: self.first_position(),
            })
    }

    /// Encodes the entire segment to bytes.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(usize::try_from(self.size_bytes).unwrap_or(0));
        self.header.encode(&mut buf);
        for entry in &self.entries {
            entry.encode(&mut buf);
        }
        buf.freeze()
    }

    /// Decodes a segment from bytes.
    ///
    /// A partial entry at the very end of the data is treated as a torn write
    /// and dropped; [`Segment::size_bytes`] then reports the length of the
    /// valid prefix.
    ///
    /// # Errors
    /// Returns an error if the header is invalid or an entry is corrupted.
    pub fn decode(mut data: Bytes, config: SegmentConfig) -> LogResult<Self> {
        let header = SegmentHeader::decode(&mut data)?;
        let mut segment = Self::new(header.segment_id, header.first_position, config);
        let mut offset = SEGMENT_HEADER_SIZE as u64;

        while data.has_remaining() {
            if data.remaining() < ENTRY_HEADER_SIZE {
                break;
            }

            match Entry::decode(&mut data, offset) {
                Ok(entry) => {
                    if entry.position() != segment.next_position() {
                        return Err(LogError::InvalidHeader {
                            offset,
                            reason: "entry position out of sequence",
                        });
                    }
                    offset += entry.total_size();
                    segment.size_bytes += entry.total_size();
                    segment.entries.push(entry);
                }
                Err(LogError::TruncatedEntry { .. }) => break,
                Err(e) => return Err(e),
            }
        }

        Ok(segment)
    }
}
