//! System limits.
//!
//! Every identifier and buffer has an explicit bound. Values that cross a
//! crate boundary are validated against these constants at construction time.

/// Largest valid partition id (the range of a signed 16-bit integer).
pub const PARTITION_ID_MAX: u16 = 32_767;

/// Maximum length of a topic name in bytes.
pub const TOPIC_NAME_BYTES_MAX: usize = 255;

/// Maximum size of a single log entry payload in bytes (1 MiB).
pub const ENTRY_PAYLOAD_SIZE_BYTES_MAX: u32 = 1024 * 1024;

/// Minimum size of a log segment in bytes (1 MiB).
pub const SEGMENT_SIZE_BYTES_MIN: u64 = 1024 * 1024;

/// Maximum size of a log segment in bytes (2 GiB).
pub const SEGMENT_SIZE_BYTES_MAX: u64 = 2 * 1024 * 1024 * 1024;

/// Maximum number of entries per log segment.
pub const ENTRIES_PER_SEGMENT_MAX: u64 = 10_000_000;

/// Bytes per megabyte, used to convert coarse configuration values.
pub const BYTES_PER_MB: u64 = 1024 * 1024;
