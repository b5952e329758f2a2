//! Strand Log - the partition log primitive.
//!
//! Every (topic, partition) pair is backed by one [`LogStream`]: an
//! append-only sequence of entries, addressed by dense [`Position`]s and
//! stored as a series of segment files in a single directory.
//!
//! # File Layout
//!
//! ```text
//! /data/orders.0/
//!   segment-00000001.log   # Sealed segment
//!   segment-00000002.log   # Active segment (current writes)
//! ```
//!
//! # Reading
//!
//! Writers append through the shared [`LogStream`]. Readers obtain a
//! [`LogStreamReader`] cursor and decode entries into a caller-owned
//! [`EntryRecord`], typically a reused [`RawRecord`].
//!
//! [`Position`]: strand_core::Position

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod entry;
mod error;
mod reader;
mod record;
mod segment;
mod storage;
mod stream;

pub use entry::{Entry, EntryHeader, ENTRY_HEADER_SIZE};
pub use error::{LogError, LogResult};
pub use reader::{LogReader, LogStreamReader};
pub use record::{EntryRecord, RawRecord};
pub use segment::{Segment, SegmentConfig, SegmentHeader, SegmentId, SEGMENT_HEADER_SIZE};
pub use storage::{Storage, StorageFile, TokioStorage};
pub use stream::{LogStream, LogStreamConfig};
