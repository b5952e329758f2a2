//! Strand Log Streams - the partition registry and entry processor.
//!
//! [`LogStreamsManager`] is the single owner of every open partition log in
//! a broker process. It maps `(topic, partition)` to a shared
//! [`LogStream`](strand_log::LogStream) handle and chooses the storage
//! directory a new partition is placed in.
//!
//! [`LogEntryProcessor`] drains one partition log into an [`EntryHandler`].
//! A handler either consumes an entry, which advances the cursor, or defers
//! it, which rewinds the cursor so the same entry is delivered again on the
//! next call.
//!
//! # Example
//!
//! ```ignore
//! let mut manager = LogStreamsManager::new(LogStreamsConfig::new().with_directory("/data"));
//! let stream = manager.create(TopicName::try_from("orders")?, PartitionId::new(0)?).await?;
//!
//! let mut processor = LogEntryProcessor::new(stream.reader(), RawRecord::new(),
//!     |_position, _record: &RawRecord| HandleResult::Consume);
//! let consumed = processor.process(64)?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod config;
mod error;
mod manager;
mod processor;

pub use config::LogStreamsConfig;
pub use error::{LogStreamsError, LogStreamsResult};
pub use manager::LogStreamsManager;
pub use processor::{EntryHandler, HandleResult, LogEntryProcessor};
