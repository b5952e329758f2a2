//! Reusable test scenarios.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use strand_core::{PartitionId, Position, TopicName};
use strand_log::{LogResult, LogStream, LogStreamConfig, RawRecord};
use strand_logstreams::{EntryHandler, HandleResult};

/// Opens a log for `topic`/`partition` in `dir`.
///
/// # Errors
/// Returns an error if the log cannot be opened.
pub async fn open_log(
    dir: &Path,
    topic: TopicName,
    partition: PartitionId,
) -> LogResult<Arc<LogStream>> {
    let config = LogStreamConfig::new(topic, partition, dir);
    Ok(Arc::new(LogStream::open(config).await?))
}

/// Appends each payload as one entry. Returns the position of the first.
///
/// # Errors
/// Returns an error if the append fails.
pub async fn append_all(stream: &LogStream, payloads: &[&str]) -> LogResult<Position> {
    stream
        .append_batch(payloads.iter().map(|p| Bytes::copy_from_slice(p.as_bytes())))
        .await
}

/// Handler that records every delivery and defers on demand.
///
/// Every call is recorded, deferred or not, so redelivery is visible.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    deliveries: Vec<(Position, Vec<u8>)>,
    consumed: Vec<(Position, Vec<u8>)>,
    defer_next: u32,
}

impl RecordingHandler {
    /// Creates a handler that consumes everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defers the next `count` deliveries.
    pub fn defer_next(&mut self, count: u32) {
        self.defer_next = count;
    }

    /// Returns every delivery seen, in order.
    #[must_use]
    pub fn deliveries(&self) -> &[(Position, Vec<u8>)] {
        &self.deliveries
    }

    /// Returns the consumed entries, in order.
    #[must_use]
    pub fn consumed(&self) -> &[(Position, Vec<u8>)] {
        &self.consumed
    }

    /// Returns the consumed payloads as strings.
    #[must_use]
    pub fn consumed_payloads(&self) -> Vec<String> {
        self.consumed
            .iter()
            .map(|(_, p)| String::from_utf8_lossy(p).into_owned())
            .collect()
    }
}

impl EntryHandler<RawRecord> for RecordingHandler {
    fn handle(&mut self, position: Position, record: &RawRecord) -> HandleResult {
        let entry = (position, record.payload().to_vec());
        self.deliveries.push(entry.clone());

        if self.defer_next > 0 {
            self.defer_next -= 1;
            return HandleResult::Defer;
        }
        self.consumed.push(entry);
        HandleResult::Consume
    }
}

/// Polls `condition` until it holds or `timeout` elapses. Returns whether it
/// held.
pub async fn wait_for<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
