//! The broker's partition entry handler.
//!
//! Every processed entry produces a commit notice for each alive peer,
//! queued on the outbound send buffer. If the buffer cannot take a notice
//! for every peer, the entry is deferred and offered again on the next run.
//! Peers treat notices as idempotent, so a redelivered entry may notify a
//! peer twice.
//!
//! # Commit notice format
//!
//! ```text
//! +-------------+-------------+-----------+----------+
//! | Topic len   | Topic bytes | Partition | Position |
//! | (2 bytes)   | (N bytes)   | (2 bytes) | (8 bytes)|
//! +-------------+-------------+-----------+----------+
//! ```
//!
//! All integers are big-endian.

use std::sync::{Arc, PoisonError, RwLock};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use strand_cluster::PeerList;
use strand_core::{NodeId, PartitionId, Position, TopicName};
use strand_log::RawRecord;
use strand_logstreams::{EntryHandler, HandleResult};
use strand_runtime::{OutboundMessage, SendBuffer, SendBufferError};
use tracing::{debug, trace};

/// Encodes a commit notice.
#[must_use]
pub fn encode_commit_notice(topic: &TopicName, partition: PartitionId, position: Position) -> Bytes {
    let name = topic.as_bytes();
    let mut buf = BytesMut::with_capacity(2 + name.len() + 2 + 8);
    // Topic names are bounded well below u16::MAX.
    #[allow(clippy::cast_possible_truncation)]
    buf.put_u16(name.len() as u16);
    buf.put_slice(name);
    buf.put_u16(partition.get());
    buf.put_u64(position.get());
    buf.freeze()
}

/// Decodes a commit notice. Returns `None` if the data is malformed.
#[must_use]
pub fn decode_commit_notice(mut data: &[u8]) -> Option<(TopicName, PartitionId, Position)> {
    if data.remaining() < 2 {
        return None;
    }
    let len = usize::from(data.get_u16());
    if data.remaining() != len + 2 + 8 {
        return None;
    }
    let topic = TopicName::new(Bytes::copy_from_slice(&data[..len])).ok()?;
    data.advance(len);
    let partition = PartitionId::new(i64::from(data.get_u16())).ok()?;
    let position = Position::new(data.get_u64());
    Some((topic, partition, position))
}

/// Handler that announces processed entries to alive peers.
#[derive(Debug)]
pub struct CommitNotifier {
    topic: TopicName,
    partition: PartitionId,
    local: NodeId,
    peers: Arc<RwLock<PeerList>>,
    send_buffer: SendBuffer,
}

impl CommitNotifier {
    /// Creates a notifier for one partition.
    #[must_use]
    pub const fn new(
        topic: TopicName,
        partition: PartitionId,
        local: NodeId,
        peers: Arc<RwLock<PeerList>>,
        send_buffer: SendBuffer,
    ) -> Self {
        Self {
            topic,
            partition,
            local,
            peers,
            send_buffer,
        }
    }

    fn targets(&self) -> Vec<NodeId> {
        let peers = self.peers.read().unwrap_or_else(PoisonError::into_inner);
        peers
            .alive()
            .map(|peer| peer.node_id)
            .filter(|id| *id != self.local)
            .collect()
    }
}

impl EntryHandler<RawRecord> for CommitNotifier {
    fn handle(&mut self, position: Position, record: &RawRecord) -> HandleResult {
        let targets = self.targets();
        if self.send_buffer.available() < targets.len() {
            trace!(
                topic = %self.topic,
                partition = self.partition.get(),
                position = position.get(),
                "Send buffer full, deferring entry"
            );
            return HandleResult::Defer;
        }

        let notice = encode_commit_notice(&self.topic, self.partition, position);
        for node_id in targets {
            match self
                .send_buffer
                .try_offer(OutboundMessage::new(node_id, notice.clone()))
            {
                Ok(()) => {}
                Err(SendBufferError::Full { .. }) => return HandleResult::Defer,
                Err(SendBufferError::Closed) => {
                    debug!(node_id = node_id.get(), "Send buffer closed, dropping notice");
                    break;
                }
            }
        }

        trace!(
            topic = %self.topic,
            partition = self.partition.get(),
            position = position.get(),
            bytes = record.len(),
            "Processed entry"
        );
        HandleResult::Consume
    }
}
