//! Outbound send buffer.
//!
//! Producers offer messages without blocking; a full buffer is reported
//! immediately so that a log handler can defer its entry and retry later.
//! A single consumer drains the buffer and hands messages to the transport.

use bytes::Bytes;
use strand_core::NodeId;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::SendBufferError;

/// A message addressed to a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Destination node.
    pub node_id: NodeId,
    /// Encoded message.
    pub payload: Bytes,
}

impl OutboundMessage {
    /// Creates a message.
    #[must_use]
    pub const fn new(node_id: NodeId, payload: Bytes) -> Self {
        Self { node_id, payload }
    }
}

/// Producer side of a bounded outbound queue. Clones share the queue.
#[derive(Debug, Clone)]
pub struct SendBuffer {
    tx: mpsc::Sender<OutboundMessage>,
    capacity: usize,
}

/// Consumer side of a [`SendBuffer`].
#[derive(Debug)]
pub struct SendBufferReceiver {
    rx: mpsc::Receiver<OutboundMessage>,
}

impl SendBuffer {
    /// Creates a buffer holding at most `capacity` messages.
    ///
    /// # Panics
    /// Panics if `capacity` is 0.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, SendBufferReceiver) {
        assert!(capacity > 0, "send buffer capacity must be positive");
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx, capacity }, SendBufferReceiver { rx })
    }

    /// Queues a message without waiting.
    ///
    /// # Errors
    /// Returns `Full` if the buffer has no free slot and `Closed` if the
    /// receiver is gone.
    pub fn try_offer(&self, message: OutboundMessage) -> Result<(), SendBufferError> {
        self.tx.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => SendBufferError::Full {
                capacity: self.capacity,
            },
            TrySendError::Closed(_) => SendBufferError::Closed,
        })
    }

    /// Queues a message, waiting for a free slot.
    ///
    /// # Errors
    /// Returns `Closed` if the receiver is gone.
    pub async fn offer(&self, message: OutboundMessage) -> Result<(), SendBufferError> {
        self.tx
            .send(message)
            .await
            .map_err(|_| SendBufferError::Closed)
    }

    /// Returns the buffer capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of free slots.
    #[must_use]
    pub fn available(&self) -> usize {
        self.tx.capacity()
    }

    /// Returns true if the receiver is gone.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl SendBufferReceiver {
    /// Waits for the next message. Returns `None` once every producer is
    /// dropped and the buffer is empty.
    pub async fn recv(&mut self) -> Option<OutboundMessage> {
        self.rx.recv().await
    }

    /// Returns the next message if one is queued.
    pub fn try_recv(&mut self) -> Option<OutboundMessage> {
        self.rx.try_recv().ok()
    }

    /// Removes up to `max` queued messages without waiting.
    pub fn drain(&mut self, max: usize) -> Vec<OutboundMessage> {
        let mut out = Vec::new();
        while out.len() < max {
            match self.rx.try_recv() {
                Ok(message) => out.push(message),
                Err(_) => break,
            }
        }
        out
    }

    /// Stops accepting new messages. Queued messages can still be received.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
