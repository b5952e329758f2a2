//! Membership change notifications.
//!
//! The membership protocol publishes a [`MembershipEvent`] whenever its view
//! of the cluster changes. Any number of [`Subscription`]s receive every
//! event published after they subscribed. A subscriber that falls behind
//! by more than the channel capacity skips the oldest events.

use strand_core::NodeId;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, warn};

use crate::peer::Peer;

/// Default number of events buffered per subscriber.
const EVENT_CAPACITY_DEFAULT: usize = 256;

/// A change in cluster membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipEvent {
    /// A peer joined or announced a newer state.
    Joined(Peer),
    /// A peer missed heartbeats.
    Suspected {
        /// The suspected peer.
        node_id: NodeId,
    },
    /// A peer left or was declared dead.
    Left {
        /// The departed peer.
        node_id: NodeId,
    },
}

/// Publisher of membership events.
#[derive(Debug, Clone)]
pub struct Membership {
    tx: broadcast::Sender<MembershipEvent>,
}

impl Default for Membership {
    fn default() -> Self {
        Self::new(EVENT_CAPACITY_DEFAULT)
    }
}

impl Membership {
    /// Creates a publisher buffering up to `capacity` events per subscriber.
    ///
    /// # Panics
    /// Panics if `capacity` is 0.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes an event and returns how many subscribers will see it.
    pub fn publish(&self, event: MembershipEvent) -> usize {
        debug!(?event, "Publishing membership event");
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribes to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Returns the number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Receiving end of a membership event stream.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<MembershipEvent>,
}

impl Subscription {
    /// Waits for the next event. Returns `None` once every publisher is
    /// dropped.
    pub async fn recv(&mut self) -> Option<MembershipEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Membership subscription lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next event if one is ready.
    pub fn try_recv(&mut self) -> Option<MembershipEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Membership subscription lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}
