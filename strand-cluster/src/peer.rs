//! Peers and the peer list.

use std::collections::BTreeMap;

use strand_core::NodeId;
use tracing::debug;

use crate::membership::MembershipEvent;

/// Version of a peer's self-reported state.
///
/// Ordered by generation (bumped on restart), then version (bumped on every
/// change within a generation).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Heartbeat {
    /// Restart counter.
    pub generation: u64,
    /// Change counter within a generation.
    pub version: u64,
}

impl Heartbeat {
    /// Creates a heartbeat.
    #[must_use]
    pub const fn new(generation: u64, version: u64) -> Self {
        Self {
            generation,
            version,
        }
    }

    /// Returns the next version in the same generation.
    #[must_use]
    pub const fn bump(self) -> Self {
        Self {
            generation: self.generation,
            version: self.version + 1,
        }
    }
}

/// Liveness of a peer as seen locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerState {
    /// Recently heard from.
    Alive,
    /// Missed heartbeats; may be down.
    Suspect,
    /// Considered down.
    Dead,
}

/// A broker in the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    /// Node identifier.
    pub node_id: NodeId,
    /// Address serving clients.
    pub client_addr: String,
    /// Address serving cluster management traffic.
    pub management_addr: String,
    /// Address serving replication traffic.
    pub replication_addr: String,
    /// Latest known heartbeat.
    pub heartbeat: Heartbeat,
    /// Local view of the peer's liveness.
    pub state: PeerState,
}

impl Peer {
    /// Creates an alive peer with an initial heartbeat.
    #[must_use]
    pub fn new(
        node_id: NodeId,
        client_addr: impl Into<String>,
        management_addr: impl Into<String>,
        replication_addr: impl Into<String>,
    ) -> Self {
        Self {
            node_id,
            client_addr: client_addr.into(),
            management_addr: management_addr.into(),
            replication_addr: replication_addr.into(),
            heartbeat: Heartbeat::default(),
            state: PeerState::Alive,
        }
    }

    /// Sets the heartbeat.
    #[must_use]
    pub const fn with_heartbeat(mut self, heartbeat: Heartbeat) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    /// Returns true if the peer is alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.state == PeerState::Alive
    }
}

/// Known peers, ordered by node id.
#[derive(Debug, Clone, Default)]
pub struct PeerList {
    peers: BTreeMap<NodeId, Peer>,
}

impl PeerList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or updates a peer. An update only applies if its heartbeat is
    /// newer than the stored one.
    ///
    /// Returns true if the list changed.
    pub fn upsert(&mut self, peer: Peer) -> bool {
        match self.peers.get_mut(&peer.node_id) {
            Some(existing) if existing.heartbeat >= peer.heartbeat => false,
            Some(existing) => {
                debug!(node_id = peer.node_id.get(), "Updated peer");
                *existing = peer;
                true
            }
            None => {
                debug!(node_id = peer.node_id.get(), "Added peer");
                self.peers.insert(peer.node_id, peer);
                true
            }
        }
    }

    /// Returns a peer by id.
    #[must_use]
    pub fn get(&self, node_id: NodeId) -> Option<&Peer> {
        self.peers.get(&node_id)
    }

    /// Sets a peer's liveness. Returns false if the peer is unknown.
    pub fn mark(&mut self, node_id: NodeId, state: PeerState) -> bool {
        self.peers.get_mut(&node_id).is_some_and(|peer| {
            peer.state = state;
            true
        })
    }

    /// Removes a peer.
    pub fn remove(&mut self, node_id: NodeId) -> Option<Peer> {
        self.peers.remove(&node_id)
    }

    /// Returns the alive peers in node id order.
    pub fn alive(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values().filter(|peer| peer.is_alive())
    }

    /// Returns all peers in node id order.
    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values()
    }

    /// Returns the number of peers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Returns true if there are no peers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Applies a membership event. Returns true if the list changed.
    pub fn apply(&mut self, event: &MembershipEvent) -> bool {
        match event {
            MembershipEvent::Joined(peer) => self.upsert(peer.clone()),
            MembershipEvent::Suspected { node_id } => self.mark(*node_id, PeerState::Suspect),
            MembershipEvent::Left { node_id } => self.remove(*node_id).is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(id: u64, heartbeat: Heartbeat) -> Peer {
        Peer::new(
            NodeId::new(id),
            format!("10.0.0.{id}:51015"),
            format!("10.0.0.{id}:51016"),
            format!("10.0.0.{id}:51017"),
        )
        .with_heartbeat(heartbeat)
    }

    #[test]
    fn test_heartbeat_ordering() {
        assert!(Heartbeat::new(1, 0) > Heartbeat::new(0, 99));
        assert!(Heartbeat::new(1, 2) > Heartbeat::new(1, 1));
        assert_eq!(Heartbeat::new(1, 1).bump(), Heartbeat::new(1, 2));
    }

    #[test]
    fn test_upsert_newer_heartbeat_wins() {
        let mut peers = PeerList::new();
        assert!(peers.upsert(peer(1, Heartbeat::new(1, 5))));

        let mut stale = peer(1, Heartbeat::new(1, 4));
        stale.client_addr = "stale:1".to_string();
        assert!(!peers.upsert(stale));
        assert!(!peers.upsert(peer(1, Heartbeat::new(1, 5))));

        let mut newer = peer(1, Heartbeat::new(2, 0));
        newer.client_addr = "newer:1".to_string();
        assert!(peers.upsert(newer));
        assert_eq!(peers.get(NodeId::new(1)).unwrap().client_addr, "newer:1");
        assert_eq!(peers.len(), 1);
    }

    #[test]
    fn test_mark_and_alive() {
        let mut peers = PeerList::new();
        for id in [3, 1, 2] {
            peers.upsert(peer(id, Heartbeat::default()));
        }

        assert!(peers.mark(NodeId::new(2), PeerState::Dead));
        assert!(!peers.mark(NodeId::new(9), PeerState::Dead));

        let alive: Vec<u64> = peers.alive().map(|p| p.node_id.get()).collect();
        assert_eq!(alive, vec![1, 3]);
    }

    #[test]
    fn test_apply_events() {
        let mut peers = PeerList::new();

        assert!(peers.apply(&MembershipEvent::Joined(peer(1, Heartbeat::default()))));
        assert!(peers.apply(&MembershipEvent::Suspected {
            node_id: NodeId::new(1)
        }));
        assert_eq!(peers.get(NodeId::new(1)).unwrap().state, PeerState::Suspect);

        assert!(peers.apply(&MembershipEvent::Left {
            node_id: NodeId::new(1)
        }));
        assert!(peers.is_empty());
        assert!(!peers.apply(&MembershipEvent::Left {
            node_id: NodeId::new(1)
        }));
    }
}
