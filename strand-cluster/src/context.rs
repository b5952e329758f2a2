//! The cluster coordination context.
//!
//! A [`ClusterContext`] bundles the shared resources that cluster
//! management logic works with. It is assembled once during startup with a
//! [`ClusterContextBuilder`] and does not change afterwards; the resources
//! it points to carry their own synchronization.

use std::sync::{Arc, RwLock};

use strand_logstreams::LogStreamsManager;
use strand_runtime::{ActorScheduler, ConnectionPool, SendBuffer};

use crate::error::{ClusterError, ClusterResult};
use crate::membership::Subscription;
use crate::peer::{Peer, PeerList};

/// Shared registry handle. Writers are the administrative paths that create
/// partitions; everything else reads.
pub type SharedLogStreams = Arc<tokio::sync::RwLock<LogStreamsManager>>;

/// Resources used by cluster coordination.
#[derive(Debug)]
pub struct ClusterContext {
    local_peer: Peer,
    subscription: Subscription,
    connections: Arc<ConnectionPool>,
    send_buffer: SendBuffer,
    peers: Arc<RwLock<PeerList>>,
    scheduler: ActorScheduler,
    log_streams: SharedLogStreams,
}

impl ClusterContext {
    /// Starts building a context.
    #[must_use]
    pub fn builder() -> ClusterContextBuilder {
        ClusterContextBuilder::default()
    }

    /// Returns this broker's own peer entry.
    #[must_use]
    pub const fn local_peer(&self) -> &Peer {
        &self.local_peer
    }

    /// Returns the membership event subscription.
    pub fn subscription_mut(&mut self) -> &mut Subscription {
        &mut self.subscription
    }

    /// Returns the outbound connection pool.
    #[must_use]
    pub const fn connections(&self) -> &Arc<ConnectionPool> {
        &self.connections
    }

    /// Returns the outbound send buffer.
    #[must_use]
    pub const fn send_buffer(&self) -> &SendBuffer {
        &self.send_buffer
    }

    /// Returns the peer list.
    #[must_use]
    pub const fn peers(&self) -> &Arc<RwLock<PeerList>> {
        &self.peers
    }

    /// Returns the actor scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &ActorScheduler {
        &self.scheduler
    }

    /// Returns the partition log registry.
    #[must_use]
    pub const fn log_streams(&self) -> &SharedLogStreams {
        &self.log_streams
    }
}

/// Builder for [`ClusterContext`]. Every field is required.
#[derive(Debug, Default)]
pub struct ClusterContextBuilder {
    local_peer: Option<Peer>,
    subscription: Option<Subscription>,
    connections: Option<Arc<ConnectionPool>>,
    send_buffer: Option<SendBuffer>,
    peers: Option<Arc<RwLock<PeerList>>>,
    scheduler: Option<ActorScheduler>,
    log_streams: Option<SharedLogStreams>,
}

impl ClusterContextBuilder {
    /// Sets this broker's own peer entry.
    #[must_use]
    pub fn local_peer(mut self, peer: Peer) -> Self {
        self.local_peer = Some(peer);
        self
    }

    /// Sets the membership event subscription.
    #[must_use]
    pub fn subscription(mut self, subscription: Subscription) -> Self {
        self.subscription = Some(subscription);
        self
    }

    /// Sets the outbound connection pool.
    #[must_use]
    pub fn connections(mut self, connections: Arc<ConnectionPool>) -> Self {
        self.connections = Some(connections);
        self
    }

    /// Sets the outbound send buffer.
    #[must_use]
    pub fn send_buffer(mut self, send_buffer: SendBuffer) -> Self {
        self.send_buffer = Some(send_buffer);
        self
    }

    /// Sets the peer list.
    #[must_use]
    pub fn peers(mut self, peers: Arc<RwLock<PeerList>>) -> Self {
        self.peers = Some(peers);
        self
    }

    /// Sets the actor scheduler.
    #[must_use]
    pub fn scheduler(mut self, scheduler: ActorScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Sets the partition log registry.
    #[must_use]
    pub fn log_streams(mut self, log_streams: SharedLogStreams) -> Self {
        self.log_streams = Some(log_streams);
        self
    }

    /// Builds the context.
    ///
    /// # Errors
    /// Returns `MissingDependency` naming the first field that was not set.
    pub fn build(self) -> ClusterResult<ClusterContext> {
        Ok(ClusterContext {
            local_peer: required(self.local_peer, "local peer")?,
            subscription: required(self.subscription, "membership subscription")?,
            connections: required(self.connections, "connection pool")?,
            send_buffer: required(self.send_buffer, "send buffer")?,
            peers: required(self.peers, "peer list")?,
            scheduler: required(self.scheduler, "scheduler")?,
            log_streams: required(self.log_streams, "log streams manager")?,
        })
    }
}

fn required<T>(value: Option<T>, name: &'static str) -> ClusterResult<T> {
    value.ok_or(ClusterError::MissingDependency { name })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::{Membership, MembershipEvent};
    use strand_core::NodeId;
    use strand_logstreams::LogStreamsConfig;
    use strand_runtime::{ConnectionPoolConfig, SchedulerConfig};

    fn local_peer() -> Peer {
        Peer::new(NodeId::new(1), "127.0.0.1:51015", "127.0.0.1:51016", "127.0.0.1:51017")
    }

    fn full_builder(membership: &Membership) -> ClusterContextBuilder {
        let (send_buffer, _receiver) = SendBuffer::new(16);
        ClusterContext::builder()
            .local_peer(local_peer())
            .subscription(membership.subscribe())
            .connections(Arc::new(ConnectionPool::new(ConnectionPoolConfig::default())))
            .send_buffer(send_buffer)
            .peers(Arc::new(RwLock::new(PeerList::new())))
            .scheduler(ActorScheduler::new(SchedulerConfig::default()))
            .log_streams(Arc::new(tokio::sync::RwLock::new(LogStreamsManager::new(
                LogStreamsConfig::new(),
            ))))
    }

    #[tokio::test]
    async fn test_build_with_all_fields() {
        let membership = Membership::default();
        let mut context = full_builder(&membership).build().unwrap();

        assert_eq!(context.local_peer().node_id, NodeId::new(1));
        assert_eq!(context.send_buffer().capacity(), 16);
        assert!(context.connections().is_empty());
        assert!(context.peers().read().unwrap().is_empty());
        assert!(!context.scheduler().is_shut_down());
        assert!(context.log_streams().read().await.is_empty());

        membership.publish(MembershipEvent::Left {
            node_id: NodeId::new(2),
        });
        assert!(context.subscription_mut().try_recv().is_some());
    }

    #[test]
    fn test_build_reports_missing_dependency() {
        let err = ClusterContext::builder()
            .local_peer(local_peer())
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ClusterError::MissingDependency {
                name: "membership subscription"
            }
        );

        let membership = Membership::default();
        let mut builder = full_builder(&membership);
        builder.log_streams = None;
        assert_eq!(
            builder.build().unwrap_err().to_string(),
            "cluster context is missing its log streams manager"
        );
    }
}
