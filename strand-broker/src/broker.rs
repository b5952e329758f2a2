//! Broker lifecycle.

use std::sync::{Arc, PoisonError, RwLock};

use strand_cluster::{ClusterContext, Membership, Peer, PeerList};
use strand_core::{PartitionId, TopicName};
use strand_log::{LogStream, RawRecord};
use strand_logstreams::{LogEntryProcessor, LogStreamsManager};
use strand_runtime::{
    ActorHandle, ActorScheduler, ConnectionPool, SendBuffer, SendBufferReceiver,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BrokerConfig;
use crate::error::{BrokerError, BrokerResult};
use crate::handler::CommitNotifier;

/// A running broker.
#[derive(Debug)]
pub struct Broker {
    context: ClusterContext,
    membership: Membership,
    processors: Vec<ActorHandle>,
    dispatcher: JoinHandle<()>,
    dispatcher_shutdown: watch::Sender<bool>,
}

impl Broker {
    /// Opens every configured partition, starts one processor per partition
    /// and the outbound dispatch loop.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or a partition log
    /// cannot be opened.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub async fn start(config: BrokerConfig) -> BrokerResult<Self> {
        info!(
            node_id = config.node_id.get(),
            directories = config.log_streams.directories.len(),
            topics = config.topics.len(),
            peers = config.peers.len(),
            "Starting broker"
        );

        config.log_streams.validate()?;
        if config.send_buffer_capacity == 0 {
            return Err(BrokerError::Config {
                message: "send buffer capacity must be positive".to_string(),
            });
        }

        let mut manager = LogStreamsManager::new(config.log_streams.clone());
        open_topics(&mut manager, &config).await?;

        let local_peer = Peer::new(
            config.node_id,
            config.client_addr.clone(),
            config.management_addr.clone(),
            config.replication_addr.clone(),
        );
        let mut peer_list = PeerList::new();
        for spec in &config.peers {
            peer_list.upsert(Peer::new(
                spec.node_id,
                spec.client_addr(),
                spec.management_addr(),
                spec.replication_addr(),
            ));
        }
        let peers = Arc::new(RwLock::new(peer_list));

        let scheduler = ActorScheduler::new(config.scheduler);
        let connections = Arc::new(ConnectionPool::new(config.connections));
        let (send_buffer, send_receiver) = SendBuffer::new(config.send_buffer_capacity);
        let membership = Membership::default();

        let mut streams = Vec::with_capacity(manager.len());
        manager.for_each(|stream| streams.push(Arc::clone(stream)));

        let context = ClusterContext::builder()
            .local_peer(local_peer)
            .subscription(membership.subscribe())
            .connections(Arc::clone(&connections))
            .send_buffer(send_buffer)
            .peers(Arc::clone(&peers))
            .scheduler(scheduler)
            .log_streams(Arc::new(tokio::sync::RwLock::new(manager)))
            .build()?;

        let mut processors = Vec::with_capacity(streams.len());
        for stream in &streams {
            processors.push(register_processor(&context, stream)?);
        }

        let (dispatcher_shutdown, shutdown_rx) = watch::channel(false);
        let dispatcher = tokio::spawn(dispatch_loop(send_receiver, connections, peers, shutdown_rx));

        info!(
            node_id = config.node_id.get(),
            partitions = processors.len(),
            "Broker started"
        );

        Ok(Self {
            context,
            membership,
            processors,
            dispatcher,
            dispatcher_shutdown,
        })
    }

    /// Returns the cluster context.
    #[must_use]
    pub const fn context(&self) -> &ClusterContext {
        &self.context
    }

    /// Returns the membership event publisher.
    #[must_use]
    pub const fn membership(&self) -> &Membership {
        &self.membership
    }

    /// Returns the handles of the partition processors.
    #[must_use]
    pub fn processors(&self) -> &[ActorHandle] {
        &self.processors
    }

    /// Applies pending membership events to the peer list. Returns how many
    /// changed it.
    pub fn sync_membership(&mut self) -> usize {
        let peers = Arc::clone(self.context.peers());
        let mut changed = 0;
        while let Some(event) = self.context.subscription_mut().try_recv() {
            let mut list = peers.write().unwrap_or_else(PoisonError::into_inner);
            if list.apply(&event) {
                changed += 1;
            }
        }
        changed
    }

    /// Opens a partition at runtime and starts its processor.
    ///
    /// # Errors
    /// Returns an error if the log cannot be created or the scheduler is
    /// shut down.
    pub async fn open_partition(
        &mut self,
        topic: TopicName,
        partition: PartitionId,
    ) -> BrokerResult<Arc<LogStream>> {
        let stream = self
            .context
            .log_streams()
            .write()
            .await
            .create(topic, partition)
            .await?;
        self.processors
            .push(register_processor(&self.context, &stream)?);
        Ok(stream)
    }

    /// Stops processors and dispatch, then closes connections and logs.
    ///
    /// # Errors
    /// Returns an error if a log fails to close. Everything else is still
    /// shut down.
    pub async fn shutdown(self) -> BrokerResult<()> {
        info!(node_id = self.context.local_peer().node_id.get(), "Shutting down broker");

        self.context.scheduler().shutdown().await;

        self.dispatcher_shutdown.send_replace(true);
        if let Err(e) = self.dispatcher.await {
            warn!(error = %e, "Dispatch loop did not exit cleanly");
        }

        self.context.connections().close_all();
        self.context.log_streams().read().await.close_all().await?;

        info!("Broker stopped");
        Ok(())
    }
}

/// Creates every configured partition. On failure, the partitions opened so
/// far are closed before the error is returned.
async fn open_topics(manager: &mut LogStreamsManager, config: &BrokerConfig) -> BrokerResult<()> {
    let result = create_topics(manager, config).await;
    if result.is_err() {
        if let Err(e) = manager.close_all().await {
            warn!(error = %e, "Failed to close partitions after startup error");
        }
    }
    result
}

async fn create_topics(manager: &mut LogStreamsManager, config: &BrokerConfig) -> BrokerResult<()> {
    for topic in &config.topics {
        let name = TopicName::try_from(topic.name.as_str())?;
        for id in 0..topic.partitions {
            let partition = PartitionId::new(i64::from(id))?;
            manager.create(name.clone(), partition).await?;
        }
        info!(topic = %topic.name, partitions = topic.partitions, "Opened topic");
    }
    Ok(())
}

fn register_processor(context: &ClusterContext, stream: &Arc<LogStream>) -> BrokerResult<ActorHandle> {
    let handler = CommitNotifier::new(
        stream.topic_name().clone(),
        stream.partition_id(),
        context.local_peer().node_id,
        Arc::clone(context.peers()),
        context.send_buffer().clone(),
    );
    let processor = LogEntryProcessor::new(stream.reader(), RawRecord::new(), handler);
    Ok(context.scheduler().register(stream.log_name(), processor)?)
}

/// Sends queued messages to peers until shut down.
async fn dispatch_loop(
    mut receiver: SendBufferReceiver,
    connections: Arc<ConnectionPool>,
    peers: Arc<RwLock<PeerList>>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let message = tokio::select! {
            message = receiver.recv() => message,
            _ = shutdown.changed() => None,
        };
        let Some(message) = message else {
            break;
        };

        let addr = peers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(message.node_id)
            .map(|peer| peer.management_addr.clone());
        let Some(addr) = addr else {
            debug!(node_id = message.node_id.get(), "Dropping message for unknown peer");
            continue;
        };

        if let Err(e) = connections.send(&addr, &message.payload).await {
            warn!(node_id = message.node_id.get(), addr = %addr, error = %e, "Failed to send message");
        }
    }
    debug!("Dispatch loop stopped");
}
