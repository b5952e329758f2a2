//! Broker configuration and command-line value parsers.

use strand_core::limits::PARTITION_ID_MAX;
use strand_core::NodeId;
use strand_logstreams::LogStreamsConfig;
use strand_runtime::{ConnectionPoolConfig, SchedulerConfig};

/// Default send buffer capacity in messages.
const SEND_BUFFER_CAPACITY_DEFAULT: usize = 1024;

/// A peer given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSpec {
    /// The peer's node id.
    pub node_id: NodeId,
    /// The peer's host name or IP address.
    pub host: String,
    /// Port serving clients.
    pub client_port: u16,
    /// Port serving cluster management traffic.
    pub management_port: u16,
    /// Port serving replication traffic.
    pub replication_port: u16,
}

impl PeerSpec {
    /// Returns `host:client_port`.
    #[must_use]
    pub fn client_addr(&self) -> String {
        format!("{}:{}", self.host, self.client_port)
    }

    /// Returns `host:management_port`.
    #[must_use]
    pub fn management_addr(&self) -> String {
        format!("{}:{}", self.host, self.management_port)
    }

    /// Returns `host:replication_port`.
    #[must_use]
    pub fn replication_addr(&self) -> String {
        format!("{}:{}", self.host, self.replication_port)
    }
}

/// A topic to open at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSpec {
    /// Topic name.
    pub name: String,
    /// Number of partitions, numbered from 0.
    pub partitions: u32,
}

/// Parses a peer in the form `node_id:host:client_port:management_port:replication_port`.
///
/// # Errors
/// Returns a message describing the first malformed part.
pub fn parse_peer(s: &str) -> Result<PeerSpec, String> {
    let parts: Vec<&str> = s.split(':').collect();
    let [node_id, host, client, management, replication] = parts.as_slice() else {
        return Err(format!(
            "invalid peer format '{s}', expected 'node_id:host:client_port:management_port:replication_port'"
        ));
    };

    let node_id: u64 = node_id
        .parse()
        .map_err(|_| format!("invalid node_id '{node_id}' in peer '{s}'"))?;
    if host.is_empty() {
        return Err(format!("empty host in peer '{s}'"));
    }
    let port = |value: &str, name: &str| {
        value
            .parse::<u16>()
            .map_err(|_| format!("invalid {name} '{value}' in peer '{s}'"))
    };

    Ok(PeerSpec {
        node_id: NodeId::new(node_id),
        host: (*host).to_string(),
        client_port: port(*client, "client_port")?,
        management_port: port(*management, "management_port")?,
        replication_port: port(*replication, "replication_port")?,
    })
}

/// Parses a topic in the form `name:partitions`.
///
/// # Errors
/// Returns a message if the name is empty or the partition count is not in
/// `1..=32768`.
pub fn parse_topic(s: &str) -> Result<TopicSpec, String> {
    let Some((name, partitions)) = s.rsplit_once(':') else {
        return Err(format!(
            "invalid topic format '{s}', expected 'name:partitions'"
        ));
    };
    if name.is_empty() {
        return Err("topic name cannot be empty".to_string());
    }

    let partitions: u32 = partitions
        .parse()
        .map_err(|_| format!("invalid partition count '{partitions}' in topic '{s}'"))?;
    let max = u32::from(PARTITION_ID_MAX) + 1;
    if partitions == 0 || partitions > max {
        return Err(format!(
            "partition count must be in 1..={max}, got {partitions}"
        ));
    }

    Ok(TopicSpec {
        name: name.to_string(),
        partitions,
    })
}

/// Everything a broker needs to start.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// This broker's node id.
    pub node_id: NodeId,
    /// Address serving clients.
    pub client_addr: String,
    /// Address serving cluster management traffic.
    pub management_addr: String,
    /// Address serving replication traffic.
    pub replication_addr: String,
    /// Partition log registry settings.
    pub log_streams: LogStreamsConfig,
    /// Scheduler settings.
    pub scheduler: SchedulerConfig,
    /// Outbound connection settings.
    pub connections: ConnectionPoolConfig,
    /// Outbound send buffer capacity in messages.
    pub send_buffer_capacity: usize,
    /// Statically known peers.
    pub peers: Vec<PeerSpec>,
    /// Topics opened at startup.
    pub topics: Vec<TopicSpec>,
}

impl BrokerConfig {
    /// Creates a configuration with default resources and no topics.
    #[must_use]
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            client_addr: "0.0.0.0:51015".to_string(),
            management_addr: "0.0.0.0:51016".to_string(),
            replication_addr: "0.0.0.0:51017".to_string(),
            log_streams: LogStreamsConfig::default(),
            scheduler: SchedulerConfig::default(),
            connections: ConnectionPoolConfig::default(),
            send_buffer_capacity: SEND_BUFFER_CAPACITY_DEFAULT,
            peers: Vec::new(),
            topics: Vec::new(),
        }
    }

    /// Sets the registry configuration.
    #[must_use]
    pub fn with_log_streams(mut self, config: LogStreamsConfig) -> Self {
        self.log_streams = config;
        self
    }

    /// Sets the scheduler configuration.
    #[must_use]
    pub const fn with_scheduler(mut self, config: SchedulerConfig) -> Self {
        self.scheduler = config;
        self
    }

    /// Sets the send buffer capacity.
    #[must_use]
    pub const fn with_send_buffer_capacity(mut self, capacity: usize) -> Self {
        self.send_buffer_capacity = capacity;
        self
    }

    /// Adds a peer.
    #[must_use]
    pub fn with_peer(mut self, peer: PeerSpec) -> Self {
        self.peers.push(peer);
        self
    }

    /// Adds a topic.
    #[must_use]
    pub fn with_topic(mut self, name: impl Into<String>, partitions: u32) -> Self {
        self.topics.push(TopicSpec {
            name: name.into(),
            partitions,
        });
        self
    }
}
