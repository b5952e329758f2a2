//! Strand broker binary.
//!
//! Opens the configured partitions, drives one processor per partition and
//! runs until interrupted.
//!
//! # Single node
//!
//! ```bash
//! strand-broker --node-id 1 --log-dir /data --topic orders:4
//! ```
//!
//! # Multiple log directories and peers
//!
//! ```bash
//! strand-broker --node-id 1 --log-dir /disk1 --log-dir /disk2 --log-dir /disk3 \
//!     --topic orders:8 --peer 2:node2:51015:51016:51017
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;

use clap::Parser;
use strand_core::NodeId;
use strand_logstreams::LogStreamsConfig;
use strand_runtime::{ConnectionPoolConfig, SchedulerConfig};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use strand_broker::{parse_peer, parse_topic, Broker, BrokerConfig, PeerSpec, TopicSpec};

/// Strand partitioned log broker.
#[derive(Parser, Debug)]
#[command(name = "strand-broker")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Node ID for this broker.
    #[arg(long, default_value = "1")]
    node_id: u64,

    /// Address serving clients.
    #[arg(long, default_value = "0.0.0.0:51015")]
    client_addr: String,

    /// Address serving cluster management traffic.
    #[arg(long, default_value = "0.0.0.0:51016")]
    management_addr: String,

    /// Address serving replication traffic.
    #[arg(long, default_value = "0.0.0.0:51017")]
    replication_addr: String,

    /// Storage directory for partition logs. Can be specified multiple times.
    #[arg(long = "log-dir")]
    log_dirs: Vec<PathBuf>,

    /// Segment size of new partition logs in megabytes.
    #[arg(long, default_value = "512")]
    segment_size_mb: u32,

    /// Write buffer size of new partition logs in megabytes.
    #[arg(long, default_value = "16")]
    write_buffer_size_mb: u32,

    /// Capacity of the outbound send buffer in messages.
    #[arg(long, default_value = "1024")]
    send_buffer_capacity: usize,

    /// Maximum number of pooled outbound connections.
    #[arg(long, default_value = "64")]
    max_connections: usize,

    /// Peer in format `node_id:host:client_port:management_port:replication_port`.
    /// Can be specified multiple times.
    #[arg(long = "peer", value_parser = parse_peer)]
    peers: Vec<PeerSpec>,

    /// Topic to open at startup in format `name:partitions`.
    /// Can be specified multiple times.
    #[arg(long = "topic", value_parser = parse_topic)]
    topics: Vec<TopicSpec>,

    /// Entries a processor may handle per scheduling run.
    #[arg(long, default_value = "64", value_parser = clap::value_parser!(u32).range(1..))]
    max_cycles: u32,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: Level,
}

impl Args {
    fn into_config(self) -> BrokerConfig {
        let log_streams = LogStreamsConfig::new()
            .with_directories(self.log_dirs)
            .with_segment_size_mb(self.segment_size_mb)
            .with_write_buffer_size_mb(self.write_buffer_size_mb);

        let mut config = BrokerConfig::new(NodeId::new(self.node_id))
            .with_log_streams(log_streams)
            .with_scheduler(SchedulerConfig::default().with_max_cycles_per_run(self.max_cycles))
            .with_send_buffer_capacity(self.send_buffer_capacity);
        config.client_addr = self.client_addr;
        config.management_addr = self.management_addr;
        config.replication_addr = self.replication_addr;
        config.connections =
            ConnectionPoolConfig::default().with_max_connections(self.max_connections);
        config.peers = self.peers;
        config.topics = self.topics;
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let broker = Broker::start(args.into_config()).await?;

    tokio::signal::ctrl_c().await?;
    info!("Received interrupt");

    broker.shutdown().await?;
    Ok(())
}
