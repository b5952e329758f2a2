//! Strand Broker - wires partition logs, processors and cluster resources
//! into a running broker.
//!
//! [`Broker::start`] opens the configured partitions, registers one
//! [`LogEntryProcessor`](strand_logstreams::LogEntryProcessor) per partition
//! with the scheduler and starts the outbound dispatch loop.
//! [`Broker::shutdown`] stops everything in reverse order and closes the
//! logs.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod broker;
mod config;
mod error;
mod handler;

pub use broker::Broker;
pub use config::{parse_peer, parse_topic, BrokerConfig, PeerSpec, TopicSpec};
pub use error::{BrokerError, BrokerResult};
pub use handler::{decode_commit_notice, encode_commit_notice, CommitNotifier};
