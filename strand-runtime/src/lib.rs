//! Strand Runtime - execution resources shared by a broker.
//!
//! This crate provides:
//! - [`ActorScheduler`]: drives [`Actor`]s as cooperative tokio tasks,
//!   backing off while they are idle
//! - [`SendBuffer`]: a bounded outbound message queue with non-blocking
//!   offers, used as a backpressure signal
//! - [`ConnectionPool`]: cached outbound TCP connections to peers
//!
//! # Example
//!
//! ```ignore
//! let scheduler = ActorScheduler::new(SchedulerConfig::default());
//! let handle = scheduler.register("orders.0", processor)?;
//! // ...
//! scheduler.shutdown().await;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod config;
mod connection;
mod dispatcher;
mod error;
mod scheduler;

pub use config::{ConnectionPoolConfig, SchedulerConfig};
pub use connection::{Connection, ConnectionPool};
pub use dispatcher::{OutboundMessage, SendBuffer, SendBufferReceiver};
pub use error::{ConnectionError, ConnectionResult, SchedulerError, SendBufferError};
pub use scheduler::{Actor, ActorHandle, ActorScheduler};
