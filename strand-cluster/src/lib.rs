//! Strand Cluster - membership view and coordination context.
//!
//! The membership protocol itself lives elsewhere. This crate holds what it
//! produces and what coordination logic consumes:
//!
//! - [`Peer`] / [`PeerList`]: the known brokers and their liveness
//! - [`Membership`] / [`Subscription`]: a stream of membership changes
//! - [`ClusterContext`]: every shared resource coordination logic needs,
//!   wired once at startup through [`ClusterContextBuilder`]

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod context;
mod error;
mod membership;
mod peer;

pub use context::{ClusterContext, ClusterContextBuilder, SharedLogStreams};
pub use error::{ClusterError, ClusterResult};
pub use membership::{Membership, MembershipEvent, Subscription};
pub use peer::{Heartbeat, Peer, PeerList, PeerState};
