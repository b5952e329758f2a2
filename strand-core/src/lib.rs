//! Strand Core - Strongly-typed identifiers and limits for Strand.
//!
//! This crate provides the vocabulary shared by every other Strand crate:
//! topic names, partition ids, log positions and node ids, plus the explicit
//! limits those identifiers are validated against.
//!
//! # Design Principles
//!
//! - **Strongly-typed IDs**: a `Position` cannot be passed where a `NodeId` is expected
//! - **Validated construction**: an invalid `TopicName` or `PartitionId` cannot exist
//! - **Explicit limits**: every bound lives in [`limits`]
//! - **No unsafe code**

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;
pub mod limits;
mod types;

pub use error::{Error, Result};
pub use types::{NodeId, PartitionId, Position, TopicName};
