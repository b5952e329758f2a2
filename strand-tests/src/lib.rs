//! Strand Tests - integration tests for Strand.
//!
//! Tests here drive several crates together against real on-disk logs.
//! Unit tests stay inline in each crate under `#[cfg(test)]`.
//!
//! ## Test Organization
//!
//! **Integration Tests** (`*_tests.rs`):
//! - `processor_tests`: entry processing over real partition logs
//! - `registry_tests`: partition log placement and registry behavior
//! - `broker_tests`: broker startup, scheduling and commit notices
//!
//! **Support Modules**:
//! - `scenarios`: reusable logs, handlers and wait helpers
//!
//! ## Naming Conventions
//!
//! - Integration tests: `test_<component>_<scenario>`

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod scenarios;

#[cfg(test)]
mod processor_tests;
#[cfg(test)]
mod registry_tests;
