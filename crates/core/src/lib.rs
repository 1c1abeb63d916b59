//! Core types for the Causeway lineage subsystem
//!
//! This crate defines the fundamental value types threaded through every
//! pipeline stage:
//!
//! - [`Identifier`] / [`IdKind`]: time-ordered, prefix-tagged identifiers
//! - [`ChainRecord`]: the immutable lineage record
//! - [`StagePayload`]: a stage's persisted output record
//! - [`Error`] / [`Result`]: the canonical error surface
//!
//! Everything here is a plain value: no I/O, no clocks beyond identifier
//! minting, no shared state. The journal and pipeline crates build on top.

#![warn(missing_docs)]

pub mod chain;
pub mod error;
pub mod id;
pub mod payload;

pub use chain::{Birth, ChainRecord, Slot, SlotKind};
pub use error::{Error, Result};
pub use id::{IdKind, Identifier};
pub use payload::StagePayload;
