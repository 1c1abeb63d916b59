//! Pipeline-side machinery of the Causeway lineage subsystem
//!
//! - [`Pipeline`] / [`StageDef`]: the canonical stage registry with slot
//!   assignments
//! - [`StageMiddleware`]: the generic lineage wrapper around
//!   causality-unaware business functions
//! - [`ConfluenceBarrier`]: explicit barriers for stages aggregating
//!   multiple upstream lineage instances
//! - [`Reconstructor`]: terminal-side resolution of a chain against the
//!   Journal
//!
//! Stages run as independent concurrent workers; everything here either
//! passes immutable values or synchronizes explicitly (the barrier).

#![warn(missing_docs)]

mod confluence;
mod middleware;
mod reconstruct;
mod stage;

pub use confluence::{BirthMergePolicy, ConfluenceBarrier, ConfluenceConfig};
pub use middleware::{BoxError, CarriesChain, Emitted, StageMiddleware, StageOutput};
pub use reconstruct::{LineageEntry, Reconstruction, Reconstructor};
pub use stage::{Pipeline, StageDef, BIRTH};
