//! # Causeway
//!
//! Causality-lineage tracking for multi-stage decision pipelines.
//!
//! Every unit of work descending from a single triggering event (a market
//! tick, a news item, a scheduled trigger) stays traceable back to that
//! trigger and through every intermediate decision, so a terminal action
//! can be fully audited after the fact.
//!
//! ## Quick Start
//!
//! ```
//! use causeway::prelude::*;
//!
//! let causeway = Causeway::in_memory();
//!
//! // A market tick births a lineage.
//! let tick = Identifier::mint(IdKind::Tick);
//! let chain = causeway
//!     .birth(Birth::tick(tick), serde_json::json!({"px": 101.5}))
//!     .unwrap();
//!
//! // Stages extend the chain through middleware; the business function
//! // never sees the lineage machinery.
//! let detect = causeway
//!     .middleware("signal-detection", |_: &ChainRecord| {
//!         Ok(StageOutput::new(
//!             Identifier::mint(IdKind::Signal),
//!             serde_json::json!({"kind": "momentum"}),
//!         ))
//!     })
//!     .unwrap();
//! let emitted = detect.call(&chain).unwrap();
//! let payload = causeway.record(emitted).unwrap();
//!
//! // The terminal record reconstructs in canonical order.
//! let lineage = causeway.reconstruct(&payload.chain).unwrap();
//! assert!(lineage.missing.is_empty());
//! ```
//!
//! ## Pieces
//!
//! - [`ChainRecord`]: the immutable lineage value threaded through stages
//! - [`Pipeline`]: canonical stage order and slot assignments
//! - [`StageMiddleware`]: copy-and-extend around causality-unaware stages
//! - [`Journal`] / [`MemoryJournal`]: the append-only payload store
//! - [`Reconstructor`]: ordered lineage resolution with explicit gaps
//! - [`RetentionSweeper`]: window-based purge of orphaned birth records

#![warn(missing_docs)]

mod tracker;

pub mod prelude;

pub use tracker::{Causeway, CausewayBuilder};

// Re-export the working set at the crate root.
pub use causeway_core::{
    Birth, ChainRecord, Error, IdKind, Identifier, Result, Slot, SlotKind, StagePayload,
};
pub use causeway_journal::{
    Journal, MemoryJournal, RetentionConfig, RetentionSweeper, SweepReport, SweeperHandle,
};
pub use causeway_pipeline::{
    BirthMergePolicy, ConfluenceBarrier, ConfluenceConfig, Emitted, LineageEntry, Pipeline,
    Reconstruction, Reconstructor, StageDef, StageMiddleware, StageOutput, BIRTH,
};
