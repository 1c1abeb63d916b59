//! Convenience re-exports for working with Causeway.
//!
//! ```
//! use causeway::prelude::*;
//! ```

pub use crate::{Causeway, CausewayBuilder};

pub use causeway_core::{
    Birth, ChainRecord, Error, IdKind, Identifier, Result, Slot, SlotKind, StagePayload,
};
pub use causeway_journal::{
    Journal, MemoryJournal, RetentionConfig, RetentionSweeper, SweepReport, SweeperHandle,
};
pub use causeway_pipeline::{
    BirthMergePolicy, ConfluenceBarrier, ConfluenceConfig, Emitted, LineageEntry, Pipeline,
    Reconstruction, Reconstructor, StageDef, StageMiddleware, StageOutput,
};
