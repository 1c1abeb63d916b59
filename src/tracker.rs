//! Main entry point for the Causeway lineage subsystem.
//!
//! This module provides the `Causeway` struct, wiring a Journal, a
//! Pipeline, and the terminal-side components together behind one handle.

use causeway_core::{Birth, ChainRecord, Result, StagePayload};
use causeway_journal::{Journal, MemoryJournal, RetentionConfig, RetentionSweeper, SweeperHandle};
use causeway_pipeline::{Emitted, Pipeline, Reconstruction, Reconstructor, StageMiddleware};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// The lineage subsystem handle.
///
/// Owns the Journal the pipeline writes to and the Pipeline registry the
/// stages and the reconstructor share. Cheap to clone-by-`Arc` into stage
/// workers via [`Causeway::journal`].
///
/// # Example
///
/// ```
/// use causeway::prelude::*;
///
/// let causeway = Causeway::in_memory();
///
/// // Ingest a birth event.
/// let tick = Identifier::mint(IdKind::Tick);
/// let chain = causeway
///     .birth(Birth::tick(tick), serde_json::json!({"px": 101.5}))
///     .unwrap();
///
/// // Run a stage through its middleware and journal the output.
/// let detect = causeway
///     .middleware("signal-detection", |input: &ChainRecord| {
///         let _ = input; // business logic is causality-unaware
///         Ok(StageOutput::new(
///             Identifier::mint(IdKind::Signal),
///             serde_json::json!({"score": 0.9}),
///         ))
///     })
///     .unwrap();
/// let emitted = detect.call(&chain).unwrap();
/// let payload = causeway.record(emitted).unwrap();
///
/// // Audit it back.
/// let lineage = causeway.reconstruct(&payload.chain).unwrap();
/// assert_eq!(lineage.entries.len(), 2);
/// ```
pub struct Causeway {
    journal: Arc<dyn Journal>,
    pipeline: Pipeline,
}

impl Causeway {
    /// A Causeway over an in-memory journal and the canonical pipeline.
    pub fn in_memory() -> Self {
        Causeway {
            journal: Arc::new(MemoryJournal::new()),
            pipeline: Pipeline::canonical(),
        }
    }

    /// Start building a Causeway with a custom journal or pipeline.
    pub fn builder() -> CausewayBuilder {
        CausewayBuilder::default()
    }

    /// The journal stages persist to.
    pub fn journal(&self) -> Arc<dyn Journal> {
        Arc::clone(&self.journal)
    }

    /// The stage registry.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Ingest a birth event: create its ChainRecord and journal the birth
    /// payload under the birth identifier.
    ///
    /// Fails with [`Error::Validation`](causeway_core::Error::Validation)
    /// if no birth identifier is supplied; such a record must never enter
    /// the pipeline.
    pub fn birth(&self, birth: Birth, body: serde_json::Value) -> Result<ChainRecord> {
        let chain = ChainRecord::create(birth)?;
        for id in chain.birth_ids() {
            self.journal
                .put(StagePayload::new(id.clone(), chain.clone(), body.clone()))?;
        }
        debug!(birth = ?chain.birth_ids(), "lineage born");
        Ok(chain)
    }

    /// Bind a business function to its registered stage.
    pub fn middleware<F>(&self, stage: &str, business: F) -> Result<StageMiddleware<F>> {
        StageMiddleware::new(&self.pipeline, stage, business)
    }

    /// Persist a stage's emitted output to the journal.
    pub fn record<T: Serialize>(&self, emitted: Emitted<T>) -> Result<StagePayload> {
        let payload = emitted.into_payload()?;
        self.journal.put(payload.clone())?;
        Ok(payload)
    }

    /// Resolve a chain against the journal in canonical stage order.
    pub fn reconstruct(&self, record: &ChainRecord) -> Result<Reconstruction> {
        Reconstructor::new(self.journal(), self.pipeline.clone()).reconstruct(record)
    }

    /// A retention sweeper over this journal, judging completeness by this
    /// pipeline's slots.
    pub fn sweeper(&self, config: RetentionConfig) -> RetentionSweeper {
        RetentionSweeper::new(self.journal(), config, self.pipeline.slots().collect())
    }

    /// Run the retention sweeper on a background thread every `interval`.
    pub fn start_sweeper(
        &self,
        config: RetentionConfig,
        interval: std::time::Duration,
    ) -> SweeperHandle {
        self.sweeper(config).spawn(interval)
    }
}

/// Builder for a [`Causeway`] with a custom journal or pipeline.
#[derive(Default)]
pub struct CausewayBuilder {
    journal: Option<Arc<dyn Journal>>,
    pipeline: Option<Pipeline>,
}

impl CausewayBuilder {
    /// Use a specific journal implementation.
    pub fn journal(mut self, journal: Arc<dyn Journal>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Use a specific pipeline registry.
    pub fn pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Build the handle; defaults fill in an in-memory journal and the
    /// canonical pipeline.
    pub fn build(self) -> Causeway {
        Causeway {
            journal: self
                .journal
                .unwrap_or_else(|| Arc::new(MemoryJournal::new())),
            pipeline: self.pipeline.unwrap_or_else(Pipeline::canonical),
        }
    }
}
