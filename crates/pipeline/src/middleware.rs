//! Stage middleware: lineage extension around causality-unaware stages
//!
//! [`StageMiddleware`] wraps a stage's pure business function so the stage
//! never touches the chain itself:
//!
//! 1. extract the [`ChainRecord`] from the input
//! 2. invoke the business function
//! 3. extend the chain with the output's self-identifier under the
//!    stage's registered slot
//! 4. attach the extended chain to the output
//!
//! If step 3 fails, the stage invocation fails as a whole and the business
//! output is discarded: a record never leaves a stage with an ambiguous or
//! missing chain. The middleware is deterministic and has no side effects
//! beyond the returned record.

use crate::stage::Pipeline;
use causeway_core::{ChainRecord, Error, Identifier, Result, Slot, StagePayload};
use serde::Serialize;
use tracing::debug;

/// Boxed business error, wrapped into
/// [`Error::Stage`](causeway_core::Error::Stage) by the middleware.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Anything a stage can receive that carries the incoming lineage.
pub trait CarriesChain {
    /// The lineage embedded in this value.
    fn chain(&self) -> &ChainRecord;
}

impl CarriesChain for ChainRecord {
    fn chain(&self) -> &ChainRecord {
        self
    }
}

impl CarriesChain for StagePayload {
    fn chain(&self) -> &ChainRecord {
        &self.chain
    }
}

/// What a business function returns: its freshly minted self-identifier
/// and its payload body. No causality awareness required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutput<T> {
    /// The output record's self-assigned identifier
    pub id: Identifier,
    /// The business payload
    pub body: T,
}

impl<T> StageOutput<T> {
    /// Pair an identifier with its body.
    pub fn new(id: Identifier, body: T) -> Self {
        StageOutput { id, body }
    }
}

/// A stage output with its extended lineage attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emitted<T> {
    /// The output record's self-assigned identifier
    pub id: Identifier,
    /// The input lineage extended with `id`
    pub chain: ChainRecord,
    /// The business payload
    pub body: T,
}

impl<T> CarriesChain for Emitted<T> {
    fn chain(&self) -> &ChainRecord {
        &self.chain
    }
}

impl<T: Serialize> Emitted<T> {
    /// Convert into the [`StagePayload`] persisted to the Journal.
    pub fn into_payload(self) -> Result<StagePayload> {
        let body = serde_json::to_value(&self.body)?;
        Ok(StagePayload::new(self.id, self.chain, body))
    }
}

/// Generic lineage wrapper around one stage's business function.
///
/// Constructed through the [`Pipeline`] so a stage can only ever bind the
/// slot it registered.
///
/// # Examples
///
/// ```
/// use causeway_core::{Birth, ChainRecord, IdKind, Identifier, Slot};
/// use causeway_pipeline::{Pipeline, StageMiddleware, StageOutput};
///
/// let pipeline = Pipeline::canonical();
/// let detect = StageMiddleware::new(&pipeline, "signal-detection", |_: &ChainRecord| {
///     Ok(StageOutput::new(Identifier::mint(IdKind::Signal), "momentum"))
/// })
/// .unwrap();
///
/// let tick = Identifier::mint(IdKind::Tick);
/// let chain = ChainRecord::create(Birth::tick(tick)).unwrap();
/// let emitted = detect.call(&chain).unwrap();
/// assert_eq!(emitted.chain.multi(Slot::SignalIds), &[emitted.id.clone()]);
/// ```
pub struct StageMiddleware<F> {
    name: String,
    slot: Slot,
    business: F,
}

impl<F> std::fmt::Debug for StageMiddleware<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageMiddleware")
            .field("name", &self.name)
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}

impl<F> StageMiddleware<F> {
    /// Bind a business function to its registered stage.
    ///
    /// Fails with [`Error::Validation`](causeway_core::Error::Validation)
    /// if `stage` is not registered in `pipeline`.
    pub fn new(pipeline: &Pipeline, stage: &str, business: F) -> Result<Self> {
        let def = pipeline
            .stage(stage)
            .ok_or_else(|| Error::Validation(format!("unknown stage {stage}")))?;
        Ok(StageMiddleware {
            name: def.name.clone(),
            slot: def.slot,
            business,
        })
    }

    /// The stage this middleware is bound to.
    pub fn stage(&self) -> &str {
        &self.name
    }

    /// The slot this middleware extends.
    pub fn slot(&self) -> Slot {
        self.slot
    }

    /// Invoke the business function and extend the lineage with its
    /// self-identifier.
    ///
    /// A business failure wraps as
    /// [`Error::Stage`](causeway_core::Error::Stage); an extension failure
    /// (`SlotConflict`, `Validation`) discards the business output and
    /// fails the invocation.
    pub fn call<I, T>(&self, input: &I) -> Result<Emitted<T>>
    where
        I: CarriesChain,
        F: Fn(&I) -> std::result::Result<StageOutput<T>, BoxError>,
    {
        let output = (self.business)(input).map_err(|source| Error::Stage {
            stage: self.name.clone(),
            source,
        })?;
        let chain = input.chain().extend(self.slot, output.id.clone())?;
        debug!(stage = %self.name, id = %output.id, "stage emitted");
        Ok(Emitted {
            id: output.id,
            chain,
            body: output.body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use causeway_core::{Birth, IdKind};

    fn chain() -> ChainRecord {
        ChainRecord::create(Birth::tick(Identifier::mint(IdKind::Tick))).unwrap()
    }

    #[test]
    fn middleware_extends_the_registered_slot() {
        let pipeline = Pipeline::canonical();
        let mw = StageMiddleware::new(&pipeline, "context-assessment", |_: &ChainRecord| {
            Ok(StageOutput::new(Identifier::mint(IdKind::Context), 42u32))
        })
        .unwrap();

        let input = chain();
        let emitted = mw.call(&input).unwrap();
        assert_eq!(
            emitted.chain.single(Slot::ContextAssessmentId),
            Some(&emitted.id)
        );
        assert_eq!(emitted.body, 42);
        // The input is untouched.
        assert!(input.single(Slot::ContextAssessmentId).is_none());
    }

    #[test]
    fn unknown_stage_is_rejected_at_construction() {
        let pipeline = Pipeline::canonical();
        let result = StageMiddleware::new(&pipeline, "no-such-stage", |_: &ChainRecord| {
            Ok::<_, BoxError>(StageOutput::new(Identifier::mint(IdKind::Context), ()))
        });
        assert!(matches!(result.unwrap_err(), Error::Validation(_)));
    }

    #[test]
    fn business_failure_wraps_as_stage_error() {
        let pipeline = Pipeline::canonical();
        let mw = StageMiddleware::new(&pipeline, "entry-plan", |_: &ChainRecord| {
            Err::<StageOutput<()>, BoxError>("no liquidity".into())
        })
        .unwrap();

        let err = mw.call(&chain()).unwrap_err();
        assert!(matches!(err, Error::Stage { .. }));
        assert!(err.to_string().contains("entry-plan"));
    }

    #[test]
    fn extension_conflict_discards_business_output() {
        let pipeline = Pipeline::canonical();
        let mw = StageMiddleware::new(&pipeline, "strategy-directive", |_: &ChainRecord| {
            Ok(StageOutput::new(Identifier::mint(IdKind::Directive), ()))
        })
        .unwrap();

        // Input already carries a different directive id.
        let input = chain()
            .extend(Slot::StrategyDirectiveId, Identifier::mint(IdKind::Directive))
            .unwrap();
        let err = mw.call(&input).unwrap_err();
        assert!(matches!(err, Error::SlotConflict { .. }));
    }

    #[test]
    fn wrong_kind_output_fails_the_invocation() {
        let pipeline = Pipeline::canonical();
        // Business function mints the wrong identifier kind for its stage.
        let mw = StageMiddleware::new(&pipeline, "size-plan", |_: &ChainRecord| {
            Ok(StageOutput::new(Identifier::mint(IdKind::Signal), ()))
        })
        .unwrap();

        let err = mw.call(&chain()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn emitted_converts_to_payload() {
        let pipeline = Pipeline::canonical();
        let mw = StageMiddleware::new(&pipeline, "signal-detection", |_: &ChainRecord| {
            Ok(StageOutput::new(
                Identifier::mint(IdKind::Signal),
                serde_json::json!({"score": 0.8}),
            ))
        })
        .unwrap();

        let emitted = mw.call(&chain()).unwrap();
        let id = emitted.id.clone();
        let payload = emitted.into_payload().unwrap();
        assert_eq!(payload.id, id);
        assert_eq!(payload.body["score"], 0.8);
    }
}
