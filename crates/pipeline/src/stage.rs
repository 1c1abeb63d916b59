//! Pipeline stage registry
//!
//! The [`Pipeline`] holds the canonical, fixed stage order and each
//! stage's slot assignment. It is consulted three ways:
//!
//! - to configure each stage's middleware (a stage can only bind the slot
//!   it registered)
//! - to drive reconstruction traversal order
//! - to reject a stage writing outside its registered assignment

use causeway_core::{Error, Result, Slot};

/// The pseudo-stage every lineage starts from.
pub const BIRTH: &str = "birth";

/// One registered pipeline stage: its name, the slot it writes, and the
/// stages it may legally follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageDef {
    /// Stage name, unique within the pipeline
    pub name: String,
    /// The single slot this stage is allowed to write
    pub slot: Slot,
    /// Legal upstream stage names ([`BIRTH`] for entry stages)
    pub upstream: Vec<String>,
}

impl StageDef {
    /// Define a stage.
    pub fn new(name: impl Into<String>, slot: Slot, upstream: &[&str]) -> Self {
        StageDef {
            name: name.into(),
            slot,
            upstream: upstream.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Ordered registry of pipeline stages.
///
/// Registration order is canonical order: it fixes both propagation and
/// reconstruction traversal.
///
/// # Examples
///
/// ```
/// use causeway_pipeline::Pipeline;
/// use causeway_core::Slot;
///
/// let pipeline = Pipeline::canonical();
/// assert_eq!(pipeline.len(), 9);
/// assert!(pipeline.assert_assignment("signal-detection", Slot::SignalIds).is_ok());
/// assert!(pipeline.assert_assignment("signal-detection", Slot::EntryPlanId).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<StageDef>,
}

impl Pipeline {
    /// An empty pipeline; stages are added with [`Pipeline::register`].
    pub fn new() -> Self {
        Pipeline::default()
    }

    /// The canonical trading-decision pipeline:
    /// birth → signal-detection → risk-monitoring → context-assessment →
    /// strategy-directive → entry-plan → size-plan → exit-plan →
    /// routing-plan → execution-directive.
    pub fn canonical() -> Self {
        let mut pipeline = Pipeline::new();
        for def in [
            StageDef::new("signal-detection", Slot::SignalIds, &[BIRTH]),
            StageDef::new("risk-monitoring", Slot::RiskEventIds, &[BIRTH, "signal-detection"]),
            StageDef::new(
                "context-assessment",
                Slot::ContextAssessmentId,
                &["signal-detection", "risk-monitoring"],
            ),
            StageDef::new(
                "strategy-directive",
                Slot::StrategyDirectiveId,
                &["context-assessment"],
            ),
            StageDef::new("entry-plan", Slot::EntryPlanId, &["strategy-directive"]),
            StageDef::new("size-plan", Slot::SizePlanId, &["entry-plan"]),
            StageDef::new("exit-plan", Slot::ExitPlanId, &["size-plan"]),
            StageDef::new("routing-plan", Slot::RoutingPlanId, &["exit-plan"]),
            StageDef::new(
                "execution-directive",
                Slot::ExecutionDirectiveId,
                &["routing-plan"],
            ),
        ] {
            pipeline
                .register(def)
                .expect("canonical pipeline is well-formed");
        }
        pipeline
    }

    /// Register a stage at the end of the pipeline.
    ///
    /// Fails with [`Error::Validation`] on a duplicate stage name, a slot
    /// already assigned to another stage, or an upstream reference to an
    /// unknown stage.
    pub fn register(&mut self, def: StageDef) -> Result<()> {
        if self.stage(&def.name).is_some() {
            return Err(Error::Validation(format!(
                "stage {} is already registered",
                def.name
            )));
        }
        if let Some(owner) = self.stages.iter().find(|s| s.slot == def.slot) {
            return Err(Error::Validation(format!(
                "slot {} is already assigned to stage {}",
                def.slot, owner.name
            )));
        }
        for upstream in &def.upstream {
            if upstream != BIRTH && self.stage(upstream).is_none() {
                return Err(Error::Validation(format!(
                    "stage {} declares unknown upstream {upstream}",
                    def.name
                )));
            }
        }
        self.stages.push(def);
        Ok(())
    }

    /// Look up a stage by name.
    pub fn stage(&self, name: &str) -> Option<&StageDef> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// All stages in canonical order.
    pub fn stages(&self) -> &[StageDef] {
        &self.stages
    }

    /// The slots written along this pipeline, in canonical order.
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.stages.iter().map(|s| s.slot)
    }

    /// Position of the stage writing `slot`, if any.
    pub fn position(&self, slot: Slot) -> Option<usize> {
        self.stages.iter().position(|s| s.slot == slot)
    }

    /// Number of registered stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// True if no stage is registered.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Verify that `stage` exists and is registered to write `slot`.
    pub fn assert_assignment(&self, stage: &str, slot: Slot) -> Result<()> {
        let def = self
            .stage(stage)
            .ok_or_else(|| Error::Validation(format!("unknown stage {stage}")))?;
        if def.slot != slot {
            return Err(Error::Validation(format!(
                "stage {stage} is registered for slot {}, not {slot}",
                def.slot
            )));
        }
        Ok(())
    }
}
