//! ChainRecord: the immutable lineage value object
//!
//! A [`ChainRecord`] captures everything needed to trace a terminal action
//! back to the single event that caused it: the birth identifier it
//! descends from, and one slot per pipeline stage holding the
//! identifier(s) that stage emitted.
//!
//! ## Invariants
//!
//! - At least one birth identifier is set at creation; creation with none
//!   fails with [`Error::Validation`].
//! - A record is never mutated in place. [`ChainRecord::extend`] returns a
//!   new record derived from its input (copy-on-extend), so records can be
//!   passed across concurrent stages without locking.
//! - Single-valued slots are write-once: re-setting the same value is an
//!   idempotent no-op (safe under retries), a differing value is
//!   [`Error::SlotConflict`]. Multi-valued slots only grow, preserving
//!   insertion order with set semantics.
//!
//! ## Wire form
//!
//! Serializes as a mapping from slot name to either a single identifier
//! string or an ordered sequence of identifier strings. Unset slots are
//! omitted entirely, never emitted as explicit null.

use crate::error::{Error, Result};
use crate::id::{IdKind, Identifier};
use serde::{Deserialize, Serialize};

/// Whether a slot holds one identifier or an ordered sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Optional scalar, write-once per lineage instance
    Single,
    /// Ordered, duplicate-free sequence; only grows
    Multi,
}

/// The stage slots of a ChainRecord, in canonical pipeline order.
///
/// Each slot corresponds to one pipeline stage's output identifier(s).
/// Birth identifiers are not slots; they are fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    /// Signal-detection outputs (multi)
    SignalIds,
    /// Risk-monitoring outputs (multi)
    RiskEventIds,
    /// Context-assessment output
    ContextAssessmentId,
    /// Strategy-directive output
    StrategyDirectiveId,
    /// Entry-plan output
    EntryPlanId,
    /// Size-plan output
    SizePlanId,
    /// Exit-plan output
    ExitPlanId,
    /// Routing-plan output
    RoutingPlanId,
    /// Execution-directive output
    ExecutionDirectiveId,
}

impl Slot {
    /// All slots in canonical pipeline order.
    pub const ALL: [Slot; 9] = [
        Slot::SignalIds,
        Slot::RiskEventIds,
        Slot::ContextAssessmentId,
        Slot::StrategyDirectiveId,
        Slot::EntryPlanId,
        Slot::SizePlanId,
        Slot::ExitPlanId,
        Slot::RoutingPlanId,
        Slot::ExecutionDirectiveId,
    ];

    /// The slot's name as it appears in the serialized record.
    pub fn name(&self) -> &'static str {
        match self {
            Slot::SignalIds => "signal_ids",
            Slot::RiskEventIds => "risk_event_ids",
            Slot::ContextAssessmentId => "context_assessment_id",
            Slot::StrategyDirectiveId => "strategy_directive_id",
            Slot::EntryPlanId => "entry_plan_id",
            Slot::SizePlanId => "size_plan_id",
            Slot::ExitPlanId => "exit_plan_id",
            Slot::RoutingPlanId => "routing_plan_id",
            Slot::ExecutionDirectiveId => "execution_directive_id",
        }
    }

    /// Single or multi valued.
    pub fn kind(&self) -> SlotKind {
        match self {
            Slot::SignalIds | Slot::RiskEventIds => SlotKind::Multi,
            _ => SlotKind::Single,
        }
    }

    /// The identifier kind this slot accepts.
    pub fn id_kind(&self) -> IdKind {
        match self {
            Slot::SignalIds => IdKind::Signal,
            Slot::RiskEventIds => IdKind::Risk,
            Slot::ContextAssessmentId => IdKind::Context,
            Slot::StrategyDirectiveId => IdKind::Directive,
            Slot::EntryPlanId => IdKind::EntryPlan,
            Slot::SizePlanId => IdKind::SizePlan,
            Slot::ExitPlanId => IdKind::ExitPlan,
            Slot::RoutingPlanId => IdKind::RoutingPlan,
            Slot::ExecutionDirectiveId => IdKind::ExecutionDirective,
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The birth identifier(s) a lineage descends from.
///
/// Exactly one of the three is set in a well-formed single-origin lineage.
/// Confluence across differing births is handled by the merge policies in
/// the pipeline crate, never by silently combining births here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Birth {
    /// Market tick identifier (kind `Tick`)
    pub tick: Option<Identifier>,
    /// News item identifier (kind `News`)
    pub news: Option<Identifier>,
    /// Scheduled trigger identifier (kind `Schedule`)
    pub schedule: Option<Identifier>,
}

impl Birth {
    /// A birth from a market tick.
    pub fn tick(id: Identifier) -> Self {
        Birth {
            tick: Some(id),
            ..Birth::default()
        }
    }

    /// A birth from a news item.
    pub fn news(id: Identifier) -> Self {
        Birth {
            news: Some(id),
            ..Birth::default()
        }
    }

    /// A birth from a scheduled trigger.
    pub fn schedule(id: Identifier) -> Self {
        Birth {
            schedule: Some(id),
            ..Birth::default()
        }
    }

    /// True if no birth identifier is set.
    pub fn is_empty(&self) -> bool {
        self.tick.is_none() && self.news.is_none() && self.schedule.is_none()
    }
}

/// Immutable lineage record threaded through the pipeline.
///
/// Born at the trigger event, extended once per traversed stage, frozen at
/// the terminal stage, consumed read-only by reconstruction.
///
/// # Examples
///
/// ```
/// use causeway_core::{Birth, ChainRecord, Identifier, Slot};
///
/// let tick = Identifier::parse("TCK_20251026_100000_a1b2c3d4").unwrap();
/// let sig = Identifier::parse("SIG_20251026_100001_def5e6f7").unwrap();
///
/// let record = ChainRecord::create(Birth::tick(tick)).unwrap();
/// let record = record.extend(Slot::SignalIds, sig.clone()).unwrap();
/// assert_eq!(record.multi(Slot::SignalIds), &[sig]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainRecord {
    /// Tick birth identifier
    #[serde(skip_serializing_if = "Option::is_none", default)]
    tick_id: Option<Identifier>,
    /// News birth identifier
    #[serde(skip_serializing_if = "Option::is_none", default)]
    news_id: Option<Identifier>,
    /// Schedule birth identifier
    #[serde(skip_serializing_if = "Option::is_none", default)]
    schedule_id: Option<Identifier>,

    /// Signal-detection outputs, insertion-order preserved, duplicate-free
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    signal_ids: Vec<Identifier>,
    /// Risk-monitoring outputs, insertion-order preserved, duplicate-free
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    risk_event_ids: Vec<Identifier>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    context_assessment_id: Option<Identifier>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    strategy_directive_id: Option<Identifier>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    entry_plan_id: Option<Identifier>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    size_plan_id: Option<Identifier>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    exit_plan_id: Option<Identifier>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    routing_plan_id: Option<Identifier>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    execution_directive_id: Option<Identifier>,
}

impl ChainRecord {
    /// Construct a new record from the supplied birth identifier(s).
    ///
    /// Fails with [`Error::Validation`] if no birth identifier is supplied,
    /// or if a supplied identifier's kind does not match its field.
    pub fn create(birth: Birth) -> Result<Self> {
        if birth.is_empty() {
            return Err(Error::Validation(
                "chain record requires at least one birth identifier".to_string(),
            ));
        }
        for (id, expected) in [
            (&birth.tick, IdKind::Tick),
            (&birth.news, IdKind::News),
            (&birth.schedule, IdKind::Schedule),
        ] {
            if let Some(id) = id {
                if id.kind() != expected {
                    return Err(Error::Validation(format!(
                        "birth identifier {id} has kind {}, expected {}",
                        id.kind(),
                        expected
                    )));
                }
            }
        }
        Ok(ChainRecord {
            tick_id: birth.tick,
            news_id: birth.news,
            schedule_id: birth.schedule,
            ..ChainRecord::default()
        })
    }

    /// Return a new record with `slot` extended by `id`.
    ///
    /// - Single-valued slot, unset: sets it.
    /// - Single-valued slot, already set to `id`: no-op, returns an equal
    ///   record (idempotent under retries).
    /// - Single-valued slot, set to a different value:
    ///   [`Error::SlotConflict`].
    /// - Multi-valued slot: appends `id` if not already present; re-adding
    ///   an existing value is a no-op.
    ///
    /// The identifier's kind must match the slot's registered kind.
    pub fn extend(&self, slot: Slot, id: Identifier) -> Result<ChainRecord> {
        if id.kind() != slot.id_kind() {
            return Err(Error::Validation(format!(
                "identifier {id} has kind {}, slot {slot} accepts {}",
                id.kind(),
                slot.id_kind()
            )));
        }
        let mut next = self.clone();
        match slot.kind() {
            SlotKind::Single => {
                let field = next.single_mut(slot);
                match field {
                    None => *field = Some(id),
                    Some(existing) if *existing == id => {}
                    Some(existing) => {
                        return Err(Error::SlotConflict {
                            slot: slot.name(),
                            existing: existing.clone(),
                            attempted: id,
                        })
                    }
                }
            }
            SlotKind::Multi => {
                let seq = next.multi_mut(slot);
                if !seq.contains(&id) {
                    seq.push(id);
                }
            }
        }
        Ok(next)
    }

    /// The value of a single-valued slot, or `None` if unset (or if `slot`
    /// is multi-valued).
    pub fn single(&self, slot: Slot) -> Option<&Identifier> {
        match slot {
            Slot::ContextAssessmentId => self.context_assessment_id.as_ref(),
            Slot::StrategyDirectiveId => self.strategy_directive_id.as_ref(),
            Slot::EntryPlanId => self.entry_plan_id.as_ref(),
            Slot::SizePlanId => self.size_plan_id.as_ref(),
            Slot::ExitPlanId => self.exit_plan_id.as_ref(),
            Slot::RoutingPlanId => self.routing_plan_id.as_ref(),
            Slot::ExecutionDirectiveId => self.execution_directive_id.as_ref(),
            Slot::SignalIds | Slot::RiskEventIds => None,
        }
    }

    /// The sequence of a multi-valued slot; empty for single-valued slots.
    pub fn multi(&self, slot: Slot) -> &[Identifier] {
        match slot {
            Slot::SignalIds => &self.signal_ids,
            Slot::RiskEventIds => &self.risk_event_ids,
            _ => &[],
        }
    }

    /// Every identifier held by `slot`, regardless of its kind.
    pub fn values(&self, slot: Slot) -> Vec<&Identifier> {
        match slot.kind() {
            SlotKind::Single => self.single(slot).into_iter().collect(),
            SlotKind::Multi => self.multi(slot).iter().collect(),
        }
    }

    /// True if `slot` holds at least one identifier.
    pub fn is_set(&self, slot: Slot) -> bool {
        !self.values(slot).is_empty()
    }

    /// The tick birth identifier, if this lineage was born from a tick.
    pub fn tick_id(&self) -> Option<&Identifier> {
        self.tick_id.as_ref()
    }

    /// The news birth identifier, if this lineage was born from a news item.
    pub fn news_id(&self) -> Option<&Identifier> {
        self.news_id.as_ref()
    }

    /// The schedule birth identifier, if this lineage was born from a
    /// scheduled trigger.
    pub fn schedule_id(&self) -> Option<&Identifier> {
        self.schedule_id.as_ref()
    }

    /// All birth identifiers, in tick, news, schedule order.
    pub fn birth_ids(&self) -> Vec<&Identifier> {
        [&self.tick_id, &self.news_id, &self.schedule_id]
            .into_iter()
            .filter_map(Option::as_ref)
            .collect()
    }

    /// True if both records descend from exactly the same birth
    /// identifier(s).
    pub fn same_birth(&self, other: &ChainRecord) -> bool {
        self.tick_id == other.tick_id
            && self.news_id == other.news_id
            && self.schedule_id == other.schedule_id
    }

    /// True if any stage slot has been set since creation.
    pub fn is_extended(&self) -> bool {
        Slot::ALL.iter().any(|s| self.is_set(*s))
    }

    /// True if every slot in `required` is set.
    ///
    /// Callers pass the pipeline's canonical slot order; the reconstructor
    /// uses this to distinguish full from partial lineages.
    pub fn is_complete(&self, required: impl IntoIterator<Item = Slot>) -> bool {
        required.into_iter().all(|s| self.is_set(s))
    }

    /// Merge `other` into this record.
    ///
    /// Both records must descend from exactly the same birth; differing
    /// births fail with [`Error::Validation`] (the merge policies in the
    /// pipeline crate normalize births before calling this). Slots merge
    /// pairwise under [`extend`](ChainRecord::extend) semantics, so a
    /// single-valued slot set to different values on each side surfaces as
    /// [`Error::SlotConflict`].
    pub fn merge(&self, other: &ChainRecord) -> Result<ChainRecord> {
        if !self.same_birth(other) {
            return Err(Error::Validation(
                "cannot merge chain records with differing births".to_string(),
            ));
        }
        self.merge_slots(other)
    }

    /// Merge only the stage slots of `other` into this record, leaving this
    /// record's birth untouched.
    pub fn merge_slots(&self, other: &ChainRecord) -> Result<ChainRecord> {
        let mut merged = self.clone();
        for slot in Slot::ALL {
            for id in other.values(slot) {
                merged = merged.extend(slot, id.clone())?;
            }
        }
        Ok(merged)
    }

    fn single_mut(&mut self, slot: Slot) -> &mut Option<Identifier> {
        match slot {
            Slot::ContextAssessmentId => &mut self.context_assessment_id,
            Slot::StrategyDirectiveId => &mut self.strategy_directive_id,
            Slot::EntryPlanId => &mut self.entry_plan_id,
            Slot::SizePlanId => &mut self.size_plan_id,
            Slot::ExitPlanId => &mut self.exit_plan_id,
            Slot::RoutingPlanId => &mut self.routing_plan_id,
            Slot::ExecutionDirectiveId => &mut self.execution_directive_id,
            Slot::SignalIds | Slot::RiskEventIds => {
                unreachable!("multi-valued slot accessed as single")
            }
        }
    }

    fn multi_mut(&mut self, slot: Slot) -> &mut Vec<Identifier> {
        match slot {
            Slot::SignalIds => &mut self.signal_ids,
            Slot::RiskEventIds => &mut self.risk_event_ids,
            _ => unreachable!("single-valued slot accessed as multi"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::IdKind;

    fn id(kind: IdKind, suffix: u32) -> Identifier {
        Identifier::parse(&format!("{}_20251026_100000_{suffix:08x}", kind.prefix())).unwrap()
    }

    fn born() -> ChainRecord {
        ChainRecord::create(Birth::tick(id(IdKind::Tick, 1))).unwrap()
    }

    // =========================================================================
    // Creation
    // =========================================================================

    #[test]
    fn create_requires_a_birth() {
        let err = ChainRecord::create(Birth::default()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn create_sets_only_the_supplied_birth() {
        let record = born();
        assert!(record.tick_id().is_some());
        assert!(record.news_id().is_none());
        assert!(record.schedule_id().is_none());
        assert!(!record.is_extended());
    }

    #[test]
    fn create_rejects_kind_mismatch() {
        let err = ChainRecord::create(Birth::tick(id(IdKind::Signal, 1))).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    // =========================================================================
    // Extend: single-valued slots
    // =========================================================================

    #[test]
    fn extend_sets_an_unset_single_slot() {
        let ctx = id(IdKind::Context, 2);
        let record = born().extend(Slot::ContextAssessmentId, ctx.clone()).unwrap();
        assert_eq!(record.single(Slot::ContextAssessmentId), Some(&ctx));
    }

    #[test]
    fn extend_does_not_mutate_the_input() {
        let record = born();
        let _ = record
            .extend(Slot::ContextAssessmentId, id(IdKind::Context, 2))
            .unwrap();
        assert!(record.single(Slot::ContextAssessmentId).is_none());
    }

    #[test]
    fn extend_same_value_is_idempotent() {
        let ctx = id(IdKind::Context, 2);
        let once = born().extend(Slot::ContextAssessmentId, ctx.clone()).unwrap();
        let twice = once.extend(Slot::ContextAssessmentId, ctx).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn extend_differing_value_conflicts() {
        let set = born()
            .extend(Slot::StrategyDirectiveId, id(IdKind::Directive, 2))
            .unwrap();
        let err = set
            .extend(Slot::StrategyDirectiveId, id(IdKind::Directive, 3))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::SlotConflict {
                slot: "strategy_directive_id",
                ..
            }
        ));
    }

    #[test]
    fn extend_rejects_kind_mismatch() {
        let err = born()
            .extend(Slot::StrategyDirectiveId, id(IdKind::Signal, 2))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    // =========================================================================
    // Extend: multi-valued slots
    // =========================================================================

    #[test]
    fn multi_slot_preserves_order_and_dedupes() {
        let a = id(IdKind::Signal, 0xa);
        let b = id(IdKind::Signal, 0xb);
        let record = born()
            .extend(Slot::SignalIds, a.clone())
            .unwrap()
            .extend(Slot::SignalIds, b.clone())
            .unwrap()
            .extend(Slot::SignalIds, a.clone())
            .unwrap();
        assert_eq!(record.multi(Slot::SignalIds), &[a, b]);
    }

    // =========================================================================
    // Completeness and merging
    // =========================================================================

    #[test]
    fn is_complete_over_full_path() {
        let mut record = born();
        assert!(!record.is_complete(Slot::ALL));
        for slot in Slot::ALL {
            record = record.extend(slot, id(slot.id_kind(), 7)).unwrap();
        }
        assert!(record.is_complete(Slot::ALL));
    }

    #[test]
    fn merge_unions_multi_slots_in_order() {
        let a = id(IdKind::Signal, 0xa);
        let b = id(IdKind::Signal, 0xb);
        let c = id(IdKind::Signal, 0xc);
        let left = born()
            .extend(Slot::SignalIds, a.clone())
            .unwrap()
            .extend(Slot::SignalIds, b.clone())
            .unwrap();
        let right = born()
            .extend(Slot::SignalIds, b.clone())
            .unwrap()
            .extend(Slot::SignalIds, c.clone())
            .unwrap();
        let merged = left.merge(&right).unwrap();
        assert_eq!(merged.multi(Slot::SignalIds), &[a, b, c]);
    }

    #[test]
    fn merge_rejects_differing_births() {
        let other = ChainRecord::create(Birth::news(id(IdKind::News, 9))).unwrap();
        let err = born().merge(&other).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn merge_surfaces_single_slot_conflicts() {
        let left = born()
            .extend(Slot::EntryPlanId, id(IdKind::EntryPlan, 1))
            .unwrap();
        let right = born()
            .extend(Slot::EntryPlanId, id(IdKind::EntryPlan, 2))
            .unwrap();
        assert!(matches!(
            left.merge(&right).unwrap_err(),
            Error::SlotConflict { .. }
        ));
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    #[test]
    fn unset_slots_are_omitted_never_null() {
        let record = born();
        let value = serde_json::to_value(&record).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 1, "only the tick birth should be present");
        assert!(object.contains_key("tick_id"));
        assert!(!object.values().any(|v| v.is_null()));
    }

    #[test]
    fn serde_round_trips() {
        let record = born()
            .extend(Slot::SignalIds, id(IdKind::Signal, 0xa))
            .unwrap()
            .extend(Slot::StrategyDirectiveId, id(IdKind::Directive, 0xb))
            .unwrap();
        let json = serde_json::to_string(&record).unwrap();
        let back: ChainRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn multi_slot_serializes_as_sequence() {
        let record = born().extend(Slot::SignalIds, id(IdKind::Signal, 0xa)).unwrap();
        let value = serde_json::to_value(&record).unwrap();
        assert!(value["signal_ids"].is_array());
        assert!(value["tick_id"].is_string());
    }
}
