//! Lineage reconstruction
//!
//! The [`Reconstructor`] walks a [`ChainRecord`] in the pipeline's
//! canonical order and resolves every referenced identifier against the
//! Journal, producing the ordered lineage a terminal action is audited
//! from.
//!
//! A missing Journal entry never aborts reconstruction: it becomes an
//! explicit gap at its position, and the result carries the list of
//! missing identifiers. An audit query returning partial history beats one
//! that throws.

use crate::stage::Pipeline;
use causeway_core::{ChainRecord, Identifier, Result, Slot, SlotKind, StagePayload};
use causeway_journal::{Journal, PinSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// One position of a reconstructed lineage.
#[derive(Debug, Clone, PartialEq)]
pub struct LineageEntry {
    /// The slot this identifier was referenced from; `None` for the birth
    /// position
    pub slot: Option<Slot>,
    /// The referenced identifier
    pub id: Identifier,
    /// The resolved payload; `None` marks a gap
    pub payload: Option<StagePayload>,
}

impl LineageEntry {
    /// True if the Journal had no entry for this position.
    pub fn is_gap(&self) -> bool {
        self.payload.is_none()
    }
}

/// The ordered result of resolving a ChainRecord.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    /// Resolved positions in canonical stage order, births first
    pub entries: Vec<LineageEntry>,
    /// Identifiers with no Journal entry, in traversal order
    pub missing: Vec<Identifier>,
    /// True if the record covers the full pipeline path and nothing was
    /// missing
    pub complete: bool,
}

/// Terminal-side resolver of lineage records against the Journal.
pub struct Reconstructor {
    journal: Arc<dyn Journal>,
    pipeline: Pipeline,
}

impl Reconstructor {
    /// Create a reconstructor over `journal`, traversing in `pipeline`'s
    /// canonical order.
    pub fn new(journal: Arc<dyn Journal>, pipeline: Pipeline) -> Self {
        Reconstructor { journal, pipeline }
    }

    /// Resolve every identifier referenced by `record`.
    ///
    /// Traversal order is birth identifiers (tick, news, schedule) followed
    /// by the pipeline's slots in canonical order, independent of the order
    /// Journal writes occurred in. Multi-valued slots resolve through the
    /// Journal's batched lookup. Every referenced entry is pinned for the
    /// duration of the call, so a concurrent retention sweep cannot remove
    /// it mid-read.
    pub fn reconstruct(&self, record: &ChainRecord) -> Result<Reconstruction> {
        let referenced: Vec<Identifier> = record
            .birth_ids()
            .into_iter()
            .chain(self.pipeline.slots().flat_map(|slot| record.values(slot)))
            .cloned()
            .collect();
        let _pins = PinSet::acquire(Arc::clone(&self.journal), referenced.clone());

        let mut entries = Vec::with_capacity(referenced.len());
        let mut missing = Vec::new();

        for id in record.birth_ids() {
            let payload = self.journal.get(id)?;
            self.push(&mut entries, &mut missing, None, id.clone(), payload);
        }

        for slot in self.pipeline.slots() {
            match slot.kind() {
                SlotKind::Single => {
                    if let Some(id) = record.single(slot) {
                        let payload = self.journal.get(id)?;
                        self.push(&mut entries, &mut missing, Some(slot), id.clone(), payload);
                    }
                }
                SlotKind::Multi => {
                    let ids: Vec<&Identifier> = record.multi(slot).iter().collect();
                    if ids.is_empty() {
                        continue;
                    }
                    let payloads = self.journal.get_many(&ids)?;
                    for (id, payload) in ids.into_iter().zip(payloads) {
                        self.push(&mut entries, &mut missing, Some(slot), id.clone(), payload);
                    }
                }
            }
        }

        let complete = missing.is_empty() && record.is_complete(self.pipeline.slots());
        debug!(
            entries = entries.len(),
            missing = missing.len(),
            complete,
            "lineage reconstructed"
        );
        Ok(Reconstruction {
            entries,
            missing,
            complete,
        })
    }

    fn push(
        &self,
        entries: &mut Vec<LineageEntry>,
        missing: &mut Vec<Identifier>,
        slot: Option<Slot>,
        id: Identifier,
        payload: Option<StagePayload>,
    ) {
        if payload.is_none() {
            warn!(%id, "journal entry missing; recording gap");
            missing.push(id.clone());
        }
        entries.push(LineageEntry { slot, id, payload });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use causeway_core::{Birth, IdKind};
    use causeway_journal::MemoryJournal;

    struct Fixture {
        journal: Arc<MemoryJournal>,
        reconstructor: Reconstructor,
    }

    impl Fixture {
        fn new() -> Self {
            let journal = Arc::new(MemoryJournal::new());
            let reconstructor = Reconstructor::new(journal.clone(), Pipeline::canonical());
            Fixture {
                journal,
                reconstructor,
            }
        }

        /// Journal a birth and thread a full lineage through all nine
        /// stages, journaling each stage's payload. Returns the terminal
        /// chain.
        fn full_lineage(&self) -> ChainRecord {
            let tick = Identifier::mint(IdKind::Tick);
            let mut chain = ChainRecord::create(Birth::tick(tick.clone())).unwrap();
            self.journal
                .put(StagePayload::new(
                    tick,
                    chain.clone(),
                    serde_json::json!({"px": 100.0}),
                ))
                .unwrap();

            for slot in Slot::ALL {
                let id = Identifier::mint(slot.id_kind());
                chain = chain.extend(slot, id.clone()).unwrap();
                self.journal
                    .put(StagePayload::new(id, chain.clone(), serde_json::json!({})))
                    .unwrap();
            }
            chain
        }
    }

    #[test]
    fn full_lineage_resolves_in_canonical_order() {
        let fx = Fixture::new();
        let chain = fx.full_lineage();

        let result = fx.reconstructor.reconstruct(&chain).unwrap();
        assert_eq!(result.entries.len(), 10, "birth + nine stages");
        assert!(result.missing.is_empty());
        assert!(result.complete);

        assert_eq!(result.entries[0].slot, None);
        let slots: Vec<Slot> = result.entries[1..]
            .iter()
            .map(|e| e.slot.unwrap())
            .collect();
        assert_eq!(slots, Slot::ALL.to_vec());
        assert!(result.entries.iter().all(|e| !e.is_gap()));
    }

    #[test]
    fn missing_entry_becomes_a_gap_not_an_error() {
        let fx = Fixture::new();
        let chain = fx.full_lineage();

        let directive = chain.single(Slot::StrategyDirectiveId).unwrap().clone();
        fx.journal.purge(&directive).unwrap();

        let result = fx.reconstructor.reconstruct(&chain).unwrap();
        assert_eq!(result.entries.len(), 10);
        assert_eq!(result.missing, vec![directive.clone()]);
        assert!(!result.complete);

        let gap = result
            .entries
            .iter()
            .find(|e| e.slot == Some(Slot::StrategyDirectiveId))
            .unwrap();
        assert!(gap.is_gap());
        assert_eq!(gap.id, directive);
    }

    #[test]
    fn partial_record_reconstructs_its_prefix() {
        let fx = Fixture::new();
        let tick = Identifier::mint(IdKind::Tick);
        let chain = ChainRecord::create(Birth::tick(tick.clone())).unwrap();
        fx.journal
            .put(StagePayload::new(tick, chain.clone(), serde_json::json!({})))
            .unwrap();

        let sig = Identifier::mint(IdKind::Signal);
        let chain = chain.extend(Slot::SignalIds, sig.clone()).unwrap();
        fx.journal
            .put(StagePayload::new(sig, chain.clone(), serde_json::json!({})))
            .unwrap();

        let result = fx.reconstructor.reconstruct(&chain).unwrap();
        assert_eq!(result.entries.len(), 2);
        assert!(result.missing.is_empty());
        assert!(!result.complete, "only one of nine slots is set");
    }

    #[test]
    fn reconstruction_order_ignores_write_order() {
        let fx = Fixture::new();
        // Build the chain first, journal the payloads in reverse.
        let tick = Identifier::mint(IdKind::Tick);
        let mut chain = ChainRecord::create(Birth::tick(tick.clone())).unwrap();
        let mut payloads = vec![StagePayload::new(
            tick,
            chain.clone(),
            serde_json::json!({}),
        )];
        for slot in Slot::ALL {
            let id = Identifier::mint(slot.id_kind());
            chain = chain.extend(slot, id.clone()).unwrap();
            payloads.push(StagePayload::new(id, chain.clone(), serde_json::json!({})));
        }
        for payload in payloads.into_iter().rev() {
            fx.journal.put(payload).unwrap();
        }

        let result = fx.reconstructor.reconstruct(&chain).unwrap();
        let slots: Vec<Option<Slot>> = result.entries.iter().map(|e| e.slot).collect();
        let expected: Vec<Option<Slot>> = std::iter::once(None)
            .chain(Slot::ALL.into_iter().map(Some))
            .collect();
        assert_eq!(slots, expected);
    }

    #[test]
    fn referenced_entries_are_pinned_during_the_call() {
        // PinSet releases on drop; after reconstruct returns, a purge must
        // succeed again.
        let fx = Fixture::new();
        let chain = fx.full_lineage();
        let result = fx.reconstructor.reconstruct(&chain).unwrap();
        assert!(result.complete);

        let birth = result.entries[0].id.clone();
        assert!(fx.journal.purge(&birth).unwrap());
    }
}
