//! Stage payloads
//!
//! A [`StagePayload`] is the opaque business record a stage produces: its
//! self-assigned identifier, the lineage it belongs to, and the stage's own
//! body. Payloads are created once, immutable thereafter, and persisted to
//! the Journal keyed by the self-identifier.

use crate::chain::ChainRecord;
use crate::id::Identifier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stage's output record, as persisted to the Journal.
///
/// The embedded [`ChainRecord`] is the lineage as of the moment this
/// payload was emitted: the stage's own identifier is already present in
/// its slot. Birth events are stored the same way, keyed by the birth
/// identifier with the freshly created chain embedded, which is what makes
/// them visible to the retention sweeper and resolvable by reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagePayload {
    /// Self-assigned identifier; the Journal key
    pub id: Identifier,
    /// Lineage as of this payload's emission
    pub chain: ChainRecord,
    /// Opaque business body; this subsystem never inspects it
    pub body: serde_json::Value,
    /// Wall-clock time the payload was recorded
    pub recorded_at: DateTime<Utc>,
}

impl StagePayload {
    /// Create a payload recorded now.
    pub fn new(id: Identifier, chain: ChainRecord, body: serde_json::Value) -> Self {
        Self::recorded_at(id, chain, body, Utc::now())
    }

    /// Create a payload with an explicit recording time.
    ///
    /// Used by tests and backfill tooling; production stages use
    /// [`StagePayload::new`].
    pub fn recorded_at(
        id: Identifier,
        chain: ChainRecord,
        body: serde_json::Value,
        at: DateTime<Utc>,
    ) -> Self {
        StagePayload {
            id,
            chain,
            body,
            recorded_at: at,
        }
    }

    /// True if this payload's own identifier is a birth-event identifier.
    pub fn is_birth(&self) -> bool {
        self.id.kind().is_birth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Birth;
    use crate::id::{IdKind, Identifier};

    #[test]
    fn birth_payloads_are_recognized() {
        let tick = Identifier::mint(IdKind::Tick);
        let chain = ChainRecord::create(Birth::tick(tick.clone())).unwrap();
        let payload = StagePayload::new(tick, chain.clone(), serde_json::json!({"px": 101.5}));
        assert!(payload.is_birth());

        let sig = Identifier::mint(IdKind::Signal);
        let payload = StagePayload::new(sig, chain, serde_json::json!({}));
        assert!(!payload.is_birth());
    }
}
