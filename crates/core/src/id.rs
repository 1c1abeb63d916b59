//! Lineage identifiers
//!
//! Every record referenced by a [`ChainRecord`](crate::chain::ChainRecord)
//! slot is named by an [`Identifier`] in the wire format
//! `PREFIX_YYYYMMDD_HHMMSS_hhhhhhhh`:
//!
//! - `PREFIX`: 3-letter stage-kind code (see [`IdKind`])
//! - `YYYYMMDD_HHMMSS`: creation wall-clock date/time (UTC)
//! - `hhhhhhhh`: 8 lowercase hex characters of collision-resistant suffix
//!
//! Identifiers are lexicographically sortable by creation time within a
//! given prefix. They are minted by whichever component creates the
//! underlying record; ChainRecord slots hold back-references only.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stage-kind of an identifier, determining its 3-letter prefix.
///
/// The prefix table is a frozen wire contract:
///
/// | Kind | Prefix |
/// |------|--------|
/// | Tick | TCK |
/// | News | NWS |
/// | Schedule | SCH |
/// | Signal | SIG |
/// | Risk | RSK |
/// | Context | CTX |
/// | Directive | STR |
/// | EntryPlan | ENT |
/// | SizePlan | SIZ |
/// | ExitPlan | EXT |
/// | RoutingPlan | RTE |
/// | ExecutionDirective | EXD |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdKind {
    /// Market tick birth event
    Tick,
    /// News item birth event
    News,
    /// Scheduled trigger birth event
    Schedule,
    /// Detected signal
    Signal,
    /// Risk event
    Risk,
    /// Context assessment
    Context,
    /// Strategy directive
    Directive,
    /// Entry plan
    EntryPlan,
    /// Size plan
    SizePlan,
    /// Exit plan
    ExitPlan,
    /// Routing plan
    RoutingPlan,
    /// Execution directive
    ExecutionDirective,
}

impl IdKind {
    /// The 3-letter wire prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            IdKind::Tick => "TCK",
            IdKind::News => "NWS",
            IdKind::Schedule => "SCH",
            IdKind::Signal => "SIG",
            IdKind::Risk => "RSK",
            IdKind::Context => "CTX",
            IdKind::Directive => "STR",
            IdKind::EntryPlan => "ENT",
            IdKind::SizePlan => "SIZ",
            IdKind::ExitPlan => "EXT",
            IdKind::RoutingPlan => "RTE",
            IdKind::ExecutionDirective => "EXD",
        }
    }

    /// Resolve a wire prefix back to its kind.
    pub fn from_prefix(prefix: &str) -> Option<IdKind> {
        match prefix {
            "TCK" => Some(IdKind::Tick),
            "NWS" => Some(IdKind::News),
            "SCH" => Some(IdKind::Schedule),
            "SIG" => Some(IdKind::Signal),
            "RSK" => Some(IdKind::Risk),
            "CTX" => Some(IdKind::Context),
            "STR" => Some(IdKind::Directive),
            "ENT" => Some(IdKind::EntryPlan),
            "SIZ" => Some(IdKind::SizePlan),
            "EXT" => Some(IdKind::ExitPlan),
            "RTE" => Some(IdKind::RoutingPlan),
            "EXD" => Some(IdKind::ExecutionDirective),
            _ => None,
        }
    }

    /// True for the three birth-event kinds.
    pub fn is_birth(&self) -> bool {
        matches!(self, IdKind::Tick | IdKind::News | IdKind::Schedule)
    }
}

impl std::fmt::Display for IdKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A globally unique, time-ordered lineage identifier.
///
/// Wraps the validated string form `PREFIX_YYYYMMDD_HHMMSS_hhhhhhhh`.
/// Construction goes through [`Identifier::mint`] or [`Identifier::parse`];
/// an `Identifier` in hand is always well-formed.
///
/// # Examples
///
/// ```
/// use causeway_core::{IdKind, Identifier};
///
/// let id = Identifier::mint(IdKind::Tick);
/// assert!(id.as_str().starts_with("TCK_"));
/// assert_eq!(id.kind(), IdKind::Tick);
///
/// let parsed = Identifier::parse("SIG_20251026_100001_def5e6f7").unwrap();
/// assert_eq!(parsed.kind(), IdKind::Signal);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

// PREFIX(3) '_' DATE(8) '_' TIME(6) '_' SUFFIX(8)
const ID_LEN: usize = 3 + 1 + 8 + 1 + 6 + 1 + 8;

impl Identifier {
    /// Mint a fresh identifier of the given kind at the current UTC time.
    ///
    /// The 8-hex suffix is drawn from a v4 UUID, making collisions within
    /// the same wall-clock second vanishingly unlikely per minter.
    pub fn mint(kind: IdKind) -> Self {
        Self::mint_at(kind, Utc::now())
    }

    /// Mint an identifier with an explicit creation timestamp.
    ///
    /// Used by tests and by replay tooling that must reproduce a known
    /// wall-clock ordering.
    pub fn mint_at(kind: IdKind, at: DateTime<Utc>) -> Self {
        let suffix = (Uuid::new_v4().as_u128() & 0xffff_ffff) as u32;
        Identifier(format!(
            "{}_{}_{:08x}",
            kind.prefix(),
            at.format("%Y%m%d_%H%M%S"),
            suffix
        ))
    }

    /// Parse and validate an identifier from its wire form.
    ///
    /// Fails with [`Error::InvalidIdentifier`] on any shape violation:
    /// unknown prefix, wrong field widths, non-digit timestamp, an
    /// impossible calendar date, or a non-hex suffix.
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidIdentifier {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        if s.len() != ID_LEN {
            return Err(invalid("wrong length"));
        }
        let bytes = s.as_bytes();
        if bytes[3] != b'_' || bytes[12] != b'_' || bytes[19] != b'_' {
            return Err(invalid("misplaced separators"));
        }

        let prefix = &s[..3];
        if IdKind::from_prefix(prefix).is_none() {
            return Err(invalid("unknown prefix"));
        }

        let date = &s[4..12];
        let time = &s[13..19];
        if !date.bytes().all(|b| b.is_ascii_digit()) || !time.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("non-digit timestamp field"));
        }
        if NaiveDateTime::parse_from_str(&format!("{date}{time}"), "%Y%m%d%H%M%S").is_err() {
            return Err(invalid("impossible date/time"));
        }

        let suffix = &s[20..];
        if !suffix
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return Err(invalid("suffix is not lowercase hex"));
        }

        Ok(Identifier(s.to_string()))
    }

    /// The stage-kind encoded in the prefix.
    pub fn kind(&self) -> IdKind {
        // Validated at construction; the prefix is always known.
        IdKind::from_prefix(&self.0[..3]).unwrap_or(IdKind::Tick)
    }

    /// The creation wall-clock time encoded in the middle fields.
    pub fn timestamp(&self) -> DateTime<Utc> {
        let naive = NaiveDateTime::parse_from_str(
            &format!("{}{}", &self.0[4..12], &self.0[13..19]),
            "%Y%m%d%H%M%S",
        )
        .unwrap_or_default();
        Utc.from_utc_datetime(&naive)
    }

    /// The wire form of this identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identifier {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Identifier::parse(&s)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> String {
        id.0
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
