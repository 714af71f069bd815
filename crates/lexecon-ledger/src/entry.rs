// entry.rs — Ledger entry data model.
//
// Every audit record is a LedgerEntry. Entries form a chain: each one
// carries the `entry_hash` of its predecessor in `previous_hash`, and its
// own `entry_hash` is SHA-256 over the canonical JSON of
// {entry_id, event_type, data, timestamp, previous_hash}. That formula is
// the single source of truth for chain integrity.
//
// `entry_hash` is derived, never set by callers. Deserialization
// recomputes it and rejects any entry whose stored hash disagrees.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::LedgerError;
use crate::hasher;

/// A single record in the ledger chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "StoredEntry")]
pub struct LedgerEntry {
    /// `"genesis"` for the first entry, `"entry_<index>"` after that.
    pub entry_id: String,

    /// Caller-defined kind of event (e.g. "decision").
    pub event_type: String,

    /// Caller-supplied payload.
    pub data: Map<String, Value>,

    /// When the entry was created, RFC 3339 in UTC.
    pub timestamp: String,

    /// `entry_hash` of the preceding entry, or 64 zeros for the first.
    pub previous_hash: String,

    entry_hash: String,
}

impl LedgerEntry {
    /// Build an entry stamped with the current UTC time.
    pub fn new(
        entry_id: impl Into<String>,
        event_type: impl Into<String>,
        data: Map<String, Value>,
        previous_hash: impl Into<String>,
    ) -> Self {
        Self::with_timestamp(entry_id, event_type, data, now_timestamp(), previous_hash)
    }

    /// Build an entry with an explicit timestamp. The hash is computed here.
    pub fn with_timestamp(
        entry_id: impl Into<String>,
        event_type: impl Into<String>,
        data: Map<String, Value>,
        timestamp: impl Into<String>,
        previous_hash: impl Into<String>,
    ) -> Self {
        let mut entry = Self {
            entry_id: entry_id.into(),
            event_type: event_type.into(),
            data,
            timestamp: timestamp.into(),
            previous_hash: previous_hash.into(),
            entry_hash: String::new(),
        };
        entry.entry_hash = entry.calculate_hash();
        entry
    }

    /// The hash recorded when the entry was built or loaded.
    pub fn entry_hash(&self) -> &str {
        &self.entry_hash
    }

    /// Recompute the hash from the entry's current fields.
    pub fn calculate_hash(&self) -> String {
        hasher::hash_canonical(&json!({
            "entry_id": self.entry_id,
            "event_type": self.event_type,
            "data": self.data,
            "timestamp": self.timestamp,
            "previous_hash": self.previous_hash,
        }))
    }

    /// True when the recorded hash still matches the entry's content.
    pub fn is_intact(&self) -> bool {
        self.entry_hash == self.calculate_hash()
    }

    /// Parse a serialized entry and re-verify its hash.
    ///
    /// Unlike going through `serde_json::from_value`, a hash mismatch comes
    /// back as [`LedgerError::HashMismatch`] rather than a serde error.
    pub fn from_value(value: Value) -> Result<Self, LedgerError> {
        let stored: StoredEntry = serde_json::from_value(value)?;
        Self::try_from(stored)
    }
}

/// The wire form of an entry, before its hash has been checked.
#[derive(Debug, Deserialize)]
struct StoredEntry {
    entry_id: String,
    event_type: String,
    #[serde(default)]
    data: Map<String, Value>,
    timestamp: String,
    previous_hash: String,
    entry_hash: String,
}

impl TryFrom<StoredEntry> for LedgerEntry {
    type Error = LedgerError;

    fn try_from(stored: StoredEntry) -> Result<Self, Self::Error> {
        let entry = LedgerEntry::with_timestamp(
            stored.entry_id,
            stored.event_type,
            stored.data,
            stored.timestamp,
            stored.previous_hash,
        );
        if entry.entry_hash != stored.entry_hash {
            return Err(LedgerError::HashMismatch {
                entry_id: entry.entry_id,
                expected: stored.entry_hash,
                actual: entry.entry_hash,
            });
        }
        Ok(entry)
    }
}

pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
