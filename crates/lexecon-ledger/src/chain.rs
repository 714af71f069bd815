// chain.rs — The append-only, hash-linked ledger chain.
//
// The chain always starts with a genesis entry (previous_hash = 64 zeros).
// Each later entry is `entry_<index>` and links to its predecessor's hash.
// The chain only grows: there is no API to remove or reorder entries.
//
// Mutation needs `&mut self`, so a single owner is the only writer. Callers
// that share one chain across threads must go through `SharedLedger`,
// which serializes the read-tail / hash / push sequence behind a mutex.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::entry::LedgerEntry;
use crate::error::LedgerError;
use crate::hasher::ZERO_HASH;
use crate::report::{AuditReport, IntegrityFailure, IntegrityReport};
use crate::storage::LedgerStorage;

/// `entry_id` and `event_type` of the first entry in every chain.
pub const GENESIS_ID: &str = "genesis";

const GENESIS_MESSAGE: &str = "Lexecon ledger initialized";

/// Serialized form of a whole chain: `{"entries": [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerSnapshot {
    pub entries: Vec<LedgerEntry>,
}

/// A tamper-evident ledger of audit entries.
pub struct LedgerChain {
    entries: Vec<LedgerEntry>,
    storage: Option<Box<dyn LedgerStorage>>,
    storage_failures: usize,
}

impl LedgerChain {
    /// Create an in-memory chain holding only the genesis entry.
    pub fn new() -> Self {
        let mut chain = Self {
            entries: Vec::new(),
            storage: None,
            storage_failures: 0,
        };
        chain.push_genesis();
        chain
    }

    /// Create a chain backed by `storage`.
    ///
    /// If storage already holds entries they are taken as the chain, in the
    /// order returned. Otherwise a genesis entry is created and saved.
    /// Any entry failing hash re-verification aborts construction.
    pub fn open(storage: impl LedgerStorage + 'static) -> Result<Self, LedgerError> {
        let loaded = storage.load_all_entries()?;
        let mut chain = Self {
            entries: loaded,
            storage: Some(Box::new(storage)),
            storage_failures: 0,
        };
        if chain.entries.is_empty() {
            chain.push_genesis();
            tracing::info!("ledger initialized with genesis entry");
        } else {
            tracing::info!(entries = chain.entries.len(), "ledger loaded from storage");
        }
        Ok(chain)
    }

    /// Rebuild a chain from a snapshot. Every entry's hash is re-verified;
    /// linkage is left to [`LedgerChain::verify_integrity`].
    pub fn from_snapshot(snapshot: &Value) -> Result<Self, LedgerError> {
        let items = snapshot
            .get("entries")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let entries = items
            .into_iter()
            .map(LedgerEntry::from_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            entries,
            storage: None,
            storage_failures: 0,
        })
    }

    pub fn to_snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            entries: self.entries.clone(),
        }
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hash of the newest entry, if any.
    pub fn head_hash(&self) -> Option<&str> {
        self.entries.last().map(LedgerEntry::entry_hash)
    }

    /// Number of `save_entry` calls that failed since construction.
    pub fn storage_failures(&self) -> usize {
        self.storage_failures
    }

    /// Append a new entry linked to the current head and return it.
    ///
    /// The entry is in the chain before storage is called. A storage
    /// failure is logged and counted but does not undo the append.
    pub fn append(
        &mut self,
        event_type: impl Into<String>,
        data: Map<String, Value>,
    ) -> &LedgerEntry {
        let entry_id = format!("entry_{}", self.entries.len());
        let previous_hash = self.head_hash().unwrap_or(ZERO_HASH).to_string();
        let entry = LedgerEntry::new(entry_id, event_type, data, previous_hash);
        tracing::debug!(
            entry_id = %entry.entry_id,
            event_type = %entry.event_type,
            "ledger append"
        );
        self.push(entry)
    }

    /// Walk the chain, recomputing each hash and checking each link.
    ///
    /// Stops at the first failure. Never errors: the outcome is always a
    /// report, so it is safe to call periodically for monitoring.
    pub fn verify_integrity(&self) -> IntegrityReport {
        let Some(head) = self.entries.last() else {
            tracing::warn!("integrity check on empty ledger");
            return IntegrityReport::empty();
        };

        for (i, entry) in self.entries.iter().enumerate() {
            let failure = if !entry.is_intact() {
                Some(IntegrityFailure::HashMismatch)
            } else if i > 0 && entry.previous_hash != self.entries[i - 1].entry_hash() {
                Some(IntegrityFailure::ChainBreak)
            } else {
                None
            };

            if let Some(failure) = failure {
                tracing::warn!(
                    index = i,
                    entry_id = %entry.entry_id,
                    ?failure,
                    "ledger integrity failure"
                );
                return IntegrityReport::failed(failure, i, &entry.entry_id);
            }
        }

        IntegrityReport::intact(self.entries.len(), head.entry_hash())
    }

    /// Find an entry by `entry_id` or by `entry_hash`. Linear scan.
    pub fn get_entry(&self, id_or_hash: &str) -> Option<&LedgerEntry> {
        self.entries
            .iter()
            .find(|e| e.entry_id == id_or_hash || e.entry_hash() == id_or_hash)
    }

    pub fn get_entries_by_type(&self, event_type: &str) -> Vec<&LedgerEntry> {
        self.entries
            .iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Entries optionally filtered by type, keeping only the newest `limit`.
    /// A limit of zero means no limit.
    pub fn recent(&self, event_type: Option<&str>, limit: Option<usize>) -> Vec<&LedgerEntry> {
        let matching: Vec<&LedgerEntry> = self
            .entries
            .iter()
            .filter(|e| event_type.map_or(true, |t| e.event_type == t))
            .collect();
        let start = match limit {
            Some(n) if n > 0 => matching.len().saturating_sub(n),
            _ => 0,
        };
        matching[start..].to_vec()
    }

    pub fn generate_audit_report(&self) -> AuditReport {
        let integrity = self.verify_integrity();

        let mut event_type_counts = BTreeMap::new();
        for entry in &self.entries {
            *event_type_counts.entry(entry.event_type.clone()).or_insert(0) += 1;
        }

        AuditReport {
            total_entries: self.entries.len(),
            integrity_valid: integrity.valid,
            integrity,
            event_type_counts,
            first_entry_timestamp: self.entries.first().map(|e| e.timestamp.clone()),
            last_entry_timestamp: self.entries.last().map(|e| e.timestamp.clone()),
            chain_head_hash: self.head_hash().map(str::to_string),
        }
    }

    fn push_genesis(&mut self) {
        let mut data = Map::new();
        data.insert("message".to_string(), json!(GENESIS_MESSAGE));
        let genesis = LedgerEntry::new(GENESIS_ID, GENESIS_ID, data, ZERO_HASH);
        self.push(genesis);
    }

    fn push(&mut self, entry: LedgerEntry) -> &LedgerEntry {
        self.entries.push(entry);
        let index = self.entries.len() - 1;
        if let Some(storage) = self.storage.as_mut() {
            if let Err(e) = storage.save_entry(&self.entries[index]) {
                self.storage_failures += 1;
                tracing::error!(
                    entry_id = %self.entries[index].entry_id,
                    error = %e,
                    "failed to persist ledger entry"
                );
            }
        }
        &self.entries[index]
    }
}

impl Default for LedgerChain {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LedgerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerChain")
            .field("entries", &self.entries.len())
            .field("persistent", &self.storage.is_some())
            .field("storage_failures", &self.storage_failures)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn data(key: &str, value: Value) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(key.to_string(), value);
        map
    }

    fn chain_with(n: usize) -> LedgerChain {
        let mut chain = LedgerChain::new();
        for i in 0..n {
            chain.append("decision", data("n", json!(i)));
        }
        chain
    }

    #[test]
    fn fresh_chain_has_valid_genesis() {
        let chain = LedgerChain::new();
        assert_eq!(chain.len(), 1);
        let genesis = &chain.entries()[0];
        assert_eq!(genesis.entry_id, "genesis");
        assert_eq!(genesis.event_type, "genesis");
        assert_eq!(genesis.previous_hash, "0".repeat(64));

        let report = chain.verify_integrity();
        assert!(report.valid);
        assert!(report.chain_intact);
        assert_eq!(report.chain_head_hash.as_deref(), Some(genesis.entry_hash()));
    }

    #[test]
    fn appends_link_to_previous_entry() {
        let chain = chain_with(3);
        let entries = chain.entries();
        for n in 1..entries.len() {
            assert_eq!(entries[n].entry_id, format!("entry_{}", n));
            assert_eq!(entries[n].previous_hash, entries[n - 1].entry_hash());
            assert_eq!(entries[n].entry_hash(), entries[n].calculate_hash());
        }
        let report = chain.verify_integrity();
        assert!(report.valid);
        assert_eq!(report.entries_checked, 4);
        assert_eq!(report.entries_verified, 4);
    }

    #[test]
    fn tampered_data_is_detected() {
        let mut chain = chain_with(3);
        chain.entries[1].data.insert("n".to_string(), json!(99));

        let report = chain.verify_integrity();
        assert!(!report.valid);
        assert!(!report.chain_intact);
        assert_eq!(report.entries_checked, 2);
        assert_eq!(report.entries_verified, 1);
        assert_eq!(report.failed_index, Some(1));
        assert_eq!(report.failure, Some(IntegrityFailure::HashMismatch));
        assert_eq!(report.entry_id.as_deref(), Some("entry_1"));
        assert!(report.chain_head_hash.is_none());
    }

    #[test]
    fn swapped_entries_break_the_chain() {
        let mut chain = chain_with(3);
        chain.entries.swap(1, 2);

        let report = chain.verify_integrity();
        assert!(!report.valid);
        assert_eq!(report.failure, Some(IntegrityFailure::ChainBreak));
        assert_eq!(report.failed_index, Some(1));
    }

    #[test]
    fn removed_middle_entry_breaks_the_chain() {
        let mut chain = chain_with(3);
        chain.entries.remove(2);

        let report = chain.verify_integrity();
        assert!(!report.valid);
        assert_eq!(report.failure, Some(IntegrityFailure::ChainBreak));
        assert_eq!(report.failed_index, Some(2));
    }

    #[test]
    fn empty_chain_is_invalid() {
        let chain = LedgerChain::from_snapshot(&json!({"entries": []})).unwrap();
        let report = chain.verify_integrity();
        assert!(!report.valid);
        assert_eq!(report.failure, Some(IntegrityFailure::Empty));
        assert_eq!(report.entries_checked, 0);
    }

    #[test]
    fn lookup_by_id_and_hash() {
        let chain = chain_with(2);
        let second = chain.entries()[1].clone();
        assert_eq!(chain.get_entry("entry_1"), Some(&second));
        assert_eq!(chain.get_entry(second.entry_hash()), Some(&second));
        assert!(chain.get_entry("entry_9").is_none());
    }

    #[test]
    fn filter_by_type_and_recent() {
        let mut chain = chain_with(3);
        chain.append("approval", Map::new());

        assert_eq!(chain.get_entries_by_type("decision").len(), 3);
        assert_eq!(chain.get_entries_by_type("approval").len(), 1);

        let recent = chain.recent(Some("decision"), Some(2));
        let ids: Vec<_> = recent.iter().map(|e| e.entry_id.as_str()).collect();
        assert_eq!(ids, vec!["entry_2", "entry_3"]);
        assert_eq!(chain.recent(None, None).len(), 5);
        assert_eq!(chain.recent(None, Some(0)).len(), 5);
        assert_eq!(chain.recent(Some("decision"), Some(0)).len(), 3);
    }

    #[test]
    fn audit_report_counts_event_types() {
        let chain = chain_with(2);
        let report = chain.generate_audit_report();
        assert_eq!(report.total_entries, 3);
        assert!(report.integrity_valid);
        assert_eq!(report.event_type_counts["genesis"], 1);
        assert_eq!(report.event_type_counts["decision"], 2);
        assert_eq!(
            report.first_entry_timestamp.as_deref(),
            Some(chain.entries()[0].timestamp.as_str())
        );
        assert_eq!(report.chain_head_hash.as_deref(), chain.head_hash());
    }

    #[test]
    fn snapshot_round_trip() {
        let chain = chain_with(2);
        let snapshot = serde_json::to_value(chain.to_snapshot()).unwrap();
        let restored = LedgerChain::from_snapshot(&snapshot).unwrap();
        assert_eq!(restored.entries(), chain.entries());
        assert!(restored.verify_integrity().valid);
    }

    #[test]
    fn snapshot_with_edited_entry_is_rejected() {
        let chain = chain_with(2);
        let mut snapshot = serde_json::to_value(chain.to_snapshot()).unwrap();
        snapshot["entries"][1]["data"]["n"] = json!(42);

        let err = LedgerChain::from_snapshot(&snapshot).unwrap_err();
        assert!(matches!(err, LedgerError::HashMismatch { .. }));
    }

    #[test]
    fn open_on_empty_storage_saves_genesis() {
        let chain = LedgerChain::open(MemoryStorage::new()).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.entries()[0].entry_id, GENESIS_ID);
    }

    #[test]
    fn open_trusts_stored_entries() {
        let original = chain_with(2);
        let storage = MemoryStorage::with_entries(original.entries().to_vec());
        let mut chain = LedgerChain::open(storage).unwrap();
        assert_eq!(chain.len(), 3);

        let next = chain.append("decision", Map::new()).clone();
        assert_eq!(next.entry_id, "entry_3");
        assert_eq!(next.previous_hash, original.entries()[2].entry_hash());
        assert!(chain.verify_integrity().valid);
    }

    struct FailingStorage;

    impl LedgerStorage for FailingStorage {
        fn save_entry(&mut self, _entry: &LedgerEntry) -> Result<(), LedgerError> {
            Err(LedgerError::Storage {
                path: "unwritable".into(),
                source: std::io::Error::other("disk full"),
            })
        }

        fn load_all_entries(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn storage_failures_do_not_break_the_chain() {
        let mut chain = LedgerChain::open(FailingStorage).unwrap();
        chain.append("decision", Map::new());
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.storage_failures(), 2);
        assert!(chain.verify_integrity().valid);
    }
}
