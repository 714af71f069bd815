// report.rs — Integrity and audit reports.
//
// Both are derived on demand from the chain; nothing here is stored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Why a chain failed verification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityFailure {
    /// The chain has no entries, not even genesis.
    Empty,
    /// An entry's content no longer matches its recorded hash.
    HashMismatch,
    /// An entry's `previous_hash` does not match its predecessor's hash.
    ChainBreak,
}

/// Result of walking the chain and recomputing every hash and link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntegrityReport {
    pub valid: bool,
    /// Entries examined, including the failing one.
    pub entries_checked: usize,
    /// Entries that passed both checks.
    pub entries_verified: usize,
    pub chain_intact: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<IntegrityFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
    /// Hash of the last entry; only set on a fully valid chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_head_hash: Option<String>,
}

impl IntegrityReport {
    pub(crate) fn intact(entries: usize, head_hash: &str) -> Self {
        Self {
            valid: true,
            entries_checked: entries,
            entries_verified: entries,
            chain_intact: true,
            failure: None,
            error: None,
            failed_index: None,
            entry_id: None,
            chain_head_hash: Some(head_hash.to_string()),
        }
    }

    pub(crate) fn empty() -> Self {
        Self {
            valid: false,
            entries_checked: 0,
            entries_verified: 0,
            chain_intact: false,
            failure: Some(IntegrityFailure::Empty),
            error: Some("Empty ledger".to_string()),
            failed_index: None,
            entry_id: None,
            chain_head_hash: None,
        }
    }

    pub(crate) fn failed(failure: IntegrityFailure, index: usize, entry_id: &str) -> Self {
        let error = match failure {
            IntegrityFailure::HashMismatch => format!("Hash mismatch at entry {}", index),
            IntegrityFailure::ChainBreak => format!("Chain break at entry {}", index),
            IntegrityFailure::Empty => "Empty ledger".to_string(),
        };
        Self {
            valid: false,
            entries_checked: index + 1,
            entries_verified: index,
            chain_intact: false,
            failure: Some(failure),
            error: Some(error),
            failed_index: Some(index),
            entry_id: Some(entry_id.to_string()),
            chain_head_hash: None,
        }
    }
}

/// Summary of the chain for auditors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditReport {
    pub total_entries: usize,
    pub integrity_valid: bool,
    pub integrity: IntegrityReport,
    pub event_type_counts: BTreeMap<String, usize>,
    pub first_entry_timestamp: Option<String>,
    pub last_entry_timestamp: Option<String>,
    pub chain_head_hash: Option<String>,
}
