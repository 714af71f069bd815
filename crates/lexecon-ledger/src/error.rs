// error.rs — Error types for the ledger subsystem.
//
// Chain integrity problems found by `verify_integrity` are reported, not
// raised. The errors here are for things that must stop the caller:
// a persisted entry whose hash does not match, or storage that cannot be
// read or written.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A serialized entry's stored hash disagrees with its recomputed hash.
    /// Loading must abort: trusting the entry would poison the chain.
    #[error("hash mismatch in entry {entry_id}: stored {expected}, recomputed {actual}")]
    HashMismatch {
        entry_id: String,
        expected: String,
        actual: String,
    },

    /// Failed to open, read, or write the storage backing the ledger.
    #[error("ledger storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A storage line could not be parsed as an entry.
    #[error("corrupt ledger storage at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    /// Failed to serialize or deserialize ledger data.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A shared ledger's lock was poisoned by a panicking writer.
    #[error("ledger lock poisoned: {0}")]
    LockPoisoned(String),
}
