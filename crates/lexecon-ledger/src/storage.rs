// storage.rs — Storage collaborators for the ledger chain.
//
// The chain only needs two things from storage: append one entry, and
// load every entry in chain order. `LedgerStorage` is that contract.
//
// `JsonlStorage` keeps one JSON entry per line, opened in append mode so
// existing records are never overwritten. Every loaded line is re-verified
// against its recorded hash; a single bad line aborts the load.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::entry::LedgerEntry;
use crate::error::LedgerError;

/// Persistence backend for a [`crate::LedgerChain`].
///
/// Implementations must return entries from `load_all_entries` in the
/// order they were saved; the chain trusts that order.
pub trait LedgerStorage: Send {
    /// Persist one newly appended entry.
    fn save_entry(&mut self, entry: &LedgerEntry) -> Result<(), LedgerError>;

    /// Load every persisted entry, oldest first. Empty when nothing is stored.
    fn load_all_entries(&self) -> Result<Vec<LedgerEntry>, LedgerError>;
}

/// In-memory storage, useful for tests and ephemeral ledgers.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: Vec<LedgerEntry>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with previously saved entries.
    pub fn with_entries(entries: Vec<LedgerEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }
}

impl LedgerStorage for MemoryStorage {
    fn save_entry(&mut self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        self.entries.push(entry.clone());
        Ok(())
    }

    fn load_all_entries(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ok(self.entries.clone())
    }
}

/// JSON Lines file storage: one serialized [`LedgerEntry`] per line.
pub struct JsonlStorage {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl JsonlStorage {
    /// Open (or create) a JSONL ledger file, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| LedgerError::Storage {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        // Append mode: existing records are never overwritten.
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| LedgerError::Storage {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            writer: BufWriter::new(file),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and verify every entry in a JSONL ledger file.
    ///
    /// Blank lines are skipped. Unparseable lines fail with `Corrupt`;
    /// entries whose hash does not match fail with `HashMismatch`.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<LedgerEntry>, LedgerError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| LedgerError::Storage {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| LedgerError::Storage {
                path: path.to_path_buf(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let value: Value =
                serde_json::from_str(&line).map_err(|e| LedgerError::Corrupt {
                    line: line_num + 1,
                    reason: e.to_string(),
                })?;
            entries.push(LedgerEntry::from_value(value)?);
        }

        Ok(entries)
    }
}

impl LedgerStorage for JsonlStorage {
    fn save_entry(&mut self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        let json = serde_json::to_string(entry)?;
        let path = &self.path;
        let io_err = |source| LedgerError::Storage {
            path: path.clone(),
            source,
        };
        writeln!(self.writer, "{}", json).map_err(io_err)?;
        // Flush so the record reaches the OS before append returns.
        self.writer.flush().map_err(io_err)?;
        Ok(())
    }

    fn load_all_entries(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        Self::read_all(&self.path)
    }
}
