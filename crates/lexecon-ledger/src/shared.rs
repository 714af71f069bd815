// shared.rs — A ledger chain shared between threads.
//
// `append` reads the head hash, builds an entry, and pushes it. Two
// unguarded appends could both read the same head and fork the chain, so
// every access goes through one mutex. A poisoned lock is reported as an
// error instead of panicking the caller.

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{Map, Value};

use crate::chain::LedgerChain;
use crate::entry::LedgerEntry;
use crate::error::LedgerError;
use crate::report::{AuditReport, IntegrityReport};

/// Cloneable handle to a mutex-guarded [`LedgerChain`].
#[derive(Debug, Clone)]
pub struct SharedLedger {
    inner: Arc<Mutex<LedgerChain>>,
}

impl SharedLedger {
    pub fn new(chain: LedgerChain) -> Self {
        Self {
            inner: Arc::new(Mutex::new(chain)),
        }
    }

    /// Append under the lock and return a copy of the new entry.
    pub fn append(
        &self,
        event_type: impl Into<String>,
        data: Map<String, Value>,
    ) -> Result<LedgerEntry, LedgerError> {
        let mut chain = self.lock()?;
        Ok(chain.append(event_type, data).clone())
    }

    pub fn verify_integrity(&self) -> Result<IntegrityReport, LedgerError> {
        Ok(self.lock()?.verify_integrity())
    }

    pub fn generate_audit_report(&self) -> Result<AuditReport, LedgerError> {
        Ok(self.lock()?.generate_audit_report())
    }

    pub fn len(&self) -> Result<usize, LedgerError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.lock()?.is_empty())
    }

    /// Run a read-only closure against the chain while holding the lock.
    pub fn read<R>(&self, f: impl FnOnce(&LedgerChain) -> R) -> Result<R, LedgerError> {
        let chain = self.lock()?;
        Ok(f(&chain))
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerChain>, LedgerError> {
        self.inner
            .lock()
            .map_err(|e| LedgerError::LockPoisoned(e.to_string()))
    }
}

impl From<LedgerChain> for SharedLedger {
    fn from(chain: LedgerChain) -> Self {
        Self::new(chain)
    }
}
