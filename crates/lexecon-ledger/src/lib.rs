//! # lexecon-ledger
//!
//! Hash-chained, append-only audit ledger for Lexecon.
//!
//! Every decision (or any other event) is recorded as a [`LedgerEntry`].
//! Each entry's hash covers its own content and its predecessor's hash, so
//! editing, reordering, or splicing entries is detected by
//! [`LedgerChain::verify_integrity`]. Persisted entries are re-verified on
//! load and rejected if their stored hash disagrees.
//!
//! ## Quick Example
//!
//! ```rust
//! use lexecon_ledger::LedgerChain;
//! use serde_json::{json, Map};
//!
//! let mut ledger = LedgerChain::new();
//! let mut data = Map::new();
//! data.insert("decision".to_string(), json!("allow"));
//! ledger.append("decision", data);
//!
//! assert!(ledger.verify_integrity().valid);
//! ```

pub mod chain;
pub mod entry;
pub mod error;
pub mod hasher;
pub mod report;
pub mod shared;
pub mod storage;

pub use chain::{LedgerChain, LedgerSnapshot, GENESIS_ID};
pub use entry::LedgerEntry;
pub use error::LedgerError;
pub use report::{AuditReport, IntegrityFailure, IntegrityReport};
pub use shared::SharedLedger;
pub use storage::{JsonlStorage, LedgerStorage, MemoryStorage};
