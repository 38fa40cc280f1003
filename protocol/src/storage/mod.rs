//! # Storage Module
//!
//! Where identity records live between requests.
//!
//! ## Architecture
//!
//! ```text
//! - `ledger.rs`: Ledger trait, composite keys, in-memory ledger, transactions
//! - `db.rs`: sled persistence (state + meta trees)
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! lifecycle operation → LedgerTransaction → WriteBatch → LedgerDb / MemoryLedger
//!                        (staged writes)     (commit)      (state tree)
//! ```
//!
//! The lifecycle code never writes to a backend directly. It stages into a
//! transaction and commits once every check has passed, so a rejected
//! request leaves no trace.

pub mod db;
pub mod ledger;

pub use db::LedgerDb;
pub use ledger::{
    Ledger, LedgerError, LedgerKey, LedgerResult, LedgerTransaction, MemoryLedger, WriteBatch,
};
