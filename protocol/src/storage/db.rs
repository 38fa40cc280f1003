//! # LedgerDb: Persistent Storage Engine
//!
//! The on-disk [`Ledger`], built on sled's embedded key-value store. All
//! identity records a node keeps flow through this module.
//!
//! ## Tree Layout
//!
//! sled organizes data into named "trees", each an independent B+ tree
//! with its own keyspace:
//!
//! | Tree    | Key                          | Value              |
//! |---------|------------------------------|--------------------|
//! | `state` | NUL-joined [`LedgerKey`]     | JSON record        |
//! | `meta`  | key (UTF-8)                  | value (UTF-8)      |
//!
//! `meta` records which contract and protocol version created the
//! database the first time it is opened.
//!
//! ## Atomicity
//!
//! [`Ledger::apply_batch`] becomes a single sled `Batch` on the `state`
//! tree followed by a flush. Either every write of a lifecycle operation
//! lands on disk or none does.

use sled::{Batch, Db, Tree};
use std::path::Path;

use super::ledger::{Ledger, LedgerError, LedgerKey, LedgerResult, WriteBatch};
use crate::config::{CONTRACT_NAME, PROTOCOL_VERSION};

// ---------------------------------------------------------------------------
// Metadata Keys
// ---------------------------------------------------------------------------

const META_CONTRACT: &[u8] = b"contract";
const META_PROTOCOL_VERSION: &[u8] = b"protocol_version";

// ---------------------------------------------------------------------------
// LedgerDb
// ---------------------------------------------------------------------------

/// sled-backed ledger.
///
/// # Thread Safety
///
/// sled trees are safe to share, but the [`Ledger`] trait takes `&mut self`
/// for writes. The node wraps a `LedgerDb` in a mutex so lifecycle
/// operations run one at a time.
#[derive(Debug, Clone)]
pub struct LedgerDb {
    db: Db,
    state: Tree,
    meta: Tree,
}

impl LedgerDb {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> LedgerResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database that is removed when dropped.
    pub fn open_temporary() -> LedgerResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> LedgerResult<Self> {
        let state = db.open_tree("state")?;
        let meta = db.open_tree("meta")?;

        if meta.get(META_CONTRACT)?.is_none() {
            meta.insert(META_CONTRACT, CONTRACT_NAME.as_bytes())?;
            meta.insert(META_PROTOCOL_VERSION, PROTOCOL_VERSION.as_bytes())?;
        }

        Ok(Self { db, state, meta })
    }

    /// The contract name recorded when the database was created.
    pub fn contract_name(&self) -> LedgerResult<Option<String>> {
        self.meta_string(META_CONTRACT)
    }

    /// The protocol version recorded when the database was created.
    pub fn created_by_version(&self) -> LedgerResult<Option<String>> {
        self.meta_string(META_PROTOCOL_VERSION)
    }

    fn meta_string(&self, key: &[u8]) -> LedgerResult<Option<String>> {
        match self.meta.get(key)? {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|e| LedgerError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    /// Number of records in the `state` tree.
    pub fn record_count(&self) -> usize {
        self.state.len()
    }

    /// Block until all pending writes are durable.
    pub fn flush(&self) -> LedgerResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl Ledger for LedgerDb {
    fn get_raw(&self, key: &LedgerKey) -> LedgerResult<Option<Vec<u8>>> {
        Ok(self.state.get(key.to_bytes())?.map(|v| v.to_vec()))
    }

    fn put_raw(&mut self, key: &LedgerKey, value: Vec<u8>) -> LedgerResult<()> {
        self.state.insert(key.to_bytes(), value)?;
        Ok(())
    }

    fn apply_batch(&mut self, batch: WriteBatch) -> LedgerResult<()> {
        let mut sled_batch = Batch::default();
        for (key, value) in batch.into_writes() {
            sled_batch.insert(key.to_bytes(), value);
        }
        self.state.apply_batch(sled_batch)?;
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
