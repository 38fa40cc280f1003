//! # Ledger Contract
//!
//! The key-value interface the lifecycle operations are written against,
//! plus the two pieces every backend shares: composite keys and a
//! transactional overlay.
//!
//! ## Keys
//!
//! A [`LedgerKey`] is a tuple of string parts. On disk the parts are joined
//! with a NUL byte, so `("open:did:status:", "did:example:a")` and
//! `("open:did:status:did:", "example:a")` never collide even though both
//! concatenate to the same text.
//!
//! | Record          | Parts                                               |
//! |-----------------|-----------------------------------------------------|
//! | latest document | `open:did:doc:`, did, `:latest`                     |
//! | archived version| `open:did:doc:`, did, `:versionId:`, n              |
//! | status          | `open:did:status:`, did                             |
//! | VC metadata     | `open:vcmeta:`, vc id                               |
//!
//! ## Values
//!
//! Values are JSON. The records are small and operators read them with
//! ordinary tooling, so a binary encoding buys nothing here.
//!
//! ## Atomicity
//!
//! [`LedgerTransaction`] buffers writes in memory and hands them to the
//! backend as one [`WriteBatch`] on [`LedgerTransaction::commit`]. Reads
//! through the transaction see its own staged writes. Dropping it without
//! committing discards everything.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::config::{
    DOCUMENT_KEY_PREFIX, KEY_PART_SEPARATOR, LATEST_DOCUMENT_SUFFIX, STATUS_KEY_PREFIX,
    VC_META_KEY_PREFIX, VERSIONED_DOCUMENT_SEGMENT,
};
use crate::identity::VersionId;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors from ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("key already exists: {0}")]
    AlreadyExists(String),

    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

// ---------------------------------------------------------------------------
// LedgerKey
// ---------------------------------------------------------------------------

/// A namespaced composite key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LedgerKey {
    parts: Vec<String>,
}

impl LedgerKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }

    /// The authoritative latest document of `did`.
    pub fn latest_document(did: &str) -> Self {
        Self::new([DOCUMENT_KEY_PREFIX, did, LATEST_DOCUMENT_SUFFIX])
    }

    /// An archived snapshot of `did` at `version`.
    pub fn versioned_document(did: &str, version: VersionId) -> Self {
        Self::new([
            DOCUMENT_KEY_PREFIX.to_string(),
            did.to_string(),
            VERSIONED_DOCUMENT_SEGMENT.to_string(),
            version.to_string(),
        ])
    }

    pub fn document_status(did: &str) -> Self {
        Self::new([STATUS_KEY_PREFIX, did])
    }

    pub fn vc_meta(vc_id: &str) -> Self {
        Self::new([VC_META_KEY_PREFIX, vc_id])
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// NUL-joined byte form used by storage backends.
    pub fn to_bytes(&self) -> Vec<u8> {
        let len = self.parts.iter().map(|p| p.len() + 1).sum();
        let mut out = Vec::with_capacity(len);
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push(KEY_PART_SEPARATOR);
            }
            out.extend_from_slice(part.as_bytes());
        }
        out
    }
}

impl fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts.concat())
    }
}

// ---------------------------------------------------------------------------
// Ledger trait
// ---------------------------------------------------------------------------

/// An ordered set of writes applied all-or-nothing.
#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    writes: Vec<(LedgerKey, Vec<u8>)>,
}

impl WriteBatch {
    pub fn put(&mut self, key: LedgerKey, value: Vec<u8>) {
        self.writes.push((key, value));
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn into_writes(self) -> Vec<(LedgerKey, Vec<u8>)> {
        self.writes
    }
}

/// Key-value storage for identity records.
///
/// Backends implement the two raw operations (and [`Ledger::apply_batch`]
/// when they can do better than one write at a time). The typed helpers
/// are shared.
pub trait Ledger {
    fn get_raw(&self, key: &LedgerKey) -> LedgerResult<Option<Vec<u8>>>;

    fn put_raw(&mut self, key: &LedgerKey, value: Vec<u8>) -> LedgerResult<()>;

    /// Apply every write in `batch`. The default applies them in order;
    /// persistent backends override this with a native atomic batch.
    fn apply_batch(&mut self, batch: WriteBatch) -> LedgerResult<()> {
        for (key, value) in batch.into_writes() {
            self.put_raw(&key, value)?;
        }
        Ok(())
    }

    fn exists(&self, key: &LedgerKey) -> LedgerResult<bool> {
        Ok(self.get_raw(key)?.is_some())
    }

    /// Read and decode a record. Absent keys are `Ok(None)`.
    fn find<T: DeserializeOwned>(&self, key: &LedgerKey) -> LedgerResult<Option<T>>
    where
        Self: Sized,
    {
        match self.get_raw(key)? {
            Some(bytes) => decode(key, &bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Read and decode a record, failing with `NotFound` if absent.
    fn get<T: DeserializeOwned>(&self, key: &LedgerKey) -> LedgerResult<T>
    where
        Self: Sized,
    {
        self.find(key)?
            .ok_or_else(|| LedgerError::NotFound(key.to_string()))
    }

    /// Write a record, replacing any previous value.
    fn put<T: Serialize>(&mut self, key: &LedgerKey, value: &T) -> LedgerResult<()>
    where
        Self: Sized,
    {
        let bytes =
            serde_json::to_vec(value).map_err(|e| LedgerError::Serialization(e.to_string()))?;
        self.put_raw(key, bytes)
    }

    /// Write a record that must not exist yet.
    fn insert<T: Serialize>(&mut self, key: &LedgerKey, value: &T) -> LedgerResult<()>
    where
        Self: Sized,
    {
        if self.exists(key)? {
            return Err(LedgerError::AlreadyExists(key.to_string()));
        }
        self.put(key, value)
    }
}

fn decode<T: DeserializeOwned>(key: &LedgerKey, bytes: &[u8]) -> LedgerResult<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| LedgerError::Serialization(format!("{key}: {e}")))
}

// ---------------------------------------------------------------------------
// MemoryLedger
// ---------------------------------------------------------------------------

/// In-memory ledger for tests and tooling.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryLedger {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Ledger for MemoryLedger {
    fn get_raw(&self, key: &LedgerKey) -> LedgerResult<Option<Vec<u8>>> {
        Ok(self.entries.get(&key.to_bytes()).cloned())
    }

    fn put_raw(&mut self, key: &LedgerKey, value: Vec<u8>) -> LedgerResult<()> {
        self.entries.insert(key.to_bytes(), value);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// LedgerTransaction
// ---------------------------------------------------------------------------

/// A write-buffering view over another ledger.
pub struct LedgerTransaction<'a, L: Ledger> {
    inner: &'a mut L,
    staged: BTreeMap<Vec<u8>, (LedgerKey, Vec<u8>)>,
}

impl<'a, L: Ledger> LedgerTransaction<'a, L> {
    pub fn new(inner: &'a mut L) -> Self {
        Self {
            inner,
            staged: BTreeMap::new(),
        }
    }

    /// Number of distinct keys written so far.
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    /// Hand every staged write to the underlying ledger as one batch.
    pub fn commit(self) -> LedgerResult<()> {
        if self.staged.is_empty() {
            return Ok(());
        }
        let mut batch = WriteBatch::default();
        for (_, (key, value)) in self.staged {
            batch.put(key, value);
        }
        self.inner.apply_batch(batch)
    }
}

impl<L: Ledger> Ledger for LedgerTransaction<'_, L> {
    fn get_raw(&self, key: &LedgerKey) -> LedgerResult<Option<Vec<u8>>> {
        match self.staged.get(&key.to_bytes()) {
            Some((_, value)) => Ok(Some(value.clone())),
            None => self.inner.get_raw(key),
        }
    }

    fn put_raw(&mut self, key: &LedgerKey, value: Vec<u8>) -> LedgerResult<()> {
        self.staged.insert(key.to_bytes(), (key.clone(), value));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn v(n: u64) -> VersionId {
        VersionId::new(n).unwrap()
    }

    #[test]
    fn key_bytes_are_nul_separated() {
        let key = LedgerKey::document_status("did:example:a");
        assert_eq!(key.to_bytes(), b"open:did:status:\0did:example:a".to_vec());
        assert_eq!(key.to_string(), "open:did:status:did:example:a");
    }

    #[test]
    fn shifted_part_boundaries_do_not_collide() {
        let a = LedgerKey::new(["open:did:status:", "did:example:a"]);
        let b = LedgerKey::new(["open:did:status:did:", "example:a"]);
        assert_eq!(a.to_string(), b.to_string());
        assert_ne!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn document_keys_are_distinct_per_version() {
        let latest = LedgerKey::latest_document("did:example:a");
        let v1 = LedgerKey::versioned_document("did:example:a", v(1));
        let v10 = LedgerKey::versioned_document("did:example:a", v(10));
        assert_ne!(latest, v1);
        assert_ne!(v1, v10);
        assert_eq!(v10.parts()[3], "10");
    }

    #[test]
    fn typed_put_get_round_trip() {
        let mut ledger = MemoryLedger::new();
        let key = LedgerKey::vc_meta("vc:1");
        ledger.put(&key, &vec!["a", "b"]).unwrap();
        let back: Vec<String> = ledger.get(&key).unwrap();
        assert_eq!(back, vec!["a", "b"]);
    }

    #[test]
    fn get_missing_is_not_found_and_find_is_none() {
        let ledger = MemoryLedger::new();
        let key = LedgerKey::vc_meta("missing");
        assert!(matches!(ledger.get::<String>(&key), Err(LedgerError::NotFound(_))));
        assert!(ledger.find::<String>(&key).unwrap().is_none());
        assert!(!ledger.exists(&key).unwrap());
    }

    #[test]
    fn insert_refuses_existing_key() {
        let mut ledger = MemoryLedger::new();
        let key = LedgerKey::vc_meta("vc:1");
        ledger.insert(&key, &1u32).unwrap();
        assert!(matches!(
            ledger.insert(&key, &2u32),
            Err(LedgerError::AlreadyExists(_))
        ));
        ledger.put(&key, &3u32).unwrap();
        assert_eq!(ledger.get::<u32>(&key).unwrap(), 3);
    }

    #[test]
    fn corrupt_value_is_a_serialization_error() {
        let mut ledger = MemoryLedger::new();
        let key = LedgerKey::vc_meta("vc:1");
        ledger.put_raw(&key, b"not json".to_vec()).unwrap();
        assert!(matches!(
            ledger.get::<u32>(&key),
            Err(LedgerError::Serialization(_))
        ));
    }

    #[test]
    fn transaction_reads_its_own_writes() {
        let mut ledger = MemoryLedger::new();
        let key = LedgerKey::vc_meta("vc:1");
        let mut tx = LedgerTransaction::new(&mut ledger);
        tx.insert(&key, &"staged").unwrap();
        assert_eq!(tx.get::<String>(&key).unwrap(), "staged");
        assert!(matches!(tx.insert(&key, &"again"), Err(LedgerError::AlreadyExists(_))));
        tx.commit().unwrap();
        assert_eq!(ledger.get::<String>(&key).unwrap(), "staged");
    }

    #[test]
    fn dropped_transaction_writes_nothing() {
        let mut ledger = MemoryLedger::new();
        {
            let mut tx = LedgerTransaction::new(&mut ledger);
            tx.put(&LedgerKey::vc_meta("vc:1"), &1u8).unwrap();
            tx.put(&LedgerKey::vc_meta("vc:2"), &2u8).unwrap();
            assert_eq!(tx.staged_len(), 2);
        }
        assert!(ledger.is_empty());
    }

    #[test]
    fn repeated_writes_to_one_key_keep_the_last() {
        let mut ledger = MemoryLedger::new();
        let key = LedgerKey::vc_meta("vc:1");
        let mut tx = LedgerTransaction::new(&mut ledger);
        tx.put(&key, &1u8).unwrap();
        tx.put(&key, &2u8).unwrap();
        assert_eq!(tx.staged_len(), 1);
        tx.commit().unwrap();
        assert_eq!(ledger.get::<u8>(&key).unwrap(), 2);
        assert_eq!(ledger.len(), 1);
    }
}
