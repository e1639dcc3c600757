//! # Ledger Storage
//!
//! The key-value ledger the registry runs against.
//!
//! The registry only sees the [`LedgerStore`] trait: single-key get, put and
//! delete, plus a version-stamped read and a conditional write. There are no
//! multi-key transactions and no scan primitive.
//!
//! Two backends are provided:
//! - [`MemoryLedger`]: a `BTreeMap` behind a lock (tests, ephemeral servers)
//! - [`RedbLedger`]: a redb database file (durable, ACID per call)

mod memory;
mod redb_ledger;

pub use memory::MemoryLedger;
pub use redb_ledger::RedbLedger;

use crate::{LedgerError, Versioned};
use serde::{Deserialize, Serialize};

// =============================================================================
// LEDGERSTORE TRAIT
// =============================================================================

/// Single-key operations against the ledger.
///
/// Each call is atomic on its own. Nothing is atomic across calls.
///
/// Every successful write bumps the key's version. Versions are kept across
/// deletes, so a delete followed by a put is never mistaken for "unchanged"
/// by a concurrent conditional writer.
pub trait LedgerStore: Send + Sync {
    /// Read the bytes at `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError>;

    /// Unconditionally write `bytes` at `key`.
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), LedgerError>;

    /// Remove `key`. Removing an absent key succeeds.
    fn delete(&self, key: &str) -> Result<(), LedgerError>;

    /// Read the bytes at `key` with the version they were written at.
    fn get_versioned(&self, key: &str) -> Result<Option<Versioned>, LedgerError>;

    /// Write `bytes` at `key` only if the key is still at `expected`.
    ///
    /// `expected = None` requires the key to be absent. Returns `Ok(false)`
    /// when the precondition does not hold and nothing was written.
    fn put_if_version(
        &self,
        key: &str,
        expected: Option<u64>,
        bytes: &[u8],
    ) -> Result<bool, LedgerError>;
}

impl<S: LedgerStore + ?Sized> LedgerStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        (**self).get(key)
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), LedgerError> {
        (**self).put(key, bytes)
    }

    fn delete(&self, key: &str) -> Result<(), LedgerError> {
        (**self).delete(key)
    }

    fn get_versioned(&self, key: &str) -> Result<Option<Versioned>, LedgerError> {
        (**self).get_versioned(key)
    }

    fn put_if_version(
        &self,
        key: &str,
        expected: Option<u64>,
        bytes: &[u8],
    ) -> Result<bool, LedgerError> {
        (**self).put_if_version(key, expected, bytes)
    }
}

// =============================================================================
// SLOT
// =============================================================================

/// Per-key storage cell shared by both backends.
///
/// A deleted key keeps its slot as a tombstone (`bytes = None`) so that its
/// version keeps increasing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Slot {
    pub(crate) version: u64,
    pub(crate) bytes: Option<Vec<u8>>,
}

impl Slot {
    /// The live value, if any.
    pub(crate) fn live(&self) -> Option<Versioned> {
        self.bytes
            .as_ref()
            .map(|b| Versioned::new(self.version, b.clone()))
    }

    /// Whether a conditional write expecting `expected` may proceed.
    pub(crate) fn matches(&self, expected: Option<u64>) -> bool {
        match (expected, &self.bytes) {
            (None, None) => true,
            (Some(v), Some(_)) => v == self.version,
            _ => false,
        }
    }

    /// Store `bytes` and bump the version.
    pub(crate) fn write(&mut self, bytes: &[u8]) {
        self.version = self.version.saturating_add(1);
        self.bytes = Some(bytes.to_vec());
    }

    /// Turn the slot into a tombstone. Returns false if it already was one.
    pub(crate) fn clear(&mut self) -> bool {
        if self.bytes.is_none() {
            return false;
        }
        self.version = self.version.saturating_add(1);
        self.bytes = None;
        true
    }
}
