//! In-memory ledger backend.

use super::{LedgerStore, Slot};
use crate::{LedgerError, Versioned};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A volatile ledger keeping every key in a `BTreeMap`.
///
/// Safe to share across threads; each trait call holds the lock for exactly
/// one key operation, like a networked single-key store would.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    slots: RwLock<BTreeMap<String, Slot>>,
}

impl MemoryLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Live keys in ascending order.
    pub fn keys(&self) -> Result<Vec<String>, LedgerError> {
        Ok(self
            .read()?
            .iter()
            .filter(|(_, slot)| slot.bytes.is_some())
            .map(|(key, _)| key.clone())
            .collect())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Slot>>, LedgerError> {
        self.slots
            .read()
            .map_err(|_| LedgerError::Store("memory ledger lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Slot>>, LedgerError> {
        self.slots
            .write()
            .map_err(|_| LedgerError::Store("memory ledger lock poisoned".to_string()))
    }
}

impl LedgerStore for MemoryLedger {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        Ok(self.read()?.get(key).and_then(|slot| slot.bytes.clone()))
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), LedgerError> {
        self.write()?.entry(key.to_string()).or_default().write(bytes);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), LedgerError> {
        if let Some(slot) = self.write()?.get_mut(key) {
            slot.clear();
        }
        Ok(())
    }

    fn get_versioned(&self, key: &str) -> Result<Option<Versioned>, LedgerError> {
        Ok(self.read()?.get(key).and_then(Slot::live))
    }

    fn put_if_version(
        &self,
        key: &str,
        expected: Option<u64>,
        bytes: &[u8],
    ) -> Result<bool, LedgerError> {
        let mut slots = self.write()?;
        let slot = slots.entry(key.to_string()).or_default();
        if !slot.matches(expected) {
            return Ok(false);
        }
        slot.write(bytes);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_delete() {
        let ledger = MemoryLedger::new();
        assert_eq!(ledger.get("k").expect("get"), None);

        ledger.put("k", b"v").expect("put");
        assert_eq!(ledger.get("k").expect("get"), Some(b"v".to_vec()));

        ledger.delete("k").expect("delete");
        assert_eq!(ledger.get("k").expect("get"), None);

        // Deleting an absent key is not an error.
        ledger.delete("missing").expect("delete missing");
    }

    #[test]
    fn conditional_write_checks_version() {
        let ledger = MemoryLedger::new();
        assert!(ledger.put_if_version("k", None, b"1").expect("cas"));
        assert!(!ledger.put_if_version("k", None, b"2").expect("cas"));

        let current = ledger.get_versioned("k").expect("get").expect("present");
        assert!(!ledger
            .put_if_version("k", Some(current.version + 1), b"3")
            .expect("cas"));
        assert!(ledger
            .put_if_version("k", Some(current.version), b"3")
            .expect("cas"));
        assert_eq!(ledger.get("k").expect("get"), Some(b"3".to_vec()));
    }

    #[test]
    fn keys_skip_tombstones() {
        let ledger = MemoryLedger::new();
        ledger.put("b", b"1").expect("put");
        ledger.put("a", b"1").expect("put");
        ledger.delete("b").expect("delete");
        assert_eq!(ledger.keys().expect("keys"), vec!["a".to_string()]);
    }
}
