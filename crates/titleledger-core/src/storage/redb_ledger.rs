//! # redb-backed Ledger
//!
//! A disk-backed ledger using the redb embedded database.
//!
//! All keys live in one table. Each value is a postcard-encoded [`Slot`]
//! carrying the version stamp next to the bytes, so conditional writes can
//! compare and write inside a single redb write transaction.
//!
//! Every trait call opens and commits its own transaction. That matches the
//! collaborator contract (single-key atomicity, nothing across calls) and
//! leaves cross-key consistency to the registry.

use super::{LedgerStore, Slot};
use crate::{LedgerError, Versioned};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;

/// Table for ledger state: key -> postcard-encoded `Slot`
const LEDGER_STATE: TableDefinition<&str, &[u8]> = TableDefinition::new("ledger_state");

/// A durable ledger stored in a redb file.
pub struct RedbLedger {
    db: Database,
}

impl std::fmt::Debug for RedbLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbLedger").finish_non_exhaustive()
    }
}

fn io_err(e: impl std::fmt::Display) -> LedgerError {
    LedgerError::Io(e.to_string())
}

fn read_err(e: impl std::fmt::Display) -> LedgerError {
    LedgerError::Store(e.to_string())
}

fn encode_slot(slot: &Slot) -> Result<Vec<u8>, LedgerError> {
    postcard::to_allocvec(slot).map_err(|e| LedgerError::Serialization(e.to_string()))
}

fn decode_slot(bytes: &[u8]) -> Result<Slot, LedgerError> {
    postcard::from_bytes(bytes).map_err(|e| LedgerError::Decode(format!("ledger slot: {}", e)))
}

impl RedbLedger {
    /// Open or create a ledger database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize the table if it doesn't exist
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(LEDGER_STATE).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        Ok(Self { db })
    }

    /// Live keys in ascending order.
    pub fn keys(&self) -> Result<Vec<String>, LedgerError> {
        let read_txn = self.db.begin_read().map_err(read_err)?;
        let table = read_txn.open_table(LEDGER_STATE).map_err(read_err)?;

        let mut keys = Vec::new();
        for entry in table.iter().map_err(read_err)? {
            let (key, value) = entry.map_err(read_err)?;
            if decode_slot(value.value())?.bytes.is_some() {
                keys.push(key.value().to_string());
            }
        }
        Ok(keys)
    }

    fn read_slot(&self, key: &str) -> Result<Option<Slot>, LedgerError> {
        let read_txn = self.db.begin_read().map_err(read_err)?;
        let table = read_txn.open_table(LEDGER_STATE).map_err(read_err)?;
        table
            .get(key)
            .map_err(read_err)?
            .map(|data| decode_slot(data.value()))
            .transpose()
    }

    /// Run `update` against the key's slot inside one write transaction.
    ///
    /// The slot is written back only when `update` returns true.
    fn update_slot(
        &self,
        key: &str,
        update: impl FnOnce(&mut Slot) -> bool,
        on_err: impl Fn(String) -> LedgerError,
    ) -> Result<bool, LedgerError> {
        let write_txn = self.db.begin_write().map_err(|e| on_err(e.to_string()))?;
        let changed = {
            let mut table = write_txn
                .open_table(LEDGER_STATE)
                .map_err(|e| on_err(e.to_string()))?;
            let mut slot = match table.get(key).map_err(|e| on_err(e.to_string()))? {
                Some(data) => decode_slot(data.value())?,
                None => Slot::default(),
            };
            let changed = update(&mut slot);
            if changed {
                let encoded = encode_slot(&slot)?;
                table
                    .insert(key, encoded.as_slice())
                    .map_err(|e| on_err(e.to_string()))?;
            }
            changed
        };
        write_txn.commit().map_err(|e| on_err(e.to_string()))?;
        Ok(changed)
    }
}

impl LedgerStore for RedbLedger {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        Ok(self.read_slot(key)?.and_then(|slot| slot.bytes))
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), LedgerError> {
        self.update_slot(
            key,
            |slot| {
                slot.write(bytes);
                true
            },
            |reason| LedgerError::Write {
                key: key.to_string(),
                reason,
            },
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), LedgerError> {
        self.update_slot(key, Slot::clear, |reason| LedgerError::Delete {
            key: key.to_string(),
            reason,
        })?;
        Ok(())
    }

    fn get_versioned(&self, key: &str) -> Result<Option<Versioned>, LedgerError> {
        Ok(self.read_slot(key)?.and_then(|slot| slot.live()))
    }

    fn put_if_version(
        &self,
        key: &str,
        expected: Option<u64>,
        bytes: &[u8],
    ) -> Result<bool, LedgerError> {
        self.update_slot(
            key,
            |slot| {
                if !slot.matches(expected) {
                    return false;
                }
                slot.write(bytes);
                true
            },
            |reason| LedgerError::Write {
                key: key.to_string(),
                reason,
            },
        )
    }
}
