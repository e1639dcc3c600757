//! # Registry Manager
//!
//! Implements the registry operations against a [`LedgerStore`], keeping the
//! id index in step with record creation and deletion.
//!
//! ## Consistency model
//!
//! The ledger offers no multi-key transactions, so a title and its index
//! entry are always written by two separate calls:
//!
//! - `create_title` writes the record, then appends the id to the index.
//! - `delete_title` deletes the record, then removes the first matching id.
//!
//! If the second call fails after the first committed, the operation returns
//! [`LedgerError::PartialFailure`] and logs at error level. There is no
//! rollback; operators reconcile with [`Registry::audit`].
//!
//! Every read-modify-write (the index, and records under update/transfer)
//! is a versioned compare-and-swap retried up to `max_cas_retries` times, so
//! concurrent writers never silently undo each other.

use crate::codec::{
    self, TitleRecord, decode_index, decode_record, encode_index, encode_record,
    validate_field, validate_title_id,
};
use crate::primitives::{
    DEFAULT_CAS_RETRIES, INDEX_KEY, LEGACY_SEED_KEY, MAX_CAS_RETRIES, MAX_KEY_LENGTH,
    MAX_VALUE_LENGTH, TRANSFER_ARG_COUNT, UPDATE_ARG_COUNT,
};
use crate::storage::LedgerStore;
use crate::{CreatePolicy, LedgerError, Versioned};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Tunable registry behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// What creation does when the id is already present.
    pub create_policy: CreatePolicy,
    /// Compare-and-swap attempts per read-modify-write.
    pub max_cas_retries: u32,
    /// Key for the legacy smoke-test value. `None` skips the write.
    pub legacy_seed_key: Option<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            create_policy: CreatePolicy::Upsert,
            max_cas_retries: DEFAULT_CAS_RETRIES,
            legacy_seed_key: Some(LEGACY_SEED_KEY.to_string()),
        }
    }
}

impl RegistryConfig {
    /// Check the configuration for values the registry cannot run with.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.max_cas_retries == 0 || self.max_cas_retries > MAX_CAS_RETRIES {
            return Err(LedgerError::Config(format!(
                "max_cas_retries must be between 1 and {}, got {}",
                MAX_CAS_RETRIES, self.max_cas_retries
            )));
        }
        if let Some(key) = &self.legacy_seed_key {
            if key.is_empty() || key == INDEX_KEY {
                return Err(LedgerError::Config(format!(
                    "legacy_seed_key '{}' is not usable",
                    key
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// AUDIT REPORT
// =============================================================================

/// Result of checking the index against the records it points to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    /// Number of index entries, duplicates included.
    pub indexed: usize,
    /// Ids present in the index with no record in the ledger.
    pub dangling: Vec<String>,
    /// Ids appearing more than once in the index, with their count.
    pub duplicates: BTreeMap<String, usize>,
}

impl AuditReport {
    /// True when every indexed id resolves to a record exactly once.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.dangling.is_empty() && self.duplicates.is_empty()
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// The registry manager: the last validation boundary before the ledger.
#[derive(Debug)]
pub struct Registry<S> {
    store: S,
    config: RegistryConfig,
}

impl<S: LedgerStore> Registry<S> {
    /// Create a registry with the default configuration.
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: RegistryConfig::default(),
        }
    }

    /// Create a registry with an explicit configuration.
    pub fn with_config(store: S, config: RegistryConfig) -> Result<Self, LedgerError> {
        config.validate()?;
        Ok(Self { store, config })
    }

    /// The underlying ledger.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The active configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    /// Reset the registry: write the legacy seed value and an empty index.
    ///
    /// Expects exactly one argument parseable as an integer. Any prior index
    /// content is discarded; records are left in place.
    pub fn initialize(&self, args: &[String]) -> Result<(), LedgerError> {
        expect_exact(args, 1)?;
        let seed: i64 = args[0].parse().map_err(|_| {
            LedgerError::Argument(format!(
                "Expecting integer value for asset holding, got '{}'",
                args[0]
            ))
        })?;

        let mut seeded = None;
        if let Some(key) = &self.config.legacy_seed_key {
            self.store
                .put(key, seed.to_string().as_bytes())
                .map_err(|e| as_write_error(key, e))?;
            seeded = Some(key.as_str());
        }

        let empty = encode_index(&[])?;
        if let Err(e) = self.store.put(INDEX_KEY, &empty) {
            let e = as_write_error(INDEX_KEY, e);
            return Err(match seeded {
                Some(key) => self.partial_failure("initialize", key, e),
                None => e,
            });
        }

        tracing::info!(seed, "registry initialized, index reset");
        Ok(())
    }

    /// Create a title from `[id, vin, make, model, rego, owner]`.
    ///
    /// Fields are lower-cased before encoding. Under [`CreatePolicy::Upsert`]
    /// an existing record is overwritten and the id appended again.
    pub fn create_title(&self, args: &[String]) -> Result<(), LedgerError> {
        let record = TitleRecord::for_creation(args)?;
        let id = record.id.as_str();
        let bytes = encode_record(&record)?;

        tracing::debug!(id, owner = %record.owner, "creating title");

        match self.config.create_policy {
            CreatePolicy::Upsert => {
                self.store
                    .put(id, &bytes)
                    .map_err(|e| as_write_error(id, e))?;
            }
            CreatePolicy::CreateOnly => {
                let inserted = self
                    .store
                    .put_if_version(id, None, &bytes)
                    .map_err(|e| as_write_error(id, e))?;
                if !inserted {
                    return Err(LedgerError::AlreadyExists(id.to_string()));
                }
            }
        }

        self.modify_index(|ids| {
            ids.push(id.to_string());
            true
        })
        .map_err(|e| self.partial_failure("init_title", id, e))?;

        tracing::info!(id, "title created");
        Ok(())
    }

    /// Overwrite vin, make, model and rego of an existing title, verbatim.
    ///
    /// Expects at least `[id, vin, make, model, rego]`; extra arguments are
    /// ignored. The index is not touched.
    pub fn update_title(&self, args: &[String]) -> Result<(), LedgerError> {
        expect_at_least(args, UPDATE_ARG_COUNT)?;
        let id = args[0].as_str();
        validate_title_id(id)?;
        for field in &args[1..UPDATE_ARG_COUNT] {
            validate_field(field)?;
        }

        tracing::debug!(id, "updating title");
        self.modify_record(id, |record| {
            record.apply_update(&args[1], &args[2], &args[3], &args[4]);
        })?;
        tracing::info!(id, "title updated");
        Ok(())
    }

    /// Replace the owner of an existing title, verbatim.
    ///
    /// Expects at least `[id, new_owner]`. The index is not touched.
    pub fn transfer_owner(&self, args: &[String]) -> Result<(), LedgerError> {
        expect_at_least(args, TRANSFER_ARG_COUNT)?;
        let id = args[0].as_str();
        let owner = args[1].as_str();
        validate_title_id(id)?;
        validate_field(owner)?;

        tracing::debug!(id, owner, "transferring title");
        self.modify_record(id, |record| record.apply_transfer(owner))?;
        tracing::info!(id, owner, "title transferred");
        Ok(())
    }

    /// Delete a title and drop the first matching index entry.
    ///
    /// Deleting an absent id succeeds and leaves the index unchanged.
    pub fn delete_title(&self, args: &[String]) -> Result<(), LedgerError> {
        expect_exact(args, 1)?;
        let id = args[0].as_str();
        validate_title_id(id)?;

        self.store.delete(id).map_err(|e| match e {
            LedgerError::Delete { .. } => e,
            other => LedgerError::Delete {
                key: id.to_string(),
                reason: other.to_string(),
            },
        })?;

        let removed = self
            .modify_index(|ids| codec::remove_first(ids, id))
            .map_err(|e| self.partial_failure("delete", id, e))?;

        tracing::info!(id, removed_from_index = removed, "title deleted");
        Ok(())
    }

    /// Write `[key, value]` verbatim, bypassing record structure.
    pub fn raw_write(&self, args: &[String]) -> Result<(), LedgerError> {
        expect_exact(args, 2)?;
        let key = args[0].as_str();
        let value = args[1].as_str();
        validate_raw_key(key)?;
        if value.len() > MAX_VALUE_LENGTH {
            return Err(LedgerError::Argument(format!(
                "Value length {} exceeds maximum {} bytes",
                value.len(),
                MAX_VALUE_LENGTH
            )));
        }

        if key == INDEX_KEY {
            tracing::warn!("raw write is replacing the id index");
        }
        self.store
            .put(key, value.as_bytes())
            .map_err(|e| as_write_error(key, e))?;
        tracing::debug!(key, bytes = value.len(), "raw write");
        Ok(())
    }

    /// Return the raw bytes stored at `[key]`.
    pub fn raw_read(&self, args: &[String]) -> Result<Vec<u8>, LedgerError> {
        expect_exact(args, 1)?;
        let key = args[0].as_str();
        validate_raw_key(key)?;
        Ok(self.fetch(key)?.bytes)
    }

    // -------------------------------------------------------------------------
    // Read helpers
    // -------------------------------------------------------------------------

    /// The decoded id index, in insertion order.
    pub fn title_ids(&self) -> Result<Vec<String>, LedgerError> {
        match self.store.get(INDEX_KEY)? {
            Some(bytes) => decode_index(&bytes),
            None => Ok(Vec::new()),
        }
    }

    /// The decoded record stored at `id`.
    pub fn read_title(&self, id: &str) -> Result<TitleRecord, LedgerError> {
        validate_title_id(id)?;
        decode_record(&self.fetch(id)?.bytes)
    }

    /// Check that every indexed id resolves to exactly one record.
    ///
    /// Orphan records (a record with no index entry) cannot be detected: the
    /// ledger has no scan primitive.
    pub fn audit(&self) -> Result<AuditReport, LedgerError> {
        let ids = self.title_ids()?;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for id in &ids {
            *counts.entry(id.as_str()).or_default() += 1;
        }

        let mut report = AuditReport {
            indexed: ids.len(),
            ..AuditReport::default()
        };
        for (id, count) in counts {
            if self.store.get(id)?.is_none() {
                report.dangling.push(id.to_string());
            }
            if count > 1 {
                report.duplicates.insert(id.to_string(), count);
            }
        }

        if !report.is_consistent() {
            tracing::warn!(
                dangling = report.dangling.len(),
                duplicates = report.duplicates.len(),
                "index audit found inconsistencies"
            );
        }
        Ok(report)
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Read `key`, treating a failed read the same as an absent key.
    fn fetch(&self, key: &str) -> Result<Versioned, LedgerError> {
        match self.store.get_versioned(key) {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(LedgerError::NotFound(key.to_string())),
            Err(e) => {
                tracing::warn!(key, error = %e, "ledger read failed");
                Err(LedgerError::NotFound(key.to_string()))
            }
        }
    }

    /// Compare-and-swap loop over the id index.
    ///
    /// `mutate` returns false to leave the index as it is; no write happens
    /// then and the call returns `Ok(false)`.
    fn modify_index(
        &self,
        mut mutate: impl FnMut(&mut Vec<String>) -> bool,
    ) -> Result<bool, LedgerError> {
        for attempt in 1..=self.config.max_cas_retries {
            let current = self.store.get_versioned(INDEX_KEY)?;
            let (expected, mut ids) = match current {
                Some(value) => (Some(value.version), decode_index(&value.bytes)?),
                None => (None, Vec::new()),
            };

            if !mutate(&mut ids) {
                return Ok(false);
            }

            let bytes = encode_index(&ids)?;
            let written = self
                .store
                .put_if_version(INDEX_KEY, expected, &bytes)
                .map_err(|e| as_write_error(INDEX_KEY, e))?;
            if written {
                return Ok(true);
            }
            tracing::warn!(attempt, "index changed concurrently, retrying");
        }

        Err(LedgerError::Conflict {
            key: INDEX_KEY.to_string(),
            attempts: self.config.max_cas_retries,
        })
    }

    /// Compare-and-swap loop over one existing record.
    fn modify_record(
        &self,
        id: &str,
        mut mutate: impl FnMut(&mut TitleRecord),
    ) -> Result<(), LedgerError> {
        for attempt in 1..=self.config.max_cas_retries {
            let current = self.fetch(id)?;
            let mut record = decode_record(&current.bytes)?;
            mutate(&mut record);

            let bytes = encode_record(&record)?;
            let written = self
                .store
                .put_if_version(id, Some(current.version), &bytes)
                .map_err(|e| as_write_error(id, e))?;
            if written {
                return Ok(());
            }
            tracing::warn!(id, attempt, "record changed concurrently, retrying");
        }

        Err(LedgerError::Conflict {
            key: id.to_string(),
            attempts: self.config.max_cas_retries,
        })
    }

    fn partial_failure(&self, operation: &'static str, key: &str, e: LedgerError) -> LedgerError {
        tracing::error!(
            operation,
            key,
            error = %e,
            "operation partially applied; ledger needs reconciliation"
        );
        LedgerError::partial(operation, key, e)
    }
}

// =============================================================================
// ARGUMENT HELPERS
// =============================================================================

fn expect_exact(args: &[String], count: usize) -> Result<(), LedgerError> {
    if args.len() != count {
        return Err(LedgerError::Argument(format!(
            "Incorrect number of arguments. Expecting {}, got {}",
            count,
            args.len()
        )));
    }
    Ok(())
}

fn expect_at_least(args: &[String], count: usize) -> Result<(), LedgerError> {
    if args.len() < count {
        return Err(LedgerError::Argument(format!(
            "Incorrect number of arguments. Expecting {}, got {}",
            count,
            args.len()
        )));
    }
    Ok(())
}

fn validate_raw_key(key: &str) -> Result<(), LedgerError> {
    if key.is_empty() {
        return Err(LedgerError::Argument("key must be a non-empty string".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(LedgerError::Argument(format!(
            "Key length {} exceeds maximum {} bytes",
            key.len(),
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

/// Normalize a store failure on a mutation into [`LedgerError::Write`].
fn as_write_error(key: &str, e: LedgerError) -> LedgerError {
    match e {
        LedgerError::Write { .. } => e,
        other => LedgerError::Write {
            key: key.to_string(),
            reason: other.to_string(),
        },
    }
}

// =============================================================================
// TESTS
// =============================================================================
