//! # Record Codec
//!
//! Converts between the title record and the bytes persisted at its key, and
//! between the id index and the bytes persisted at [`INDEX_KEY`].
//!
//! Format:
//! - Record: a JSON object with the six string fields `id`, `vin`, `make`,
//!   `model`, `rego`, `owner`, always in that order.
//! - Index: a JSON array of strings, in insertion order.
//!
//! Encoding is deterministic, so `encode_record(decode_record(b)) == b` for
//! any `b` produced by `encode_record`.
//!
//! Decoding a record is strict about shape (the bytes must be a JSON object
//! whose present fields are strings) and lenient about presence: a missing
//! field decodes to the empty string.
//!
//! [`INDEX_KEY`]: crate::primitives::INDEX_KEY

use crate::LedgerError;
use crate::primitives::{
    CREATE_ARG_COUNT, MAX_KEY_LENGTH, MAX_VALUE_LENGTH, is_reserved_key,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// TITLE RECORD
// =============================================================================

/// One vehicle title: identity, vehicle attributes and current owner.
///
/// A plain attribute bag. There is no status or version field; presence in
/// the ledger is the only state a title has.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TitleRecord {
    /// Primary key, identical to the ledger key the record is stored at.
    #[serde(default)]
    pub id: String,
    /// Vehicle identification number.
    #[serde(default)]
    pub vin: String,
    #[serde(default)]
    pub make: String,
    #[serde(default)]
    pub model: String,
    /// Registration code.
    #[serde(default)]
    pub rego: String,
    #[serde(default)]
    pub owner: String,
}

impl TitleRecord {
    /// Build a record from the six positional `init_title` arguments.
    ///
    /// Validates the argument count and the non-empty id and owner, then
    /// lower-cases vin, make, model, rego and owner. The id is kept verbatim.
    pub fn for_creation(args: &[String]) -> Result<Self, LedgerError> {
        if args.len() != CREATE_ARG_COUNT {
            return Err(LedgerError::Argument(format!(
                "Incorrect number of arguments. Expecting {}, got {}",
                CREATE_ARG_COUNT,
                args.len()
            )));
        }

        validate_title_id(&args[0])?;
        if args[5].is_empty() {
            return Err(LedgerError::Argument(
                "6th argument (owner) must be a non-empty string".to_string(),
            ));
        }
        for value in &args[1..] {
            validate_field(value)?;
        }

        Ok(Self {
            id: args[0].clone(),
            vin: normalize(&args[1]),
            make: normalize(&args[2]),
            model: normalize(&args[3]),
            rego: normalize(&args[4]),
            owner: normalize(&args[5]),
        })
    }

    /// Overwrite vin, make, model and rego verbatim.
    pub fn apply_update(&mut self, vin: &str, make: &str, model: &str, rego: &str) {
        self.vin = vin.to_string();
        self.make = make.to_string();
        self.model = model.to_string();
        self.rego = rego.to_string();
    }

    /// Overwrite the owner verbatim.
    pub fn apply_transfer(&mut self, owner: &str) {
        self.owner = owner.to_string();
    }
}

/// Creation-time normalization: per-character simple lower-casing.
///
/// Each char maps to exactly one char and no context is applied, so `İ`
/// becomes `i` and a word-final `Σ` becomes `σ`.
#[must_use]
pub fn normalize(value: &str) -> String {
    value
        .chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect()
}

/// Check that `id` can name a title.
///
/// Rejects empty ids, oversized ids and ids in the reserved namespace.
pub fn validate_title_id(id: &str) -> Result<(), LedgerError> {
    if id.is_empty() {
        return Err(LedgerError::Argument(
            "1st argument (id) must be a non-empty string".to_string(),
        ));
    }
    if id.len() > MAX_KEY_LENGTH {
        return Err(LedgerError::Argument(format!(
            "Id length {} exceeds maximum {} bytes",
            id.len(),
            MAX_KEY_LENGTH
        )));
    }
    if is_reserved_key(id) {
        return Err(LedgerError::Argument(format!(
            "Id '{}' is in the reserved namespace",
            id
        )));
    }
    Ok(())
}

/// Check a single record field against the value size limit.
pub fn validate_field(value: &str) -> Result<(), LedgerError> {
    if value.len() > MAX_VALUE_LENGTH {
        return Err(LedgerError::Argument(format!(
            "Field length {} exceeds maximum {} bytes",
            value.len(),
            MAX_VALUE_LENGTH
        )));
    }
    Ok(())
}

// =============================================================================
// RECORD ENCODING
// =============================================================================

/// Encode a record as a compact JSON object.
pub fn encode_record(record: &TitleRecord) -> Result<Vec<u8>, LedgerError> {
    serde_json::to_vec(record).map_err(|e| LedgerError::Serialization(e.to_string()))
}

/// Decode a record.
///
/// Fails with [`LedgerError::Decode`] unless `bytes` is a JSON object.
/// Absent fields degrade to the empty string.
pub fn decode_record(bytes: &[u8]) -> Result<TitleRecord, LedgerError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| LedgerError::Decode(format!("record is not valid JSON: {}", e)))?;
    if !value.is_object() {
        return Err(LedgerError::Decode(
            "record is not a JSON object".to_string(),
        ));
    }
    serde_json::from_value(value)
        .map_err(|e| LedgerError::Decode(format!("record field has wrong type: {}", e)))
}

// =============================================================================
// INDEX ENCODING
// =============================================================================

/// Encode the id index as a JSON array.
pub fn encode_index(ids: &[String]) -> Result<Vec<u8>, LedgerError> {
    serde_json::to_vec(ids).map_err(|e| LedgerError::Serialization(e.to_string()))
}

/// Decode the id index.
///
/// Empty input and JSON `null` decode to an empty index.
pub fn decode_index(bytes: &[u8]) -> Result<Vec<String>, LedgerError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    let ids: Option<Vec<String>> = serde_json::from_slice(bytes)
        .map_err(|e| LedgerError::Decode(format!("index is not a JSON string array: {}", e)))?;
    Ok(ids.unwrap_or_default())
}

/// Remove the first entry equal to `id`, keeping the order of the rest.
///
/// Returns whether an entry was removed.
pub fn remove_first(ids: &mut Vec<String>, id: &str) -> bool {
    match ids.iter().position(|entry| entry == id) {
        Some(pos) => {
            ids.remove(pos);
            true
        }
        None => false,
    }
}

// =============================================================================
// TESTS
// =============================================================================
