//! # Registry Primitives
//!
//! Hardcoded keys and limits for the title registry.
//!
//! These are compiled into the binary. Anything an operator may tune lives in
//! [`crate::registry::RegistryConfig`] instead.

/// Ledger key holding the encoded id index.
///
/// Starts with [`RESERVED_PREFIX`], so no valid title id can alias it.
pub const INDEX_KEY: &str = "_title_index";

/// Prefix reserved for registry bookkeeping keys.
///
/// Title ids starting with this prefix are rejected on create, update,
/// transfer and delete.
pub const RESERVED_PREFIX: char = '_';

/// Default key for the legacy smoke-test value written by `initialize`.
pub const LEGACY_SEED_KEY: &str = "abc";

/// Default number of compare-and-swap attempts for one read-modify-write.
pub const DEFAULT_CAS_RETRIES: u32 = 8;

/// Upper bound accepted for configured compare-and-swap attempts.
pub const MAX_CAS_RETRIES: u32 = 1024;

/// Number of positional arguments of `init_title`.
pub const CREATE_ARG_COUNT: usize = 6;

/// Minimum number of positional arguments of `update_title`.
pub const UPDATE_ARG_COUNT: usize = 5;

/// Minimum number of positional arguments of `set_owner`.
pub const TRANSFER_ARG_COUNT: usize = 2;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for a ledger key or title id, in bytes.
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum length for a raw value or a single record field, in bytes.
pub const MAX_VALUE_LENGTH: usize = 65536;

/// Returns true when `key` is reserved for registry bookkeeping.
#[must_use]
pub fn is_reserved_key(key: &str) -> bool {
    key.starts_with(RESERVED_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_key_is_reserved() {
        assert!(is_reserved_key(INDEX_KEY));
    }

    #[test]
    fn legacy_key_is_not_reserved() {
        assert!(!is_reserved_key(LEGACY_SEED_KEY));
        assert!(!is_reserved_key("V1"));
    }
}
