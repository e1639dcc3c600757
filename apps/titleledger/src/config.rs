//! # Configuration
//!
//! Optional TOML file loaded with `--config`. Every field has a default, so
//! an empty or partial file is valid.
//!
//! ```toml
//! [registry]
//! create_policy = "create_only"   # or "upsert" (default)
//! max_cas_retries = 8
//! legacy_seed_key = "abc"         # "" disables the legacy seed write
//! allow_raw_write = true          # false rejects `write` over HTTP
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use titleledger_core::{
    CreatePolicy, LedgerError, RegistryConfig,
    primitives::{DEFAULT_CAS_RETRIES, LEGACY_SEED_KEY},
};

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// APP CONFIG
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub registry: RegistrySection,
    pub server: ServerSection,
}

/// `[registry]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistrySection {
    pub create_policy: CreatePolicy,
    pub max_cas_retries: u32,
    /// Empty string disables the legacy seed write.
    pub legacy_seed_key: String,
    pub allow_raw_write: bool,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            create_policy: CreatePolicy::Upsert,
            max_cas_retries: DEFAULT_CAS_RETRIES,
            legacy_seed_key: LEGACY_SEED_KEY.to_string(),
            allow_raw_write: true,
        }
    }
}

/// `[server]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Load from `path`, or return defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, LedgerError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let metadata = std::fs::metadata(path).map_err(|e| {
            LedgerError::Io(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(LedgerError::Config(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Io(format!("Read config: {}", e)))?;
        let config = Self::parse(&text)?;
        tracing::info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn parse(text: &str) -> Result<Self, LedgerError> {
        let config: Self =
            toml::from_str(text).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.registry_config().validate()?;
        Ok(config)
    }

    /// The core registry configuration this file describes.
    pub fn registry_config(&self) -> RegistryConfig {
        let section = &self.registry;
        RegistryConfig {
            create_policy: section.create_policy,
            max_cas_retries: section.max_cas_retries,
            legacy_seed_key: Some(section.legacy_seed_key.clone()).filter(|k| !k.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = AppConfig::parse("").expect("parse");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.registry_config(), RegistryConfig::default());
    }

    #[test]
    fn partial_file_overrides_named_fields() {
        let config = AppConfig::parse(
            "[registry]\ncreate_policy = \"create_only\"\nlegacy_seed_key = \"\"\n\n[server]\nport = 9000\n",
        )
        .expect("parse");

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        let registry = config.registry_config();
        assert_eq!(registry.create_policy, CreatePolicy::CreateOnly);
        assert_eq!(registry.legacy_seed_key, None);
        assert!(config.registry.allow_raw_write);
    }

    #[test]
    fn invalid_values_are_config_errors() {
        for text in [
            "[registry]\nmax_cas_retries = 0\n",
            "[registry]\ncreate_policy = \"sometimes\"\n",
            "[registry]\nlegacy_seed_key = \"_title_index\"\n",
            "[storage]\npath = \"x\"\n",
        ] {
            assert!(
                matches!(AppConfig::parse(text), Err(LedgerError::Config(_))),
                "{}",
                text
            );
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let result = AppConfig::load(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(LedgerError::Io(_))));
        assert_eq!(AppConfig::load(None).expect("defaults"), AppConfig::default());
    }
}
