// crates/dbgrant-config/src/lib.rs
// ============================================================================
// Module: dbgrant Config
// Description: Plugin configuration model, loading, and validation.
// Purpose: Read a bounded TOML file into typed store and logging settings.
// Dependencies: dbgrant-core, dbgrant-store-sqlite, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! [`DbgrantConfig::load`] resolves the config path (explicit argument, then
//! the `DBGRANT_CONFIG` environment variable, then `dbgrant.toml` in the
//! working directory), applies input guards, parses TOML with unknown fields
//! rejected, and validates the result.
//! Invariants:
//! - Paths longer than [`MAX_CONFIG_PATH_LENGTH`] or with a component longer
//!   than [`MAX_CONFIG_PATH_COMPONENT_LENGTH`] are rejected before any I/O.
//! - Files larger than [`MAX_CONFIG_FILE_BYTES`] or not valid UTF-8 are rejected.
//! - A relative store path resolves against the config file's directory.
//!
//! Security posture: config files are untrusted input and fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsString;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use dbgrant_core::LoggingConfig;
use dbgrant_store_sqlite::SqliteStoreConfig;
use dbgrant_store_sqlite::validate_store_config;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "DBGRANT_CONFIG";
/// Config file used when neither an explicit path nor the env var is set.
pub const DEFAULT_CONFIG_FILE: &str = "dbgrant.toml";
/// Maximum total config path length.
pub const MAX_CONFIG_PATH_LENGTH: usize = 4096;
/// Maximum length of a single config path component.
pub const MAX_CONFIG_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum config file size in bytes.
pub const MAX_CONFIG_FILE_BYTES: u64 = 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Messages never embed file contents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// The config file is not valid TOML for the config model.
    #[error("config parse error: {0}")]
    Parse(String),
    /// The config failed an input guard or a validation rule.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Top-level plugin configuration.
///
/// # Invariants
/// - Unknown fields are rejected at every level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DbgrantConfig {
    /// Catalog store settings.
    pub store: SqliteStoreConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DbgrantConfig {
    /// Creates a config for a catalog at `path` with default logging.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            store: SqliteStoreConfig::new(path),
            logging: LoggingConfig::default(),
        }
    }

    /// Loads and validates the config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the path or file fails an input guard, the
    /// TOML does not parse, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = resolve_config_path(path, std::env::var_os(CONFIG_ENV_VAR));
        validate_config_path(&path)?;
        let text = read_bounded_utf8(&path)?;
        let mut config = Self::from_toml_str(&text)?;
        if config.store.path.is_relative()
            && let Some(base) = path.parent()
        {
            config.store.path = base.join(&config.store.path);
        }
        config.validate()?;
        Ok(config)
    }

    /// Parses config TOML without validating it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the TOML is malformed or does not
    /// match the config model.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Validates cross-field rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a rule is violated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_store_config(&self.store).map_err(|err| ConfigError::Invalid(err.to_string()))?;
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::Invalid("logging.filter must not be empty".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Loading Helpers
// ============================================================================

/// Resolves the config path from an explicit argument or the env var value.
#[must_use]
pub fn resolve_config_path(explicit: Option<&Path>, env_value: Option<OsString>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match env_value {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => PathBuf::from(DEFAULT_CONFIG_FILE),
    }
}

/// Applies path length guards.
fn validate_config_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().len() > MAX_CONFIG_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_CONFIG_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Reads at most [`MAX_CONFIG_FILE_BYTES`] and decodes them as UTF-8.
fn read_bounded_utf8(path: &Path) -> Result<String, ConfigError> {
    let file = fs::File::open(path).map_err(|err| ConfigError::Io(err.to_string()))?;
    let mut bytes = Vec::new();
    file.take(MAX_CONFIG_FILE_BYTES + 1)
        .read_to_end(&mut bytes)
        .map_err(|err| ConfigError::Io(err.to_string()))?;
    if !u64::try_from(bytes.len()).is_ok_and(|len| len <= MAX_CONFIG_FILE_BYTES) {
        return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
    }
    String::from_utf8(bytes).map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))
}
