// crates/dbgrant-core/src/telemetry.rs
// ============================================================================
// Module: dbgrant Telemetry
// Description: Structured logging setup for the plugin process.
// Purpose: Route `tracing` events to stderr with a configurable filter.
// Dependencies: serde, thiserror, tracing-subscriber
// ============================================================================

//! ## Overview
//! The orchestrator owns stdout for the plugin protocol, so log output always
//! goes to stderr. The filter uses `tracing_subscriber::EnvFilter` directive
//! syntax (for example `info,dbgrant_core=debug`). A `RUST_LOG` value in the
//! environment takes precedence over the configured filter.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Logging configuration.
///
/// # Invariants
/// - `filter` is a non-empty `EnvFilter` directive string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit ANSI colour codes.
    #[serde(default)]
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            ansi: false,
        }
    }
}

/// Serde default for [`LoggingConfig::filter`].
fn default_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Logging setup failures.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TelemetryError {
    /// The filter directive failed to parse.
    #[error("invalid log filter: {0}")]
    InvalidFilter(String),
    /// A global subscriber is already installed.
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(String),
}

// ============================================================================
// SECTION: Initialization
// ============================================================================

/// Builds the filter for `config`, preferring `RUST_LOG` when set.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] when the configured directive is
/// malformed.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.filter).map_err(|err| TelemetryError::InvalidFilter(err.to_string()))
}

/// Installs the global stderr subscriber.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or a subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(config)?;
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(config.ansi)
                .with_target(true),
        )
        .try_init()
        .map_err(|err| TelemetryError::AlreadyInitialized(err.to_string()))
}
