// crates/dbgrant-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Catalog Store
// Description: Configuration, errors, and the connection factory for the catalog.
// Purpose: Open per-invocation connections with validated paths and schema.
// Dependencies: dbgrant-core, rusqlite, serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! The catalog lives in one `SQLite` file. [`SqliteConnectionFactory`]
//! validates the configured path once at construction, creates the parent
//! directory, and initializes the schema. Every lifecycle invocation then
//! opens its own [`SqlConnection`], which is dropped when the invocation ends.
//! Security posture: catalog contents and names are untrusted input; all SQL
//! uses bound parameters.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use dbgrant_core::ConnectionFactory;
use dbgrant_core::Diagnostics;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::connection::SqlConnection;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the catalog.
pub const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode.
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` catalog.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a config for `path` with default pragmas.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` catalog errors.
///
/// # Invariants
/// - Error messages avoid embedding catalog payloads beyond entity names and ids.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Invalid configuration or catalog data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Catalog schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// The addressed entity does not exist.
    #[error("sqlite store entity not found: {0}")]
    NotFound(String),
    /// The write violated a uniqueness or reference constraint.
    #[error("sqlite store constraint violation: {0}")]
    Conflict(String),
}

impl From<rusqlite::Error> for SqliteStoreError {
    fn from(error: rusqlite::Error) -> Self {
        match error.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => Self::Conflict(error.to_string()),
            _ => Self::Db(error.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Connection Factory
// ============================================================================

/// Connection factory for the `SQLite` catalog.
///
/// # Invariants
/// - The path was validated and the schema initialized at construction.
/// - Every connection is fresh; no connection is shared between invocations.
#[derive(Debug, Clone)]
pub struct SqliteConnectionFactory {
    /// Store configuration.
    config: SqliteStoreConfig,
}

impl SqliteConnectionFactory {
    /// Validates the configuration and initializes the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path is unsafe or the database
    /// cannot be opened or initialized.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_config(&config)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        tracing::info!(path = %config.path.display(), "sqlite catalog ready");
        Ok(Self {
            config,
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Opens a fresh connection.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or its
    /// schema version is unsupported.
    pub fn open(&self) -> Result<SqlConnection, SqliteStoreError> {
        let mut connection = open_connection(&self.config)?;
        initialize_schema(&mut connection)?;
        Ok(SqlConnection::new(connection))
    }
}

impl ConnectionFactory for SqliteConnectionFactory {
    type Connection = SqlConnection;

    fn connect(&self, diagnostics: &mut Diagnostics) -> Option<SqlConnection> {
        match self.open() {
            Ok(connection) => {
                tracing::debug!("opened catalog connection");
                Some(connection)
            }
            Err(err) => {
                diagnostics.add_error("Unable to connect to the managed store", err.to_string());
                None
            }
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates store configuration values.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Invalid`] for unsafe paths or a zero busy timeout.
pub fn validate_store_config(config: &SqliteStoreConfig) -> Result<(), SqliteStoreError> {
    validate_store_path(&config.path)?;
    if config.busy_timeout_ms == 0 {
        return Err(SqliteStoreError::Invalid(
            "busy_timeout_ms must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with pragmas applied.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability and referential integrity.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the catalog schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", [], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS databases (
                    database_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE
                );
                CREATE TABLE IF NOT EXISTS principals (
                    principal_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    database_id INTEGER NOT NULL
                        REFERENCES databases(database_id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    type TEXT NOT NULL CHECK (type IN ('ROLE', 'SQL_USER')),
                    owner_principal_id INTEGER REFERENCES principals(principal_id),
                    UNIQUE (database_id, name)
                );
                CREATE TABLE IF NOT EXISTS role_members (
                    role_principal_id INTEGER NOT NULL REFERENCES principals(principal_id),
                    member_principal_id INTEGER NOT NULL REFERENCES principals(principal_id),
                    PRIMARY KEY (role_principal_id, member_principal_id)
                );
                CREATE TABLE IF NOT EXISTS database_permissions (
                    principal_id INTEGER NOT NULL REFERENCES principals(principal_id),
                    permission_name TEXT NOT NULL,
                    with_grant_option INTEGER NOT NULL DEFAULT 0,
                    PRIMARY KEY (principal_id, permission_name)
                );
                CREATE INDEX IF NOT EXISTS idx_role_members_member
                    ON role_members (member_principal_id);",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tracing::debug!(version = SCHEMA_VERSION, "initialized catalog schema");
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}
