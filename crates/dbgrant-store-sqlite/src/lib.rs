// crates/dbgrant-store-sqlite/src/lib.rs
// ============================================================================
// Module: dbgrant SQLite Store
// Description: SQLite-backed catalog of databases, principals, and permissions.
// Purpose: Provide the SQL access layer behind the lifecycle adapters.
// Dependencies: dbgrant-core, rusqlite, serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! This crate emulates a database server catalog in `SQLite` and exposes it to
//! resource kinds through [`SqliteConnectionFactory`], an implementation of
//! [`dbgrant_core::ConnectionFactory`]. Catalog operations on
//! [`SqlConnection`] report failures as diagnostics so pipeline steps can
//! short-circuit on them.
//! Invariants:
//! - Principal ids are unique across databases.
//! - Foreign keys are enforced on every connection.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod connection;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use connection::DatabaseRecord;
pub use connection::PermissionRecord;
pub use connection::PrincipalRecord;
pub use connection::PrincipalType;
pub use connection::SqlConnection;
pub use store::SCHEMA_VERSION;
pub use store::SqliteConnectionFactory;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
pub use store::validate_store_config;
