// crates/dbgrant-store-sqlite/tests/sqlite_catalog_unit.rs
// ============================================================================
// Module: SQLite Catalog Unit Tests
// Description: Path safety, schema versioning, and catalog operations.
// Purpose: Validate that store failures surface as diagnostics and that
//          catalog constraints hold.
// ============================================================================

//! ## Overview
//! Unit-level tests for the `SQLite` catalog:
//! - Path safety checks (length/component/directory rejection)
//! - Schema version validation
//! - Database, principal, membership, and permission operations
//! - "find" versus "get" semantics for absent rows

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::path::PathBuf;

use dbgrant_core::ConnectionFactory;
use dbgrant_core::DatabaseId;
use dbgrant_core::Diagnostics;
use dbgrant_core::PrincipalId;
use dbgrant_store_sqlite::PrincipalType;
use dbgrant_store_sqlite::SqlConnection;
use dbgrant_store_sqlite::SqliteConnectionFactory;
use dbgrant_store_sqlite::SqliteStoreConfig;
use dbgrant_store_sqlite::SqliteStoreError;
use rusqlite::Connection;
use rusqlite::params;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn factory_in(dir: &TempDir) -> SqliteConnectionFactory {
    SqliteConnectionFactory::new(SqliteStoreConfig::new(dir.path().join("catalog.db"))).unwrap()
}

fn connect(factory: &SqliteConnectionFactory) -> SqlConnection {
    let mut diagnostics = Diagnostics::new();
    let connection = factory.connect(&mut diagnostics).unwrap();
    assert!(diagnostics.is_empty());
    connection
}

fn first_detail(diagnostics: &Diagnostics) -> String {
    diagnostics.iter().next().map(|entry| entry.detail.clone()).unwrap_or_default()
}

fn first_summary(diagnostics: &Diagnostics) -> String {
    diagnostics.iter().next().map(|entry| entry.summary.clone()).unwrap_or_default()
}

// ============================================================================
// SECTION: Path And Schema
// ============================================================================

#[test]
fn factory_rejects_directory_path() {
    let dir = TempDir::new().unwrap();
    let err = SqliteConnectionFactory::new(SqliteStoreConfig::new(dir.path())).unwrap_err();
    assert_eq!(
        err,
        SqliteStoreError::Invalid("store path must be a file, not a directory".to_string())
    );
}

#[test]
fn factory_rejects_empty_path() {
    let err = SqliteConnectionFactory::new(SqliteStoreConfig::new(PathBuf::new())).unwrap_err();
    assert!(matches!(err, SqliteStoreError::Invalid(message) if message.contains("empty")));
}

#[test]
fn factory_rejects_overlong_component() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a".repeat(256));
    let err = SqliteConnectionFactory::new(SqliteStoreConfig::new(path)).unwrap_err();
    assert!(matches!(err, SqliteStoreError::Invalid(message) if message.contains("component")));
}

#[test]
fn factory_rejects_overlong_total_path() {
    let dir = TempDir::new().unwrap();
    let mut path = dir.path().to_path_buf();
    for _ in 0 .. 20 {
        path.push("b".repeat(250));
    }
    let err = SqliteConnectionFactory::new(SqliteStoreConfig::new(path)).unwrap_err();
    assert!(matches!(err, SqliteStoreError::Invalid(message) if message.contains("length")));
}

#[test]
fn factory_rejects_zero_busy_timeout() {
    let dir = TempDir::new().unwrap();
    let mut config = SqliteStoreConfig::new(dir.path().join("catalog.db"));
    config.busy_timeout_ms = 0;
    assert!(SqliteConnectionFactory::new(config).is_err());
}

#[test]
fn factory_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("catalog.db");
    let factory = SqliteConnectionFactory::new(SqliteStoreConfig::new(&path)).unwrap();
    assert!(path.exists());
    assert_eq!(factory.config().path, path);
}

#[test]
fn unknown_schema_version_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("catalog.db");
    {
        let connection = Connection::open(&path).unwrap();
        connection.execute_batch("CREATE TABLE store_meta (version INTEGER NOT NULL);").unwrap();
        connection.execute("INSERT INTO store_meta (version) VALUES (?1)", params![99]).unwrap();
    }
    let err = SqliteConnectionFactory::new(SqliteStoreConfig::new(&path)).unwrap_err();
    assert!(matches!(err, SqliteStoreError::VersionMismatch(_)));
}

#[test]
fn connect_failure_is_reported_as_diagnostic() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("catalog.db");
    let factory = SqliteConnectionFactory::new(SqliteStoreConfig::new(&path)).unwrap();
    {
        let connection = Connection::open(&path).unwrap();
        connection.execute("UPDATE store_meta SET version = ?1", params![42]).unwrap();
    }
    let mut diagnostics = Diagnostics::new();
    assert!(factory.connect(&mut diagnostics).is_none());
    assert_eq!(first_summary(&diagnostics), "Unable to connect to the managed store");
    assert!(first_detail(&diagnostics).contains("unsupported schema version: 42"));
}

// ============================================================================
// SECTION: Databases And Principals
// ============================================================================

#[test]
fn database_lookup_by_name() {
    let dir = TempDir::new().unwrap();
    let connection = connect(&factory_in(&dir));
    let mut diagnostics = Diagnostics::new();
    let created = connection.create_database("sales", &mut diagnostics).unwrap();
    let found = connection.find_database_by_name("sales", &mut diagnostics).unwrap();
    assert_eq!(created, found);
    assert!(connection.find_database_by_name("missing", &mut diagnostics).is_none());
    assert!(diagnostics.is_empty());
}

#[test]
fn duplicate_database_name_is_a_conflict() {
    let dir = TempDir::new().unwrap();
    let connection = connect(&factory_in(&dir));
    let mut diagnostics = Diagnostics::new();
    connection.create_database("sales", &mut diagnostics).unwrap();
    assert!(connection.create_database("sales", &mut diagnostics).is_none());
    assert_eq!(first_summary(&diagnostics), "Unable to create database");
    assert!(first_detail(&diagnostics).contains("constraint violation"));
}

#[test]
fn get_database_reports_missing_rows() {
    let dir = TempDir::new().unwrap();
    let connection = connect(&factory_in(&dir));
    let mut diagnostics = Diagnostics::new();
    let missing = DatabaseId::from_raw(404).unwrap();
    assert!(connection.get_database(missing, &mut diagnostics).is_none());
    assert!(first_detail(&diagnostics).contains("entity not found: database 404"));
}

#[test]
fn principal_ids_are_unique_across_databases() {
    let dir = TempDir::new().unwrap();
    let connection = connect(&factory_in(&dir));
    let mut diagnostics = Diagnostics::new();
    let first = connection.create_database("first", &mut diagnostics).unwrap();
    let second = connection.create_database("second", &mut diagnostics).unwrap();
    let a = connection.create_database_role(first.id, "reader", None, &mut diagnostics).unwrap();
    let b = connection.create_database_role(second.id, "reader", None, &mut diagnostics).unwrap();
    assert_ne!(a.id, b.id);
    let user = connection.create_user(first.id, "alice", &mut diagnostics).unwrap();
    assert_eq!(user.principal_type, PrincipalType::SqlUser);
    let found = connection.find_principal_by_name(first.id, "alice", &mut diagnostics).unwrap();
    assert_eq!(found, user);
    assert!(diagnostics.is_empty());
}

#[test]
fn role_owner_must_share_the_database() {
    let dir = TempDir::new().unwrap();
    let connection = connect(&factory_in(&dir));
    let mut diagnostics = Diagnostics::new();
    let first = connection.create_database("first", &mut diagnostics).unwrap();
    let second = connection.create_database("second", &mut diagnostics).unwrap();
    let owner = connection.create_user(first.id, "owner", &mut diagnostics).unwrap();
    let role = connection.create_database_role(first.id, "r", Some(owner.id), &mut diagnostics);
    assert_eq!(role.unwrap().owner_id, Some(owner.id));
    assert!(
        connection.create_database_role(second.id, "r", Some(owner.id), &mut diagnostics).is_none()
    );
    assert!(first_detail(&diagnostics).contains("belongs to database"));
}

#[test]
fn update_database_role_renames_and_reassigns() {
    let dir = TempDir::new().unwrap();
    let connection = connect(&factory_in(&dir));
    let mut diagnostics = Diagnostics::new();
    let db = connection.create_database("db", &mut diagnostics).unwrap();
    let owner = connection.create_user(db.id, "owner", &mut diagnostics).unwrap();
    let role = connection.create_database_role(db.id, "old", None, &mut diagnostics).unwrap();
    let updated = connection
        .update_database_role(role.id, "new", Some(owner.id), &mut diagnostics)
        .unwrap();
    assert_eq!(updated.name, "new");
    assert_eq!(updated.owner_id, Some(owner.id));
    assert_eq!(connection.get_principal(role.id, &mut diagnostics).unwrap(), updated);
    assert!(diagnostics.is_empty());
}

#[test]
fn update_rejects_non_role_principals() {
    let dir = TempDir::new().unwrap();
    let connection = connect(&factory_in(&dir));
    let mut diagnostics = Diagnostics::new();
    let db = connection.create_database("db", &mut diagnostics).unwrap();
    let user = connection.create_user(db.id, "alice", &mut diagnostics).unwrap();
    assert!(connection.update_database_role(user.id, "bob", None, &mut diagnostics).is_none());
    assert!(first_detail(&diagnostics).contains("is not a role"));
}

#[test]
fn find_principal_absent_is_silent_but_get_is_not() {
    let dir = TempDir::new().unwrap();
    let connection = connect(&factory_in(&dir));
    let mut diagnostics = Diagnostics::new();
    let missing = PrincipalId::from_raw(77).unwrap();
    assert!(connection.find_principal(missing, &mut diagnostics).is_none());
    assert!(diagnostics.is_empty());
    assert!(connection.get_principal(missing, &mut diagnostics).is_none());
    assert_eq!(first_summary(&diagnostics), "Unable to read principal");
}

// ============================================================================
// SECTION: Membership
// ============================================================================

#[test]
fn role_membership_lifecycle() {
    let dir = TempDir::new().unwrap();
    let connection = connect(&factory_in(&dir));
    let mut diagnostics = Diagnostics::new();
    let db = connection.create_database("db", &mut diagnostics).unwrap();
    let role = connection.create_database_role(db.id, "readers", None, &mut diagnostics).unwrap();
    let user = connection.create_user(db.id, "alice", &mut diagnostics).unwrap();
    connection.add_role_member(role.id, user.id, &mut diagnostics);
    assert!(connection.has_role_member(role.id, user.id, &mut diagnostics));
    connection.remove_role_member(role.id, user.id, &mut diagnostics);
    assert!(!connection.has_role_member(role.id, user.id, &mut diagnostics));
    assert!(diagnostics.is_empty());
    connection.remove_role_member(role.id, user.id, &mut diagnostics);
    assert!(diagnostics.is_empty());
}

#[test]
fn membership_across_databases_is_rejected() {
    let dir = TempDir::new().unwrap();
    let connection = connect(&factory_in(&dir));
    let mut diagnostics = Diagnostics::new();
    let first = connection.create_database("first", &mut diagnostics).unwrap();
    let second = connection.create_database("second", &mut diagnostics).unwrap();
    let role = connection.create_database_role(first.id, "r", None, &mut diagnostics).unwrap();
    let user = connection.create_user(second.id, "u", &mut diagnostics).unwrap();
    connection.add_role_member(role.id, user.id, &mut diagnostics);
    assert!(diagnostics.has_error());
    assert!(!connection.has_role_member(role.id, user.id, &mut Diagnostics::new()));
}

#[test]
fn dropping_a_role_with_members_fails() {
    let dir = TempDir::new().unwrap();
    let connection = connect(&factory_in(&dir));
    let mut diagnostics = Diagnostics::new();
    let db = connection.create_database("db", &mut diagnostics).unwrap();
    let role = connection.create_database_role(db.id, "r", None, &mut diagnostics).unwrap();
    let user = connection.create_user(db.id, "u", &mut diagnostics).unwrap();
    connection.add_role_member(role.id, user.id, &mut diagnostics);
    connection.drop_database_role(role.id, &mut diagnostics);
    assert_eq!(first_summary(&diagnostics), "Unable to drop database role");

    let mut diagnostics = Diagnostics::new();
    connection.remove_role_member(role.id, user.id, &mut diagnostics);
    connection.drop_database_role(role.id, &mut diagnostics);
    assert!(diagnostics.is_empty());
    assert!(connection.find_principal(role.id, &mut diagnostics).is_none());
}

#[test]
fn removals_of_absent_entities_are_idempotent() {
    let dir = TempDir::new().unwrap();
    let connection = connect(&factory_in(&dir));
    let mut diagnostics = Diagnostics::new();
    let db = connection.create_database("db", &mut diagnostics).unwrap();
    let role = connection.create_database_role(db.id, "r", None, &mut diagnostics).unwrap();
    let user = connection.create_user(db.id, "u", &mut diagnostics).unwrap();
    connection.drop_database_role(role.id, &mut diagnostics);
    connection.drop_database_role(role.id, &mut diagnostics);
    connection.remove_role_member(role.id, user.id, &mut diagnostics);
    connection.revoke_permission(user.id, "SELECT", &mut diagnostics);
    connection.revoke_permission(user.id, "SELECT", &mut diagnostics);
    assert!(diagnostics.is_empty());
}

#[test]
fn dropping_a_user_as_a_role_fails() {
    let dir = TempDir::new().unwrap();
    let connection = connect(&factory_in(&dir));
    let mut diagnostics = Diagnostics::new();
    let db = connection.create_database("db", &mut diagnostics).unwrap();
    let user = connection.create_user(db.id, "u", &mut diagnostics).unwrap();
    connection.drop_database_role(user.id, &mut diagnostics);
    assert_eq!(first_summary(&diagnostics), "Unable to drop database role");
    assert!(first_detail(&diagnostics).contains("is not a role"));
}

// ============================================================================
// SECTION: Permissions
// ============================================================================

#[test]
fn permission_grant_update_revoke() {
    let dir = TempDir::new().unwrap();
    let connection = connect(&factory_in(&dir));
    let mut diagnostics = Diagnostics::new();
    let db = connection.create_database("db", &mut diagnostics).unwrap();
    let user = connection.create_user(db.id, "u", &mut diagnostics).unwrap();
    let granted = connection.grant_permission(user.id, "SELECT", false, &mut diagnostics).unwrap();
    assert!(!granted.with_grant_option);
    let updated = connection.update_permission(user.id, "SELECT", true, &mut diagnostics).unwrap();
    assert!(updated.with_grant_option);
    assert_eq!(connection.find_permission(user.id, "SELECT", &mut diagnostics), Some(updated));
    connection.revoke_permission(user.id, "SELECT", &mut diagnostics);
    assert!(connection.find_permission(user.id, "SELECT", &mut diagnostics).is_none());
    assert!(diagnostics.is_empty());
}

#[test]
fn duplicate_grant_is_a_conflict() {
    let dir = TempDir::new().unwrap();
    let connection = connect(&factory_in(&dir));
    let mut diagnostics = Diagnostics::new();
    let db = connection.create_database("db", &mut diagnostics).unwrap();
    let user = connection.create_user(db.id, "u", &mut diagnostics).unwrap();
    connection.grant_permission(user.id, "SELECT", false, &mut diagnostics).unwrap();
    assert!(connection.grant_permission(user.id, "SELECT", true, &mut diagnostics).is_none());
    assert_eq!(first_summary(&diagnostics), "Unable to grant permission");
}

#[test]
fn update_of_missing_permission_is_not_found() {
    let dir = TempDir::new().unwrap();
    let connection = connect(&factory_in(&dir));
    let mut diagnostics = Diagnostics::new();
    let db = connection.create_database("db", &mut diagnostics).unwrap();
    let user = connection.create_user(db.id, "u", &mut diagnostics).unwrap();
    assert!(connection.update_permission(user.id, "DELETE", true, &mut diagnostics).is_none());
    assert!(first_detail(&diagnostics).contains("entity not found"));
}

#[test]
fn grant_to_unknown_principal_fails() {
    let dir = TempDir::new().unwrap();
    let connection = connect(&factory_in(&dir));
    let mut diagnostics = Diagnostics::new();
    let missing = PrincipalId::from_raw(9).unwrap();
    assert!(connection.grant_permission(missing, "SELECT", false, &mut diagnostics).is_none());
    assert!(diagnostics.has_error());
}

#[test]
fn catalog_persists_across_connections() {
    let dir = TempDir::new().unwrap();
    let factory = factory_in(&dir);
    let mut diagnostics = Diagnostics::new();
    let created = connect(&factory).create_database("kept", &mut diagnostics).unwrap();
    let found = connect(&factory).get_database(created.id, &mut diagnostics).unwrap();
    assert_eq!(found.name, "kept");
}
