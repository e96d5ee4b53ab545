// crates/dbgrant-resources/src/data_sources.rs
// ============================================================================
// Module: dbgrant Data Sources
// Description: Read-only lookups of databases and roles by name.
// Purpose: Resolve names to identifiers for use in resource attributes.
// Dependencies: dbgrant-core, dbgrant-store-sqlite, serde
// ============================================================================

//! ## Overview
//! Data sources take a name as config and fill in the computed identifier
//! attributes. A name with no match is an error rather than an empty result.

// ============================================================================
// SECTION: Imports
// ============================================================================

use dbgrant_core::DataSource;
use dbgrant_core::DataSourceReadRequest;
use dbgrant_core::DatabaseId;
use dbgrant_core::NumericId;
use dbgrant_core::ReadResponse;
use dbgrant_core::ValidateRequest;
use dbgrant_core::ValidatedDataSource;
use dbgrant_store_sqlite::PrincipalType;
use dbgrant_store_sqlite::SqlConnection;
use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::DatabasePrincipalId;
use crate::role::DatabaseRoleData;

// ============================================================================
// SECTION: Database Lookup
// ============================================================================

/// Attributes of the database lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseLookupData {
    /// Database name to resolve.
    pub name: String,
    /// Resolved database identifier.
    #[serde(default)]
    pub id: NumericId<DatabaseId>,
}

/// Looks up a database by name.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatabaseDataSource;

impl DataSource for DatabaseDataSource {
    type Data = DatabaseLookupData;
    type Connection = SqlConnection;

    fn read(
        &self,
        request: DataSourceReadRequest<'_, DatabaseLookupData, SqlConnection>,
        response: &mut ReadResponse<DatabaseLookupData>,
    ) {
        let DataSourceReadRequest {
            config,
            connection,
            pipeline,
        } = request;
        let mut found = None;
        pipeline
            .then(|diagnostics| {
                found = connection.find_database_by_name(&config.name, diagnostics);
                if found.is_none() && !diagnostics.has_error() {
                    diagnostics.add_attribute_error(
                        "name",
                        "Database not found",
                        format!("no database named '{}'", config.name),
                    );
                }
            })
            .then(|_| {
                if let Some(database) = &found {
                    response.set_state(DatabaseLookupData {
                        name: database.name.clone(),
                        id: NumericId::new(database.id),
                    });
                }
            });
    }
}

// ============================================================================
// SECTION: Role Lookup
// ============================================================================

/// Attributes of the role lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleLookupData {
    /// Database to search.
    pub database_id: NumericId<DatabaseId>,
    /// Role name to resolve.
    pub name: String,
    /// Resolved role identifier.
    #[serde(default)]
    pub id: DatabasePrincipalId,
    /// Resolved owner, if any.
    #[serde(default)]
    pub owner_id: Option<DatabasePrincipalId>,
}

/// Looks up a database role by database and name.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatabaseRoleDataSource;

impl DataSource for DatabaseRoleDataSource {
    type Data = RoleLookupData;
    type Connection = SqlConnection;

    fn read(
        &self,
        request: DataSourceReadRequest<'_, RoleLookupData, SqlConnection>,
        response: &mut ReadResponse<RoleLookupData>,
    ) {
        let DataSourceReadRequest {
            config,
            connection,
            pipeline,
        } = request;
        let mut database = None;
        let mut found = None;
        pipeline
            .then(|diagnostics| database = config.database_id.id(diagnostics))
            .then(|diagnostics| {
                let Some(database) = database else {
                    return;
                };
                found = connection
                    .find_principal_by_name(database, &config.name, diagnostics)
                    .filter(|record| record.principal_type == PrincipalType::Role);
                if found.is_none() && !diagnostics.has_error() {
                    diagnostics.add_attribute_error(
                        "name",
                        "Role not found",
                        format!("no role named '{}' in database {database}", config.name),
                    );
                }
            })
            .then(|_| {
                if let Some(record) = &found {
                    let role = DatabaseRoleData::from_record(record);
                    response.set_state(RoleLookupData {
                        database_id: role.database_id,
                        name: role.name,
                        id: role.id,
                        owner_id: role.owner_id,
                    });
                }
            });
    }
}

impl ValidatedDataSource for DatabaseRoleDataSource {
    fn validate(&self, request: ValidateRequest<'_, RoleLookupData>) {
        let ValidateRequest {
            config,
            pipeline,
        } = request;
        pipeline.then(|diagnostics| {
            if config.name.trim().is_empty() {
                diagnostics.add_attribute_error(
                    "name",
                    "Invalid role name",
                    "role name must not be empty",
                );
            }
        });
    }
}
