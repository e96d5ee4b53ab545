// crates/dbgrant-resources/src/role.rs
// ============================================================================
// Module: dbgrant Database Role Resource
// Description: Lifecycle of database roles in the catalog.
// Purpose: Create, read, rename, re-own, and drop roles.
// Dependencies: dbgrant-core, dbgrant-store-sqlite, serde
// ============================================================================

//! ## Overview
//! A role is identified by `database_id/principal_id`. The owner is an
//! optional principal reference in the same database; a null reference
//! means the role has no explicit owner.
//! Invariants:
//! - A role missing from the catalog, or found under another database, reads
//!   as removed.
//! - Moving a role to another database is rejected in place.
//! - The database and owner are resolved against the catalog before a write,
//!   so an owner stored under another database is rejected up front.

// ============================================================================
// SECTION: Imports
// ============================================================================

use dbgrant_core::CreateRequest;
use dbgrant_core::CreateResponse;
use dbgrant_core::DatabaseId;
use dbgrant_core::DeleteRequest;
use dbgrant_core::Diagnostics;
use dbgrant_core::NumericId;
use dbgrant_core::PrincipalId;
use dbgrant_core::ReadRequest;
use dbgrant_core::ReadResponse;
use dbgrant_core::Resource;
use dbgrant_core::UpdatableResource;
use dbgrant_core::UpdateRequest;
use dbgrant_core::UpdateResponse;
use dbgrant_core::ValidateRequest;
use dbgrant_core::ValidatedResource;
use dbgrant_store_sqlite::PrincipalRecord;
use dbgrant_store_sqlite::PrincipalType;
use dbgrant_store_sqlite::SqlConnection;
use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::DatabasePrincipalId;
use crate::identifiers::concrete_database;
use crate::identifiers::database_principal_id;
use crate::identifiers::principal_parts;
use crate::identifiers::resolve_principal;

// ============================================================================
// SECTION: Data
// ============================================================================

/// Attributes of a database role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseRoleData {
    /// Role identifier, unknown until created.
    #[serde(default)]
    pub id: DatabasePrincipalId,
    /// Owning database.
    pub database_id: NumericId<DatabaseId>,
    /// Role name, unique within the database.
    pub name: String,
    /// Owning principal, if any.
    #[serde(default)]
    pub owner_id: Option<DatabasePrincipalId>,
}

impl DatabaseRoleData {
    /// Builds role attributes from a catalog row.
    #[must_use]
    pub fn from_record(record: &PrincipalRecord) -> Self {
        Self {
            id: database_principal_id(record.database_id, record.id),
            database_id: NumericId::new(record.database_id),
            name: record.name.clone(),
            owner_id: record.owner_id.map(|owner| database_principal_id(record.database_id, owner)),
        }
    }
}

// ============================================================================
// SECTION: Resource
// ============================================================================

/// Database role resource kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatabaseRoleResource;

impl Resource for DatabaseRoleResource {
    type Data = DatabaseRoleData;
    type Connection = SqlConnection;

    fn create(
        &self,
        request: CreateRequest<'_, DatabaseRoleData, SqlConnection>,
        response: &mut CreateResponse<DatabaseRoleData>,
    ) {
        let CreateRequest {
            plan,
            connection,
            pipeline,
        } = request;
        let mut database = None;
        let mut owner = None;
        let mut created = None;
        pipeline
            .then(|diagnostics| {
                database = plan
                    .database_id
                    .id(diagnostics)
                    .and_then(|id| connection.get_database(id, diagnostics));
            })
            .then(|diagnostics| {
                if let Some(database) = &database {
                    owner = owner_principal(
                        connection,
                        plan.owner_id.as_ref(),
                        database.id,
                        diagnostics,
                    );
                }
            })
            .then(|diagnostics| {
                if let Some(database) = &database {
                    created = connection.create_database_role(
                        database.id,
                        &plan.name,
                        owner,
                        diagnostics,
                    );
                }
            })
            .then(|_| {
                if let Some(record) = &created {
                    tracing::info!(role = %record.id, database = %record.database_id, "role created");
                    response.set_state(DatabaseRoleData::from_record(record));
                }
            });
    }

    fn read(
        &self,
        request: ReadRequest<'_, DatabaseRoleData, SqlConnection>,
        response: &mut ReadResponse<DatabaseRoleData>,
    ) {
        let ReadRequest {
            state,
            connection,
            pipeline,
        } = request;
        let mut parts = None;
        pipeline.then(|diagnostics| parts = principal_parts(&state.id, diagnostics)).then(
            |diagnostics| {
                let Some((database, role)) = parts else {
                    return;
                };
                match connection.find_principal(role, diagnostics) {
                    Some(record)
                        if record.database_id == database
                            && record.principal_type == PrincipalType::Role =>
                    {
                        response.set_state(DatabaseRoleData::from_record(&record));
                    }
                    _ => tracing::debug!(role = %role, "role not present in catalog"),
                }
            },
        );
    }

    fn delete(&self, request: DeleteRequest<'_, DatabaseRoleData, SqlConnection>) {
        let DeleteRequest {
            state,
            connection,
            pipeline,
        } = request;
        let mut parts = None;
        pipeline.then(|diagnostics| parts = principal_parts(&state.id, diagnostics)).then(
            |diagnostics| {
                if let Some((_, role)) = parts {
                    connection.drop_database_role(role, diagnostics);
                }
            },
        );
    }
}

impl UpdatableResource for DatabaseRoleResource {
    fn update(
        &self,
        request: UpdateRequest<'_, DatabaseRoleData, SqlConnection>,
        response: &mut UpdateResponse<DatabaseRoleData>,
    ) {
        let UpdateRequest {
            plan,
            state,
            connection,
            pipeline,
        } = request;
        let mut parts = None;
        let mut owner = None;
        let mut updated = None;
        pipeline
            .then(|diagnostics| parts = principal_parts(&state.id, diagnostics))
            .then(|diagnostics| {
                let Some((database, _)) = parts else {
                    return;
                };
                if let Some(planned) = plan.database_id.id(diagnostics)
                    && planned != database
                {
                    diagnostics.add_attribute_error(
                        "database_id",
                        "Database change requires replacement",
                        format!("role {} cannot move from database {database} to {planned}", state.id),
                    );
                }
            })
            .then(|diagnostics| {
                if let Some((database, _)) = parts {
                    owner =
                        owner_principal(connection, plan.owner_id.as_ref(), database, diagnostics);
                }
            })
            .then(|diagnostics| {
                if let Some((_, role)) = parts {
                    updated = connection.update_database_role(role, &plan.name, owner, diagnostics);
                }
            })
            .then(|_| {
                if let Some(record) = &updated {
                    response.set_state(DatabaseRoleData::from_record(record));
                }
            });
    }
}

impl ValidatedResource for DatabaseRoleResource {
    fn validate(&self, request: ValidateRequest<'_, DatabaseRoleData>) {
        let ValidateRequest {
            config,
            pipeline,
        } = request;
        pipeline
            .then(|diagnostics| {
                if config.name.trim().is_empty() {
                    diagnostics.add_attribute_error(
                        "name",
                        "Invalid role name",
                        "role name must not be empty",
                    );
                }
            })
            .then(|diagnostics| {
                let Some(owner) = &config.owner_id else {
                    return;
                };
                if config.database_id.as_composite().elements().is_none() {
                    return;
                }
                let database = config.database_id.id(diagnostics);
                let owner_database = concrete_database(owner, diagnostics);
                if let (Some(database), Some(owner_database)) = (database, owner_database)
                    && database != owner_database
                {
                    diagnostics.add_attribute_error(
                        "owner_id",
                        "Owner in a different database",
                        format!("owner {owner} does not belong to database {database}"),
                    );
                }
            });
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the owner reference to a principal of `database`.
///
/// Null and absent references mean no owner and yield `None` quietly.
fn owner_principal(
    connection: &SqlConnection,
    owner: Option<&DatabasePrincipalId>,
    database: DatabaseId,
    diagnostics: &mut Diagnostics,
) -> Option<PrincipalId> {
    let owner = owner.filter(|id| !id.is_null())?;
    let record = resolve_principal(connection, owner, "owner_id", diagnostics)?;
    if record.database_id != database {
        diagnostics.add_attribute_error(
            "owner_id",
            "Owner in a different database",
            format!("owner {owner} does not belong to database {database}"),
        );
        return None;
    }
    Some(record.id)
}
