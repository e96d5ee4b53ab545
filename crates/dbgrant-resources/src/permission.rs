// crates/dbgrant-resources/src/permission.rs
// ============================================================================
// Module: dbgrant Database Permission Resource
// Description: Lifecycle of database-scoped permission grants.
// Purpose: Grant, read, adjust the grant option of, and revoke permissions.
// Dependencies: dbgrant-core, dbgrant-store-sqlite, serde
// ============================================================================

//! ## Overview
//! A grant is identified by `principal_id/permission_name`. Only the grant
//! option changes in place; any other difference needs a new grant.
//! Invariants:
//! - The identifier is decoded before the catalog is touched, so a malformed
//!   principal element fails without any store access.
//! - Permission names are checked before every write and never contain the
//!   element delimiter, so every created grant has a decodable identifier.
//! - The grantee reference must name the principal's actual database.

// ============================================================================
// SECTION: Imports
// ============================================================================

use dbgrant_core::CreateRequest;
use dbgrant_core::CreateResponse;
use dbgrant_core::DeleteRequest;
use dbgrant_core::Diagnostics;
use dbgrant_core::ELEMENT_DELIMITER;
use dbgrant_core::PermissionId;
use dbgrant_core::PrincipalId;
use dbgrant_core::ReadRequest;
use dbgrant_core::ReadResponse;
use dbgrant_core::Resource;
use dbgrant_core::UpdatableResource;
use dbgrant_core::UpdateRequest;
use dbgrant_core::UpdateResponse;
use dbgrant_core::ValidateRequest;
use dbgrant_core::ValidatedResource;
use dbgrant_store_sqlite::PermissionRecord;
use dbgrant_store_sqlite::PrincipalRecord;
use dbgrant_store_sqlite::SqlConnection;
use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::DatabasePrincipalId;
use crate::identifiers::database_principal_id;
use crate::identifiers::resolve_principal;

// ============================================================================
// SECTION: Data
// ============================================================================

/// Attributes of a permission grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionData {
    /// Grant identifier, unknown until created.
    #[serde(default)]
    pub id: PermissionId<PrincipalId>,
    /// Grantee.
    pub principal_id: DatabasePrincipalId,
    /// Permission name, for example `SELECT`.
    pub permission: String,
    /// Whether the grantee may grant the permission onward.
    #[serde(default)]
    pub with_grant_option: bool,
}

impl PermissionData {
    /// Builds grant attributes from catalog rows.
    #[must_use]
    pub fn from_records(principal: &PrincipalRecord, grant: &PermissionRecord) -> Self {
        Self {
            id: PermissionId::new(grant.principal_id, grant.permission.clone()),
            principal_id: database_principal_id(principal.database_id, principal.id),
            permission: grant.permission.clone(),
            with_grant_option: grant.with_grant_option,
        }
    }
}

// ============================================================================
// SECTION: Resource
// ============================================================================

/// Database permission resource kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatabasePermissionResource;

impl Resource for DatabasePermissionResource {
    type Data = PermissionData;
    type Connection = SqlConnection;

    fn create(
        &self,
        request: CreateRequest<'_, PermissionData, SqlConnection>,
        response: &mut CreateResponse<PermissionData>,
    ) {
        let CreateRequest {
            plan,
            connection,
            pipeline,
        } = request;
        let mut grantee = None;
        let mut granted = None;
        pipeline
            .then(|diagnostics| check_permission_name(&plan.permission, diagnostics))
            .then(|diagnostics| {
                grantee =
                    resolve_principal(connection, &plan.principal_id, "principal_id", diagnostics);
            })
            .then(|diagnostics| {
                if let Some(principal) = &grantee {
                    granted = connection.grant_permission(
                        principal.id,
                        &plan.permission,
                        plan.with_grant_option,
                        diagnostics,
                    );
                }
            })
            .then(|_| {
                if let (Some(principal), Some(grant)) = (&grantee, &granted) {
                    tracing::info!(
                        principal = %grant.principal_id,
                        permission = %grant.permission,
                        "permission granted"
                    );
                    response.set_state(PermissionData::from_records(principal, grant));
                }
            });
    }

    fn read(
        &self,
        request: ReadRequest<'_, PermissionData, SqlConnection>,
        response: &mut ReadResponse<PermissionData>,
    ) {
        let ReadRequest {
            state,
            connection,
            pipeline,
        } = request;
        let mut principal = None;
        pipeline.then(|diagnostics| principal = state.id.entity_id(diagnostics)).then(
            |diagnostics| {
                let (Some(principal), Some(name)) = (principal, state.id.permission_name()) else {
                    return;
                };
                let Some(grantee) = connection.find_principal(principal, diagnostics) else {
                    return;
                };
                if let Some(grant) = connection.find_permission(principal, name, diagnostics) {
                    response.set_state(PermissionData::from_records(&grantee, &grant));
                }
            },
        );
    }

    fn delete(&self, request: DeleteRequest<'_, PermissionData, SqlConnection>) {
        let DeleteRequest {
            state,
            connection,
            pipeline,
        } = request;
        let mut principal = None;
        pipeline.then(|diagnostics| principal = state.id.entity_id(diagnostics)).then(
            |diagnostics| {
                if let (Some(principal), Some(name)) = (principal, state.id.permission_name()) {
                    connection.revoke_permission(principal, name, diagnostics);
                }
            },
        );
    }
}

impl UpdatableResource for DatabasePermissionResource {
    fn update(
        &self,
        request: UpdateRequest<'_, PermissionData, SqlConnection>,
        response: &mut UpdateResponse<PermissionData>,
    ) {
        let UpdateRequest {
            plan,
            state,
            connection,
            pipeline,
        } = request;
        let mut principal = None;
        let mut updated = None;
        pipeline
            .then(|diagnostics| check_permission_name(&plan.permission, diagnostics))
            .then(|diagnostics| principal = state.id.entity_id(diagnostics))
            .then(|diagnostics| {
                if plan.permission != state.permission {
                    diagnostics.add_attribute_error(
                        "permission",
                        "Permission change requires replacement",
                        format!(
                            "grant {} cannot change from {} to {}",
                            state.id, state.permission, plan.permission
                        ),
                    );
                }
                if plan.principal_id != state.principal_id {
                    diagnostics.add_attribute_error(
                        "principal_id",
                        "Grantee change requires replacement",
                        format!("grant {} cannot move to {}", state.id, plan.principal_id),
                    );
                }
            })
            .then(|diagnostics| {
                if let (Some(principal), Some(name)) = (principal, state.id.permission_name()) {
                    updated = connection.update_permission(
                        principal,
                        name,
                        plan.with_grant_option,
                        diagnostics,
                    );
                }
            })
            .then(|_| {
                if let Some(grant) = &updated {
                    response.set_state(PermissionData {
                        id: state.id.clone(),
                        principal_id: state.principal_id.clone(),
                        permission: grant.permission.clone(),
                        with_grant_option: grant.with_grant_option,
                    });
                }
            });
    }
}

impl ValidatedResource for DatabasePermissionResource {
    fn validate(&self, request: ValidateRequest<'_, PermissionData>) {
        let ValidateRequest {
            config,
            pipeline,
        } = request;
        pipeline.then(|diagnostics| check_permission_name(&config.permission, diagnostics));
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects blank permission names and names containing the element delimiter.
fn check_permission_name(permission: &str, diagnostics: &mut Diagnostics) {
    if permission.trim().is_empty() {
        diagnostics.add_attribute_error(
            "permission",
            "Invalid permission",
            "permission name must not be empty",
        );
    } else if permission.contains(ELEMENT_DELIMITER) {
        diagnostics.add_attribute_error(
            "permission",
            "Invalid permission",
            format!("permission name must not contain '{ELEMENT_DELIMITER}'"),
        );
    }
}
