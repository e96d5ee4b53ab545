// crates/dbgrant-resources/src/role_member.rs
// ============================================================================
// Module: dbgrant Role Membership Resource
// Description: Lifecycle of role memberships in the catalog.
// Purpose: Add, check, and remove members of database roles.
// Dependencies: dbgrant-core, dbgrant-store-sqlite, serde
// ============================================================================

//! ## Overview
//! Memberships are identified by `database_id/role_id/member_id` and have no
//! mutable attributes, so the kind supports no in-place update.
//! Invariants:
//! - Both references are resolved against the catalog before the membership
//!   is written, so the identifier always names the actual database.

// ============================================================================
// SECTION: Imports
// ============================================================================

use dbgrant_core::CreateRequest;
use dbgrant_core::CreateResponse;
use dbgrant_core::DeleteRequest;
use dbgrant_core::ReadRequest;
use dbgrant_core::ReadResponse;
use dbgrant_core::Resource;
use dbgrant_core::ValidateRequest;
use dbgrant_core::ValidatedResource;
use dbgrant_store_sqlite::SqlConnection;
use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::DatabasePrincipalId;
use crate::identifiers::RoleMemberId;
use crate::identifiers::concrete_database;
use crate::identifiers::database_principal_id;
use crate::identifiers::membership_parts;
use crate::identifiers::resolve_principal;
use crate::identifiers::role_member_id;

// ============================================================================
// SECTION: Data
// ============================================================================

/// Attributes of a role membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMemberData {
    /// Membership identifier, unknown until created.
    #[serde(default)]
    pub id: RoleMemberId,
    /// Role receiving the member.
    pub role_id: DatabasePrincipalId,
    /// Principal added to the role.
    pub member_id: DatabasePrincipalId,
}

// ============================================================================
// SECTION: Resource
// ============================================================================

/// Role membership resource kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleMemberResource;

impl Resource for RoleMemberResource {
    type Data = RoleMemberData;
    type Connection = SqlConnection;

    fn create(
        &self,
        request: CreateRequest<'_, RoleMemberData, SqlConnection>,
        response: &mut CreateResponse<RoleMemberData>,
    ) {
        let CreateRequest {
            plan,
            connection,
            pipeline,
        } = request;
        let mut role = None;
        let mut member = None;
        pipeline
            .then(|diagnostics| {
                role = resolve_principal(connection, &plan.role_id, "role_id", diagnostics);
                member = resolve_principal(connection, &plan.member_id, "member_id", diagnostics);
            })
            .then(|diagnostics| {
                if let (Some(role), Some(member)) = (&role, &member) {
                    connection.add_role_member(role.id, member.id, diagnostics);
                }
            })
            .then(|_| {
                if let (Some(role), Some(member)) = (&role, &member) {
                    tracing::info!(role = %role.id, member = %member.id, "role member added");
                    response.set_state(RoleMemberData {
                        id: role_member_id(role.database_id, role.id, member.id),
                        role_id: database_principal_id(role.database_id, role.id),
                        member_id: database_principal_id(member.database_id, member.id),
                    });
                }
            });
    }

    fn read(
        &self,
        request: ReadRequest<'_, RoleMemberData, SqlConnection>,
        response: &mut ReadResponse<RoleMemberData>,
    ) {
        let ReadRequest {
            state,
            connection,
            pipeline,
        } = request;
        let mut parts = None;
        pipeline.then(|diagnostics| parts = membership_parts(&state.id, diagnostics)).then(
            |diagnostics| {
                let Some((database, role, member)) = parts else {
                    return;
                };
                if connection.has_role_member(role, member, diagnostics) {
                    response.set_state(RoleMemberData {
                        id: state.id.clone(),
                        role_id: database_principal_id(database, role),
                        member_id: database_principal_id(database, member),
                    });
                }
            },
        );
    }

    fn delete(&self, request: DeleteRequest<'_, RoleMemberData, SqlConnection>) {
        let DeleteRequest {
            state,
            connection,
            pipeline,
        } = request;
        let mut parts = None;
        pipeline.then(|diagnostics| parts = membership_parts(&state.id, diagnostics)).then(
            |diagnostics| {
                if let Some((_, role, member)) = parts {
                    connection.remove_role_member(role, member, diagnostics);
                }
            },
        );
    }
}

impl ValidatedResource for RoleMemberResource {
    fn validate(&self, request: ValidateRequest<'_, RoleMemberData>) {
        let ValidateRequest {
            config,
            pipeline,
        } = request;
        pipeline.then(|diagnostics| {
            let role_database = concrete_database(&config.role_id, diagnostics);
            let member_database = concrete_database(&config.member_id, diagnostics);
            if let (Some(role_database), Some(member_database)) = (role_database, member_database)
                && role_database != member_database
            {
                diagnostics.add_attribute_error(
                    "member_id",
                    "Member in a different database",
                    format!(
                        "member {} is in database {member_database} but role {} is in database \
                         {role_database}",
                        config.member_id, config.role_id
                    ),
                );
            }
        });
    }
}
