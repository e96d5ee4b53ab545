// crates/dbgrant-resources/src/identifiers.rs
// ============================================================================
// Module: dbgrant Resource Identifiers
// Description: Composite identifier kinds used by the principal resource kinds.
// Purpose: Compose, split, and resolve `database/principal` and `database/role/member` ids.
// Dependencies: dbgrant-core, dbgrant-store-sqlite
// ============================================================================

//! ## Overview
//! Principals are addressed as `database_id/principal_id` and role
//! memberships as `database_id/role_id/member_id`. Splitting helpers record
//! one diagnostic per bad element so a single invocation reports every
//! malformed element at once. [`resolve_principal`] also checks the database
//! element against the catalog, so state written from a reference always
//! reads back unchanged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use dbgrant_core::CompositeId;
use dbgrant_core::DatabaseId;
use dbgrant_core::Diagnostics;
use dbgrant_core::IdentifierKind;
use dbgrant_core::PrincipalId;
use dbgrant_store_sqlite::PrincipalRecord;
use dbgrant_store_sqlite::SqlConnection;

// ============================================================================
// SECTION: Kinds
// ============================================================================

/// Marker for `database_id/principal_id` identifiers.
pub struct DatabasePrincipal;

impl IdentifierKind for DatabasePrincipal {
    const NAME: &'static str = "database principal";
    const ARITY: usize = 2;
}

/// Identifier of a principal scoped to its database.
pub type DatabasePrincipalId = CompositeId<DatabasePrincipal>;

/// Marker for `database_id/role_id/member_id` identifiers.
pub struct RoleMember;

impl IdentifierKind for RoleMember {
    const NAME: &'static str = "role member";
    const ARITY: usize = 3;
}

/// Identifier of a role membership.
pub type RoleMemberId = CompositeId<RoleMember>;

// ============================================================================
// SECTION: Composition
// ============================================================================

/// Builds a principal identifier from its parts.
#[must_use]
pub fn database_principal_id(
    database_id: DatabaseId,
    principal_id: PrincipalId,
) -> DatabasePrincipalId {
    CompositeId::from_array([database_id.to_string(), principal_id.to_string()])
}

/// Builds a role membership identifier from its parts.
#[must_use]
pub fn role_member_id(
    database_id: DatabaseId,
    role_id: PrincipalId,
    member_id: PrincipalId,
) -> RoleMemberId {
    CompositeId::from_array([database_id.to_string(), role_id.to_string(), member_id.to_string()])
}

/// Splits a principal identifier into its database and principal parts.
///
/// Both elements are parsed even when the first fails.
pub fn principal_parts(
    id: &DatabasePrincipalId,
    diagnostics: &mut Diagnostics,
) -> Option<(DatabaseId, PrincipalId)> {
    let database = id.element::<DatabaseId>(0, diagnostics);
    let principal = id.element::<PrincipalId>(1, diagnostics);
    Some((database?, principal?))
}

/// Splits a membership identifier into database, role, and member parts.
pub fn membership_parts(
    id: &RoleMemberId,
    diagnostics: &mut Diagnostics,
) -> Option<(DatabaseId, PrincipalId, PrincipalId)> {
    let database = id.element::<DatabaseId>(0, diagnostics);
    let role = id.element::<PrincipalId>(1, diagnostics);
    let member = id.element::<PrincipalId>(2, diagnostics);
    Some((database?, role?, member?))
}

/// Returns the database element of a concrete principal reference.
///
/// Null and unknown references yield `None` without a diagnostic.
pub(crate) fn concrete_database(
    id: &DatabasePrincipalId,
    diagnostics: &mut Diagnostics,
) -> Option<DatabaseId> {
    id.elements()?;
    id.element::<DatabaseId>(0, diagnostics)
}

/// Loads the principal a reference names and checks its database element.
///
/// A principal stored under a different database than the reference claims
/// is reported as an attribute error on `attribute`.
pub fn resolve_principal(
    connection: &SqlConnection,
    id: &DatabasePrincipalId,
    attribute: &str,
    diagnostics: &mut Diagnostics,
) -> Option<PrincipalRecord> {
    let (database, principal) = principal_parts(id, diagnostics)?;
    let record = connection.get_principal(principal, diagnostics)?;
    if record.database_id != database {
        diagnostics.add_attribute_error(
            attribute,
            "Principal in a different database",
            format!(
                "principal {principal} belongs to database {}, not {database}",
                record.database_id
            ),
        );
        return None;
    }
    Some(record)
}
