// crates/dbgrant-resources/src/lib.rs
// ============================================================================
// Module: dbgrant Resources
// Description: Database principal and permission kinds built on the adapter layer.
// Purpose: Expose roles, role memberships, permissions, and lookups to an orchestrator.
// Dependencies: dbgrant-config, dbgrant-core, dbgrant-store-sqlite, serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! Each kind is a plain typed implementation of the `dbgrant-core` resource
//! traits; [`DbgrantPlugin`] binds them to the `SQLite` catalog and registers
//! them by type name.
//!
//! | Type name | Kind | Update |
//! |-----------|------|--------|
//! | `dbgrant_database_role` | resource, data source | yes |
//! | `dbgrant_database_role_member` | resource | no |
//! | `dbgrant_database_permission` | resource | grant option only |
//! | `dbgrant_database` | data source | n/a |

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod data_sources;
pub mod identifiers;
pub mod permission;
pub mod plugin;
pub mod role;
pub mod role_member;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use data_sources::DatabaseDataSource;
pub use data_sources::DatabaseLookupData;
pub use data_sources::DatabaseRoleDataSource;
pub use data_sources::RoleLookupData;
pub use identifiers::DatabasePrincipal;
pub use identifiers::DatabasePrincipalId;
pub use identifiers::RoleMember;
pub use identifiers::RoleMemberId;
pub use identifiers::database_principal_id;
pub use identifiers::membership_parts;
pub use identifiers::principal_parts;
pub use identifiers::resolve_principal;
pub use identifiers::role_member_id;
pub use permission::DatabasePermissionResource;
pub use permission::PermissionData;
pub use plugin::DATABASE;
pub use plugin::DATABASE_PERMISSION;
pub use plugin::DATABASE_ROLE;
pub use plugin::DATABASE_ROLE_MEMBER;
pub use plugin::DbgrantPlugin;
pub use plugin::PluginError;
pub use plugin::build_registry;
pub use role::DatabaseRoleData;
pub use role::DatabaseRoleResource;
pub use role_member::RoleMemberData;
pub use role_member::RoleMemberResource;
