// crates/dbgrant-store-sqlite/src/connection.rs
// ============================================================================
// Module: SQLite Catalog Connection
// Description: Entity operations over one catalog connection.
// Purpose: Read and write databases, principals, memberships, and permissions.
// Dependencies: dbgrant-core, rusqlite, tracing
// ============================================================================

//! ## Overview
//! [`SqlConnection`] exposes each catalog operation twice over: a private
//! fallible form returning [`SqliteStoreError`], and a public form that takes
//! the invocation's [`Diagnostics`] and records a failure as an error
//! diagnostic (stable summary, store error as detail). The public form is what
//! pipeline steps call.
//!
//! "find" operations return `None` without a diagnostic when the row is
//! absent; "get" operations treat absence as an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use dbgrant_core::DatabaseId;
use dbgrant_core::Diagnostics;
use dbgrant_core::PrincipalId;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;

use crate::store::SqliteStoreError;

// ============================================================================
// SECTION: Records
// ============================================================================

/// Database catalog row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseRecord {
    /// Store-assigned identifier.
    pub id: DatabaseId,
    /// Unique database name.
    pub name: String,
}

/// Principal kind.
///
/// # Invariants
/// - Values map 1:1 to the catalog `type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrincipalType {
    /// Database role.
    Role,
    /// Database user.
    SqlUser,
}

impl PrincipalType {
    /// Returns the catalog column value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Role => "ROLE",
            Self::SqlUser => "SQL_USER",
        }
    }

    /// Parses a catalog column value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ROLE" => Some(Self::Role),
            "SQL_USER" => Some(Self::SqlUser),
            _ => None,
        }
    }
}

impl fmt::Display for PrincipalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Principal catalog row.
///
/// # Invariants
/// - `name` is unique within `database_id`.
/// - `owner_id`, when set, refers to a principal of the same store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalRecord {
    /// Store-assigned identifier, unique across databases.
    pub id: PrincipalId,
    /// Owning database.
    pub database_id: DatabaseId,
    /// Principal name.
    pub name: String,
    /// Principal kind.
    pub principal_type: PrincipalType,
    /// Owning principal, when any.
    pub owner_id: Option<PrincipalId>,
}

/// Permission grant row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRecord {
    /// Grantee.
    pub principal_id: PrincipalId,
    /// Permission name, stored verbatim.
    pub permission: String,
    /// Whether the grantee may grant the permission onward.
    pub with_grant_option: bool,
}

// ============================================================================
// SECTION: Connection
// ============================================================================

/// Principal column list shared by principal queries.
const PRINCIPAL_COLUMNS: &str = "principal_id, database_id, name, type, owner_principal_id";

/// Open connection to the catalog, scoped to one lifecycle invocation.
pub struct SqlConnection {
    /// Underlying `SQLite` connection.
    connection: Connection,
}

impl SqlConnection {
    /// Wraps an initialized connection.
    pub(crate) const fn new(connection: Connection) -> Self {
        Self {
            connection,
        }
    }

    // ------------------------------------------------------------------------
    // Databases
    // ------------------------------------------------------------------------

    /// Creates a database.
    ///
    /// Databases are provisioned by the host, not by a resource kind; hosts
    /// and test fixtures call this to seed the catalog.
    pub fn create_database(
        &self,
        name: &str,
        diagnostics: &mut Diagnostics,
    ) -> Option<DatabaseRecord> {
        record(self.try_create_database(name), "Unable to create database", diagnostics)
    }

    /// Reads a database that must exist.
    pub fn get_database(
        &self,
        id: DatabaseId,
        diagnostics: &mut Diagnostics,
    ) -> Option<DatabaseRecord> {
        let result = self.try_find_database(id).and_then(|found| {
            found.ok_or_else(|| SqliteStoreError::NotFound(format!("database {id}")))
        });
        record(result, "Unable to read database", diagnostics)
    }

    /// Looks up a database by name.
    pub fn find_database_by_name(
        &self,
        name: &str,
        diagnostics: &mut Diagnostics,
    ) -> Option<DatabaseRecord> {
        record(self.try_find_database_by_name(name), "Unable to look up database", diagnostics)
            .flatten()
    }

    // ------------------------------------------------------------------------
    // Principals
    // ------------------------------------------------------------------------

    /// Creates a database role.
    pub fn create_database_role(
        &self,
        database_id: DatabaseId,
        name: &str,
        owner_id: Option<PrincipalId>,
        diagnostics: &mut Diagnostics,
    ) -> Option<PrincipalRecord> {
        record(
            self.try_create_principal(database_id, name, PrincipalType::Role, owner_id),
            "Unable to create database role",
            diagnostics,
        )
    }

    /// Creates a database user.
    ///
    /// Users are provisioned by the host, not by a resource kind; hosts and
    /// test fixtures call this to seed grantees and members.
    pub fn create_user(
        &self,
        database_id: DatabaseId,
        name: &str,
        diagnostics: &mut Diagnostics,
    ) -> Option<PrincipalRecord> {
        record(
            self.try_create_principal(database_id, name, PrincipalType::SqlUser, None),
            "Unable to create database user",
            diagnostics,
        )
    }

    /// Looks up a principal; absence is not an error.
    pub fn find_principal(
        &self,
        id: PrincipalId,
        diagnostics: &mut Diagnostics,
    ) -> Option<PrincipalRecord> {
        record(self.try_find_principal(id), "Unable to look up principal", diagnostics).flatten()
    }

    /// Reads a principal that must exist.
    pub fn get_principal(
        &self,
        id: PrincipalId,
        diagnostics: &mut Diagnostics,
    ) -> Option<PrincipalRecord> {
        let result = self.try_find_principal(id).and_then(|found| {
            found.ok_or_else(|| SqliteStoreError::NotFound(format!("principal {id}")))
        });
        record(result, "Unable to read principal", diagnostics)
    }

    /// Looks up a principal by database and name.
    pub fn find_principal_by_name(
        &self,
        database_id: DatabaseId,
        name: &str,
        diagnostics: &mut Diagnostics,
    ) -> Option<PrincipalRecord> {
        record(
            self.try_find_principal_by_name(database_id, name),
            "Unable to look up principal",
            diagnostics,
        )
        .flatten()
    }

    /// Renames a database role and sets its owner.
    pub fn update_database_role(
        &self,
        id: PrincipalId,
        name: &str,
        owner_id: Option<PrincipalId>,
        diagnostics: &mut Diagnostics,
    ) -> Option<PrincipalRecord> {
        record(
            self.try_update_database_role(id, name, owner_id),
            "Unable to update database role",
            diagnostics,
        )
    }

    /// Drops a database role.
    ///
    /// Dropping an absent role succeeds. Fails while the role still has
    /// members, owns principals, or holds permissions.
    pub fn drop_database_role(&self, id: PrincipalId, diagnostics: &mut Diagnostics) {
        record(self.try_drop_database_role(id), "Unable to drop database role", diagnostics);
    }

    // ------------------------------------------------------------------------
    // Role Membership
    // ------------------------------------------------------------------------

    /// Adds `member_id` to `role_id`.
    pub fn add_role_member(
        &self,
        role_id: PrincipalId,
        member_id: PrincipalId,
        diagnostics: &mut Diagnostics,
    ) {
        record(
            self.try_add_role_member(role_id, member_id),
            "Unable to add role member",
            diagnostics,
        );
    }

    /// Returns true when `member_id` belongs to `role_id`.
    pub fn has_role_member(
        &self,
        role_id: PrincipalId,
        member_id: PrincipalId,
        diagnostics: &mut Diagnostics,
    ) -> bool {
        record(
            self.try_has_role_member(role_id, member_id),
            "Unable to look up role member",
            diagnostics,
        )
        .unwrap_or(false)
    }

    /// Removes `member_id` from `role_id`; an absent membership is not an error.
    pub fn remove_role_member(
        &self,
        role_id: PrincipalId,
        member_id: PrincipalId,
        diagnostics: &mut Diagnostics,
    ) {
        record(
            self.try_remove_role_member(role_id, member_id),
            "Unable to remove role member",
            diagnostics,
        );
    }

    // ------------------------------------------------------------------------
    // Permissions
    // ------------------------------------------------------------------------

    /// Grants a permission.
    pub fn grant_permission(
        &self,
        principal_id: PrincipalId,
        permission: &str,
        with_grant_option: bool,
        diagnostics: &mut Diagnostics,
    ) -> Option<PermissionRecord> {
        record(
            self.try_grant_permission(principal_id, permission, with_grant_option),
            "Unable to grant permission",
            diagnostics,
        )
    }

    /// Looks up a permission grant; absence is not an error.
    pub fn find_permission(
        &self,
        principal_id: PrincipalId,
        permission: &str,
        diagnostics: &mut Diagnostics,
    ) -> Option<PermissionRecord> {
        record(
            self.try_find_permission(principal_id, permission),
            "Unable to look up permission",
            diagnostics,
        )
        .flatten()
    }

    /// Changes the grant option of an existing grant.
    pub fn update_permission(
        &self,
        principal_id: PrincipalId,
        permission: &str,
        with_grant_option: bool,
        diagnostics: &mut Diagnostics,
    ) -> Option<PermissionRecord> {
        record(
            self.try_update_permission(principal_id, permission, with_grant_option),
            "Unable to update permission",
            diagnostics,
        )
    }

    /// Revokes a permission; an absent grant is not an error.
    pub fn revoke_permission(
        &self,
        principal_id: PrincipalId,
        permission: &str,
        diagnostics: &mut Diagnostics,
    ) {
        record(
            self.try_revoke_permission(principal_id, permission),
            "Unable to revoke permission",
            diagnostics,
        );
    }

    // ------------------------------------------------------------------------
    // Fallible Operations
    // ------------------------------------------------------------------------

    /// Inserts a database row.
    fn try_create_database(&self, name: &str) -> Result<DatabaseRecord, SqliteStoreError> {
        self.connection.execute("INSERT INTO databases (name) VALUES (?1)", params![name])?;
        let id = database_id(self.connection.last_insert_rowid())?;
        Ok(DatabaseRecord {
            id,
            name: name.to_string(),
        })
    }

    /// Selects a database row by id.
    fn try_find_database(&self, id: DatabaseId) -> Result<Option<DatabaseRecord>, SqliteStoreError> {
        let row = self
            .connection
            .query_row(
                "SELECT database_id, name FROM databases WHERE database_id = ?1",
                params![id.get()],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        row.map(|(raw, name)| {
            Ok(DatabaseRecord {
                id: database_id(raw)?,
                name,
            })
        })
        .transpose()
    }

    /// Selects a database row by name.
    fn try_find_database_by_name(
        &self,
        name: &str,
    ) -> Result<Option<DatabaseRecord>, SqliteStoreError> {
        let raw: Option<i64> = self
            .connection
            .query_row(
                "SELECT database_id FROM databases WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|raw| {
            Ok(DatabaseRecord {
                id: database_id(raw)?,
                name: name.to_string(),
            })
        })
        .transpose()
    }

    /// Inserts a principal row after checking the owner's database.
    fn try_create_principal(
        &self,
        database_id: DatabaseId,
        name: &str,
        principal_type: PrincipalType,
        owner_id: Option<PrincipalId>,
    ) -> Result<PrincipalRecord, SqliteStoreError> {
        if let Some(owner_id) = owner_id {
            self.require_same_database(owner_id, database_id)?;
        }
        self.connection.execute(
            "INSERT INTO principals (database_id, name, type, owner_principal_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![database_id.get(), name, principal_type.as_str(), owner_id.map(PrincipalId::get)],
        )?;
        let id = principal_id(self.connection.last_insert_rowid())?;
        Ok(PrincipalRecord {
            id,
            database_id,
            name: name.to_string(),
            principal_type,
            owner_id,
        })
    }

    /// Selects a principal row by id.
    fn try_find_principal(
        &self,
        id: PrincipalId,
    ) -> Result<Option<PrincipalRecord>, SqliteStoreError> {
        let sql = format!("SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE principal_id = ?1");
        self.connection.query_row(&sql, params![id.get()], read_principal_row).optional()?.transpose()
    }

    /// Selects a principal row by database and name.
    fn try_find_principal_by_name(
        &self,
        database_id: DatabaseId,
        name: &str,
    ) -> Result<Option<PrincipalRecord>, SqliteStoreError> {
        let sql = format!(
            "SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE database_id = ?1 AND name = ?2"
        );
        self.connection
            .query_row(&sql, params![database_id.get(), name], read_principal_row)
            .optional()?
            .transpose()
    }

    /// Updates a role row.
    fn try_update_database_role(
        &self,
        id: PrincipalId,
        name: &str,
        owner_id: Option<PrincipalId>,
    ) -> Result<PrincipalRecord, SqliteStoreError> {
        let existing = self.require_role(id)?;
        if let Some(owner_id) = owner_id {
            self.require_same_database(owner_id, existing.database_id)?;
        }
        self.connection.execute(
            "UPDATE principals SET name = ?1, owner_principal_id = ?2 WHERE principal_id = ?3",
            params![name, owner_id.map(PrincipalId::get), id.get()],
        )?;
        Ok(PrincipalRecord {
            name: name.to_string(),
            owner_id,
            ..existing
        })
    }

    /// Deletes a role row; an absent principal is already dropped.
    fn try_drop_database_role(&self, id: PrincipalId) -> Result<(), SqliteStoreError> {
        let Some(principal) = self.try_find_principal(id)? else {
            tracing::debug!(role = %id, "role already absent");
            return Ok(());
        };
        if principal.principal_type != PrincipalType::Role {
            return Err(SqliteStoreError::Invalid(format!("principal {id} is not a role")));
        }
        self.connection.execute("DELETE FROM principals WHERE principal_id = ?1", params![id.get()])?;
        Ok(())
    }

    /// Inserts a membership row after checking kinds and databases.
    fn try_add_role_member(
        &self,
        role_id: PrincipalId,
        member_id: PrincipalId,
    ) -> Result<(), SqliteStoreError> {
        let role = self.require_role(role_id)?;
        self.require_same_database(member_id, role.database_id)?;
        if role_id == member_id {
            return Err(SqliteStoreError::Invalid(format!("role {role_id} cannot be its own member")));
        }
        self.connection.execute(
            "INSERT INTO role_members (role_principal_id, member_principal_id) VALUES (?1, ?2)",
            params![role_id.get(), member_id.get()],
        )?;
        Ok(())
    }

    /// Checks for a membership row.
    fn try_has_role_member(
        &self,
        role_id: PrincipalId,
        member_id: PrincipalId,
    ) -> Result<bool, SqliteStoreError> {
        let found: Option<i64> = self
            .connection
            .query_row(
                "SELECT 1 FROM role_members WHERE role_principal_id = ?1 AND member_principal_id = ?2",
                params![role_id.get(), member_id.get()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Deletes a membership row.
    fn try_remove_role_member(
        &self,
        role_id: PrincipalId,
        member_id: PrincipalId,
    ) -> Result<(), SqliteStoreError> {
        let removed = self.connection.execute(
            "DELETE FROM role_members WHERE role_principal_id = ?1 AND member_principal_id = ?2",
            params![role_id.get(), member_id.get()],
        )?;
        if removed == 0 {
            tracing::debug!(role = %role_id, member = %member_id, "membership already absent");
        }
        Ok(())
    }

    /// Inserts a permission row.
    fn try_grant_permission(
        &self,
        principal_id: PrincipalId,
        permission: &str,
        with_grant_option: bool,
    ) -> Result<PermissionRecord, SqliteStoreError> {
        self.connection.execute(
            "INSERT INTO database_permissions (principal_id, permission_name, with_grant_option)
             VALUES (?1, ?2, ?3)",
            params![principal_id.get(), permission, with_grant_option],
        )?;
        Ok(PermissionRecord {
            principal_id,
            permission: permission.to_string(),
            with_grant_option,
        })
    }

    /// Selects a permission row.
    fn try_find_permission(
        &self,
        principal_id: PrincipalId,
        permission: &str,
    ) -> Result<Option<PermissionRecord>, SqliteStoreError> {
        let with_grant_option: Option<bool> = self
            .connection
            .query_row(
                "SELECT with_grant_option FROM database_permissions
                 WHERE principal_id = ?1 AND permission_name = ?2",
                params![principal_id.get(), permission],
                |row| row.get(0),
            )
            .optional()?;
        Ok(with_grant_option.map(|with_grant_option| PermissionRecord {
            principal_id,
            permission: permission.to_string(),
            with_grant_option,
        }))
    }

    /// Updates the grant option of a permission row.
    fn try_update_permission(
        &self,
        principal_id: PrincipalId,
        permission: &str,
        with_grant_option: bool,
    ) -> Result<PermissionRecord, SqliteStoreError> {
        let updated = self.connection.execute(
            "UPDATE database_permissions SET with_grant_option = ?1
             WHERE principal_id = ?2 AND permission_name = ?3",
            params![with_grant_option, principal_id.get(), permission],
        )?;
        if updated == 0 {
            return Err(SqliteStoreError::NotFound(format!(
                "permission {permission} for principal {principal_id}"
            )));
        }
        Ok(PermissionRecord {
            principal_id,
            permission: permission.to_string(),
            with_grant_option,
        })
    }

    /// Deletes a permission row.
    fn try_revoke_permission(
        &self,
        principal_id: PrincipalId,
        permission: &str,
    ) -> Result<(), SqliteStoreError> {
        self.connection.execute(
            "DELETE FROM database_permissions WHERE principal_id = ?1 AND permission_name = ?2",
            params![principal_id.get(), permission],
        )?;
        Ok(())
    }

    /// Returns the principal when it is a role.
    fn require_role(&self, id: PrincipalId) -> Result<PrincipalRecord, SqliteStoreError> {
        let principal = self
            .try_find_principal(id)?
            .ok_or_else(|| SqliteStoreError::NotFound(format!("principal {id}")))?;
        if principal.principal_type != PrincipalType::Role {
            return Err(SqliteStoreError::Invalid(format!("principal {id} is not a role")));
        }
        Ok(principal)
    }

    /// Fails unless `id` exists in `database_id`.
    fn require_same_database(
        &self,
        id: PrincipalId,
        database_id: DatabaseId,
    ) -> Result<(), SqliteStoreError> {
        let principal = self
            .try_find_principal(id)?
            .ok_or_else(|| SqliteStoreError::NotFound(format!("principal {id}")))?;
        if principal.database_id != database_id {
            return Err(SqliteStoreError::Invalid(format!(
                "principal {id} belongs to database {}, not {database_id}",
                principal.database_id
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Records a failed store call as an error diagnostic.
fn record<T>(
    result: Result<T, SqliteStoreError>,
    summary: &str,
    diagnostics: &mut Diagnostics,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::debug!(error = %err, "catalog operation failed");
            diagnostics.add_error(summary, err.to_string());
            None
        }
    }
}

/// Converts a raw column value into a database id.
fn database_id(raw: i64) -> Result<DatabaseId, SqliteStoreError> {
    DatabaseId::from_raw(raw)
        .ok_or_else(|| SqliteStoreError::Invalid(format!("negative database id: {raw}")))
}

/// Converts a raw column value into a principal id.
fn principal_id(raw: i64) -> Result<PrincipalId, SqliteStoreError> {
    PrincipalId::from_raw(raw)
        .ok_or_else(|| SqliteStoreError::Invalid(format!("negative principal id: {raw}")))
}

/// Maps a principal row; id conversion failures surface as the inner result.
fn read_principal_row(row: &Row<'_>) -> rusqlite::Result<Result<PrincipalRecord, SqliteStoreError>> {
    let id: i64 = row.get(0)?;
    let database: i64 = row.get(1)?;
    let name: String = row.get(2)?;
    let kind: String = row.get(3)?;
    let owner: Option<i64> = row.get(4)?;
    Ok(build_principal(id, database, name, &kind, owner))
}

/// Assembles a principal record from raw column values.
fn build_principal(
    id: i64,
    database: i64,
    name: String,
    kind: &str,
    owner: Option<i64>,
) -> Result<PrincipalRecord, SqliteStoreError> {
    let principal_type = PrincipalType::parse(kind)
        .ok_or_else(|| SqliteStoreError::Invalid(format!("unknown principal type: {kind}")))?;
    Ok(PrincipalRecord {
        id: principal_id(id)?,
        database_id: database_id(database)?,
        name,
        principal_type,
        owner_id: owner.map(principal_id).transpose()?,
    })
}
