// crates/dbgrant-resources/src/plugin.rs
// ============================================================================
// Module: dbgrant Plugin Bootstrap
// Description: Builds the registry of resource and data source kinds.
// Purpose: Wire configuration, the catalog store, and lifecycle adapters together.
// Dependencies: dbgrant-config, dbgrant-core, dbgrant-store-sqlite, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`DbgrantPlugin`] owns one [`SqliteConnectionFactory`] shared by every
//! adapter, and a [`ResourceRegistry`] with each kind registered once under
//! its type name. Capabilities are bound here: roles and permissions support
//! update, memberships do not.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;

use dbgrant_config::ConfigError;
use dbgrant_config::DbgrantConfig;
use dbgrant_core::DataSourceAdapter;
use dbgrant_core::RegistryError;
use dbgrant_core::ResourceAdapter;
use dbgrant_core::ResourceRegistry;
use dbgrant_core::TelemetryError;
use dbgrant_core::init_logging;
use dbgrant_store_sqlite::SqliteConnectionFactory;
use dbgrant_store_sqlite::SqliteStoreError;
use thiserror::Error;

use crate::data_sources::DatabaseDataSource;
use crate::data_sources::DatabaseRoleDataSource;
use crate::permission::DatabasePermissionResource;
use crate::role::DatabaseRoleResource;
use crate::role_member::RoleMemberResource;

// ============================================================================
// SECTION: Type Names
// ============================================================================

/// Type name of the database role resource and data source.
pub const DATABASE_ROLE: &str = "dbgrant_database_role";
/// Type name of the role membership resource.
pub const DATABASE_ROLE_MEMBER: &str = "dbgrant_database_role_member";
/// Type name of the database permission resource.
pub const DATABASE_PERMISSION: &str = "dbgrant_database_permission";
/// Type name of the database data source.
pub const DATABASE: &str = "dbgrant_database";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Plugin bootstrap errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Logging could not be initialized.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    /// The catalog store could not be opened.
    #[error(transparent)]
    Store(#[from] SqliteStoreError),
    /// A kind could not be registered.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

// ============================================================================
// SECTION: Plugin
// ============================================================================

/// Configured plugin: the catalog store plus every registered kind.
pub struct DbgrantPlugin {
    /// Shared connection factory.
    factory: Arc<SqliteConnectionFactory>,
    /// Registered kinds.
    registry: ResourceRegistry,
}

impl DbgrantPlugin {
    /// Builds the plugin from a validated config.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError`] when the config is invalid, the store cannot be
    /// opened, or a kind fails to register.
    pub fn new(config: &DbgrantConfig) -> Result<Self, PluginError> {
        config.validate()?;
        let factory = Arc::new(SqliteConnectionFactory::new(config.store.clone())?);
        let registry = build_registry(&factory)?;
        tracing::info!(
            resources = registry.resource_types().len(),
            data_sources = registry.data_source_types().len(),
            "plugin ready"
        );
        Ok(Self {
            factory,
            registry,
        })
    }

    /// Loads the config file, installs logging, and builds the plugin.
    ///
    /// An already installed subscriber is kept.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError`] when loading, logging setup, or construction fails.
    pub fn from_config_file(path: Option<&Path>) -> Result<Self, PluginError> {
        let config = DbgrantConfig::load(path)?;
        match init_logging(&config.logging) {
            Ok(()) | Err(TelemetryError::AlreadyInitialized(_)) => {}
            Err(error) => return Err(error.into()),
        }
        Self::new(&config)
    }

    /// Returns the registry used for dispatch.
    #[must_use]
    pub const fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Returns the shared connection factory.
    #[must_use]
    pub fn factory(&self) -> &SqliteConnectionFactory {
        &self.factory
    }
}

/// Registers every resource and data source kind against `factory`.
///
/// # Errors
///
/// Returns [`RegistryError`] when a type name is registered twice.
pub fn build_registry(
    factory: &Arc<SqliteConnectionFactory>,
) -> Result<ResourceRegistry, RegistryError> {
    let mut registry = ResourceRegistry::new();
    registry.register_resource(
        ResourceAdapter::new(DATABASE_ROLE, DatabaseRoleResource, Arc::clone(factory))
            .with_update()
            .with_validation(),
    )?;
    registry.register_resource(
        ResourceAdapter::new(DATABASE_ROLE_MEMBER, RoleMemberResource, Arc::clone(factory))
            .with_validation(),
    )?;
    registry.register_resource(
        ResourceAdapter::new(DATABASE_PERMISSION, DatabasePermissionResource, Arc::clone(factory))
            .with_update()
            .with_validation(),
    )?;
    registry.register_data_source(DataSourceAdapter::new(
        DATABASE,
        DatabaseDataSource,
        Arc::clone(factory),
    ))?;
    registry.register_data_source(
        DataSourceAdapter::new(DATABASE_ROLE, DatabaseRoleDataSource, Arc::clone(factory))
            .with_validation(),
    )?;
    Ok(registry)
}
