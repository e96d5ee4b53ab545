// crates/dbgrant-core/src/runtime/registry.rs
// ============================================================================
// Module: dbgrant Resource Registry
// Description: Registry of lifecycle handlers keyed by type name.
// Purpose: Route protocol requests to the adapter registered for a type.
// Dependencies: crate::core, crate::interfaces, thiserror
// ============================================================================

//! ## Overview
//! The plugin registers every resource and data source adapter once at
//! startup. Dispatch looks the handler up by type name and forwards the
//! protocol request unchanged. Resource and data source names live in
//! separate namespaces, so a resource and a data source may share a name.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::protocol::ProtocolRequest;
use crate::core::protocol::ProtocolResponse;
use crate::interfaces::AdapterError;
use crate::interfaces::DataSourceHandler;
use crate::interfaces::LifecycleHandler;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry failures.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A resource type was registered twice.
    #[error("resource type already registered: {0}")]
    DuplicateResource(String),
    /// A data source type was registered twice.
    #[error("data source type already registered: {0}")]
    DuplicateDataSource(String),
    /// No resource type with the requested name.
    #[error("unknown resource type: {0}")]
    UnknownResource(String),
    /// No data source type with the requested name.
    #[error("unknown data source type: {0}")]
    UnknownDataSource(String),
    /// The adapter reported a fatal failure.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Handler registry for one plugin instance.
///
/// # Invariants
/// - Type names are unique within each namespace.
/// - Registered handlers are `Send + Sync` and stored behind trait objects.
#[derive(Default)]
pub struct ResourceRegistry {
    /// Resource handlers keyed by type name.
    resources: BTreeMap<String, Box<dyn LifecycleHandler + Send + Sync>>,
    /// Data source handlers keyed by type name.
    data_sources: BTreeMap<String, Box<dyn DataSourceHandler + Send + Sync>>,
}

impl ResourceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            resources: BTreeMap::new(),
            data_sources: BTreeMap::new(),
        }
    }

    /// Registers a resource handler under its type name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateResource`] when the name is taken.
    pub fn register_resource(
        &mut self,
        handler: impl LifecycleHandler + Send + Sync + 'static,
    ) -> Result<(), RegistryError> {
        let type_name = handler.type_name().to_string();
        if self.resources.contains_key(&type_name) {
            return Err(RegistryError::DuplicateResource(type_name));
        }
        tracing::debug!(resource = %type_name, "registered resource type");
        self.resources.insert(type_name, Box::new(handler));
        Ok(())
    }

    /// Registers a data source handler under its type name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateDataSource`] when the name is taken.
    pub fn register_data_source(
        &mut self,
        handler: impl DataSourceHandler + Send + Sync + 'static,
    ) -> Result<(), RegistryError> {
        let type_name = handler.type_name().to_string();
        if self.data_sources.contains_key(&type_name) {
            return Err(RegistryError::DuplicateDataSource(type_name));
        }
        tracing::debug!(data_source = %type_name, "registered data source type");
        self.data_sources.insert(type_name, Box::new(handler));
        Ok(())
    }

    /// Returns registered resource type names in sorted order.
    #[must_use]
    pub fn resource_types(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }

    /// Returns registered data source type names in sorted order.
    #[must_use]
    pub fn data_source_types(&self) -> Vec<&str> {
        self.data_sources.keys().map(String::as_str).collect()
    }

    /// Dispatches a create request.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] for unknown types or fatal adapter failures.
    pub fn create_resource(
        &self,
        type_name: &str,
        request: &ProtocolRequest,
    ) -> Result<ProtocolResponse, RegistryError> {
        Ok(self.resource(type_name)?.create(request)?)
    }

    /// Dispatches a read request.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] for unknown types or fatal adapter failures.
    pub fn read_resource(
        &self,
        type_name: &str,
        request: &ProtocolRequest,
    ) -> Result<ProtocolResponse, RegistryError> {
        Ok(self.resource(type_name)?.read(request)?)
    }

    /// Dispatches an update request.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] for unknown types, types without update
    /// support, or fatal adapter failures.
    pub fn update_resource(
        &self,
        type_name: &str,
        request: &ProtocolRequest,
    ) -> Result<ProtocolResponse, RegistryError> {
        Ok(self.resource(type_name)?.update(request)?)
    }

    /// Dispatches a delete request.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] for unknown types or fatal adapter failures.
    pub fn delete_resource(
        &self,
        type_name: &str,
        request: &ProtocolRequest,
    ) -> Result<ProtocolResponse, RegistryError> {
        Ok(self.resource(type_name)?.delete(request)?)
    }

    /// Dispatches a resource validate request.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] for unknown types or fatal adapter failures.
    pub fn validate_resource(
        &self,
        type_name: &str,
        request: &ProtocolRequest,
    ) -> Result<ProtocolResponse, RegistryError> {
        Ok(self.resource(type_name)?.validate(request)?)
    }

    /// Dispatches a data source read request.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] for unknown types or fatal adapter failures.
    pub fn read_data_source(
        &self,
        type_name: &str,
        request: &ProtocolRequest,
    ) -> Result<ProtocolResponse, RegistryError> {
        Ok(self.data_source(type_name)?.read(request)?)
    }

    /// Dispatches a data source validate request.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] for unknown types or fatal adapter failures.
    pub fn validate_data_source(
        &self,
        type_name: &str,
        request: &ProtocolRequest,
    ) -> Result<ProtocolResponse, RegistryError> {
        Ok(self.data_source(type_name)?.validate(request)?)
    }

    /// Looks up a resource handler.
    fn resource(
        &self,
        type_name: &str,
    ) -> Result<&(dyn LifecycleHandler + Send + Sync), RegistryError> {
        self.resources
            .get(type_name)
            .map(|handler| &**handler)
            .ok_or_else(|| RegistryError::UnknownResource(type_name.to_string()))
    }

    /// Looks up a data source handler.
    fn data_source(
        &self,
        type_name: &str,
    ) -> Result<&(dyn DataSourceHandler + Send + Sync), RegistryError> {
        self.data_sources
            .get(type_name)
            .map(|handler| &**handler)
            .ok_or_else(|| RegistryError::UnknownDataSource(type_name.to_string()))
    }
}
