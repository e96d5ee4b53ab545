// crates/dbgrant-core/src/interfaces/mod.rs
// ============================================================================
// Module: dbgrant Interfaces
// Description: Contracts between the lifecycle adapter, resource kinds, and the SQL layer.
// Purpose: Keep the adapter independent of any concrete entity kind or store.
// Dependencies: crate::core, serde, thiserror
// ============================================================================

//! ## Overview
//! Resource kinds implement [`Resource`] and, where they support them, the
//! optional capability traits [`UpdatableResource`] and [`ValidatedResource`].
//! Capabilities are bound when an adapter is built, so dispatch needs no
//! runtime type inspection. The SQL access layer is reached only through
//! [`ConnectionFactory`].
//!
//! [`LifecycleHandler`] and [`DataSourceHandler`] are the object-safe,
//! protocol-shaped faces the registry stores.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::core::diagnostics::Diagnostics;
use crate::core::lifecycle::CreateRequest;
use crate::core::lifecycle::CreateResponse;
use crate::core::lifecycle::DataSourceReadRequest;
use crate::core::lifecycle::DeleteRequest;
use crate::core::lifecycle::ReadRequest;
use crate::core::lifecycle::ReadResponse;
use crate::core::lifecycle::UpdateRequest;
use crate::core::lifecycle::UpdateResponse;
use crate::core::lifecycle::ValidateRequest;
use crate::core::protocol::LifecycleOperation;
use crate::core::protocol::ProtocolRequest;
use crate::core::protocol::ProtocolResponse;

// ============================================================================
// SECTION: Connection Factory
// ============================================================================

/// Source of connections to the managed store.
///
/// # Invariants
/// - Each call returns a fresh connection scoped to one invocation.
/// - Failures are recorded in `diagnostics` and yield `None`.
pub trait ConnectionFactory: Send + Sync {
    /// Connection handle passed to resource implementations.
    type Connection;

    /// Opens a connection.
    fn connect(&self, diagnostics: &mut Diagnostics) -> Option<Self::Connection>;
}

// ============================================================================
// SECTION: Resource Kinds
// ============================================================================

/// Business logic for one managed entity kind.
pub trait Resource: Send + Sync {
    /// Typed attribute record.
    type Data: Serialize + DeserializeOwned;
    /// Connection handle required by the implementation.
    type Connection;

    /// Creates the entity and records its state.
    fn create(
        &self,
        request: CreateRequest<'_, Self::Data, Self::Connection>,
        response: &mut CreateResponse<Self::Data>,
    );

    /// Refreshes the entity; records no state when it no longer exists.
    fn read(
        &self,
        request: ReadRequest<'_, Self::Data, Self::Connection>,
        response: &mut ReadResponse<Self::Data>,
    );

    /// Destroys the entity.
    fn delete(&self, request: DeleteRequest<'_, Self::Data, Self::Connection>);
}

/// Resource kinds that can be modified in place.
pub trait UpdatableResource: Resource {
    /// Applies planned changes and records the resulting state.
    fn update(
        &self,
        request: UpdateRequest<'_, Self::Data, Self::Connection>,
        response: &mut UpdateResponse<Self::Data>,
    );
}

/// Resource kinds with cross-field configuration checks.
pub trait ValidatedResource: Resource {
    /// Records diagnostics for inconsistent configuration.
    fn validate(&self, request: ValidateRequest<'_, Self::Data>);
}

/// Read-only lookup of an existing entity.
pub trait DataSource: Send + Sync {
    /// Typed attribute record.
    type Data: Serialize + DeserializeOwned;
    /// Connection handle required by the implementation.
    type Connection;

    /// Looks up the entity and records its state.
    fn read(
        &self,
        request: DataSourceReadRequest<'_, Self::Data, Self::Connection>,
        response: &mut ReadResponse<Self::Data>,
    );
}

/// Data sources with cross-field configuration checks.
pub trait ValidatedDataSource: DataSource {
    /// Records diagnostics for inconsistent configuration.
    fn validate(&self, request: ValidateRequest<'_, Self::Data>);
}

// ============================================================================
// SECTION: Protocol Handlers
// ============================================================================

/// Fatal adapter failures.
///
/// These indicate misconfiguration rather than user error and are never
/// reported as diagnostics.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// The kind does not implement the requested operation.
    #[error("{type_name} does not support {operation}")]
    UnsupportedOperation {
        /// Registered type name.
        type_name: String,
        /// Requested operation.
        operation: LifecycleOperation,
    },
    /// Typed state could not be encoded into an attribute bag.
    #[error("failed to encode {type_name} state: {message}")]
    StateEncoding {
        /// Registered type name.
        type_name: String,
        /// Encoder error message.
        message: String,
    },
}

/// Protocol-shaped entry points of a resource kind.
pub trait LifecycleHandler {
    /// Returns the registered type name.
    fn type_name(&self) -> &str;

    /// Handles a create request.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] on fatal misconfiguration.
    fn create(&self, request: &ProtocolRequest) -> Result<ProtocolResponse, AdapterError>;

    /// Handles a read request.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] on fatal misconfiguration.
    fn read(&self, request: &ProtocolRequest) -> Result<ProtocolResponse, AdapterError>;

    /// Handles an update request.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::UnsupportedOperation`] when the kind cannot be updated.
    fn update(&self, request: &ProtocolRequest) -> Result<ProtocolResponse, AdapterError>;

    /// Handles a delete request.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] on fatal misconfiguration.
    fn delete(&self, request: &ProtocolRequest) -> Result<ProtocolResponse, AdapterError>;

    /// Handles a validate request.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] on fatal misconfiguration.
    fn validate(&self, request: &ProtocolRequest) -> Result<ProtocolResponse, AdapterError>;
}

/// Protocol-shaped entry points of a data source kind.
pub trait DataSourceHandler {
    /// Returns the registered type name.
    fn type_name(&self) -> &str;

    /// Handles a read request.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] on fatal misconfiguration.
    fn read(&self, request: &ProtocolRequest) -> Result<ProtocolResponse, AdapterError>;

    /// Handles a validate request.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] on fatal misconfiguration.
    fn validate(&self, request: &ProtocolRequest) -> Result<ProtocolResponse, AdapterError>;
}
