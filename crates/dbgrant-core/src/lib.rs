// crates/dbgrant-core/src/lib.rs
// ============================================================================
// Module: dbgrant Core
// Description: Resource adaptation layer for a database permission plugin.
// Purpose: Decode protocol requests, drive typed resource logic, and report diagnostics.
// Dependencies: serde, serde_json, thiserror, tracing, tracing-subscriber
// ============================================================================

//! ## Overview
//! `dbgrant-core` turns untyped lifecycle requests from an infrastructure
//! orchestrator into calls on strongly typed resource implementations:
//! - [`CompositeId`] encodes multi-part identifiers as `/`-joined strings and
//!   rejects malformed input with user-facing diagnostics.
//! - [`Pipeline`] sequences side-effecting steps and stops after the first
//!   error recorded in the invocation's [`Diagnostics`].
//! - [`ResourceAdapter`] and [`DataSourceAdapter`] decode attribute bags,
//!   acquire a connection through a [`ConnectionFactory`], and encode state.
//! - [`ResourceRegistry`] routes requests by registered type name.
//!
//! Invariants:
//! - Each invocation owns one diagnostics sink; nothing is shared across invocations.
//! - A response carries new state only when no error was recorded.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;
pub mod telemetry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::diagnostics::Diagnostic;
pub use crate::core::diagnostics::Diagnostics;
pub use crate::core::diagnostics::Severity;
pub use crate::core::identifiers::AnyIdentifier;
pub use crate::core::identifiers::CompositeId;
pub use crate::core::identifiers::DatabaseId;
pub use crate::core::identifiers::ELEMENT_DELIMITER;
pub use crate::core::identifiers::EntityId;
pub use crate::core::identifiers::IdentifierError;
pub use crate::core::identifiers::IdentifierKind;
pub use crate::core::identifiers::IdentifierState;
pub use crate::core::identifiers::NumericId;
pub use crate::core::identifiers::PermissionId;
pub use crate::core::identifiers::PrincipalId;
pub use crate::core::identifiers::decode_elements;
pub use crate::core::identifiers::encode_elements;
pub use crate::core::lifecycle::CreateRequest;
pub use crate::core::lifecycle::CreateResponse;
pub use crate::core::lifecycle::DataSourceReadRequest;
pub use crate::core::lifecycle::DeleteRequest;
pub use crate::core::lifecycle::ReadRequest;
pub use crate::core::lifecycle::ReadResponse;
pub use crate::core::lifecycle::StateResponse;
pub use crate::core::lifecycle::UpdateRequest;
pub use crate::core::lifecycle::UpdateResponse;
pub use crate::core::lifecycle::ValidateRequest;
pub use crate::core::protocol::AttributeBag;
pub use crate::core::protocol::InvocationOutcome;
pub use crate::core::protocol::LifecycleOperation;
pub use crate::core::protocol::ProtocolRequest;
pub use crate::core::protocol::ProtocolResponse;
pub use crate::interfaces::AdapterError;
pub use crate::interfaces::ConnectionFactory;
pub use crate::interfaces::DataSource;
pub use crate::interfaces::DataSourceHandler;
pub use crate::interfaces::LifecycleHandler;
pub use crate::interfaces::Resource;
pub use crate::interfaces::UpdatableResource;
pub use crate::interfaces::ValidatedDataSource;
pub use crate::interfaces::ValidatedResource;
pub use crate::runtime::adapter::DataSourceAdapter;
pub use crate::runtime::adapter::ResourceAdapter;
pub use crate::runtime::pipeline::Pipeline;
pub use crate::runtime::registry::RegistryError;
pub use crate::runtime::registry::ResourceRegistry;
pub use crate::telemetry::LoggingConfig;
pub use crate::telemetry::TelemetryError;
pub use crate::telemetry::init_logging;
