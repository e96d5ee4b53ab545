// crates/dbgrant-core/src/runtime/adapter.rs
// ============================================================================
// Module: dbgrant Lifecycle Adapter
// Description: Binds typed resource implementations to protocol-shaped entry points.
// Purpose: Decode attribute bags, run the bound operation, and encode the result.
// Dependencies: crate::core, crate::interfaces, serde, serde_json, tracing
// ============================================================================

//! ## Overview
//! Each invocation moves through `Decoding -> Executing -> {Succeeded,
//! Removed, Failed}`:
//! - A fresh [`Diagnostics`] sink and a `tracing` span are set up before
//!   anything else runs.
//! - Decoding failures (malformed identifiers, wrong arity, wrong types) end
//!   the invocation before a connection is acquired.
//! - Executing opens a [`Pipeline`] whose first step acquires a connection and
//!   whose second step hands a nested pipeline to the bound implementation.
//! - Any error diagnostic yields a response with no state.
//!
//! Optional capabilities (update, validate) are captured as function
//! pointers when the adapter is built.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

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
use crate::core::protocol::AttributeBag;
use crate::core::protocol::InvocationOutcome;
use crate::core::protocol::LifecycleOperation;
use crate::core::protocol::ProtocolRequest;
use crate::core::protocol::ProtocolResponse;
use crate::interfaces::AdapterError;
use crate::interfaces::ConnectionFactory;
use crate::interfaces::DataSource;
use crate::interfaces::DataSourceHandler;
use crate::interfaces::LifecycleHandler;
use crate::interfaces::Resource;
use crate::interfaces::UpdatableResource;
use crate::interfaces::ValidatedDataSource;
use crate::interfaces::ValidatedResource;
use crate::runtime::pipeline::Pipeline;

// ============================================================================
// SECTION: Capability Pointers
// ============================================================================

/// Bound update operation of a resource kind.
type UpdateFn<R> = for<'a> fn(
    &R,
    UpdateRequest<'a, <R as Resource>::Data, <R as Resource>::Connection>,
    &mut UpdateResponse<<R as Resource>::Data>,
);

/// Bound validate operation of a resource or data source kind.
type ValidateFn<T, D> = for<'a> fn(&T, ValidateRequest<'a, D>);

// ============================================================================
// SECTION: Resource Adapter
// ============================================================================

/// Protocol-shaped wrapper around a resource implementation.
///
/// # Invariants
/// - One sink and one pipeline per invocation; nothing is shared between invocations.
/// - Update and validate run only when the capability was bound.
pub struct ResourceAdapter<R: Resource, F> {
    /// Registered type name.
    type_name: String,
    /// Business logic implementation.
    resource: R,
    /// Shared connection factory.
    factory: Arc<F>,
    /// Bound update capability.
    update: Option<UpdateFn<R>>,
    /// Bound validate capability.
    validate: Option<ValidateFn<R, R::Data>>,
}

impl<R, F> ResourceAdapter<R, F>
where
    R: Resource,
    F: ConnectionFactory<Connection = R::Connection>,
{
    /// Creates an adapter supporting create, read, and delete.
    #[must_use]
    pub fn new(type_name: impl Into<String>, resource: R, factory: Arc<F>) -> Self {
        Self {
            type_name: type_name.into(),
            resource,
            factory,
            update: None,
            validate: None,
        }
    }

    /// Binds the update capability.
    #[must_use]
    pub fn with_update(mut self) -> Self
    where
        R: UpdatableResource,
    {
        let update: UpdateFn<R> = <R as UpdatableResource>::update;
        self.update = Some(update);
        self
    }

    /// Binds the validate capability.
    #[must_use]
    pub fn with_validation(mut self) -> Self
    where
        R: ValidatedResource,
    {
        let validate: ValidateFn<R, R::Data> = <R as ValidatedResource>::validate;
        self.validate = Some(validate);
        self
    }

    /// Returns true when update is supported.
    #[must_use]
    pub const fn supports_update(&self) -> bool {
        self.update.is_some()
    }

    /// Returns true when validate is bound.
    #[must_use]
    pub const fn supports_validation(&self) -> bool {
        self.validate.is_some()
    }
}

impl<R, F> LifecycleHandler for ResourceAdapter<R, F>
where
    R: Resource,
    F: ConnectionFactory<Connection = R::Connection>,
{
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn create(&self, request: &ProtocolRequest) -> Result<ProtocolResponse, AdapterError> {
        let operation = LifecycleOperation::Create;
        let span = lifecycle_span(&self.type_name, operation);
        let _entered = span.enter();
        let mut diagnostics = Diagnostics::new();
        let Some(plan) = decode_bag::<R::Data>(
            request.planned_state.as_ref(),
            "planned_state",
            &mut diagnostics,
        ) else {
            return Ok(finish(operation, None, diagnostics));
        };
        let mut response = CreateResponse::new();
        run_connected(self.factory.as_ref(), &mut diagnostics, |connection, diagnostics| {
            self.resource.create(
                CreateRequest {
                    plan,
                    connection,
                    pipeline: Pipeline::start(diagnostics),
                },
                &mut response,
            );
        });
        finish_with_state(&self.type_name, operation, response.into_state(), diagnostics, true)
    }

    fn read(&self, request: &ProtocolRequest) -> Result<ProtocolResponse, AdapterError> {
        let operation = LifecycleOperation::Read;
        let span = lifecycle_span(&self.type_name, operation);
        let _entered = span.enter();
        let mut diagnostics = Diagnostics::new();
        let Some(state) =
            decode_bag::<R::Data>(request.prior_state.as_ref(), "prior_state", &mut diagnostics)
        else {
            return Ok(finish(operation, None, diagnostics));
        };
        let mut response = ReadResponse::new();
        run_connected(self.factory.as_ref(), &mut diagnostics, |connection, diagnostics| {
            self.resource.read(
                ReadRequest {
                    state,
                    connection,
                    pipeline: Pipeline::start(diagnostics),
                },
                &mut response,
            );
        });
        finish_with_state(&self.type_name, operation, response.into_state(), diagnostics, false)
    }

    fn update(&self, request: &ProtocolRequest) -> Result<ProtocolResponse, AdapterError> {
        let operation = LifecycleOperation::Update;
        let Some(update) = self.update else {
            return Err(AdapterError::UnsupportedOperation {
                type_name: self.type_name.clone(),
                operation,
            });
        };
        let span = lifecycle_span(&self.type_name, operation);
        let _entered = span.enter();
        let mut diagnostics = Diagnostics::new();
        let state =
            decode_bag::<R::Data>(request.prior_state.as_ref(), "prior_state", &mut diagnostics);
        let plan = decode_bag::<R::Data>(
            request.planned_state.as_ref(),
            "planned_state",
            &mut diagnostics,
        );
        let (Some(state), Some(plan)) = (state, plan) else {
            return Ok(finish(operation, None, diagnostics));
        };
        let mut response = UpdateResponse::new();
        run_connected(self.factory.as_ref(), &mut diagnostics, |connection, diagnostics| {
            update(
                &self.resource,
                UpdateRequest {
                    plan,
                    state,
                    connection,
                    pipeline: Pipeline::start(diagnostics),
                },
                &mut response,
            );
        });
        finish_with_state(&self.type_name, operation, response.into_state(), diagnostics, true)
    }

    fn delete(&self, request: &ProtocolRequest) -> Result<ProtocolResponse, AdapterError> {
        let operation = LifecycleOperation::Delete;
        let span = lifecycle_span(&self.type_name, operation);
        let _entered = span.enter();
        let mut diagnostics = Diagnostics::new();
        let Some(state) =
            decode_bag::<R::Data>(request.prior_state.as_ref(), "prior_state", &mut diagnostics)
        else {
            return Ok(finish(operation, None, diagnostics));
        };
        run_connected(self.factory.as_ref(), &mut diagnostics, |connection, diagnostics| {
            self.resource.delete(DeleteRequest {
                state,
                connection,
                pipeline: Pipeline::start(diagnostics),
            });
        });
        Ok(finish(operation, None, diagnostics))
    }

    fn validate(&self, request: &ProtocolRequest) -> Result<ProtocolResponse, AdapterError> {
        let operation = LifecycleOperation::Validate;
        let span = lifecycle_span(&self.type_name, operation);
        let _entered = span.enter();
        let mut diagnostics = Diagnostics::new();
        if let Some(validate) = self.validate
            && let Some(config) =
                decode_bag::<R::Data>(request.config.as_ref(), "config", &mut diagnostics)
        {
            validate(
                &self.resource,
                ValidateRequest {
                    config,
                    pipeline: Pipeline::start(&mut diagnostics),
                },
            );
        }
        Ok(finish(operation, None, diagnostics))
    }
}

// ============================================================================
// SECTION: Data Source Adapter
// ============================================================================

/// Protocol-shaped wrapper around a data source implementation.
///
/// # Invariants
/// - A read that records no state and no error is reported as a failure.
pub struct DataSourceAdapter<S: DataSource, F> {
    /// Registered type name.
    type_name: String,
    /// Lookup implementation.
    source: S,
    /// Shared connection factory.
    factory: Arc<F>,
    /// Bound validate capability.
    validate: Option<ValidateFn<S, S::Data>>,
}

impl<S, F> DataSourceAdapter<S, F>
where
    S: DataSource,
    F: ConnectionFactory<Connection = S::Connection>,
{
    /// Creates a data source adapter.
    #[must_use]
    pub fn new(type_name: impl Into<String>, source: S, factory: Arc<F>) -> Self {
        Self {
            type_name: type_name.into(),
            source,
            factory,
            validate: None,
        }
    }

    /// Binds the validate capability.
    #[must_use]
    pub fn with_validation(mut self) -> Self
    where
        S: ValidatedDataSource,
    {
        let validate: ValidateFn<S, S::Data> = <S as ValidatedDataSource>::validate;
        self.validate = Some(validate);
        self
    }

    /// Returns true when validate is bound.
    #[must_use]
    pub const fn supports_validation(&self) -> bool {
        self.validate.is_some()
    }
}

impl<S, F> DataSourceHandler for DataSourceAdapter<S, F>
where
    S: DataSource,
    F: ConnectionFactory<Connection = S::Connection>,
{
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn read(&self, request: &ProtocolRequest) -> Result<ProtocolResponse, AdapterError> {
        let operation = LifecycleOperation::Read;
        let span = lifecycle_span(&self.type_name, operation);
        let _entered = span.enter();
        let mut diagnostics = Diagnostics::new();
        let Some(config) =
            decode_bag::<S::Data>(request.config.as_ref(), "config", &mut diagnostics)
        else {
            return Ok(finish(operation, None, diagnostics));
        };
        let mut response = ReadResponse::new();
        run_connected(self.factory.as_ref(), &mut diagnostics, |connection, diagnostics| {
            self.source.read(
                DataSourceReadRequest {
                    config,
                    connection,
                    pipeline: Pipeline::start(diagnostics),
                },
                &mut response,
            );
        });
        finish_with_state(&self.type_name, operation, response.into_state(), diagnostics, true)
    }

    fn validate(&self, request: &ProtocolRequest) -> Result<ProtocolResponse, AdapterError> {
        let operation = LifecycleOperation::Validate;
        let span = lifecycle_span(&self.type_name, operation);
        let _entered = span.enter();
        let mut diagnostics = Diagnostics::new();
        if let Some(validate) = self.validate
            && let Some(config) =
                decode_bag::<S::Data>(request.config.as_ref(), "config", &mut diagnostics)
        {
            validate(
                &self.source,
                ValidateRequest {
                    config,
                    pipeline: Pipeline::start(&mut diagnostics),
                },
            );
        }
        Ok(finish(operation, None, diagnostics))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Opens the invocation span.
fn lifecycle_span(type_name: &str, operation: LifecycleOperation) -> tracing::Span {
    tracing::info_span!("lifecycle", resource = type_name, operation = operation.as_str())
}

/// Decodes a required attribute bag into a typed record.
fn decode_bag<D: DeserializeOwned>(
    bag: Option<&AttributeBag>,
    field: &'static str,
    diagnostics: &mut Diagnostics,
) -> Option<D> {
    let Some(bag) = bag else {
        diagnostics.add_error("Missing attributes", format!("request carries no {field}"));
        return None;
    };
    match D::deserialize(bag) {
        Ok(data) => Some(data),
        Err(error) => {
            diagnostics.add_error("Invalid attributes", format!("failed to decode {field}: {error}"));
            None
        }
    }
}

/// Acquires a connection, then runs `operation` with it.
fn run_connected<F, Op>(factory: &F, diagnostics: &mut Diagnostics, operation: Op)
where
    F: ConnectionFactory,
    Op: FnOnce(&F::Connection, &mut Diagnostics),
{
    let mut connection = None;
    Pipeline::start(diagnostics).then(|diagnostics| connection = factory.connect(diagnostics)).then(
        |diagnostics| {
            if let Some(connection) = connection.as_ref() {
                operation(connection, diagnostics);
            }
        },
    );
}

/// Encodes typed state, enforcing the state contract of the operation.
fn finish_with_state<D: Serialize>(
    type_name: &str,
    operation: LifecycleOperation,
    state: Option<D>,
    mut diagnostics: Diagnostics,
    state_required: bool,
) -> Result<ProtocolResponse, AdapterError> {
    if diagnostics.has_error() {
        return Ok(finish(operation, None, diagnostics));
    }
    let Some(state) = state else {
        if state_required {
            diagnostics.add_error(
                "Missing state",
                format!("{type_name} {operation} completed without recording state"),
            );
        }
        return Ok(finish(operation, None, diagnostics));
    };
    let bag = serde_json::to_value(&state).map_err(|err| AdapterError::StateEncoding {
        type_name: type_name.to_string(),
        message: err.to_string(),
    })?;
    Ok(finish(operation, Some(bag), diagnostics))
}

/// Builds the response and logs the outcome.
fn finish(
    operation: LifecycleOperation,
    state: Option<AttributeBag>,
    diagnostics: Diagnostics,
) -> ProtocolResponse {
    let response = match state {
        Some(state) if !diagnostics.has_error() => {
            ProtocolResponse::with_state(operation, state, diagnostics)
        }
        _ => ProtocolResponse::without_state(operation, diagnostics),
    };
    match response.outcome() {
        InvocationOutcome::Failed => {
            tracing::warn!(
                errors = response.diagnostics.error_count(),
                "lifecycle invocation failed"
            );
        }
        InvocationOutcome::Removed => {
            tracing::info!("entity no longer exists; removing from tracked state");
        }
        InvocationOutcome::Succeeded => tracing::debug!("lifecycle invocation succeeded"),
    }
    response
}
