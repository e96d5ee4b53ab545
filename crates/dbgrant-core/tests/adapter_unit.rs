// crates/dbgrant-core/tests/adapter_unit.rs
// ============================================================================
// Module: Lifecycle Adapter Unit Tests
// Description: Decode, connect, execute, and encode behavior of adapters.
// Purpose: Validate outcome classification and capability dispatch.
// ============================================================================

//! Unit tests for resource and data source adapters using an in-memory store.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use dbgrant_core::AdapterError;
use dbgrant_core::ConnectionFactory;
use dbgrant_core::CreateRequest;
use dbgrant_core::CreateResponse;
use dbgrant_core::DataSource;
use dbgrant_core::DataSourceAdapter;
use dbgrant_core::DataSourceHandler;
use dbgrant_core::DataSourceReadRequest;
use dbgrant_core::DeleteRequest;
use dbgrant_core::Diagnostics;
use dbgrant_core::InvocationOutcome;
use dbgrant_core::LifecycleHandler;
use dbgrant_core::LifecycleOperation;
use dbgrant_core::PermissionId;
use dbgrant_core::PrincipalId;
use dbgrant_core::ProtocolRequest;
use dbgrant_core::ReadRequest;
use dbgrant_core::ReadResponse;
use dbgrant_core::Resource;
use dbgrant_core::ResourceAdapter;
use dbgrant_core::UpdatableResource;
use dbgrant_core::UpdateRequest;
use dbgrant_core::UpdateResponse;
use dbgrant_core::ValidateRequest;
use dbgrant_core::ValidatedResource;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

#[derive(Default)]
struct MemoryStore {
    grants: Mutex<BTreeMap<(i64, String), bool>>,
    calls: AtomicUsize,
}

impl MemoryStore {
    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

struct MemoryConnection {
    store: Arc<MemoryStore>,
}

struct MemoryFactory {
    store: Arc<MemoryStore>,
    available: bool,
    connects: AtomicUsize,
}

impl MemoryFactory {
    fn new(store: &Arc<MemoryStore>) -> Arc<Self> {
        Arc::new(Self {
            store: Arc::clone(store),
            available: true,
            connects: AtomicUsize::new(0),
        })
    }

    fn unavailable(store: &Arc<MemoryStore>) -> Arc<Self> {
        Arc::new(Self {
            store: Arc::clone(store),
            available: false,
            connects: AtomicUsize::new(0),
        })
    }

    fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl ConnectionFactory for MemoryFactory {
    type Connection = MemoryConnection;

    fn connect(&self, diagnostics: &mut Diagnostics) -> Option<MemoryConnection> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if !self.available {
            diagnostics.add_error("Connection failed", "store unavailable");
            return None;
        }
        Some(MemoryConnection {
            store: Arc::clone(&self.store),
        })
    }
}

// ============================================================================
// SECTION: Grant Resource
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GrantData {
    #[serde(default)]
    id: PermissionId<PrincipalId>,
    principal_id: i64,
    permission: String,
    #[serde(default)]
    with_grant_option: bool,
}

struct GrantResource;

impl Resource for GrantResource {
    type Data = GrantData;
    type Connection = MemoryConnection;

    fn create(
        &self,
        request: CreateRequest<'_, GrantData, MemoryConnection>,
        response: &mut CreateResponse<GrantData>,
    ) {
        let CreateRequest {
            plan,
            connection,
            pipeline,
        } = request;
        let mut principal = None;
        pipeline
            .then(|diagnostics| {
                principal = PrincipalId::from_raw(plan.principal_id);
                if principal.is_none() {
                    diagnostics.add_attribute_error(
                        "principal_id",
                        "Invalid principal",
                        "principal id must be non-negative",
                    );
                }
            })
            .then(|_| {
                connection.store.touch();
                connection
                    .store
                    .grants
                    .lock()
                    .unwrap()
                    .insert((plan.principal_id, plan.permission.clone()), plan.with_grant_option);
            })
            .then(|_| {
                if let Some(principal) = principal {
                    response.set_state(GrantData {
                        id: PermissionId::new(principal, plan.permission.clone()),
                        ..plan.clone()
                    });
                }
            });
    }

    fn read(
        &self,
        request: ReadRequest<'_, GrantData, MemoryConnection>,
        response: &mut ReadResponse<GrantData>,
    ) {
        let ReadRequest {
            state,
            connection,
            pipeline,
        } = request;
        let mut principal = None;
        pipeline.then(|diagnostics| principal = state.id.entity_id(diagnostics)).then(|_| {
            let (Some(principal), Some(name)) = (principal, state.id.permission_name()) else {
                return;
            };
            connection.store.touch();
            let grants = connection.store.grants.lock().unwrap();
            if let Some(with_grant_option) = grants.get(&(principal.get(), name.to_string())) {
                response.set_state(GrantData {
                    id: state.id.clone(),
                    principal_id: principal.get(),
                    permission: name.to_string(),
                    with_grant_option: *with_grant_option,
                });
            }
        });
    }

    fn delete(&self, request: DeleteRequest<'_, GrantData, MemoryConnection>) {
        let DeleteRequest {
            state,
            connection,
            pipeline,
        } = request;
        let mut principal = None;
        pipeline.then(|diagnostics| principal = state.id.entity_id(diagnostics)).then(|_| {
            if let (Some(principal), Some(name)) = (principal, state.id.permission_name()) {
                connection.store.touch();
                connection.store.grants.lock().unwrap().remove(&(principal.get(), name.to_string()));
            }
        });
    }
}

impl UpdatableResource for GrantResource {
    fn update(
        &self,
        request: UpdateRequest<'_, GrantData, MemoryConnection>,
        response: &mut UpdateResponse<GrantData>,
    ) {
        let UpdateRequest {
            plan,
            state,
            connection,
            pipeline,
        } = request;
        pipeline.then(|_| {
            connection.store.touch();
            connection
                .store
                .grants
                .lock()
                .unwrap()
                .insert((state.principal_id, state.permission.clone()), plan.with_grant_option);
            response.set_state(GrantData {
                with_grant_option: plan.with_grant_option,
                ..state.clone()
            });
        });
    }
}

impl ValidatedResource for GrantResource {
    fn validate(&self, request: ValidateRequest<'_, GrantData>) {
        let ValidateRequest {
            config,
            pipeline,
        } = request;
        pipeline.then(|diagnostics| {
            if config.permission.contains('/') {
                diagnostics.add_attribute_error(
                    "permission",
                    "Invalid permission",
                    "permission names must not contain '/'",
                );
            }
        });
    }
}

/// Resource whose create never records state.
struct SilentResource;

impl Resource for SilentResource {
    type Data = GrantData;
    type Connection = MemoryConnection;

    fn create(
        &self,
        _request: CreateRequest<'_, GrantData, MemoryConnection>,
        _response: &mut CreateResponse<GrantData>,
    ) {
    }

    fn read(
        &self,
        _request: ReadRequest<'_, GrantData, MemoryConnection>,
        _response: &mut ReadResponse<GrantData>,
    ) {
    }

    fn delete(&self, _request: DeleteRequest<'_, GrantData, MemoryConnection>) {}
}

// ============================================================================
// SECTION: Grant Lookup
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GrantLookup {
    principal_id: i64,
    permission: String,
    #[serde(default)]
    with_grant_option: Option<bool>,
}

struct GrantSource;

impl DataSource for GrantSource {
    type Data = GrantLookup;
    type Connection = MemoryConnection;

    fn read(
        &self,
        request: DataSourceReadRequest<'_, GrantLookup, MemoryConnection>,
        response: &mut ReadResponse<GrantLookup>,
    ) {
        let DataSourceReadRequest {
            config,
            connection,
            pipeline,
        } = request;
        pipeline.then(|_| {
            connection.store.touch();
            let grants = connection.store.grants.lock().unwrap();
            if let Some(with_grant_option) =
                grants.get(&(config.principal_id, config.permission.clone()))
            {
                response.set_state(GrantLookup {
                    with_grant_option: Some(*with_grant_option),
                    ..config.clone()
                });
            }
        });
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn grant_adapter(factory: &Arc<MemoryFactory>) -> ResourceAdapter<GrantResource, MemoryFactory> {
    ResourceAdapter::new("test_grant", GrantResource, Arc::clone(factory))
        .with_update()
        .with_validation()
}

fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::default());
    store.grants.lock().unwrap().insert((7, "SELECT".to_string()), false);
    store
}

fn first_summary(diagnostics: &Diagnostics) -> String {
    diagnostics.iter().next().map(|entry| entry.summary.clone()).unwrap_or_default()
}

// ============================================================================
// SECTION: Create
// ============================================================================

#[test]
fn create_encodes_computed_identifier() {
    let store = Arc::new(MemoryStore::default());
    let factory = MemoryFactory::new(&store);
    let adapter = grant_adapter(&factory);
    let response = adapter
        .create(&ProtocolRequest::create(json!({
            "principal_id": 7,
            "permission": "SELECT",
        })))
        .unwrap();
    assert_eq!(response.outcome(), InvocationOutcome::Succeeded);
    assert_eq!(response.operation, LifecycleOperation::Create);
    let state = response.new_state.unwrap();
    assert_eq!(state["id"], json!("7/SELECT"));
    assert_eq!(state["with_grant_option"], json!(false));
    assert_eq!(factory.connects(), 1);
}

#[test]
fn create_without_state_is_an_error() {
    let store = Arc::new(MemoryStore::default());
    let factory = MemoryFactory::new(&store);
    let adapter = ResourceAdapter::new("silent", SilentResource, Arc::clone(&factory));
    let response = adapter
        .create(&ProtocolRequest::create(json!({"principal_id": 1, "permission": "SELECT"})))
        .unwrap();
    assert_eq!(response.outcome(), InvocationOutcome::Failed);
    assert!(response.new_state.is_none());
    assert_eq!(first_summary(&response.diagnostics), "Missing state");
}

#[test]
fn create_error_yields_no_state() {
    let store = Arc::new(MemoryStore::default());
    let factory = MemoryFactory::new(&store);
    let adapter = grant_adapter(&factory);
    let response = adapter
        .create(&ProtocolRequest::create(json!({"principal_id": -4, "permission": "SELECT"})))
        .unwrap();
    assert_eq!(response.outcome(), InvocationOutcome::Failed);
    assert!(response.new_state.is_none());
    assert_eq!(response.diagnostics.iter().next().unwrap().attribute.as_deref(), Some("principal_id"));
    assert_eq!(store.calls(), 0);
}

#[test]
fn missing_planned_state_fails_before_connecting() {
    let store = Arc::new(MemoryStore::default());
    let factory = MemoryFactory::new(&store);
    let adapter = grant_adapter(&factory);
    let response = adapter.create(&ProtocolRequest::default()).unwrap();
    assert_eq!(response.outcome(), InvocationOutcome::Failed);
    assert_eq!(first_summary(&response.diagnostics), "Missing attributes");
    assert_eq!(factory.connects(), 0);
}

// ============================================================================
// SECTION: Read
// ============================================================================

#[test]
fn read_refreshes_existing_entity() {
    let store = seeded_store();
    let factory = MemoryFactory::new(&store);
    let adapter = grant_adapter(&factory);
    let response = adapter
        .read(&ProtocolRequest::read(json!({
            "id": "7/SELECT",
            "principal_id": 7,
            "permission": "SELECT",
            "with_grant_option": true,
        })))
        .unwrap();
    assert_eq!(response.outcome(), InvocationOutcome::Succeeded);
    assert_eq!(response.new_state.unwrap()["with_grant_option"], json!(false));
}

#[test]
fn read_of_missing_entity_is_removed() {
    let store = Arc::new(MemoryStore::default());
    let factory = MemoryFactory::new(&store);
    let adapter = grant_adapter(&factory);
    let response = adapter
        .read(&ProtocolRequest::read(json!({
            "id": "7/SELECT",
            "principal_id": 7,
            "permission": "SELECT",
        })))
        .unwrap();
    assert_eq!(response.outcome(), InvocationOutcome::Removed);
    assert!(response.new_state.is_none());
    assert!(response.diagnostics.is_empty());
}

#[test]
fn read_with_non_numeric_identifier_never_reaches_store() {
    let store = seeded_store();
    let factory = MemoryFactory::new(&store);
    let adapter = grant_adapter(&factory);
    let response = adapter
        .read(&ProtocolRequest::read(json!({
            "id": "abc/SELECT",
            "principal_id": 7,
            "permission": "SELECT",
        })))
        .unwrap();
    assert_eq!(response.outcome(), InvocationOutcome::Failed);
    assert!(response.new_state.is_none());
    assert_eq!(first_summary(&response.diagnostics), "Invalid identifier");
    assert_eq!(store.calls(), 0);
}

#[test]
fn read_with_wrong_cardinality_fails_during_decoding() {
    let store = seeded_store();
    let factory = MemoryFactory::new(&store);
    let adapter = grant_adapter(&factory);
    let response = adapter
        .read(&ProtocolRequest::read(json!({
            "id": "1/2/3",
            "principal_id": 7,
            "permission": "SELECT",
        })))
        .unwrap();
    assert_eq!(response.outcome(), InvocationOutcome::Failed);
    assert_eq!(first_summary(&response.diagnostics), "Invalid attributes");
    assert_eq!(factory.connects(), 0);
}

#[test]
fn connection_failure_skips_the_operation() {
    let store = seeded_store();
    let factory = MemoryFactory::unavailable(&store);
    let adapter = grant_adapter(&factory);
    let response = adapter
        .read(&ProtocolRequest::read(json!({
            "id": "7/SELECT",
            "principal_id": 7,
            "permission": "SELECT",
        })))
        .unwrap();
    assert_eq!(response.outcome(), InvocationOutcome::Failed);
    assert_eq!(first_summary(&response.diagnostics), "Connection failed");
    assert_eq!(factory.connects(), 1);
    assert_eq!(store.calls(), 0);
}

// ============================================================================
// SECTION: Update / Delete
// ============================================================================

#[test]
fn update_without_capability_is_fatal() {
    let store = seeded_store();
    let factory = MemoryFactory::new(&store);
    let adapter = ResourceAdapter::new("test_grant", GrantResource, Arc::clone(&factory));
    assert!(!adapter.supports_update());
    let state = json!({"id": "7/SELECT", "principal_id": 7, "permission": "SELECT"});
    let err = adapter.update(&ProtocolRequest::update(state.clone(), state)).unwrap_err();
    assert_eq!(
        err,
        AdapterError::UnsupportedOperation {
            type_name: "test_grant".to_string(),
            operation: LifecycleOperation::Update,
        }
    );
    assert_eq!(factory.connects(), 0);
}

#[test]
fn update_applies_planned_change() {
    let store = seeded_store();
    let factory = MemoryFactory::new(&store);
    let adapter = grant_adapter(&factory);
    let prior = json!({"id": "7/SELECT", "principal_id": 7, "permission": "SELECT"});
    let planned = json!({
        "id": "7/SELECT",
        "principal_id": 7,
        "permission": "SELECT",
        "with_grant_option": true,
    });
    let response = adapter.update(&ProtocolRequest::update(prior, planned)).unwrap();
    assert_eq!(response.outcome(), InvocationOutcome::Succeeded);
    assert_eq!(response.new_state.unwrap()["with_grant_option"], json!(true));
    assert_eq!(store.grants.lock().unwrap().get(&(7, "SELECT".to_string())), Some(&true));
}

#[test]
fn delete_removes_entity_and_returns_no_state() {
    let store = seeded_store();
    let factory = MemoryFactory::new(&store);
    let adapter = grant_adapter(&factory);
    let response = adapter
        .delete(&ProtocolRequest::delete(json!({
            "id": "7/SELECT",
            "principal_id": 7,
            "permission": "SELECT",
        })))
        .unwrap();
    assert_eq!(response.outcome(), InvocationOutcome::Succeeded);
    assert!(response.new_state.is_none());
    assert!(store.grants.lock().unwrap().is_empty());
}

// ============================================================================
// SECTION: Validate
// ============================================================================

#[test]
fn validate_without_capability_succeeds_empty() {
    let store = Arc::new(MemoryStore::default());
    let factory = MemoryFactory::new(&store);
    let adapter = ResourceAdapter::new("test_grant", GrantResource, Arc::clone(&factory));
    assert!(!adapter.supports_validation());
    let response = adapter
        .validate(&ProtocolRequest::config(json!({"principal_id": 1, "permission": "a/b"})))
        .unwrap();
    assert_eq!(response.outcome(), InvocationOutcome::Succeeded);
    assert!(response.diagnostics.is_empty());
}

#[test]
fn validate_reports_cross_field_errors_without_connecting() {
    let store = Arc::new(MemoryStore::default());
    let factory = MemoryFactory::new(&store);
    let adapter = grant_adapter(&factory);
    let response = adapter
        .validate(&ProtocolRequest::config(json!({"principal_id": 1, "permission": "a/b"})))
        .unwrap();
    assert_eq!(response.outcome(), InvocationOutcome::Failed);
    assert_eq!(
        response.diagnostics.iter().next().unwrap().attribute.as_deref(),
        Some("permission")
    );
    assert_eq!(factory.connects(), 0);
}

// ============================================================================
// SECTION: Data Sources
// ============================================================================

#[test]
fn data_source_read_returns_lookup_result() {
    let store = seeded_store();
    let factory = MemoryFactory::new(&store);
    let adapter = DataSourceAdapter::new("test_grant", GrantSource, Arc::clone(&factory));
    assert_eq!(DataSourceHandler::type_name(&adapter), "test_grant");
    let response = adapter
        .read(&ProtocolRequest::config(json!({"principal_id": 7, "permission": "SELECT"})))
        .unwrap();
    assert_eq!(response.outcome(), InvocationOutcome::Succeeded);
    assert_eq!(response.new_state.unwrap()["with_grant_option"], json!(false));
}

#[test]
fn data_source_read_without_match_fails() {
    let store = Arc::new(MemoryStore::default());
    let factory = MemoryFactory::new(&store);
    let adapter = DataSourceAdapter::new("test_grant", GrantSource, Arc::clone(&factory));
    let response = adapter
        .read(&ProtocolRequest::config(json!({"principal_id": 7, "permission": "SELECT"})))
        .unwrap();
    assert_eq!(response.outcome(), InvocationOutcome::Failed);
    assert_eq!(first_summary(&response.diagnostics), "Missing state");
}

#[test]
fn data_source_validate_without_capability_succeeds_empty() {
    let store = Arc::new(MemoryStore::default());
    let factory = MemoryFactory::new(&store);
    let adapter = DataSourceAdapter::new("test_grant", GrantSource, Arc::clone(&factory));
    assert!(!adapter.supports_validation());
    let response = adapter
        .validate(&ProtocolRequest::config(json!({"principal_id": 7, "permission": "SELECT"})))
        .unwrap();
    assert!(response.diagnostics.is_empty());
}
