// crates/dbgrant-core/src/core/protocol.rs
// ============================================================================
// Module: dbgrant Protocol Shapes
// Description: Attribute-bag requests and responses exchanged with the orchestrator.
// Purpose: Give every lifecycle entry point one untyped input and output shape.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The orchestrator hands the plugin raw attribute bags (JSON objects) and
//! expects a new state bag plus diagnostics back. These types carry no
//! resource-specific knowledge; lifecycle adapters decode them into typed
//! records.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::diagnostics::Diagnostics;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Untyped attribute bag (a JSON object).
pub type AttributeBag = Value;

/// Lifecycle operation requested by the orchestrator.
///
/// # Invariants
/// - Variants are stable for logging and error labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleOperation {
    /// Create a managed entity.
    Create,
    /// Refresh a managed entity's state.
    Read,
    /// Modify a managed entity in place.
    Update,
    /// Destroy a managed entity.
    Delete,
    /// Cross-field checks before a plan is persisted.
    Validate,
}

impl LifecycleOperation {
    /// Returns a stable label for the operation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Validate => "validate",
        }
    }
}

impl fmt::Display for LifecycleOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol-shaped lifecycle request.
///
/// Each operation reads the bags it needs:
/// create (`planned_state`), read and delete (`prior_state`), update (both),
/// validate and data source reads (`config`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolRequest {
    /// Persisted state from the previous operation.
    #[serde(default)]
    pub prior_state: Option<AttributeBag>,
    /// Desired state computed by the orchestrator's plan.
    #[serde(default)]
    pub planned_state: Option<AttributeBag>,
    /// Raw user configuration.
    #[serde(default)]
    pub config: Option<AttributeBag>,
}

impl ProtocolRequest {
    /// Builds a create request.
    #[must_use]
    pub fn create(planned_state: AttributeBag) -> Self {
        Self {
            planned_state: Some(planned_state),
            ..Self::default()
        }
    }

    /// Builds a read request.
    #[must_use]
    pub fn read(prior_state: AttributeBag) -> Self {
        Self {
            prior_state: Some(prior_state),
            ..Self::default()
        }
    }

    /// Builds an update request.
    #[must_use]
    pub fn update(prior_state: AttributeBag, planned_state: AttributeBag) -> Self {
        Self {
            prior_state: Some(prior_state),
            planned_state: Some(planned_state),
            config: None,
        }
    }

    /// Builds a delete request.
    #[must_use]
    pub fn delete(prior_state: AttributeBag) -> Self {
        Self::read(prior_state)
    }

    /// Builds a validate or data source read request.
    #[must_use]
    pub fn config(config: AttributeBag) -> Self {
        Self {
            config: Some(config),
            ..Self::default()
        }
    }
}

/// Terminal outcome of one invocation.
///
/// # Invariants
/// - `Removed` is only produced by reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationOutcome {
    /// Completed without error diagnostics.
    Succeeded,
    /// Read found no entity; the orchestrator drops it from tracked state.
    Removed,
    /// At least one error diagnostic was recorded.
    Failed,
}

/// Protocol-shaped lifecycle response.
///
/// # Invariants
/// - `new_state` is `None` whenever `diagnostics` holds an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolResponse {
    /// Operation that produced the response.
    pub operation: LifecycleOperation,
    /// New state bag, when the entity exists.
    pub new_state: Option<AttributeBag>,
    /// Diagnostics accumulated during the invocation.
    pub diagnostics: Diagnostics,
}

impl ProtocolResponse {
    /// Builds a response carrying state.
    #[must_use]
    pub const fn with_state(
        operation: LifecycleOperation,
        state: AttributeBag,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            operation,
            new_state: Some(state),
            diagnostics,
        }
    }

    /// Builds a response without state.
    #[must_use]
    pub const fn without_state(operation: LifecycleOperation, diagnostics: Diagnostics) -> Self {
        Self {
            operation,
            new_state: None,
            diagnostics,
        }
    }

    /// Classifies the response.
    #[must_use]
    pub fn outcome(&self) -> InvocationOutcome {
        if self.diagnostics.has_error() {
            InvocationOutcome::Failed
        } else if self.new_state.is_none() && self.operation == LifecycleOperation::Read {
            InvocationOutcome::Removed
        } else {
            InvocationOutcome::Succeeded
        }
    }
}
