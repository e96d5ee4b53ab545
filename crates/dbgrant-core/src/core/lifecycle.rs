// crates/dbgrant-core/src/core/lifecycle.rs
// ============================================================================
// Module: dbgrant Lifecycle Requests
// Description: Typed request/response pairs handed to resource implementations.
// Purpose: Pair a decoded data record with a fresh pipeline and a connection.
// Dependencies: crate::runtime::pipeline
// ============================================================================

//! ## Overview
//! Every typed request owns a [`Pipeline`] over the invocation's diagnostics
//! sink. Responses track whether the entity ended up existing separately from
//! whether an error occurred: a read that never calls
//! [`StateResponse::set_state`] reports that the entity is gone.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::runtime::pipeline::Pipeline;

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Typed create request.
pub struct CreateRequest<'a, D, C> {
    /// Planned attributes.
    pub plan: D,
    /// Connection to the managed store.
    pub connection: &'a C,
    /// Step chain for this invocation.
    pub pipeline: Pipeline<'a>,
}

/// Typed read request.
pub struct ReadRequest<'a, D, C> {
    /// Previously persisted attributes.
    pub state: D,
    /// Connection to the managed store.
    pub connection: &'a C,
    /// Step chain for this invocation.
    pub pipeline: Pipeline<'a>,
}

/// Typed update request.
pub struct UpdateRequest<'a, D, C> {
    /// Planned attributes.
    pub plan: D,
    /// Previously persisted attributes.
    pub state: D,
    /// Connection to the managed store.
    pub connection: &'a C,
    /// Step chain for this invocation.
    pub pipeline: Pipeline<'a>,
}

/// Typed delete request.
pub struct DeleteRequest<'a, D, C> {
    /// Previously persisted attributes.
    pub state: D,
    /// Connection to the managed store.
    pub connection: &'a C,
    /// Step chain for this invocation.
    pub pipeline: Pipeline<'a>,
}

/// Typed validate request. Runs at plan time without a connection.
pub struct ValidateRequest<'a, D> {
    /// Configured attributes.
    pub config: D,
    /// Step chain for this invocation.
    pub pipeline: Pipeline<'a>,
}

/// Typed data source read request.
pub struct DataSourceReadRequest<'a, D, C> {
    /// Configured lookup attributes.
    pub config: D,
    /// Connection to the managed store.
    pub connection: &'a C,
    /// Step chain for this invocation.
    pub pipeline: Pipeline<'a>,
}

// ============================================================================
// SECTION: Responses
// ============================================================================

/// Typed response carrying the resulting entity state, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateResponse<D> {
    /// State recorded by the implementation.
    state: Option<D>,
}

/// Typed create response.
pub type CreateResponse<D> = StateResponse<D>;
/// Typed read response.
pub type ReadResponse<D> = StateResponse<D>;
/// Typed update response.
pub type UpdateResponse<D> = StateResponse<D>;

impl<D> StateResponse<D> {
    /// Creates a response with no state recorded.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: None,
        }
    }

    /// Records the resulting entity state.
    pub fn set_state(&mut self, state: D) {
        self.state = Some(state);
    }

    /// Returns the recorded state.
    #[must_use]
    pub const fn state(&self) -> Option<&D> {
        self.state.as_ref()
    }

    /// Returns true once state has been recorded.
    #[must_use]
    pub const fn has_state(&self) -> bool {
        self.state.is_some()
    }

    /// Consumes the response and returns the recorded state.
    #[must_use]
    pub fn into_state(self) -> Option<D> {
        self.state
    }
}

impl<D> Default for StateResponse<D> {
    fn default() -> Self {
        Self::new()
    }
}
