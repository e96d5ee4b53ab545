// crates/dbgrant-core/src/runtime/mod.rs
// ============================================================================
// Module: dbgrant Runtime
// Description: Effect pipeline, lifecycle adapters, and the handler registry.
// Purpose: Execute protocol requests against typed resource implementations.
// Dependencies: crate::core, crate::interfaces, tracing
// ============================================================================

//! ## Overview
//! Requests flow from [`registry::ResourceRegistry`] to an adapter, which
//! decodes attribute bags and drives the bound implementation through a
//! [`pipeline::Pipeline`].

pub mod adapter;
pub mod pipeline;
pub mod registry;
