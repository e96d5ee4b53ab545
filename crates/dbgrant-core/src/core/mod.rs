// crates/dbgrant-core/src/core/mod.rs
// ============================================================================
// Module: dbgrant Core Types
// Description: Identifiers, diagnostics, protocol shapes, and typed requests.
// Purpose: Group the data model shared by adapters and resource kinds.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Pure data types with no I/O. Every other module builds on these.

pub mod diagnostics;
pub mod identifiers;
pub mod lifecycle;
pub mod protocol;
