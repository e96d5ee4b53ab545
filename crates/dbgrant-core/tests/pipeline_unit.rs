// crates/dbgrant-core/tests/pipeline_unit.rs
// ============================================================================
// Module: Effect Pipeline Unit Tests
// Description: Ordering and short-circuit behavior of pipeline steps.
// Purpose: Ensure no step runs after an error is recorded.
// ============================================================================

//! Unit tests for the effect pipeline.

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

use dbgrant_core::Diagnostic;
use dbgrant_core::Diagnostics;
use dbgrant_core::IdentifierError;
use dbgrant_core::Pipeline;

#[test]
fn steps_run_in_order() {
    let mut diagnostics = Diagnostics::new();
    let mut trace = Vec::new();
    let pipeline = Pipeline::start(&mut diagnostics)
        .then(|_| trace.push(1))
        .then(|_| trace.push(2))
        .then(|_| trace.push(3));
    assert_eq!(pipeline.steps_run(), 3);
    assert!(!pipeline.is_failed());
    assert_eq!(trace, vec![1, 2, 3]);
}

#[test]
fn error_skips_remaining_steps() {
    let mut diagnostics = Diagnostics::new();
    let mut trace = Vec::new();
    let pipeline = Pipeline::start(&mut diagnostics)
        .then(|_| trace.push("lookup"))
        .then(|diagnostics| diagnostics.add_error("Lookup failed", "no such row"))
        .then(|_| trace.push("write"))
        .then(|_| trace.push("refresh"));
    assert!(pipeline.is_failed());
    assert_eq!(pipeline.steps_run(), 2);
    assert_eq!(pipeline.steps_skipped(), 2);
    assert_eq!(trace, vec!["lookup"]);
    assert_eq!(diagnostics.error_count(), 1);
}

#[test]
fn warnings_do_not_halt() {
    let mut diagnostics = Diagnostics::new();
    let mut ran = false;
    let pipeline = Pipeline::start(&mut diagnostics)
        .then(|diagnostics| diagnostics.add_warning("Heads up", "informational"))
        .then(|_| ran = true);
    assert!(!pipeline.is_failed());
    assert!(ran);
    assert_eq!(diagnostics.len(), 1);
}

#[test]
fn pre_existing_error_blocks_first_step() {
    let mut diagnostics = Diagnostics::new();
    diagnostics.add_error("Earlier", "failed before the pipeline started");
    let mut ran = false;
    let pipeline = Pipeline::start(&mut diagnostics).then(|_| ran = true);
    assert!(pipeline.is_failed());
    assert_eq!(pipeline.steps_skipped(), 1);
    assert!(!ran);
}

#[test]
fn then_try_records_error_and_halts() {
    let mut diagnostics = Diagnostics::new();
    let mut ran = false;
    let pipeline = Pipeline::start(&mut diagnostics)
        .then_try(|| Err::<(), _>(IdentifierError::NotConcrete { kind: "pair" }))
        .then(|_| ran = true);
    assert!(pipeline.is_failed());
    assert!(!ran);
    let entries: Vec<Diagnostic> = diagnostics.into_vec();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].summary, "Invalid identifier");
}

#[test]
fn then_try_success_continues() {
    let mut diagnostics = Diagnostics::new();
    let mut value = 0;
    Pipeline::start(&mut diagnostics)
        .then_try(|| {
            value = 5;
            Ok::<(), Diagnostic>(())
        })
        .then(|_| value *= 2);
    assert_eq!(value, 10);
    assert!(diagnostics.is_empty());
}

#[test]
fn nested_pipeline_shares_the_sink() {
    let mut diagnostics = Diagnostics::new();
    let mut outer_after = false;
    Pipeline::start(&mut diagnostics)
        .then(|diagnostics| {
            Pipeline::start(diagnostics)
                .then(|diagnostics| diagnostics.add_error("Inner", "inner step failed"));
        })
        .then(|_| outer_after = true);
    assert!(!outer_after);
    assert!(diagnostics.has_error());
}

#[test]
fn step_may_capture_results_for_later_steps() {
    let mut diagnostics = Diagnostics::new();
    let mut looked_up = None;
    let mut written = None;
    Pipeline::start(&mut diagnostics)
        .then(|_| looked_up = Some(41))
        .then(|_| written = looked_up.map(|value| value + 1));
    assert_eq!(written, Some(42));
}
