// crates/dbgrant-core/src/runtime/pipeline.rs
// ============================================================================
// Module: dbgrant Effect Pipeline
// Description: Short-circuiting step chain keyed off a diagnostics sink.
// Purpose: Sequence side-effecting steps of one lifecycle operation.
// Dependencies: crate::core::diagnostics, tracing
// ============================================================================

//! ## Overview
//! A [`Pipeline`] runs each step immediately and synchronously, in order, for
//! as long as the shared [`Diagnostics`] sink holds no error. Once an error is
//! recorded the pipeline latches into the failed state and every later step is
//! skipped. Steps exchange results through variables captured from the
//! enclosing operation; the pipeline carries no payload.
//!
//! There is no retry and no rollback. A step that records an error must stop
//! its own work; the pipeline only checks between steps.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::diagnostics::Diagnostic;
use crate::core::diagnostics::Diagnostics;

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Step chain for one lifecycle invocation.
///
/// # Invariants
/// - `failed` never resets once set.
/// - Confined to one invocation; never shared across threads.
pub struct Pipeline<'a> {
    /// Invocation-scoped sink, owned by the caller.
    diagnostics: &'a mut Diagnostics,
    /// Latched failure flag.
    failed: bool,
    /// Number of steps executed.
    steps_run: usize,
    /// Number of steps skipped after failure.
    steps_skipped: usize,
}

impl<'a> Pipeline<'a> {
    /// Starts a pipeline over the given sink.
    #[must_use]
    pub const fn start(diagnostics: &'a mut Diagnostics) -> Self {
        Self {
            diagnostics,
            failed: false,
            steps_run: 0,
            steps_skipped: 0,
        }
    }

    /// Runs `step` unless the pipeline has failed.
    pub fn then<F>(mut self, step: F) -> Self
    where
        F: FnOnce(&mut Diagnostics),
    {
        if self.refresh() {
            self.steps_skipped += 1;
            tracing::debug!(
                step = self.steps_run + self.steps_skipped,
                "pipeline step skipped after failure"
            );
            return self;
        }
        step(&mut *self.diagnostics);
        self.steps_run += 1;
        self.refresh();
        self
    }

    /// Runs a fallible `step` unless the pipeline has failed, recording its error.
    pub fn then_try<F, E>(self, step: F) -> Self
    where
        F: FnOnce() -> Result<(), E>,
        E: Into<Diagnostic>,
    {
        self.then(|diagnostics| {
            if let Err(error) = step() {
                diagnostics.push(error.into());
            }
        })
    }

    /// Returns true once any step has failed or the sink holds an error.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.failed || self.diagnostics.has_error()
    }

    /// Returns the number of steps executed.
    #[must_use]
    pub const fn steps_run(&self) -> usize {
        self.steps_run
    }

    /// Returns the number of steps skipped.
    #[must_use]
    pub const fn steps_skipped(&self) -> usize {
        self.steps_skipped
    }

    /// Returns the sink.
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &*self.diagnostics
    }

    /// Latches the failure flag from the sink and returns it.
    fn refresh(&mut self) -> bool {
        if !self.failed && self.diagnostics.has_error() {
            self.failed = true;
        }
        self.failed
    }
}
