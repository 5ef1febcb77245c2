//! Runtime diagnostic reporting.
//!
//! No logging crate sits in this dependency graph; observability instead
//! goes through a trait-based hook, a sink that compiles away to nothing
//! when the caller doesn't want it. This module is that shape applied to
//! the one piece of runtime observability this engine actually needs: a
//! "diagnostic sink" that runtime errors are written to when a stack is
//! skipped rather than aborting the whole evaluation.
//!
//! [`NoopSink`] is the zero-cost default. [`CollectingSink`] is the
//! in-memory sink used by tests, the REPL binary, and any embedder that
//! wants to inspect what was skipped and why.

use crate::error::RuntimeError;

/// One reported runtime failure, with the input stack's serial index within
/// the current evaluation (0-based, in pull order) for context.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub error: RuntimeError,
}

/// Receives runtime diagnostics as the engine skips stacks that errored.
///
/// All methods have a no-op default so implementations only override the
/// hooks they care about, mirroring `VmTracer`'s zero-cost-by-default design.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        let _ = diagnostic;
    }
}

/// Zero-cost default: discards every diagnostic.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {}

/// Collects every diagnostic in arrival order, for tests and interactive use.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink for CollectingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }
}
