//! The public API: parse and compile a query once,
//! then evaluate it against as many starting stacks as the caller likes.
//!
//! A [`Query`] owns the compiled operator graph and its [`Layout`]; each
//! call to [`Query::start`]/[`Query::start_with`] allocates a fresh
//! [`Scon`], constructs every node's state in the order `compiler.rs`
//! registered them, and tears it down in reverse when the returned
//! [`QueryResult`] is dropped — the LIFO contract `layout.rs` documents,
//! driven here instead of by any individual operator.

use crate::builtins::Vocabulary;
use crate::compiler::{self, CompiledQuery};
use crate::diagnostics::{DiagnosticSink, NoopSink};
use crate::error::CompileError;
use crate::layout::Scon;
use crate::op::EvalCtx;
use crate::parser::Parser;
use crate::resource::{NoLimitTracker, ResourceTracker};
use crate::simplify::simplify;
use crate::stack::Stack;

/// A compiled, reusable query.
pub struct Query {
    compiled: CompiledQuery,
}

impl Query {
    /// Parses, simplifies, and lowers `src` against `voc`. Borrows nothing
    /// from `voc` past this call — the resulting graph owns every operator
    /// and predicate a builtin handed back.
    pub fn compile(src: &str, voc: &Vocabulary) -> Result<Self, CompileError> {
        let tree = Parser::parse(src)?;
        let tree = simplify(tree);
        let compiled = compiler::compile(&tree, voc)?;
        Ok(Self { compiled })
    }

    /// Starts an evaluation with no diagnostics and no resource limits, the
    /// ambient defaults an embedder that doesn't ask for more gets for free.
    pub fn start(&self, initial: Stack) -> QueryResult<'_, NoopSink, NoLimitTracker> {
        self.start_with(initial, NoopSink, NoLimitTracker)
    }

    /// Starts an evaluation with caller-supplied diagnostics and resource
    /// tracking, e.g. a [`crate::diagnostics::CollectingSink`] and a
    /// [`crate::resource::LimitedTracker`].
    pub fn start_with<'q, D: DiagnosticSink, R: ResourceTracker>(
        &'q self,
        initial: Stack,
        diagnostics: D,
        resources: R,
    ) -> QueryResult<'q, D, R> {
        QueryResult::new(self, initial, diagnostics, resources)
    }
}

/// One evaluation of a [`Query`]: a pull-pipeline iterator yielding every
/// result [`Stack`], backed by its own [`Scon`] for the lifetime of this
/// value. Dropping it tears the state buffer down.
pub struct QueryResult<'q, D: DiagnosticSink, R: ResourceTracker> {
    query: &'q Query,
    scon: Scon,
    diagnostics: D,
    resources: R,
}

impl<'q, D: DiagnosticSink, R: ResourceTracker> QueryResult<'q, D, R> {
    fn new(query: &'q Query, initial: Stack, diagnostics: D, resources: R) -> Self {
        let mut scon = Scon::new(&query.compiled.layout);
        for node in &query.compiled.nodes {
            node.state_con(&mut scon);
        }
        let mut result = Self { query, scon, diagnostics, resources };
        let mut ctx = result.ctx();
        query.compiled.entry.install(&mut ctx, initial);
        result
    }

    fn ctx(&mut self) -> EvalCtx<'_> {
        EvalCtx { scon: &mut self.scon, diagnostics: &mut self.diagnostics, resources: &mut self.resources }
    }

    /// The diagnostics sink accumulated so far (e.g. to inspect a
    /// [`crate::diagnostics::CollectingSink`] mid-evaluation or once
    /// iteration is exhausted).
    pub fn diagnostics(&self) -> &D {
        &self.diagnostics
    }
}

impl<'q, D: DiagnosticSink, R: ResourceTracker> Iterator for QueryResult<'q, D, R> {
    type Item = Stack;

    fn next(&mut self) -> Option<Stack> {
        let root = self.query.compiled.root.clone();
        let mut ctx = self.ctx();
        root.next(&mut ctx)
    }
}

impl<'q, D: DiagnosticSink, R: ResourceTracker> Drop for QueryResult<'q, D, R> {
    fn drop(&mut self) {
        for node in self.query.compiled.nodes.iter().rev() {
            node.state_des(&mut self.scon);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::demo::demo_vocabulary;

    #[test]
    fn compiles_and_runs_a_simple_query() {
        let voc = demo_vocabulary();
        let query = Query::compile("1 2 add", &voc).unwrap();
        let out: Vec<Stack> = query.start(Stack::new()).collect();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].top().unwrap().as_const().unwrap().value.to_i128(), 3);
    }

    #[test]
    fn can_be_run_more_than_once() {
        let voc = demo_vocabulary();
        let query = Query::compile("1, 2, 3", &voc).unwrap();
        let first: Vec<i128> =
            query.start(Stack::new()).map(|s| s.top().unwrap().as_const().unwrap().value.to_i128()).collect();
        let second: Vec<i128> =
            query.start(Stack::new()).map(|s| s.top().unwrap().as_const().unwrap().value.to_i128()).collect();
        assert_eq!(first, vec![1, 2, 3]);
        assert_eq!(second, vec![1, 2, 3]);
    }

    #[test]
    fn compile_error_surfaces_as_name_error() {
        let voc = demo_vocabulary();
        assert!(Query::compile("nope", &voc).is_err());
    }
}
