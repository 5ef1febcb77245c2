//! Predicate combinators and the `op_assert` bridge back into the `Op`
//! world.
//!
//! Predicates propagate `PredResult::Fail` rather than coercing it to `No`:
//! a failed comparison (e.g. comparing a `Str` against a `Seq`) is a runtime
//! error, not simply "the predicate didn't match".

use std::rc::Rc;

use super::origin::OpOrigin;
use super::{EvalCtx, Op, Pred, PredResult};
use crate::error::RuntimeError;
use crate::stack::Stack;
use crate::value::CmpResult;

#[derive(Debug)]
pub struct PredAnd {
    a: Rc<dyn Pred>,
    b: Rc<dyn Pred>,
}

impl PredAnd {
    pub fn new(a: Rc<dyn Pred>, b: Rc<dyn Pred>) -> Self {
        Self { a, b }
    }
}

impl Pred for PredAnd {
    fn name(&self) -> &'static str {
        "and"
    }

    fn state_con(&self, sc: &mut crate::layout::Scon) {
        self.a.state_con(sc);
        self.b.state_con(sc);
    }

    fn state_des(&self, sc: &mut crate::layout::Scon) {
        self.b.state_des(sc);
        self.a.state_des(sc);
    }

    fn eval(&self, ctx: &mut EvalCtx, stack: &Stack) -> PredResult {
        match self.a.eval(ctx, stack) {
            PredResult::Yes => self.b.eval(ctx, stack),
            other => other,
        }
    }
}

#[derive(Debug)]
pub struct PredOr {
    a: Rc<dyn Pred>,
    b: Rc<dyn Pred>,
}

impl PredOr {
    pub fn new(a: Rc<dyn Pred>, b: Rc<dyn Pred>) -> Self {
        Self { a, b }
    }
}

impl Pred for PredOr {
    fn name(&self) -> &'static str {
        "or"
    }

    fn state_con(&self, sc: &mut crate::layout::Scon) {
        self.a.state_con(sc);
        self.b.state_con(sc);
    }

    fn state_des(&self, sc: &mut crate::layout::Scon) {
        self.b.state_des(sc);
        self.a.state_des(sc);
    }

    fn eval(&self, ctx: &mut EvalCtx, stack: &Stack) -> PredResult {
        match self.a.eval(ctx, stack) {
            PredResult::No => self.b.eval(ctx, stack),
            other => other,
        }
    }
}

#[derive(Debug)]
pub struct PredNot {
    inner: Rc<dyn Pred>,
}

impl PredNot {
    pub fn new(inner: Rc<dyn Pred>) -> Self {
        Self { inner }
    }
}

impl Pred for PredNot {
    fn name(&self) -> &'static str {
        "not"
    }

    fn state_con(&self, sc: &mut crate::layout::Scon) {
        self.inner.state_con(sc);
    }

    fn state_des(&self, sc: &mut crate::layout::Scon) {
        self.inner.state_des(sc);
    }

    fn eval(&self, ctx: &mut EvalCtx, stack: &Stack) -> PredResult {
        match self.inner.eval(ctx, stack) {
            PredResult::Yes => PredResult::No,
            PredResult::No => PredResult::Yes,
            PredResult::Fail => PredResult::Fail,
        }
    }
}

/// `?(X)` / `!(X)` — yields `Yes` iff the sub-expression produces at least
/// one result against a clone of the candidate stack.
#[derive(Debug)]
pub struct PredSubxAny {
    origin: Rc<OpOrigin>,
    root: Rc<dyn Op>,
}

impl PredSubxAny {
    pub fn new(origin: Rc<OpOrigin>, root: Rc<dyn Op>) -> Self {
        Self { origin, root }
    }
}

impl Pred for PredSubxAny {
    fn name(&self) -> &'static str {
        "subx_any"
    }

    fn state_con(&self, sc: &mut crate::layout::Scon) {
        self.origin.state_con(sc);
    }

    fn state_des(&self, sc: &mut crate::layout::Scon) {
        self.origin.state_des(sc);
    }

    fn eval(&self, ctx: &mut EvalCtx, stack: &Stack) -> PredResult {
        self.origin.install(ctx, stack.clone());
        if self.root.next(ctx).is_some() {
            PredResult::Yes
        } else {
            PredResult::No
        }
    }
}

/// Comparison used to combine two sub-expressions' first results
/// (`?(X == Y)`-shaped predicates built over comparison builtins).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparator {
    pub(crate) fn accepts(self, cmp: CmpResult) -> Option<bool> {
        match cmp {
            CmpResult::Fail => None,
            CmpResult::Equal => Some(matches!(self, Self::Eq | Self::Le | Self::Ge)),
            CmpResult::Less => Some(matches!(self, Self::Ne | Self::Lt | Self::Le)),
            CmpResult::Greater => Some(matches!(self, Self::Ne | Self::Gt | Self::Ge)),
        }
    }
}

/// Evaluates two sub-expressions against the candidate stack and compares
/// the top value of each one's first result.
#[derive(Debug)]
pub struct PredSubxCmp {
    left_origin: Rc<OpOrigin>,
    left_root: Rc<dyn Op>,
    right_origin: Rc<OpOrigin>,
    right_root: Rc<dyn Op>,
    comparator: Comparator,
}

impl PredSubxCmp {
    pub fn new(
        left_origin: Rc<OpOrigin>,
        left_root: Rc<dyn Op>,
        right_origin: Rc<OpOrigin>,
        right_root: Rc<dyn Op>,
        comparator: Comparator,
    ) -> Self {
        Self { left_origin, left_root, right_origin, right_root, comparator }
    }
}

impl Pred for PredSubxCmp {
    fn name(&self) -> &'static str {
        "subx_cmp"
    }

    fn state_con(&self, sc: &mut crate::layout::Scon) {
        self.left_origin.state_con(sc);
        self.right_origin.state_con(sc);
    }

    fn state_des(&self, sc: &mut crate::layout::Scon) {
        self.right_origin.state_des(sc);
        self.left_origin.state_des(sc);
    }

    fn eval(&self, ctx: &mut EvalCtx, stack: &Stack) -> PredResult {
        self.left_origin.install(ctx, stack.clone());
        let Some(left) = self.left_root.next(ctx) else {
            ctx.report(RuntimeError::Predicate { message: "comparison's left side produced no value".to_string() });
            return PredResult::Fail;
        };
        self.right_origin.install(ctx, stack.clone());
        let Some(right) = self.right_root.next(ctx) else {
            ctx.report(RuntimeError::Predicate { message: "comparison's right side produced no value".to_string() });
            return PredResult::Fail;
        };
        let (Some(l), Some(r)) = (left.top(), right.top()) else {
            ctx.report(RuntimeError::Predicate { message: "comparison side produced an empty stack".to_string() });
            return PredResult::Fail;
        };
        match self.comparator.accepts(l.cmp(r)) {
            Some(true) => PredResult::Yes,
            Some(false) => PredResult::No,
            None => {
                ctx.report(RuntimeError::Predicate { message: "values are not comparable".to_string() });
                PredResult::Fail
            }
        }
    }
}

/// `?N` / `!N` — tests the candidate stack's top value's position.
#[derive(Debug)]
pub struct PredPos {
    expected: usize,
}

impl PredPos {
    pub fn new(expected: usize) -> Self {
        Self { expected }
    }
}

impl Pred for PredPos {
    fn name(&self) -> &'static str {
        "pos"
    }

    fn eval(&self, ctx: &mut EvalCtx, stack: &Stack) -> PredResult {
        match stack.top() {
            Some(v) => {
                if v.position() == self.expected {
                    PredResult::Yes
                } else {
                    PredResult::No
                }
            }
            None => {
                ctx.report(RuntimeError::Predicate { message: "?N applied to an empty stack".to_string() });
                PredResult::Fail
            }
        }
    }
}

/// Bridges a predicate back into the `Op` world: pulls upstream stacks,
/// skipping (and diagnosing) any that the predicate rejects or fails on,
/// yielding the first one it accepts.
#[derive(Debug)]
pub struct OpAssert {
    upstream: Rc<dyn Op>,
    pred: Rc<dyn Pred>,
}

impl OpAssert {
    pub fn new(upstream: Rc<dyn Op>, pred: Rc<dyn Pred>) -> Self {
        Self { upstream, pred }
    }
}

impl Op for OpAssert {
    fn name(&self) -> &'static str {
        "assert"
    }

    fn state_con(&self, sc: &mut crate::layout::Scon) {
        self.pred.state_con(sc);
    }

    fn state_des(&self, sc: &mut crate::layout::Scon) {
        self.pred.state_des(sc);
    }

    fn next(&self, ctx: &mut EvalCtx) -> Option<Stack> {
        loop {
            let stack = self.upstream.next(ctx)?;
            match self.pred.eval(ctx, &stack) {
                PredResult::Yes => return Some(stack),
                PredResult::No => continue,
                PredResult::Fail => continue,
            }
        }
    }
}
