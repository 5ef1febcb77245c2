//! Sub-expression evaluation operators: `CAPTURE` and
//! `SUBX_EVAL`. Both install a clone of the upstream
//! stack into an inner origin and drive an inner operator graph for each
//! upstream stack; they differ only in what they do with the inner results.

use std::rc::Rc;

use super::origin::OpOrigin;
use super::{EvalCtx, Op};
use crate::layout::{Layout, Loc};
use crate::stack::Stack;
use crate::value::Value;

/// `[X]` — collects every inner result's top value into a fresh `Seq`,
/// pushed onto (a clone of) the upstream stack.
#[derive(Debug)]
pub struct OpCapture {
    upstream: Rc<dyn Op>,
    inner_origin: Rc<OpOrigin>,
    inner_root: Rc<dyn Op>,
}

impl OpCapture {
    pub fn new(upstream: Rc<dyn Op>, inner_origin: Rc<OpOrigin>, inner_root: Rc<dyn Op>) -> Self {
        Self { upstream, inner_origin, inner_root }
    }
}

impl Op for OpCapture {
    fn name(&self) -> &'static str {
        "capture"
    }

    fn next(&self, ctx: &mut EvalCtx) -> Option<Stack> {
        let mut stack = self.upstream.next(ctx)?;
        self.inner_origin.install(ctx, stack.clone());
        let mut items = Vec::new();
        while let Some(mut inner) = self.inner_root.next(ctx) {
            if let Some(v) = inner.pop() {
                items.push(v);
            }
        }
        let position = stack.size();
        stack.push(Value::new_seq(items, position));
        Some(stack)
    }
}

#[derive(Debug, Default)]
struct SubxState {
    base: Option<Stack>,
}

/// `(X)` — keeps the top `keep` values of each inner result, pushed atop a
/// copy of the original upstream stack, preserving order. Enumerates every
/// inner yield for a given upstream stack before pulling the next one.
#[derive(Debug)]
pub struct OpSubxEval {
    upstream: Rc<dyn Op>,
    inner_origin: Rc<OpOrigin>,
    inner_root: Rc<dyn Op>,
    keep: usize,
    loc: Loc,
}

impl OpSubxEval {
    pub fn new(
        upstream: Rc<dyn Op>,
        inner_origin: Rc<OpOrigin>,
        inner_root: Rc<dyn Op>,
        keep: usize,
        layout: &mut Layout,
    ) -> Self {
        Self { upstream, inner_origin, inner_root, keep, loc: layout.reserve() }
    }
}

impl Op for OpSubxEval {
    fn name(&self) -> &'static str {
        "subx_eval"
    }

    fn state_con(&self, sc: &mut crate::layout::Scon) {
        sc.con(self.loc, SubxState::default());
    }

    fn state_des(&self, sc: &mut crate::layout::Scon) {
        sc.des(self.loc);
    }

    fn next(&self, ctx: &mut EvalCtx) -> Option<Stack> {
        loop {
            if ctx.scon.get::<SubxState>(self.loc).base.is_none() {
                let base = self.upstream.next(ctx)?;
                self.inner_origin.install(ctx, base.clone());
                ctx.scon.get_mut::<SubxState>(self.loc).base = Some(base);
            }
            let Some(inner) = self.inner_root.next(ctx) else {
                ctx.scon.get_mut::<SubxState>(self.loc).base = None;
                continue;
            };
            let base = ctx.scon.get::<SubxState>(self.loc).base.clone().expect("base stack missing");
            let inner_values = inner.values();
            let n = inner_values.len();
            let keep = self.keep.min(n);
            let kept = &inner_values[n - keep..];
            let mut out = base;
            for v in kept {
                out.push(v.clone());
            }
            return Some(out);
        }
    }
}
