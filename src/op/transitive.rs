//! Transitive closure: `X*` / `X+`. Each freshly pulled
//! upstream stack starts its own closure horizon — a breadth-first expansion
//! through the inner operator, deduplicated by stack content, drained
//! completely before the next upstream stack is considered. `*` yields the
//! seed itself; `+` does not.

use std::collections::VecDeque;
use std::rc::Rc;

use super::origin::OpOrigin;
use super::{EvalCtx, Op};
use crate::error::RuntimeError;
use crate::layout::{Layout, Loc};
use crate::stack::Stack;
use crate::value::CmpResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosureKind {
    Star,
    Plus,
}

#[derive(Debug, Default)]
struct TransState {
    queue: VecDeque<Stack>,
    seen: Vec<Stack>,
    /// The work item currently installed into the inner origin and being
    /// drained; `None` means the next call must pop a new item from `queue`
    /// (or, if `queue` is empty too, pull a fresh seed from upstream).
    current: Option<Stack>,
}

fn stacks_equal(a: &Stack, b: &Stack) -> bool {
    let (av, bv) = (a.values(), b.values());
    av.len() == bv.len() && av.iter().zip(bv.iter()).all(|(x, y)| x.cmp(y) == CmpResult::Equal)
}

#[derive(Debug)]
pub struct OpTransitiveClosure {
    upstream: Rc<dyn Op>,
    inner_origin: Rc<OpOrigin>,
    inner_root: Rc<dyn Op>,
    kind: ClosureKind,
    loc: Loc,
}

impl OpTransitiveClosure {
    pub fn new(
        upstream: Rc<dyn Op>,
        inner_origin: Rc<OpOrigin>,
        inner_root: Rc<dyn Op>,
        kind: ClosureKind,
        layout: &mut Layout,
    ) -> Self {
        Self { upstream, inner_origin, inner_root, kind, loc: layout.reserve() }
    }

    fn mark_and_enqueue(&self, ctx: &mut EvalCtx, stack: Stack) -> bool {
        let state = ctx.scon.get_mut::<TransState>(self.loc);
        if state.seen.iter().any(|s| stacks_equal(s, &stack)) {
            return false;
        }
        state.seen.push(stack.clone());
        state.queue.push_back(stack);
        true
    }
}

impl Op for OpTransitiveClosure {
    fn name(&self) -> &'static str {
        "transitive_closure"
    }

    fn state_con(&self, sc: &mut crate::layout::Scon) {
        sc.con(self.loc, TransState::default());
    }

    fn state_des(&self, sc: &mut crate::layout::Scon) {
        sc.des(self.loc);
    }

    fn next(&self, ctx: &mut EvalCtx) -> Option<Stack> {
        loop {
            if let Err(e) = ctx.resources.step() {
                ctx.report(RuntimeError::Predicate { message: e.to_string() });
                return None;
            }
            let has_current = ctx.scon.get::<TransState>(self.loc).current.is_some();
            if !has_current {
                let popped = ctx.scon.get_mut::<TransState>(self.loc).queue.pop_front();
                match popped {
                    Some(item) => {
                        self.inner_origin.install(ctx, item.clone());
                        ctx.scon.get_mut::<TransState>(self.loc).current = Some(item);
                    }
                    None => {
                        let seed = self.upstream.next(ctx)?;
                        let state = ctx.scon.get_mut::<TransState>(self.loc);
                        state.seen.clear();
                        state.seen.push(seed.clone());
                        state.queue.push_back(seed.clone());
                        if self.kind == ClosureKind::Star {
                            return Some(seed);
                        }
                        continue;
                    }
                }
            }
            match self.inner_root.next(ctx) {
                Some(result) => {
                    if self.mark_and_enqueue(ctx, result.clone()) {
                        return Some(result);
                    }
                }
                None => {
                    ctx.scon.get_mut::<TransState>(self.loc).current = None;
                }
            }
        }
    }
}
