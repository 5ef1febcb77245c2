//! First-match alternation: tries branches in order for a
//! given upstream stack; once a branch has yielded, keeps draining it and
//! only advances to the next branch once the current one exhausts. Only
//! once every branch is exhausted for a stack is a new upstream stack pulled.

use std::rc::Rc;

use super::origin::OpOrigin;
use super::{EvalCtx, Op};
use crate::layout::{Layout, Loc};
use crate::stack::Stack;

#[derive(Debug)]
struct OrState {
    /// Branch currently in play, if an upstream stack has been pulled.
    active: Option<usize>,
    /// The candidate stack that was installed into `branches[active].0`, kept
    /// so it can be reinstalled into the next branch's origin if the current
    /// one exhausts without yielding (more) results.
    candidate: Option<Stack>,
}

#[derive(Debug)]
pub struct OpOr {
    upstream: Rc<dyn Op>,
    /// One (origin, branch root) pair per alternative, in try-order.
    branches: Vec<(Rc<OpOrigin>, Rc<dyn Op>)>,
    loc: Loc,
}

impl OpOr {
    pub fn new(upstream: Rc<dyn Op>, branches: Vec<(Rc<OpOrigin>, Rc<dyn Op>)>, layout: &mut Layout) -> Self {
        Self { upstream, branches, loc: layout.reserve() }
    }
}

impl Op for OpOr {
    fn name(&self) -> &'static str {
        "or"
    }

    fn state_con(&self, sc: &mut crate::layout::Scon) {
        sc.con(self.loc, OrState { active: None, candidate: None });
    }

    fn state_des(&self, sc: &mut crate::layout::Scon) {
        sc.des(self.loc);
    }

    fn next(&self, ctx: &mut EvalCtx) -> Option<Stack> {
        loop {
            let active = ctx.scon.get::<OrState>(self.loc).active;
            match active {
                Some(idx) => {
                    let (_, root) = &self.branches[idx];
                    if let Some(out) = root.next(ctx) {
                        return Some(out);
                    }
                    let next_idx = idx + 1;
                    if next_idx >= self.branches.len() {
                        let state = ctx.scon.get_mut::<OrState>(self.loc);
                        state.active = None;
                        state.candidate = None;
                        continue;
                    }
                    let stack = ctx.scon.get::<OrState>(self.loc).candidate.clone().expect("candidate stack missing");
                    let (origin, _) = &self.branches[next_idx];
                    origin.install(ctx, stack);
                    ctx.scon.get_mut::<OrState>(self.loc).active = Some(next_idx);
                }
                None => {
                    let stack = self.upstream.next(ctx)?;
                    let (origin, _) = &self.branches[0];
                    origin.install(ctx, stack.clone());
                    let state = ctx.scon.get_mut::<OrState>(self.loc);
                    state.candidate = Some(stack);
                    state.active = Some(0);
                }
            }
        }
    }
}
