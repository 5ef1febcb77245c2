//! Origin: the upstream-less entry point of a sub-expression. The
//! controlling operator (alt, subx, capture, if-else, closure
//! apply, ...) calls `install` to set the next stack to yield; `next` yields
//! it exactly once and then reports exhaustion until `install` is called
//! again.

use crate::layout::{Layout, Loc};
use crate::stack::Stack;

use super::{EvalCtx, Op};

#[derive(Debug, Default)]
struct OriginState {
    pending: Option<Stack>,
}

#[derive(Debug)]
pub struct OpOrigin {
    loc: Loc,
}

impl OpOrigin {
    pub fn new(layout: &mut Layout) -> Self {
        Self { loc: layout.reserve() }
    }

    /// Installs the stack this origin will yield on the next `next` call.
    pub fn install(&self, ctx: &mut EvalCtx, stack: Stack) {
        ctx.scon.get_mut::<OriginState>(self.loc).pending = Some(stack);
    }
}

impl Op for OpOrigin {
    fn name(&self) -> &'static str {
        "origin"
    }

    fn state_con(&self, sc: &mut crate::layout::Scon) {
        sc.con(self.loc, OriginState::default());
    }

    fn state_des(&self, sc: &mut crate::layout::Scon) {
        sc.des(self.loc);
    }

    fn next(&self, ctx: &mut EvalCtx) -> Option<Stack> {
        ctx.scon.get_mut::<OriginState>(self.loc).pending.take()
    }
}
