//! Overload dispatch: a builtin name that has more than
//! one registered implementation compiles to a single `op_overload` node
//! holding one `(Selector, origin, operator)` entry per implementation. Each
//! upstream stack is probed once (`Stack::selector_probe`), matched against
//! entries in registration order, and routed to the first match; that
//! implementation is drained to exhaustion before the next upstream stack is
//! considered, same as `op_apply`/`op_if_else`.

use std::rc::Rc;

use super::origin::OpOrigin;
use super::{EvalCtx, Op};
use crate::error::RuntimeError;
use crate::layout::{Layout, Loc};
use crate::selector::Selector;
use crate::stack::Stack;

/// One registered implementation of an overloaded operator.
pub struct OverloadArm {
    pub selector: Selector,
    pub origin: Rc<OpOrigin>,
    pub root: Rc<dyn Op>,
    pub profile_name: String,
}

impl std::fmt::Debug for OverloadArm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverloadArm").field("profile_name", &self.profile_name).finish()
    }
}

#[derive(Debug, Default)]
struct OverloadState {
    /// Index into `arms` currently draining, if any.
    active: Option<usize>,
}

#[derive(Debug)]
pub struct OpOverload {
    upstream: Rc<dyn Op>,
    arms: Vec<OverloadArm>,
    loc: Loc,
}

impl OpOverload {
    pub fn new(upstream: Rc<dyn Op>, arms: Vec<OverloadArm>, layout: &mut Layout) -> Self {
        Self { upstream, arms, loc: layout.reserve() }
    }
}

impl Op for OpOverload {
    fn name(&self) -> &'static str {
        "overload"
    }

    fn state_con(&self, sc: &mut crate::layout::Scon) {
        sc.con(self.loc, OverloadState::default());
    }

    fn state_des(&self, sc: &mut crate::layout::Scon) {
        sc.des(self.loc);
    }

    fn next(&self, ctx: &mut EvalCtx) -> Option<Stack> {
        loop {
            let active = ctx.scon.get::<OverloadState>(self.loc).active;
            let idx = match active {
                Some(idx) => idx,
                None => {
                    let stack = self.upstream.next(ctx)?;
                    let probe = stack.selector_probe();
                    match self.arms.iter().position(|arm| arm.selector.matches(probe)) {
                        Some(idx) => {
                            self.arms[idx].origin.install(ctx, stack);
                            ctx.scon.get_mut::<OverloadState>(self.loc).active = Some(idx);
                            idx
                        }
                        None => {
                            ctx.report(RuntimeError::Type {
                                expected: self.arms.iter().map(|a| a.profile_name.clone()).collect(),
                                actual: format!("profile {:#010x}", probe.imprint()),
                            });
                            continue;
                        }
                    }
                }
            };
            if let Some(out) = self.arms[idx].root.next(ctx) {
                return Some(out);
            }
            ctx.scon.get_mut::<OverloadState>(self.loc).active = None;
        }
    }
}
