//! `if C then T else E`. `then`/`else` share state space
//! (a "union layout": at most one is ever active for a given upstream stack),
//! modeled here by giving both the same general per-node state slot
//! treatment documented in `layout.rs`'s doc comment.

use std::rc::Rc;

use super::origin::OpOrigin;
use super::{EvalCtx, Op};
use crate::layout::{Layout, Loc};
use crate::stack::Stack;

#[derive(Debug, Clone, Copy)]
enum Active {
    Then,
    Else,
}

#[derive(Debug, Default)]
struct IfElseState {
    active: Option<Active>,
}

#[derive(Debug)]
pub struct OpIfElse {
    upstream: Rc<dyn Op>,
    cond_origin: Rc<OpOrigin>,
    cond_root: Rc<dyn Op>,
    then_origin: Rc<OpOrigin>,
    then_root: Rc<dyn Op>,
    else_origin: Rc<OpOrigin>,
    else_root: Rc<dyn Op>,
    loc: Loc,
}

impl OpIfElse {
    pub fn new(
        upstream: Rc<dyn Op>,
        cond_origin: Rc<OpOrigin>,
        cond_root: Rc<dyn Op>,
        then_origin: Rc<OpOrigin>,
        then_root: Rc<dyn Op>,
        else_origin: Rc<OpOrigin>,
        else_root: Rc<dyn Op>,
        layout: &mut Layout,
    ) -> Self {
        Self {
            upstream,
            cond_origin,
            cond_root,
            then_origin,
            then_root,
            else_origin,
            else_root,
            loc: layout.reserve(),
        }
    }
}

impl Op for OpIfElse {
    fn name(&self) -> &'static str {
        "if_else"
    }

    fn state_con(&self, sc: &mut crate::layout::Scon) {
        sc.con(self.loc, IfElseState::default());
    }

    fn state_des(&self, sc: &mut crate::layout::Scon) {
        sc.des(self.loc);
    }

    fn next(&self, ctx: &mut EvalCtx) -> Option<Stack> {
        loop {
            let active = ctx.scon.get::<IfElseState>(self.loc).active;
            match active {
                Some(Active::Then) => {
                    if let Some(out) = self.then_root.next(ctx) {
                        return Some(out);
                    }
                    ctx.scon.get_mut::<IfElseState>(self.loc).active = None;
                }
                Some(Active::Else) => {
                    if let Some(out) = self.else_root.next(ctx) {
                        return Some(out);
                    }
                    ctx.scon.get_mut::<IfElseState>(self.loc).active = None;
                }
                None => {
                    let stack = self.upstream.next(ctx)?;
                    self.cond_origin.install(ctx, stack.clone());
                    if self.cond_root.next(ctx).is_some() {
                        self.then_origin.install(ctx, stack);
                        ctx.scon.get_mut::<IfElseState>(self.loc).active = Some(Active::Then);
                    } else {
                        self.else_origin.install(ctx, stack);
                        ctx.scon.get_mut::<IfElseState>(self.loc).active = Some(Active::Else);
                    }
                }
            }
        }
    }
}
