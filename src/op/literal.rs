//! Literal push operator: on each upstream stack, pushes a
//! cloned literal value stamped with a fresh position. Used for both `CONST`
//! and `STR` tree nodes — the literal payload differs, the operator doesn't.

use std::rc::Rc;

use super::{EvalCtx, Op};
use crate::layout::{Layout, Loc};
use crate::stack::Stack;
use crate::value::Value;

#[derive(Debug, Default)]
struct LiteralState {
    next_position: usize,
}

#[derive(Debug)]
pub struct OpLiteral {
    upstream: Rc<dyn Op>,
    template: Value,
    loc: Loc,
}

impl OpLiteral {
    pub fn new(upstream: Rc<dyn Op>, template: Value, layout: &mut Layout) -> Self {
        Self { upstream, template, loc: layout.reserve() }
    }
}

impl Op for OpLiteral {
    fn name(&self) -> &'static str {
        "literal"
    }

    fn state_con(&self, sc: &mut crate::layout::Scon) {
        sc.con(self.loc, LiteralState::default());
    }

    fn state_des(&self, sc: &mut crate::layout::Scon) {
        sc.des(self.loc);
    }

    fn next(&self, ctx: &mut EvalCtx) -> Option<Stack> {
        let mut stack = self.upstream.next(ctx)?;
        let state = ctx.scon.get_mut::<LiteralState>(self.loc);
        state.next_position += 1;
        stack.push(self.template.clone_with_position(state.next_position));
        Some(stack)
    }
}
