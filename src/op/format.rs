//! Format strings: a pipeline of "stringer" nodes —
//! literal-text terminals and sub-expression terminals — chained like CAT,
//! each consuming the previous stringer's `(stack, partial string)` pair and
//! producing the next.
//!
//! Simplification (documented in `DESIGN.md`): an op-stringer's embedded
//! sub-expression (`%(...)`) takes only its *first* yield, leaving exactly
//! one value for that construct; it does not additionally enumerate further
//! alternatives the sub-expression might produce.

use std::rc::Rc;

use super::origin::OpOrigin;
use super::{EvalCtx, Op};
use crate::error::RuntimeError;
use crate::layout::{Layout, Loc};
use crate::stack::Stack;
use crate::value::Value;

/// A node in the format-string evaluation pipeline (a "stringer"):
/// consumes one upstream `(stack, partial)` pair, produces one.
pub trait Stringer: std::fmt::Debug {
    fn pull(&self, ctx: &mut EvalCtx) -> Option<(Stack, String)>;
}

#[derive(Debug, Default)]
struct StringerOriginState {
    pending: Option<(Stack, String)>,
}

#[derive(Debug)]
pub struct StringerOrigin {
    loc: Loc,
}

impl StringerOrigin {
    pub fn new(layout: &mut Layout) -> Self {
        Self { loc: layout.reserve() }
    }

    pub fn install(&self, ctx: &mut EvalCtx, stack: Stack) {
        ctx.scon.get_mut::<StringerOriginState>(self.loc).pending = Some((stack, String::new()));
    }

    fn con(&self, sc: &mut crate::layout::Scon) {
        sc.con(self.loc, StringerOriginState::default());
    }

    fn des(&self, sc: &mut crate::layout::Scon) {
        sc.des(self.loc);
    }
}

impl Stringer for StringerOrigin {
    fn pull(&self, ctx: &mut EvalCtx) -> Option<(Stack, String)> {
        ctx.scon.get_mut::<StringerOriginState>(self.loc).pending.take()
    }
}

/// A literal piece of text (`%%`-unescaped source between format escapes).
#[derive(Debug)]
pub struct LiteralStringer {
    upstream: Rc<dyn Stringer>,
    text: String,
}

impl LiteralStringer {
    pub fn new(upstream: Rc<dyn Stringer>, text: String) -> Self {
        Self { upstream, text }
    }
}

impl Stringer for LiteralStringer {
    fn pull(&self, ctx: &mut EvalCtx) -> Option<(Stack, String)> {
        let (stack, mut partial) = self.upstream.pull(ctx)?;
        partial.push_str(&self.text);
        Some((stack, partial))
    }
}

/// `%s` (pops and formats the TOS of the *format expression's* own stack) or
/// `%(...)` (evaluates a sub-expression against a clone of the stack).
#[derive(Debug)]
pub struct OpStringer {
    upstream: Rc<dyn Stringer>,
    inner_origin: Rc<OpOrigin>,
    inner_root: Rc<dyn Op>,
}

impl OpStringer {
    pub fn new(upstream: Rc<dyn Stringer>, inner_origin: Rc<OpOrigin>, inner_root: Rc<dyn Op>) -> Self {
        Self { upstream, inner_origin, inner_root }
    }
}

impl Stringer for OpStringer {
    fn pull(&self, ctx: &mut EvalCtx) -> Option<(Stack, String)> {
        let (stack, mut partial) = self.upstream.pull(ctx)?;
        self.inner_origin.install(ctx, stack.clone());
        let mut inner = self.inner_root.next(ctx)?;
        let shown = inner.pop()?.show(true);
        partial.push_str(&shown);
        Some((stack, partial))
    }
}

#[derive(Debug)]
pub struct OpFormat {
    upstream: Rc<dyn Op>,
    stringer_origin: Rc<StringerOrigin>,
    stringer_root: Rc<dyn Stringer>,
}

impl OpFormat {
    pub fn new(upstream: Rc<dyn Op>, stringer_origin: Rc<StringerOrigin>, stringer_root: Rc<dyn Stringer>) -> Self {
        Self { upstream, stringer_origin, stringer_root }
    }
}

impl Op for OpFormat {
    fn name(&self) -> &'static str {
        "format"
    }

    fn state_con(&self, sc: &mut crate::layout::Scon) {
        self.stringer_origin.con(sc);
    }

    fn state_des(&self, sc: &mut crate::layout::Scon) {
        self.stringer_origin.des(sc);
    }

    fn next(&self, ctx: &mut EvalCtx) -> Option<Stack> {
        loop {
            let mut stack = self.upstream.next(ctx)?;
            self.stringer_origin.install(ctx, stack.clone());
            match self.stringer_root.pull(ctx) {
                Some((_, text)) => {
                    let position = stack.size();
                    stack.push(Value::new_str(text.into_bytes(), position));
                    return Some(stack);
                }
                None => {
                    ctx.report(RuntimeError::Format {
                        message: "format sub-expression produced no value".to_string(),
                    });
                }
            }
        }
    }
}
