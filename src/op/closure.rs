//! Bind / Read / lexical closures / Apply.
//!
//! `op_bind` stores the top of each upstream stack into its own state slot
//! (popping it off, not re-pushing it) and passes the reduced stack to the
//! `let`-body. `op_read` pushes a clone of a bind slot it can see directly
//! (same lexical scope, no block boundary crossed). A `{...}` block compiles
//! to `op_lex_closure`, which captures the current value of every referenced
//! outer binding into an upvalue vector and emits a `Closure` value. Reads
//! that cross a block boundary compile to `op_upread`, which goes through
//! the closure's rendezvous cell instead of reading the outer bind slot
//! directly — the outer frame may have moved on (or be mid-recursion) by the
//! time the block actually runs.

use std::rc::Rc;

use super::origin::OpOrigin;
use super::{EvalCtx, Op};
use crate::error::RuntimeError;
use crate::layout::{Layout, Loc};
use crate::stack::Stack;
use crate::value::Closure;

#[derive(Debug, Default)]
struct BindState {
    value: Option<crate::value::Value>,
}

#[derive(Debug)]
pub struct OpBind {
    upstream: Rc<dyn Op>,
    loc: Loc,
}

impl OpBind {
    pub fn new(upstream: Rc<dyn Op>, layout: &mut Layout) -> Self {
        Self { upstream, loc: layout.reserve() }
    }

    pub fn loc(&self) -> Loc {
        self.loc
    }
}

impl Op for OpBind {
    fn name(&self) -> &'static str {
        "bind"
    }

    fn state_con(&self, sc: &mut crate::layout::Scon) {
        sc.con(self.loc, BindState::default());
    }

    fn state_des(&self, sc: &mut crate::layout::Scon) {
        sc.des(self.loc);
    }

    fn next(&self, ctx: &mut EvalCtx) -> Option<Stack> {
        let mut stack = self.upstream.next(ctx)?;
        let top = stack.pop()?;
        ctx.scon.get_mut::<BindState>(self.loc).value = Some(top);
        Some(stack)
    }
}

/// Reads a binding in the same lexical scope (no block boundary crossed).
#[derive(Debug)]
pub struct OpRead {
    upstream: Rc<dyn Op>,
    target: Loc,
}

impl OpRead {
    pub fn new(upstream: Rc<dyn Op>, target: Loc) -> Self {
        Self { upstream, target }
    }
}

impl Op for OpRead {
    fn name(&self) -> &'static str {
        "read"
    }

    fn next(&self, ctx: &mut EvalCtx) -> Option<Stack> {
        let mut stack = self.upstream.next(ctx)?;
        let value = ctx.scon.get::<BindState>(self.target).value.clone().expect("read before bind");
        stack.push(value);
        Some(stack)
    }
}

#[derive(Debug, Default)]
struct RendezvousState {
    current: Option<Closure>,
}

/// Reads upvalue `index` of whichever closure is currently installed at
/// `rendezvous`.
#[derive(Debug)]
pub struct OpUpread {
    upstream: Rc<dyn Op>,
    rendezvous: Loc,
    index: usize,
}

impl OpUpread {
    pub fn new(upstream: Rc<dyn Op>, rendezvous: Loc, index: usize) -> Self {
        Self { upstream, rendezvous, index }
    }
}

impl Op for OpUpread {
    fn name(&self) -> &'static str {
        "upread"
    }

    fn next(&self, ctx: &mut EvalCtx) -> Option<Stack> {
        let mut stack = self.upstream.next(ctx)?;
        let closure = ctx.scon.get::<RendezvousState>(self.rendezvous).current.clone().expect("upread outside closure body");
        let value = closure.upvalues[self.index].clone();
        stack.push(value);
        Some(stack)
    }
}

/// Where an `op_lex_closure` reads one upvalue's current value from at
/// capture time: either a binding in the directly-enclosing frame, or an
/// upvalue of the closure already running (for a block nested inside another
/// block, chaining capture through each boundary it crosses).
#[derive(Debug, Clone)]
pub enum UpvalueSource {
    Direct(Loc),
    Upvalue { rendezvous: Loc, index: usize },
}

/// `{...}` — captures the current value of every upvalue and packages the
/// block's own operator graph into a `Closure` value.
#[derive(Debug)]
pub struct OpLexClosure {
    upstream: Rc<dyn Op>,
    block_root: Rc<dyn Op>,
    block_origin: Rc<OpOrigin>,
    rendezvous: Loc,
    upvalue_sources: Vec<UpvalueSource>,
}

impl OpLexClosure {
    /// `rendezvous` must already have been reserved by the compiler (and used
    /// to wire any `op_upread` inside `block_root`), since the block's own
    /// body is built before this node exists.
    pub fn new(
        upstream: Rc<dyn Op>,
        block_root: Rc<dyn Op>,
        block_origin: Rc<OpOrigin>,
        rendezvous: Loc,
        upvalue_sources: Vec<UpvalueSource>,
    ) -> Self {
        Self { upstream, block_root, block_origin, rendezvous, upvalue_sources }
    }

    pub fn rendezvous(&self) -> Loc {
        self.rendezvous
    }
}

impl Op for OpLexClosure {
    fn name(&self) -> &'static str {
        "lex_closure"
    }

    fn state_con(&self, sc: &mut crate::layout::Scon) {
        sc.con(self.rendezvous, RendezvousState::default());
    }

    fn state_des(&self, sc: &mut crate::layout::Scon) {
        sc.des(self.rendezvous);
    }

    fn next(&self, ctx: &mut EvalCtx) -> Option<Stack> {
        let mut stack = self.upstream.next(ctx)?;
        let upvalues: Vec<crate::value::Value> = self
            .upvalue_sources
            .iter()
            .map(|source| match source {
                UpvalueSource::Direct(loc) => {
                    ctx.scon.get::<BindState>(*loc).value.clone().expect("upvalue read before bind")
                }
                UpvalueSource::Upvalue { rendezvous, index } => {
                    let closure = ctx
                        .scon
                        .get::<RendezvousState>(*rendezvous)
                        .current
                        .clone()
                        .expect("upvalue read outside closure body");
                    closure.upvalues[*index].clone()
                }
            })
            .collect();
        let closure = Closure {
            root: self.block_root.clone(),
            origin: self.block_origin.clone(),
            rendezvous: self.rendezvous,
            upvalues: Rc::new(upvalues),
        };
        let position = stack.size();
        stack.push(crate::value::Value::new_closure(closure, position));
        Some(stack)
    }
}

#[derive(Debug, Default)]
struct ApplyState {
    draining: Option<Closure>,
}

/// `apply` — consumes a `Closure` off the top of each upstream stack, runs
/// its body against the rest, and re-yields every result.
#[derive(Debug)]
pub struct OpApply {
    upstream: Rc<dyn Op>,
    loc: Loc,
}

impl OpApply {
    pub fn new(upstream: Rc<dyn Op>, layout: &mut Layout) -> Self {
        Self { upstream, loc: layout.reserve() }
    }
}

impl Op for OpApply {
    fn name(&self) -> &'static str {
        "apply"
    }

    fn state_con(&self, sc: &mut crate::layout::Scon) {
        sc.con(self.loc, ApplyState::default());
    }

    fn state_des(&self, sc: &mut crate::layout::Scon) {
        sc.des(self.loc);
    }

    fn next(&self, ctx: &mut EvalCtx) -> Option<Stack> {
        loop {
            let draining = ctx.scon.get::<ApplyState>(self.loc).draining.clone();
            let closure = match draining {
                Some(c) => c,
                None => loop {
                    let mut stack = self.upstream.next(ctx)?;
                    let Some(top) = stack.pop() else {
                        ctx.report(RuntimeError::Type {
                            expected: vec!["closure".to_string()],
                            actual: "empty stack".to_string(),
                        });
                        continue;
                    };
                    let Some(closure) = top.as_closure().cloned() else {
                        ctx.report(RuntimeError::Type { expected: vec!["closure".to_string()], actual: top.type_name().to_string() });
                        continue;
                    };
                    ctx.scon.get_mut::<RendezvousState>(closure.rendezvous).current = Some(closure.clone());
                    closure.origin.install(ctx, stack);
                    ctx.scon.get_mut::<ApplyState>(self.loc).draining = Some(closure.clone());
                    break closure;
                },
            };
            if let Some(out) = closure.root.next(ctx) {
                return Some(out);
            }
            ctx.scon.get_mut::<ApplyState>(self.loc).draining = None;
        }
    }
}
