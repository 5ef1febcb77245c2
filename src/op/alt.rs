//! Merging alternation: a k-way ALT lowers to one shared
//! "file" of pending stacks plus one tine operator per branch. Each tine is
//! the virtual source its branch's own operator chain pulls from; the file
//! is filled, round-robin fan-out style, the first time any tine finds it
//! empty. `OpMerge` is the operator actually referenced downstream: it
//! round-robins across the branch roots (which may just be their tine, or a
//! chain built on top of it), returning the first stack any branch produces.
//!
//! The file is owned by `OpMerge`'s `state_con`/`state_des`; the tines share
//! its `Loc` but do not construct or destroy it themselves, since they are
//! not independently meaningful without the merge that created them.

use std::rc::Rc;

use super::{EvalCtx, Op};
use crate::layout::{Layout, Loc};
use crate::stack::Stack;

#[derive(Debug)]
struct AltFile {
    slots: Vec<Option<Stack>>,
    cursor: usize,
}

#[derive(Debug)]
pub struct OpTine {
    upstream: Rc<dyn Op>,
    index: usize,
    loc: Loc,
}

impl Op for OpTine {
    fn name(&self) -> &'static str {
        "tine"
    }

    fn next(&self, ctx: &mut EvalCtx) -> Option<Stack> {
        let all_empty = ctx.scon.get::<AltFile>(self.loc).slots.iter().all(Option::is_none);
        if all_empty {
            let stack = self.upstream.next(ctx)?;
            let file = ctx.scon.get_mut::<AltFile>(self.loc);
            for slot in file.slots.iter_mut() {
                *slot = Some(stack.clone());
            }
        }
        ctx.scon.get_mut::<AltFile>(self.loc).slots[self.index].take()
    }
}

#[derive(Debug)]
pub struct OpMerge {
    /// One operator per branch: either a bare `OpTine`, or a chain of
    /// further operators built on top of one, exactly as the compiler wires
    /// whatever follows the branch's virtual source.
    branches: Vec<Rc<dyn Op>>,
    loc: Loc,
}

impl OpMerge {
    /// Builds the shared tines for a k-way ALT. Returns the tines (for the
    /// compiler to use as each branch's upstream while lowering that branch's
    /// subtree) plus a `finish` closure-free constructor: call
    /// [`OpMerge::new`] afterwards with the fully-built branch roots.
    pub fn make_tines(upstream: Rc<dyn Op>, k: usize, layout: &mut Layout) -> (Loc, Vec<Rc<OpTine>>) {
        let loc = layout.reserve();
        let tines = (0..k)
            .map(|index| Rc::new(OpTine { upstream: upstream.clone(), index, loc }))
            .collect();
        (loc, tines)
    }

    pub fn new(loc: Loc, branches: Vec<Rc<dyn Op>>) -> Self {
        Self { branches, loc }
    }
}

impl Op for OpMerge {
    fn name(&self) -> &'static str {
        "merge"
    }

    fn state_con(&self, sc: &mut crate::layout::Scon) {
        sc.con(self.loc, AltFile { slots: vec![None; self.branches.len()], cursor: 0 });
    }

    fn state_des(&self, sc: &mut crate::layout::Scon) {
        sc.des(self.loc);
    }

    fn next(&self, ctx: &mut EvalCtx) -> Option<Stack> {
        let k = self.branches.len();
        for _ in 0..k {
            let idx = {
                let file = ctx.scon.get_mut::<AltFile>(self.loc);
                let idx = file.cursor;
                file.cursor = (file.cursor + 1) % k;
                idx
            };
            if let Some(stack) = self.branches[idx].next(ctx) {
                return Some(stack);
            }
        }
        None
    }
}
