//! Lowers a (simplified) parse tree into an operator graph.
//!
//! The compiler walks the tree once, threading a [`Layout`] accumulator that
//! every constructed operator reserves its state slots from, and a flat list
//! of every operator node it creates. That list — not per-node recursion
//! through `upstream` — is what [`crate::query::Query`] uses to construct and
//! tear down a [`crate::layout::Scon`]: most operators only `state_con`/
//! `state_des` their own slot, trusting that whatever built the graph also
//! registered their upstream and any sub-expression roots separately.
//! [`crate::op::Pred`] and [`crate::op::format::Stringer`] chains are the
//! exception — since they're never standalone entries in that list, the
//! handful of `Op`s that embed one (`op_assert`, `op_format`,
//! `PredSubxAny`/`PredSubxCmp`) cascade into it explicitly instead.
//!
//! Name resolution keeps two environments: `scopes`, a flat stack of active
//! `let` bindings tagged with the block nesting depth they were introduced
//! at, and `blocks`, a stack of currently-open `{...}` boundaries. A read of
//! a binding introduced outside the nearest enclosing block resolves to
//! `op_upread` against that block's rendezvous, threading the value through
//! every intermediate block's own upvalue list as it goes — so a block
//! nested two deep can still reach a binding from its outermost scope.
//!
//! A bareword FBUILTIN node is resolved against `scopes` before the
//! vocabulary: a live binding of that name shadows a builtin, and is read
//! and immediately applied — `$name` is the only way to read a binding's
//! raw value without invoking it.

use std::collections::HashMap;
use std::rc::Rc;

use crate::builtins::Vocabulary;
use crate::error::NameError;
use crate::layout::{Layout, Loc};
use crate::op::alt::OpMerge;
use crate::op::closure::{OpApply, OpBind, OpLexClosure, OpRead, OpUpread, UpvalueSource};
use crate::op::format::{LiteralStringer, OpFormat, OpStringer, StringerOrigin, Stringer};
use crate::op::ifelse::OpIfElse;
use crate::op::literal::OpLiteral;
use crate::op::nop::OpNop;
use crate::op::or_op::OpOr;
use crate::op::origin::OpOrigin;
use crate::op::overload::{OpOverload, OverloadArm};
use crate::op::predicate::{Comparator, OpAssert, PredAnd, PredNot, PredOr, PredPos, PredSubxAny, PredSubxCmp};
use crate::op::subx::{OpCapture, OpSubxEval};
use crate::op::transitive::{ClosureKind, OpTransitiveClosure};
use crate::op::{Op, Pred};
use crate::selector::Selector;
use crate::tree::{Tag, Tree};
use crate::value::Value;

/// A fully-lowered query: an entry point ready to be `install`ed with the
/// starting stack, plus everything [`crate::query::Query`] needs to drive a
/// [`crate::layout::Scon`] through this graph's lifetime.
pub struct CompiledQuery {
    pub entry: Rc<OpOrigin>,
    pub root: Rc<dyn Op>,
    pub layout: Layout,
    /// Every operator node created while compiling, in construction order.
    /// `Query`/`QueryResult` call `state_con` over this in order and
    /// `state_des` in reverse, satisfying the LIFO contract `layout.rs`
    /// documents without every individual `Op` needing to cascade into its
    /// upstream.
    pub nodes: Vec<Rc<dyn Op>>,
}

/// Compiles `tree` (already passed through [`crate::simplify::simplify`])
/// against `voc`.
pub fn compile(tree: &Tree, voc: &Vocabulary) -> Result<CompiledQuery, NameError> {
    let mut compiler = Compiler { layout: Layout::new(), voc, nodes: Vec::new(), scopes: Vec::new(), blocks: Vec::new() };
    let entry = compiler.new_origin();
    let root = compiler.compile_op(tree, entry.clone())?;
    Ok(CompiledQuery { entry, root, layout: compiler.layout, nodes: compiler.nodes })
}

#[derive(Clone)]
struct ScopeEntry {
    name: String,
    loc: Loc,
    block_depth: usize,
}

struct BlockFrame {
    rendezvous: Loc,
    captures: Vec<UpvalueSource>,
    index_of: HashMap<Loc, usize>,
}

enum ReadSite {
    Direct(Loc),
    Upvalue { rendezvous: Loc, index: usize },
}

struct Compiler<'v> {
    layout: Layout,
    voc: &'v Vocabulary,
    nodes: Vec<Rc<dyn Op>>,
    scopes: Vec<ScopeEntry>,
    blocks: Vec<BlockFrame>,
}

impl<'v> Compiler<'v> {
    /// Registers an already-built operator (e.g. whatever a [`crate::builtins::Builtin`]
    /// handed back) so its state gets constructed/destroyed alongside everything else.
    fn track_dyn(&mut self, op: Rc<dyn Op>) -> Rc<dyn Op> {
        self.nodes.push(op.clone());
        op
    }

    fn track<T: Op + 'static>(&mut self, op: T) -> Rc<dyn Op> {
        let rc: Rc<dyn Op> = Rc::new(op);
        self.nodes.push(rc.clone());
        rc
    }

    fn track_keep<T: Op + 'static>(&mut self, op: T) -> Rc<T> {
        let rc = Rc::new(op);
        self.nodes.push(rc.clone());
        rc
    }

    /// A fresh, registered entry point for a sub-expression (alt branch,
    /// if/else arm, capture/subx body, block body, overload arm, ...).
    fn new_origin(&mut self) -> Rc<OpOrigin> {
        let origin = Rc::new(OpOrigin::new(&mut self.layout));
        self.nodes.push(origin.clone());
        origin
    }

    /// An `OpOrigin` owned by a predicate combinator instead of the flat
    /// registry — `PredSubxAny`/`PredSubxCmp` cascade its `state_con`/`state_des`
    /// themselves, so registering it here too would construct it twice.
    fn pred_origin(&mut self) -> Rc<OpOrigin> {
        Rc::new(OpOrigin::new(&mut self.layout))
    }

    /// Looks up `name` in the bindings chain without erroring — used both by
    /// `$name` reads (where an unbound name is a hard error) and by bareword
    /// builtin resolution (where it's just "no, fall through to the
    /// vocabulary").
    fn find_scope(&self, name: &str) -> Option<ScopeEntry> {
        self.scopes.iter().rev().find(|e| e.name == name).cloned()
    }

    /// Threads `entry`'s value through every block boundary between where it
    /// was bound and the current position, registering an upvalue capture on
    /// each block crossed (deduping repeat captures of the same location).
    fn read_site(&mut self, entry: &ScopeEntry) -> ReadSite {
        if entry.block_depth == self.blocks.len() {
            return ReadSite::Direct(entry.loc);
        }
        let mut source = UpvalueSource::Direct(entry.loc);
        for depth in entry.block_depth..self.blocks.len() {
            let block = &mut self.blocks[depth];
            let index = match block.index_of.get(&entry.loc) {
                Some(&i) => i,
                None => {
                    let i = block.captures.len();
                    block.captures.push(source.clone());
                    block.index_of.insert(entry.loc, i);
                    i
                }
            };
            source = UpvalueSource::Upvalue { rendezvous: block.rendezvous, index };
        }
        match source {
            UpvalueSource::Upvalue { rendezvous, index } => ReadSite::Upvalue { rendezvous, index },
            UpvalueSource::Direct(_) => unreachable!("block boundary must be crossed at least once here"),
        }
    }

    fn resolve(&mut self, name: &str) -> Result<ReadSite, NameError> {
        let entry = self
            .find_scope(name)
            .ok_or_else(|| NameError { name: name.to_string(), message: "unbound name".to_string() })?;
        Ok(self.read_site(&entry))
    }

    fn compile_op(&mut self, tree: &Tree, upstream: Rc<dyn Op>) -> Result<Rc<dyn Op>, NameError> {
        match tree.tag {
            Tag::Nop => Ok(self.track(OpNop::new(upstream))),

            Tag::Const => {
                let constant = tree.constant.expect("CONST node missing constant payload");
                let template = Value::new_const(constant, 0);
                let op = OpLiteral::new(upstream, template, &mut self.layout);
                Ok(self.track(op))
            }

            Tag::Str => {
                let text = tree.text.clone().unwrap_or_default();
                let template = Value::new_str(text.into_bytes(), 0);
                let op = OpLiteral::new(upstream, template, &mut self.layout);
                Ok(self.track(op))
            }

            Tag::EmptyList => {
                let template = Value::new_seq(Vec::new(), 0);
                let op = OpLiteral::new(upstream, template, &mut self.layout);
                Ok(self.track(op))
            }

            Tag::Cat => {
                let mut current = upstream;
                for child in &tree.children {
                    current = self.compile_op(child, current)?;
                }
                Ok(current)
            }

            Tag::Alt => {
                let (loc, tines) = OpMerge::make_tines(upstream, tree.children.len(), &mut self.layout);
                for tine in &tines {
                    self.nodes.push(tine.clone());
                }
                let mut branches = Vec::with_capacity(tines.len());
                for (child, tine) in tree.children.iter().zip(tines) {
                    branches.push(self.compile_op(child, tine)?);
                }
                Ok(self.track(OpMerge::new(loc, branches)))
            }

            Tag::Or => {
                let mut branches = Vec::with_capacity(tree.children.len());
                for child in &tree.children {
                    let origin = self.new_origin();
                    let root = self.compile_op(child, origin.clone())?;
                    branches.push((origin, root));
                }
                let op = OpOr::new(upstream, branches, &mut self.layout);
                Ok(self.track(op))
            }

            Tag::Capture => {
                let origin = self.new_origin();
                let root = self.compile_op(&tree.children[0], origin.clone())?;
                Ok(self.track(OpCapture::new(upstream, origin, root)))
            }

            Tag::SubxEval => {
                let origin = self.new_origin();
                let root = self.compile_op(&tree.children[0], origin.clone())?;
                let op = OpSubxEval::new(upstream, origin, root, tree.keep, &mut self.layout);
                Ok(self.track(op))
            }

            Tag::CloseStar | Tag::ClosePlus => {
                let origin = self.new_origin();
                let root = self.compile_op(&tree.children[0], origin.clone())?;
                let kind = if tree.tag == Tag::CloseStar { ClosureKind::Star } else { ClosureKind::Plus };
                let op = OpTransitiveClosure::new(upstream, origin, root, kind, &mut self.layout);
                Ok(self.track(op))
            }

            Tag::Assert => {
                let pred = self.compile_pred(&tree.children[0])?;
                Ok(self.track(OpAssert::new(upstream, pred)))
            }

            Tag::IfElse => {
                let cond_origin = self.new_origin();
                let cond_root = self.compile_op(&tree.children[0], cond_origin.clone())?;
                let then_origin = self.new_origin();
                let then_root = self.compile_op(&tree.children[1], then_origin.clone())?;
                let else_origin = self.new_origin();
                let else_root = self.compile_op(&tree.children[2], else_origin.clone())?;
                let op = OpIfElse::new(
                    upstream,
                    cond_origin,
                    cond_root,
                    then_origin,
                    then_root,
                    else_origin,
                    else_root,
                    &mut self.layout,
                );
                Ok(self.track(op))
            }

            Tag::Format => {
                let stringer_origin = Rc::new(StringerOrigin::new(&mut self.layout));
                let mut stringer_root: Rc<dyn Stringer> = stringer_origin.clone();
                for piece in &tree.children {
                    if piece.tag == Tag::Str {
                        let text = piece.text.clone().unwrap_or_default();
                        stringer_root = Rc::new(LiteralStringer::new(stringer_root, text));
                    } else {
                        let piece = crate::simplify::simplify(piece.clone());
                        let inner_origin = self.new_origin();
                        let inner_root = self.compile_op(&piece, inner_origin.clone())?;
                        stringer_root = Rc::new(OpStringer::new(stringer_root, inner_origin, inner_root));
                    }
                }
                Ok(self.track(OpFormat::new(upstream, stringer_origin, stringer_root)))
            }

            Tag::Scope => {
                let bind_tree = &tree.children[0];
                let body_tree = &tree.children[1];
                let name = bind_tree.text.clone().expect("BIND node missing name");
                let value_op = self.compile_op(&bind_tree.children[0], upstream)?;
                let op = OpBind::new(value_op, &mut self.layout);
                let bind_op = self.track_keep(op);
                let loc = bind_op.loc();
                self.scopes.push(ScopeEntry { name, loc, block_depth: self.blocks.len() });
                let body_op = self.compile_op(body_tree, bind_op)?;
                self.scopes.pop();
                Ok(body_op)
            }

            Tag::Bind => Err(NameError { name: tree.text.clone().unwrap_or_default(), message: "bind outside of a scope".to_string() }),

            Tag::Read => {
                let raw = tree.text.as_deref().expect("READ node missing name");
                let name = raw.strip_prefix('$').unwrap_or(raw);
                match self.resolve(name)? {
                    ReadSite::Direct(loc) => Ok(self.track(OpRead::new(upstream, loc))),
                    ReadSite::Upvalue { rendezvous, index } => Ok(self.track(OpUpread::new(upstream, rendezvous, index))),
                }
            }

            Tag::Block => {
                let rendezvous = self.layout.reserve();
                self.blocks.push(BlockFrame { rendezvous, captures: Vec::new(), index_of: HashMap::new() });
                let block_origin = self.new_origin();
                let block_root = self.compile_op(&tree.children[0], block_origin.clone());
                let frame = self.blocks.pop().expect("pushed above");
                let block_root = block_root?;
                Ok(self.track(OpLexClosure::new(upstream, block_root, block_origin, rendezvous, frame.captures)))
            }

            Tag::FBuiltin => self.compile_builtin_exec(tree, upstream),

            Tag::PredAnd | Tag::PredOr | Tag::PredNot | Tag::PredSubxAny | Tag::PredSubxCmp => Err(NameError {
                name: tree.tag.to_string(),
                message: "predicate-shaped node used where an operator was expected".to_string(),
            }),
        }
    }

    fn compile_builtin_exec(&mut self, tree: &Tree, upstream: Rc<dyn Op>) -> Result<Rc<dyn Op>, NameError> {
        let name = tree.text.as_deref().expect("FBUILTIN node missing name");
        // A bareword that names a live `let` binding shadows a builtin of
        // the same name: it reads the bound value and immediately applies
        // it, so a closure bound under a builtin's name runs in its place.
        // Plain `$name` reads bypass this and never auto-apply.
        if let Some(entry) = self.find_scope(name) {
            let site = self.read_site(&entry);
            let read_op: Rc<dyn Op> = match site {
                ReadSite::Direct(loc) => self.track(OpRead::new(upstream, loc)),
                ReadSite::Upvalue { rendezvous, index } => self.track(OpUpread::new(upstream, rendezvous, index)),
            };
            let op = OpApply::new(read_op, &mut self.layout);
            return Ok(self.track(op));
        }
        let entries = self
            .voc
            .lookup(name)
            .ok_or_else(|| NameError { name: name.to_string(), message: "unknown builtin".to_string() })?;
        if entries.len() == 1 && entries[0].profile().is_none() {
            let op = entries[0].build_exec(&mut self.layout, upstream);
            return Ok(self.track_dyn(op));
        }
        let mut arms = Vec::with_capacity(entries.len());
        for builtin in entries {
            let profile = builtin.profile().ok_or_else(|| NameError {
                name: name.to_string(),
                message: "overloaded name has an implementation with no declared profile".to_string(),
            })?;
            let origin = self.new_origin();
            let root = builtin.build_exec(&mut self.layout, origin.clone());
            self.track_dyn(root.clone());
            arms.push(OverloadArm {
                selector: Selector::from_codes(profile),
                origin,
                root,
                profile_name: format!("{name}{profile:?}"),
            });
        }
        let op = OpOverload::new(upstream, arms, &mut self.layout);
        Ok(self.track(op))
    }

    fn compile_pred(&mut self, tree: &Tree) -> Result<Rc<dyn Pred>, NameError> {
        match tree.tag {
            Tag::FBuiltin => {
                let name = tree.text.as_deref().expect("FBUILTIN node missing name");
                let entries = self
                    .voc
                    .lookup(name)
                    .ok_or_else(|| NameError { name: name.to_string(), message: "unknown builtin".to_string() })?;
                if entries.len() != 1 {
                    return Err(NameError {
                        name: name.to_string(),
                        message: "overloaded predicate builtins are not supported".to_string(),
                    });
                }
                Ok(entries[0].build_pred(&mut self.layout))
            }
            Tag::PredAnd => {
                let mut children = tree.children.iter();
                let first = children
                    .next()
                    .ok_or_else(|| NameError { name: "and".to_string(), message: "empty conjunction".to_string() })?;
                let mut acc = self.compile_pred(first)?;
                for child in children {
                    let next = self.compile_pred(child)?;
                    acc = Rc::new(PredAnd::new(acc, next));
                }
                Ok(acc)
            }
            Tag::PredOr => {
                let mut children = tree.children.iter();
                let first = children
                    .next()
                    .ok_or_else(|| NameError { name: "or".to_string(), message: "empty disjunction".to_string() })?;
                let mut acc = self.compile_pred(first)?;
                for child in children {
                    let next = self.compile_pred(child)?;
                    acc = Rc::new(PredOr::new(acc, next));
                }
                Ok(acc)
            }
            Tag::PredNot => {
                let inner = self.compile_pred(&tree.children[0])?;
                Ok(Rc::new(PredNot::new(inner)))
            }
            Tag::PredSubxAny => {
                let child = &tree.children[0];
                // `?N`/`!N` parses to PRED_SUBX_ANY wrapping a bare CONST
                // literal, which would otherwise always succeed (a literal
                // always yields one result) instead of testing the
                // candidate's position — route it to PredPos instead.
                if child.tag == Tag::Const {
                    let expected = child.constant.expect("CONST node missing constant payload").value.to_i128();
                    return Ok(Rc::new(PredPos::new(expected as usize)));
                }
                let origin = self.pred_origin();
                let root = self.compile_op(child, origin.clone())?;
                Ok(Rc::new(PredSubxAny::new(origin, root)))
            }
            Tag::PredSubxCmp => {
                let left_origin = self.pred_origin();
                let left_root = self.compile_op(&tree.children[0], left_origin.clone())?;
                let right_origin = self.pred_origin();
                let right_root = self.compile_op(&tree.children[1], right_origin.clone())?;
                // The surface grammar never attaches an explicit comparator to
                // this node (`?(X)`/`!(X)` always lower to PRED_SUBX_ANY); a
                // hand-built tree using PRED_SUBX_CMP gets equality.
                Ok(Rc::new(PredSubxCmp::new(left_origin, left_root, right_origin, right_root, Comparator::Eq)))
            }
            other => Err(NameError { name: format!("{other:?}"), message: "not a predicate-position node".to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::core_voc::core_vocabulary;
    use crate::builtins::demo::demo_vocabulary;
    use crate::diagnostics::NoopSink;
    use crate::layout::Scon;
    use crate::op::EvalCtx;
    use crate::parser::Parser;
    use crate::resource::NoLimitTracker;
    use crate::simplify::simplify;
    use crate::stack::Stack;

    fn run(src: &str, voc: &Vocabulary) -> Vec<Stack> {
        let tree = simplify(Parser::parse(src).unwrap());
        let compiled = compile(&tree, voc).unwrap();
        let mut scon = Scon::new(&compiled.layout);
        for node in &compiled.nodes {
            node.state_con(&mut scon);
        }
        let mut sink = NoopSink;
        let mut resources = NoLimitTracker;
        let mut ctx = EvalCtx { scon: &mut scon, diagnostics: &mut sink, resources: &mut resources };
        compiled.entry.install(&mut ctx, Stack::new());
        let mut out = Vec::new();
        while let Some(s) = compiled.root.next(&mut ctx) {
            out.push(s);
        }
        for node in compiled.nodes.iter().rev() {
            node.state_des(&mut scon);
        }
        out
    }

    #[test]
    fn literal_and_arithmetic() {
        let voc = demo_vocabulary();
        let out = run("1 2 add", &voc);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].top().unwrap().as_const().unwrap().value.to_i128(), 3);
    }

    #[test]
    fn let_binding_reads_back() {
        let voc = demo_vocabulary();
        let out = run("let a := 1; $a 1 add", &voc);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].top().unwrap().as_const().unwrap().value.to_i128(), 2);
    }

    #[test]
    fn alt_yields_every_branch() {
        let voc = demo_vocabulary();
        let out = run("1, 2, 3", &voc);
        let vals: Vec<i128> = out.iter().map(|s| s.top().unwrap().as_const().unwrap().value.to_i128()).collect();
        assert_eq!(vals, vec![1, 2, 3]);
    }

    #[test]
    fn closure_apply_sees_outer_binding() {
        let voc = demo_vocabulary();
        let out = run("let a := 10; { $a 1 add } apply", &voc);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].top().unwrap().as_const().unwrap().value.to_i128(), 11);
    }

    #[test]
    fn bareword_binding_shadows_builtin_and_auto_applies() {
        let voc = demo_vocabulary();
        let out = run("let length := {1}; [] length", &voc);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].top().unwrap().as_const().unwrap().value.to_i128(), 1);
    }

    #[test]
    fn if_else_picks_branch() {
        let voc = demo_vocabulary();
        let out = run("if 1 then 10 else 20", &voc);
        assert_eq!(out[0].top().unwrap().as_const().unwrap().value.to_i128(), 10);
    }

    #[test]
    fn assert_skips_non_matching_stacks() {
        let voc = demo_vocabulary();
        let out = run("1 2 ?lt", &voc);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].top().unwrap().as_const().unwrap().value.to_i128(), 2);
        let out = run("2 1 ?lt", &voc);
        assert!(out.is_empty());
    }

    #[test]
    fn unbound_name_is_a_name_error() {
        let voc = core_vocabulary();
        let tree = simplify(Parser::parse("$nope").unwrap());
        assert!(compile(&tree, &voc).is_err());
    }

    #[test]
    fn unknown_builtin_is_a_name_error() {
        let voc = core_vocabulary();
        let tree = simplify(Parser::parse("nope").unwrap());
        assert!(compile(&tree, &voc).is_err());
    }
}
