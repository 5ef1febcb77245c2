//! Builtins every vocabulary gets for free: the comparisons
//! `eq lt gt`, their negated spellings `ne ge le`, the symbolic aliases
//! `== != < <= > >=` (all predicate-only — used as `?NAME`/`!NAME`, or bare
//! as the symbolic spelling — comparing the top two stack values without
//! consuming them), and `apply`, which runs a closure
//! value and is a core language primitive rather than something any
//! particular vocabulary supplies.

use std::rc::Rc;

use super::Builtin;
use crate::layout::Layout;
use crate::op::closure::OpApply;
use crate::op::predicate::Comparator;
use crate::op::{EvalCtx, Op, Pred, PredResult};
use crate::stack::Stack;

#[derive(Debug)]
struct ComparePred {
    comparator: Comparator,
}

impl Pred for ComparePred {
    fn name(&self) -> &'static str {
        "compare"
    }

    fn eval(&self, ctx: &mut EvalCtx, stack: &Stack) -> PredResult {
        let (Some(top), Some(nos)) = (stack.get(0), stack.get(1)) else {
            ctx.report(crate::error::RuntimeError::Predicate {
                message: "comparison needs two values on the stack".to_string(),
            });
            return PredResult::Fail;
        };
        match self.comparator.accepts(nos.cmp(top)) {
            Some(true) => PredResult::Yes,
            Some(false) => PredResult::No,
            None => {
                ctx.report(crate::error::RuntimeError::Predicate { message: "values are not comparable".to_string() });
                PredResult::Fail
            }
        }
    }
}

#[derive(Debug)]
struct CompareBuiltin {
    name: &'static str,
    docstring: &'static str,
    comparator: Comparator,
}

impl Builtin for CompareBuiltin {
    fn name(&self) -> &'static str {
        self.name
    }

    fn docstring(&self) -> &'static str {
        self.docstring
    }

    fn build_pred(&self, _layout: &mut Layout) -> Rc<dyn Pred> {
        Rc::new(ComparePred { comparator: self.comparator })
    }
}

#[derive(Debug)]
struct ApplyBuiltin;

impl Builtin for ApplyBuiltin {
    fn name(&self) -> &'static str {
        "apply"
    }

    fn docstring(&self) -> &'static str {
        "runs a closure value against the rest of the stack, re-yielding every result"
    }

    fn build_exec(&self, layout: &mut Layout, upstream: Rc<dyn Op>) -> Rc<dyn Op> {
        Rc::new(OpApply::new(upstream, layout))
    }
}

/// Returns the core vocabulary: plugged into every `Query`
/// alongside whatever vocabulary the caller supplies.
pub fn core_vocabulary() -> super::Vocabulary {
    let mut voc = super::Vocabulary::new();
    let entries: &[(&'static str, &'static str, Comparator)] = &[
        ("eq", "true iff the two topmost values compare equal", Comparator::Eq),
        ("ne", "true iff the two topmost values do not compare equal", Comparator::Ne),
        ("lt", "true iff the second-from-top value is less than the top", Comparator::Lt),
        ("le", "true iff the second-from-top value is at most the top", Comparator::Le),
        ("gt", "true iff the second-from-top value is greater than the top", Comparator::Gt),
        ("ge", "true iff the second-from-top value is at least the top", Comparator::Ge),
        ("==", "symbolic alias of `eq`", Comparator::Eq),
        ("!=", "symbolic alias of `ne`", Comparator::Ne),
        ("<", "symbolic alias of `lt`", Comparator::Lt),
        ("<=", "symbolic alias of `le`", Comparator::Le),
        (">", "symbolic alias of `gt`", Comparator::Gt),
        (">=", "symbolic alias of `ge`", Comparator::Ge),
    ];
    for (name, docstring, comparator) in entries.iter().copied() {
        voc.register(Rc::new(CompareBuiltin { name, docstring, comparator }));
    }
    voc.register(Rc::new(ApplyBuiltin));
    voc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_vocabulary_registers_all_spellings() {
        let voc = core_vocabulary();
        for name in ["eq", "ne", "lt", "le", "gt", "ge", "==", "!=", "<", "<=", ">", ">=", "apply"] {
            assert!(voc.lookup(name).is_some(), "missing builtin {name}");
        }
    }
}
