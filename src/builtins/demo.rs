//! The demo vocabulary: arithmetic, sequence/string `length`, `bit`
//! enumeration, stack shuffling, `pos`, and a toy `match` predicate. Exercises
//! the whole operator hierarchy end to end without depending on any real
//! DWARF/ELF reader — that vocabulary is an external collaborator; this one
//! stands in for it in tests and the REPL.

use std::collections::VecDeque;
use std::rc::Rc;

use super::{core_voc::core_vocabulary, Builtin, Vocabulary};
use crate::constant::{Constant, Value64};
use crate::error::RuntimeError;
use crate::layout::{Layout, Loc};
use crate::op::shuffle::{OpShuffle, Shuffle};
use crate::op::{EvalCtx, Op, Pred, PredResult};
use crate::stack::Stack;
use crate::types::{TYPE_CONST, TYPE_SEQ, TYPE_STR};
use crate::value::Value;

#[derive(Debug, Clone, Copy)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinOp {
    fn name(self) -> &'static str {
        match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::Div => "div",
            BinOp::Mod => "mod",
        }
    }

    fn apply(self, a: Value64, b: Value64) -> Result<Value64, RuntimeError> {
        match self {
            BinOp::Add => a.checked_add(b),
            BinOp::Sub => a.checked_sub(b),
            BinOp::Mul => a.checked_mul(b),
            BinOp::Div => a.checked_div(b),
            BinOp::Mod => a.checked_rem(b),
        }
    }
}

/// `add sub mul div mod` over two `Const`s.
#[derive(Debug)]
struct OpConstBinary {
    upstream: Rc<dyn Op>,
    op: BinOp,
}

impl Op for OpConstBinary {
    fn name(&self) -> &'static str {
        self.op.name()
    }

    fn next(&self, ctx: &mut EvalCtx) -> Option<Stack> {
        loop {
            let mut stack = self.upstream.next(ctx)?;
            let Some(rhs) = stack.pop() else {
                ctx.report(RuntimeError::Type { expected: vec!["const const".to_string()], actual: "empty stack".to_string() });
                continue;
            };
            let Some(lhs) = stack.pop() else {
                ctx.report(RuntimeError::Type { expected: vec!["const const".to_string()], actual: "one value".to_string() });
                continue;
            };
            let (Some(a), Some(b)) = (lhs.as_const(), rhs.as_const()) else {
                ctx.report(RuntimeError::Type { expected: vec!["const const".to_string()], actual: "non-const operand".to_string() });
                continue;
            };
            match self.op.apply(a.value, b.value) {
                Ok(v) => {
                    let domain = Constant::result_domain(*a, *b);
                    let position = stack.size();
                    stack.push(Value::new_const(Constant::new(v, domain), position));
                    return Some(stack);
                }
                Err(e) => ctx.report(e),
            }
        }
    }
}

/// `add` over two `Str`s: concatenation.
#[derive(Debug)]
struct OpStrConcat {
    upstream: Rc<dyn Op>,
}

impl Op for OpStrConcat {
    fn name(&self) -> &'static str {
        "add"
    }

    fn next(&self, ctx: &mut EvalCtx) -> Option<Stack> {
        loop {
            let mut stack = self.upstream.next(ctx)?;
            let Some(rhs) = stack.pop() else {
                ctx.report(RuntimeError::Type { expected: vec!["string string".to_string()], actual: "empty stack".to_string() });
                continue;
            };
            let Some(lhs) = stack.pop() else {
                ctx.report(RuntimeError::Type { expected: vec!["string string".to_string()], actual: "one value".to_string() });
                continue;
            };
            let (Some(a), Some(b)) = (lhs.as_str_bytes(), rhs.as_str_bytes()) else {
                ctx.report(RuntimeError::Type { expected: vec!["string string".to_string()], actual: "non-string operand".to_string() });
                continue;
            };
            let mut combined = a.to_vec();
            combined.extend_from_slice(b);
            let position = stack.size();
            stack.push(Value::new_str(combined, position));
            return Some(stack);
        }
    }
}

/// Unary `neg`.
#[derive(Debug)]
struct OpNeg {
    upstream: Rc<dyn Op>,
}

impl Op for OpNeg {
    fn name(&self) -> &'static str {
        "neg"
    }

    fn next(&self, ctx: &mut EvalCtx) -> Option<Stack> {
        loop {
            let mut stack = self.upstream.next(ctx)?;
            let Some(top) = stack.pop() else {
                ctx.report(RuntimeError::Type { expected: vec!["const".to_string()], actual: "empty stack".to_string() });
                continue;
            };
            let Some(c) = top.as_const() else {
                ctx.report(RuntimeError::Type { expected: vec!["const".to_string()], actual: top.type_name().to_string() });
                continue;
            };
            match c.value.checked_neg() {
                Ok(v) => {
                    let position = stack.size();
                    stack.push(Value::new_const(Constant::new(v, c.domain), position));
                    return Some(stack);
                }
                Err(e) => ctx.report(e),
            }
        }
    }
}

/// `length` over a `Seq` or `Str`.
#[derive(Debug)]
struct OpLength {
    upstream: Rc<dyn Op>,
    seq: bool,
}

impl Op for OpLength {
    fn name(&self) -> &'static str {
        "length"
    }

    fn next(&self, ctx: &mut EvalCtx) -> Option<Stack> {
        loop {
            let mut stack = self.upstream.next(ctx)?;
            let Some(top) = stack.pop() else {
                ctx.report(RuntimeError::Type { expected: vec!["sequence or string".to_string()], actual: "empty stack".to_string() });
                continue;
            };
            let len = if self.seq { top.as_seq().map(<[Value]>::len) } else { top.as_str_bytes().map(<[u8]>::len) };
            let Some(len) = len else {
                ctx.report(RuntimeError::Type { expected: vec!["sequence or string".to_string()], actual: top.type_name().to_string() });
                continue;
            };
            let position = stack.size();
            stack.push(Value::new_const(Constant::unsigned_decimal(len as u64), position));
            return Some(stack);
        }
    }
}

#[derive(Debug, Default)]
struct BitState {
    base: Option<Stack>,
    remaining: VecDeque<u64>,
}

/// `bit` — enumerates the set bits of a `Const`, one result stack per bit,
/// least-significant first, in the hex domain.
#[derive(Debug)]
struct OpBit {
    upstream: Rc<dyn Op>,
    loc: Loc,
}

impl Op for OpBit {
    fn name(&self) -> &'static str {
        "bit"
    }

    fn state_con(&self, sc: &mut crate::layout::Scon) {
        sc.con(self.loc, BitState::default());
    }

    fn state_des(&self, sc: &mut crate::layout::Scon) {
        sc.des(self.loc);
    }

    fn next(&self, ctx: &mut EvalCtx) -> Option<Stack> {
        loop {
            if ctx.scon.get::<BitState>(self.loc).base.is_none() {
                let mut stack = self.upstream.next(ctx)?;
                let Some(top) = stack.pop() else {
                    ctx.report(RuntimeError::Type { expected: vec!["const".to_string()], actual: "empty stack".to_string() });
                    continue;
                };
                let Some(c) = top.as_const() else {
                    ctx.report(RuntimeError::Type { expected: vec!["const".to_string()], actual: top.type_name().to_string() });
                    continue;
                };
                let bits: VecDeque<u64> = c.value.set_bits().map(|b| b.bits()).collect();
                let state = ctx.scon.get_mut::<BitState>(self.loc);
                state.base = Some(stack);
                state.remaining = bits;
            }
            let state = ctx.scon.get_mut::<BitState>(self.loc);
            match state.remaining.pop_front() {
                Some(mask) => {
                    let mut out = state.base.clone().expect("bit base missing");
                    let position = out.size();
                    out.push(Value::new_const(Constant::hex(Value64::from_unsigned(mask)), position));
                    return Some(out);
                }
                None => state.base = None,
            }
        }
    }
}

/// `pos` — pushes the position of the TOS value without consuming it.
#[derive(Debug)]
struct OpPos {
    upstream: Rc<dyn Op>,
}

impl Op for OpPos {
    fn name(&self) -> &'static str {
        "pos"
    }

    fn next(&self, ctx: &mut EvalCtx) -> Option<Stack> {
        loop {
            let mut stack = self.upstream.next(ctx)?;
            let Some(orig_position) = stack.top().map(Value::position) else {
                ctx.report(RuntimeError::Type { expected: vec!["any value".to_string()], actual: "empty stack".to_string() });
                continue;
            };
            let new_position = stack.size();
            stack.push(Value::new_const(Constant::unsigned_decimal(orig_position as u64), new_position));
            return Some(stack);
        }
    }
}

/// A small glob-ish matcher: `.` is any character, `*` repeats the preceding
/// atom zero or more times, everything else is literal; matches anywhere in
/// the subject (unanchored), in the spirit of scenario 8.
fn glob_matches(text: &[u8], pattern: &[u8]) -> bool {
    (0..=text.len()).any(|i| match_here(&text[i..], pattern))
}

fn match_here(text: &[u8], pattern: &[u8]) -> bool {
    if pattern.is_empty() {
        return true;
    }
    if pattern.len() >= 2 && pattern[1] == b'*' {
        return match_star(pattern[0], text, &pattern[2..]);
    }
    if !text.is_empty() && (pattern[0] == b'.' || pattern[0] == text[0]) {
        return match_here(&text[1..], &pattern[1..]);
    }
    false
}

fn match_star(c: u8, text: &[u8], pattern: &[u8]) -> bool {
    let mut t = text;
    loop {
        if match_here(t, pattern) {
            return true;
        }
        if t.is_empty() || (c != b'.' && t[0] != c) {
            return false;
        }
        t = &t[1..];
    }
}

#[derive(Debug)]
struct PredMatch;

impl Pred for PredMatch {
    fn name(&self) -> &'static str {
        "match"
    }

    fn eval(&self, ctx: &mut EvalCtx, stack: &Stack) -> PredResult {
        let (Some(pattern), Some(subject)) = (stack.get(0), stack.get(1)) else {
            ctx.report(RuntimeError::Predicate { message: "match needs a subject and a pattern".to_string() });
            return PredResult::Fail;
        };
        let (Some(pattern), Some(subject)) = (pattern.as_str_bytes(), subject.as_str_bytes()) else {
            ctx.report(RuntimeError::Predicate { message: "match operands must be strings".to_string() });
            return PredResult::Fail;
        };
        if glob_matches(subject, pattern) {
            PredResult::Yes
        } else {
            PredResult::No
        }
    }
}

macro_rules! simple_builtin {
    ($struct_name:ident, $name:literal, $doc:literal, $profile:expr, $build:expr) => {
        #[derive(Debug)]
        struct $struct_name;

        impl Builtin for $struct_name {
            fn name(&self) -> &'static str {
                $name
            }

            fn docstring(&self) -> &'static str {
                $doc
            }

            fn profile(&self) -> Option<&'static [u8]> {
                $profile
            }

            fn build_exec(&self, layout: &mut Layout, upstream: Rc<dyn Op>) -> Rc<dyn Op> {
                let _ = layout;
                $build(upstream)
            }
        }
    };
}

simple_builtin!(AddConstBuiltin, "add", "adds two constants", Some(&[TYPE_CONST, TYPE_CONST]), |u| {
    Rc::new(OpConstBinary { upstream: u, op: BinOp::Add }) as Rc<dyn Op>
});
simple_builtin!(AddStrBuiltin, "add", "concatenates two strings", Some(&[TYPE_STR, TYPE_STR]), |u| {
    Rc::new(OpStrConcat { upstream: u }) as Rc<dyn Op>
});
simple_builtin!(SubBuiltin, "sub", "subtracts two constants", Some(&[TYPE_CONST, TYPE_CONST]), |u| {
    Rc::new(OpConstBinary { upstream: u, op: BinOp::Sub }) as Rc<dyn Op>
});
simple_builtin!(MulBuiltin, "mul", "multiplies two constants", Some(&[TYPE_CONST, TYPE_CONST]), |u| {
    Rc::new(OpConstBinary { upstream: u, op: BinOp::Mul }) as Rc<dyn Op>
});
simple_builtin!(DivBuiltin, "div", "floor-divides two constants", Some(&[TYPE_CONST, TYPE_CONST]), |u| {
    Rc::new(OpConstBinary { upstream: u, op: BinOp::Div }) as Rc<dyn Op>
});
simple_builtin!(ModBuiltin, "mod", "floor-modulos two constants", Some(&[TYPE_CONST, TYPE_CONST]), |u| {
    Rc::new(OpConstBinary { upstream: u, op: BinOp::Mod }) as Rc<dyn Op>
});
simple_builtin!(NegBuiltin, "neg", "negates a constant", None, |u| { Rc::new(OpNeg { upstream: u }) as Rc<dyn Op> });
simple_builtin!(LengthSeqBuiltin, "length", "the number of elements in a sequence", Some(&[TYPE_SEQ]), |u| {
    Rc::new(OpLength { upstream: u, seq: true }) as Rc<dyn Op>
});
simple_builtin!(LengthStrBuiltin, "length", "the byte length of a string", Some(&[TYPE_STR]), |u| {
    Rc::new(OpLength { upstream: u, seq: false }) as Rc<dyn Op>
});
simple_builtin!(PosBuiltin, "pos", "pushes the position of the top value", None, |u| {
    Rc::new(OpPos { upstream: u }) as Rc<dyn Op>
});

#[derive(Debug)]
struct BitBuiltin;

impl Builtin for BitBuiltin {
    fn name(&self) -> &'static str {
        "bit"
    }

    fn docstring(&self) -> &'static str {
        "enumerates the set bits of a constant, one result per bit"
    }

    fn profile(&self) -> Option<&'static [u8]> {
        Some(&[TYPE_CONST])
    }

    fn build_exec(&self, layout: &mut Layout, upstream: Rc<dyn Op>) -> Rc<dyn Op> {
        Rc::new(OpBit { upstream, loc: layout.reserve() })
    }
}

macro_rules! shuffle_builtin {
    ($struct_name:ident, $name:literal, $doc:literal, $kind:expr) => {
        #[derive(Debug)]
        struct $struct_name;

        impl Builtin for $struct_name {
            fn name(&self) -> &'static str {
                $name
            }
            fn docstring(&self) -> &'static str {
                $doc
            }
            fn build_exec(&self, layout: &mut Layout, upstream: Rc<dyn Op>) -> Rc<dyn Op> {
                let _ = layout;
                Rc::new(OpShuffle::new(upstream, $kind))
            }
        }
    };
}

shuffle_builtin!(DropBuiltin, "drop", "discards the top value", Shuffle::Drop);
shuffle_builtin!(SwapBuiltin, "swap", "swaps the top two values", Shuffle::Swap);
shuffle_builtin!(DupBuiltin, "dup", "duplicates the top value", Shuffle::Dup);
shuffle_builtin!(OverBuiltin, "over", "pushes a copy of the second value", Shuffle::Over);
shuffle_builtin!(RotBuiltin, "rot", "rotates the top three values", Shuffle::Rot);

#[derive(Debug)]
struct MatchBuiltin;

impl Builtin for MatchBuiltin {
    fn name(&self) -> &'static str {
        "match"
    }

    fn docstring(&self) -> &'static str {
        "tests the subject string against a glob-like pattern string"
    }

    fn profile(&self) -> Option<&'static [u8]> {
        Some(&[TYPE_STR, TYPE_STR])
    }

    fn build_pred(&self, _layout: &mut Layout) -> Rc<dyn Pred> {
        Rc::new(PredMatch)
    }
}

/// Builds the demo vocabulary: the core comparisons plus arithmetic,
/// `length`, `bit`, stack shuffling, `pos`, and `match`.
pub fn demo_vocabulary() -> Vocabulary {
    let mut voc = core_vocabulary();
    let builtins: Vec<Rc<dyn Builtin>> = vec![
        Rc::new(AddConstBuiltin),
        Rc::new(AddStrBuiltin),
        Rc::new(SubBuiltin),
        Rc::new(MulBuiltin),
        Rc::new(DivBuiltin),
        Rc::new(ModBuiltin),
        Rc::new(NegBuiltin),
        Rc::new(LengthSeqBuiltin),
        Rc::new(LengthStrBuiltin),
        Rc::new(BitBuiltin),
        Rc::new(DropBuiltin),
        Rc::new(SwapBuiltin),
        Rc::new(DupBuiltin),
        Rc::new(OverBuiltin),
        Rc::new(RotBuiltin),
        Rc::new(PosBuiltin),
        Rc::new(MatchBuiltin),
    ];
    for b in builtins {
        voc.register(b);
    }
    voc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_matches_scenario_eight() {
        assert!(glob_matches(b"foobar", b"f.*r"));
        assert!(!glob_matches(b"foobar", b"^quux$"));
    }

    #[test]
    fn demo_vocabulary_registers_arithmetic_and_shuffle() {
        let voc = demo_vocabulary();
        assert_eq!(voc.lookup("add").unwrap().len(), 2);
        assert!(voc.lookup("bit").is_some());
        assert!(voc.lookup("dup").is_some());
        assert!(voc.lookup("match").is_some());
    }
}
