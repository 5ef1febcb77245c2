//! The Zwerg value hierarchy.
//!
//! `Value` is the closed core set the engine itself knows about
//! (`Const`, `Str`, `Seq`, `Closure`); vocabularies extend it through the
//! `Extra` variant, which holds a boxed [`VocabValue`] trait object rather
//! than a fixed enum, because a DWARF/ELF vocabulary is an external
//! collaborator that must be able to add variants without touching this
//! crate.
//!
//! Ownership: stacks own their values exclusively, so `Value` has a real
//! (deep) `Clone` impl — there is no shared heap here to refcount against.

use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::constant::Constant;
use crate::op::Op;
use crate::types::{self, TYPE_CLOSURE, TYPE_CONST, TYPE_SEQ, TYPE_STR};

/// Inline capacity for `Seq` storage: most sequences produced by `[...]`
/// capture or `bit` are short, so this avoids a heap allocation for the
/// common case without changing behavior for longer ones.
type SeqStorage = SmallVec<[Value; 4]>;

/// Result of comparing two values: `Fail` means the values are not
/// comparable (typically because their variants differ)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpResult {
    Less,
    Equal,
    Greater,
    Fail,
}

impl CmpResult {
    pub fn from_ordering(o: std::cmp::Ordering) -> Self {
        match o {
            std::cmp::Ordering::Less => Self::Less,
            std::cmp::Ordering::Equal => Self::Equal,
            std::cmp::Ordering::Greater => Self::Greater,
        }
    }

    pub fn is_eq(self) -> bool {
        self == Self::Equal
    }
}

/// Extension point for vocabulary-supplied value variants (e.g. a DWARF DIE,
/// an ELF section handle). Implementations are boxed and carried inside
/// [`ValueKind::Extra`].
pub trait VocabValue: fmt::Debug {
    /// Stable name used to assign this kind's type code.
    /// Must return the same string for every instance of a given Rust type.
    fn type_name(&self) -> &'static str;

    fn clone_box(&self) -> Box<dyn VocabValue>;

    fn show(&self, brief: bool, f: &mut fmt::Formatter<'_>) -> fmt::Result;

    /// Compares against another vocab value. Implementations should return
    /// `CmpResult::Fail` unless `other` is known to be the same concrete
    /// type (typically checked via `type_name` or a downcast).
    fn cmp_value(&self, other: &dyn VocabValue) -> CmpResult;
}

#[derive(Debug)]
enum ValueKind {
    Const(Constant),
    Str(Vec<u8>),
    Seq(Box<SeqStorage>),
    Closure(Closure),
    Extra(Box<dyn VocabValue>),
}

impl Clone for ValueKind {
    fn clone(&self) -> Self {
        match self {
            Self::Const(c) => Self::Const(*c),
            Self::Str(s) => Self::Str(s.clone()),
            Self::Seq(items) => Self::Seq(items.clone()),
            Self::Closure(c) => Self::Closure(c.clone()),
            Self::Extra(v) => Self::Extra(v.clone_box()),
        }
    }
}

/// A captured closure: a first-class value packaging an operator graph plus
/// the upvalues it captured at creation time.
///
/// Two closures compare equal only when they share the same root operator
/// (`Rc::ptr_eq`) *and* the same upvalue vector, elementwise equal.
#[derive(Debug, Clone)]
pub struct Closure {
    /// The block's own operator graph root.
    pub root: Rc<dyn Op>,
    /// The entry origin that the block's graph is evaluated against.
    pub origin: Rc<crate::op::origin::OpOrigin>,
    /// State-container slot identifying which closure value is "current"
    /// while its body runs, so nested upreads can find their frame.
    pub rendezvous: crate::layout::Loc,
    /// Captured upvalues, in the block's reference order.
    pub upvalues: Rc<Vec<Value>>,
}

impl PartialEq for Closure {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.root, &other.root)
            && self.upvalues.len() == other.upvalues.len()
            && self.upvalues.iter().zip(other.upvalues.iter()).all(|(a, b)| a.cmp(b).is_eq())
    }
}

/// A value: one variant of the closed core set, or a vocabulary extension,
/// tagged with the position its producer assigned it.
#[derive(Debug, Clone)]
pub struct Value {
    kind: ValueKind,
    position: usize,
}

impl Value {
    pub fn new_const(c: Constant, position: usize) -> Self {
        Self { kind: ValueKind::Const(c), position }
    }

    pub fn new_str(bytes: Vec<u8>, position: usize) -> Self {
        Self { kind: ValueKind::Str(bytes), position }
    }

    pub fn new_seq(items: Vec<Value>, position: usize) -> Self {
        Self { kind: ValueKind::Seq(Box::new(SeqStorage::from_vec(items))), position }
    }

    pub fn new_closure(closure: Closure, position: usize) -> Self {
        Self { kind: ValueKind::Closure(closure), position }
    }

    pub fn new_extra(v: Box<dyn VocabValue>, position: usize) -> Self {
        Self { kind: ValueKind::Extra(v), position }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns a clone of this value stamped with a new position, per the
    /// public API's `Value` accessor surface.
    pub fn clone_with_position(&self, position: usize) -> Self {
        Self { kind: self.kind.clone(), position }
    }

    pub fn as_const(&self) -> Option<&Constant> {
        match &self.kind {
            ValueKind::Const(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_str_bytes(&self) -> Option<&[u8]> {
        match &self.kind {
            ValueKind::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match &self.kind {
            ValueKind::Seq(s) => Some(s.as_slice()),
            _ => None,
        }
    }

    pub fn as_closure(&self) -> Option<&Closure> {
        match &self.kind {
            ValueKind::Closure(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_extra(&self) -> Option<&dyn VocabValue> {
        match &self.kind {
            ValueKind::Extra(v) => Some(v.as_ref()),
            _ => None,
        }
    }

    /// The 8-bit type code used for overload-dispatch selectors.
    pub fn type_code(&self) -> u8 {
        match &self.kind {
            ValueKind::Const(_) => TYPE_CONST,
            ValueKind::Str(_) => TYPE_STR,
            ValueKind::Seq(_) => TYPE_SEQ,
            ValueKind::Closure(_) => TYPE_CLOSURE,
            ValueKind::Extra(v) => types::code_for(v.type_name()),
        }
    }

    pub fn type_name(&self) -> &'static str {
        types::name_for(self.type_code())
    }

    /// Totally orders values of the same variant; returns `Fail` for
    /// different variants.
    pub fn cmp(&self, other: &Value) -> CmpResult {
        match (&self.kind, &other.kind) {
            (ValueKind::Const(a), ValueKind::Const(b)) => CmpResult::from_ordering(a.cmp(b)),
            (ValueKind::Str(a), ValueKind::Str(b)) => CmpResult::from_ordering(a.cmp(b)),
            (ValueKind::Seq(a), ValueKind::Seq(b)) => cmp_seq(a, b),
            (ValueKind::Closure(a), ValueKind::Closure(b)) => {
                if a == b {
                    CmpResult::Equal
                } else {
                    CmpResult::Fail
                }
            }
            (ValueKind::Extra(a), ValueKind::Extra(b)) => a.cmp_value(b.as_ref()),
            _ => CmpResult::Fail,
        }
    }

    /// Renders the value. `brief` selects the short form used by
    /// format-string interpolation.
    pub fn show(&self, brief: bool) -> String {
        struct Show<'a>(&'a Value, bool);
        impl fmt::Display for Show<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.show_into(self.1, f)
            }
        }
        Show(self, brief).to_string()
    }

    fn show_into(&self, brief: bool, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValueKind::Const(c) => {
                if brief {
                    c.domain.show_brief(c.value, f)
                } else {
                    c.domain.show_full(c.value, f)
                }
            }
            ValueKind::Str(bytes) => {
                if brief {
                    write!(f, "{}", String::from_utf8_lossy(bytes))
                } else {
                    write!(f, "{:?}", String::from_utf8_lossy(bytes))
                }
            }
            ValueKind::Seq(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v.show(brief))?;
                }
                write!(f, "]")
            }
            ValueKind::Closure(_) => write!(f, "<closure>"),
            ValueKind::Extra(v) => v.show(brief, f),
        }
    }
}

fn cmp_seq(a: &[Value], b: &[Value]) -> CmpResult {
    if a.len() != b.len() {
        return CmpResult::from_ordering(a.len().cmp(&b.len()));
    }
    for (x, y) in a.iter().zip(b.iter()) {
        match x.cmp(y) {
            CmpResult::Equal => continue,
            other => return other,
        }
    }
    CmpResult::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cmp_fails_across_variants() {
        let a = Value::new_const(Constant::decimal(1), 0);
        let b = Value::new_str(b"x".to_vec(), 0);
        assert_eq!(a.cmp(&b), CmpResult::Fail);
    }

    #[test]
    fn sequence_equality_is_elementwise() {
        let a = Value::new_seq(vec![Value::new_const(Constant::decimal(1), 0)], 0);
        let b = Value::new_seq(vec![Value::new_const(Constant::decimal(1), 0)], 0);
        assert_eq!(a.cmp(&b), CmpResult::Equal);
    }

    #[test]
    fn clone_with_position_changes_only_position() {
        let a = Value::new_const(Constant::decimal(5), 3);
        let b = a.clone_with_position(9);
        assert_eq!(b.position(), 9);
        assert_eq!(a.cmp(&b), CmpResult::Equal);
    }
}
