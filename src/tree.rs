//! The parse tree.
//!
//! A `Tree` is a tag plus an ordered child list, with optional string,
//! constant, or builtin-name payloads depending on the tag. There is no
//! bytecode stage here — the tree is lowered directly into an operator graph
//! by `compiler.rs`.

use crate::constant::Constant;
use crate::error::Span;

/// The significant node kinds the parser produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Tag {
    Cat,
    Alt,
    Or,
    Capture,
    SubxEval,
    CloseStar,
    ClosePlus,
    Assert,
    PredAnd,
    PredOr,
    PredNot,
    PredSubxAny,
    PredSubxCmp,
    Const,
    Str,
    Format,
    Bind,
    Read,
    Scope,
    Block,
    IfElse,
    FBuiltin,
    EmptyList,
    Nop,
}

impl Tag {
    /// Expected arity, where fixed; variadic tags (`Cat`, `Alt`, `Format`,
    /// `PredAnd`, `PredOr`) return `None`.
    pub fn arity(self) -> Option<usize> {
        use Tag::*;
        match self {
            Cat | Alt | Format | PredAnd | PredOr => None,
            Or => None,
            Capture | SubxEval | CloseStar | ClosePlus | Assert | PredNot | PredSubxAny | Bind
            | Block => Some(1),
            Scope => Some(2),
            PredSubxCmp => Some(2),
            IfElse => Some(3),
            Const | Str | Read | FBuiltin | EmptyList | Nop => Some(0),
        }
    }
}

/// One node in the parse tree. Payload fields are tag-dependent: `Const`
/// carries `constant`, `Str`/`Read`/`Bind`/`FBuiltin` carry `text`, and
/// `SubxEval` carries its keep-count in `keep`.
#[derive(Debug, Clone)]
pub struct Tree {
    pub tag: Tag,
    pub children: Vec<Tree>,
    pub text: Option<String>,
    pub constant: Option<Constant>,
    pub keep: usize,
    pub span: Span,
}

impl Tree {
    pub fn new(tag: Tag, span: Span) -> Self {
        Self { tag, children: Vec::new(), text: None, constant: None, keep: 1, span }
    }

    pub fn leaf(tag: Tag, span: Span) -> Self {
        Self::new(tag, span)
    }

    pub fn with_children(tag: Tag, children: Vec<Tree>, span: Span) -> Self {
        Self { tag, children, text: None, constant: None, keep: 1, span }
    }

    pub fn with_text(tag: Tag, text: impl Into<String>, span: Span) -> Self {
        Self { tag, children: Vec::new(), text: Some(text.into()), constant: None, keep: 1, span }
    }

    pub fn with_constant(constant: Constant, span: Span) -> Self {
        Self { tag: Tag::Const, children: Vec::new(), text: None, constant: Some(constant), keep: 1, span }
    }

    pub fn nop(span: Span) -> Self {
        Self::leaf(Tag::Nop, span)
    }

    pub fn is_nop(&self) -> bool {
        self.tag == Tag::Nop
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn every_tag_has_a_lowercase_display_name() {
        for tag in Tag::iter() {
            let name = tag.to_string();
            assert!(name.chars().all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }
}
