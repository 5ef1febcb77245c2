//! Error types for the Zwerg engine.
//!
//! Compile-time errors (`Lexer`, `Parse`, `Name`) abort query construction and
//! are returned directly to the caller. Runtime errors (`Type`, `Arithmetic`,
//! `Predicate`, `Io`, `Format`) are reported through a [`DiagnosticSink`]
//! (see `diagnostics.rs`) and cause the offending stack to be skipped;
//! evaluation continues with the next upstream stack.
//!
//! `Display` impls are hand-written rather than generated by
//! `thiserror`/`anyhow`.

use std::fmt;

/// A source span, in bytes, used to annotate lexer/parser/arithmetic errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn point(at: usize) -> Self {
        Self { start: at, end: at }
    }
}

/// Compile-time failure: bad token, bad literal, unexpected token, unterminated construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerError {
    pub message: String,
    pub span: Span,
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lexer error at {}..{}: {}", self.span.start, self.span.end, self.message)
    }
}

impl std::error::Error for LexerError {}

/// Parse-time failure: unexpected token, malformed grammar construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error at {}..{}: {}", self.span.start, self.span.end, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Compile-time failure: unbound name reference, or a rebinding of an
/// already-bound name within the same lexical scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameError {
    pub name: String,
    pub message: String,
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "name error: `{}`: {}", self.name, self.message)
    }
}

impl std::error::Error for NameError {}

/// Any error that can abort query construction (lexing, parsing, compiling).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    Lexer(LexerError),
    Parse(ParseError),
    Name(NameError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lexer(e) => write!(f, "{e}"),
            Self::Parse(e) => write!(f, "{e}"),
            Self::Name(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<LexerError> for CompileError {
    fn from(e: LexerError) -> Self {
        Self::Lexer(e)
    }
}

impl From<ParseError> for CompileError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<NameError> for CompileError {
    fn from(e: NameError) -> Self {
        Self::Name(e)
    }
}

/// A runtime error, reported to a [`crate::diagnostics::DiagnosticSink`] and
/// non-fatal: the stack that produced it is skipped and evaluation continues.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// Overload resolution failed against the actual stack profile.
    Type { expected: Vec<String>, actual: String },
    /// Arithmetic overflow or division/modulo by zero.
    Arithmetic { expression: String, message: String },
    /// A sub-predicate returned `fail` (incomparable / mismatched types).
    Predicate { message: String },
    /// Surfaced from an external collaborator (ELF/DWARF reader, in this
    /// crate: the demo vocabulary's own I/O-shaped builtins).
    Io { message: String },
    /// A format-string operation failed (e.g. a `%(...)` sub-query produced
    /// zero or more than one result).
    Format { message: String },
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type { expected, actual } => {
                write!(f, "type error: expected one of [{}], got {}", expected.join(", "), actual)
            }
            Self::Arithmetic { expression, message } => {
                write!(f, "arithmetic error in `{expression}`: {message}")
            }
            Self::Predicate { message } => write!(f, "predicate error: {message}"),
            Self::Io { message } => write!(f, "io error: {message}"),
            Self::Format { message } => write!(f, "format error: {message}"),
        }
    }
}

impl std::error::Error for RuntimeError {}
