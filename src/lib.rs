//! Zwerg: the query engine behind dwgrep-style DWARF/ELF inspection.
//!
//! A [`query::Query`] is parsed and lowered once by [`compiler::compile`]
//! into a graph of [`op::Op`] trait objects — a pull pipeline, not a
//! bytecode interpreter: each node's `next` pulls a result [`stack::Stack`]
//! from upstream and yields zero or more of its own. [`query::QueryResult`]
//! drives that graph against a fresh [`layout::Scon`] for each evaluation,
//! so the same compiled [`query::Query`] can run against many starting
//! stacks without recompiling.
//!
//! The [`builtins`] module supplies the core comparison/`apply` vocabulary
//! every query gets, plus a demo vocabulary exercising the arithmetic and
//! shuffle core; a real DWARF/ELF front end would supply its own
//! [`builtins::Vocabulary`] and merge it with [`builtins::core_voc::core_vocabulary`].

#![forbid(unsafe_code)]

pub mod builtins;
pub mod compiler;
pub mod constant;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod layout;
pub mod lexer;
pub mod op;
pub mod parser;
pub mod query;
pub mod resource;
pub mod selector;
pub mod simplify;
pub mod stack;
pub mod tree;
pub mod types;
pub mod value;

pub use builtins::Vocabulary;
pub use error::{CompileError, RuntimeError};
pub use query::{Query, QueryResult};
pub use stack::Stack;
pub use value::Value;
