// src/ast/mod.rs
pub mod types;

pub use types::{Arg, CommandAst, Redirect, RedirectKind, SequenceOperator};
