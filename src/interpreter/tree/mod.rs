//! Syntax tree consumed by the interpreter
//!
//! - [`ast`]: serialized, name-based program form
//! - [`program`]: arena tree with ids, scopes and the symbol query
//! - [`lower`]: loader from the former to the latter

pub mod ast;
pub mod lower;
pub mod program;

use thiserror::Error;

pub use ast::ProgramDef;
pub use lower::{load_program, parse_program};
pub use program::{
    ExprId, ExprKind, FnBody, FnId, Function, Immediate, Module, Program, ScopeId, Stmt, StmtId,
    StmtKind, VarId,
};

/// Errors raised while loading a program
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("failed to parse program: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown variable '{0}'")]
    UnknownName(String),

    #[error("function reference '{name}' does not name a single function ({candidates} visible)")]
    UnresolvedFunction { name: String, candidates: usize },

    #[error("duplicate label '{0}'")]
    DuplicateLabel(String),

    #[error("goto targets unknown label '{0}'")]
    UnknownLabel(String),

    #[error("goto '{0}' jumps into a nested statement")]
    GotoIntoNestedScope(String),

    #[error("entry function '{0}' not found")]
    MissingEntry(String),

    #[error("entry function '{0}' is defined more than once")]
    AmbiguousEntry(String),
}
