//! Interpreter errors
//!
//! Two classes, both fatal to the run:
//! - user errors: the interpreted program misbehaved
//! - internal errors: an interpreter invariant broke or the tree is ill-formed

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interpreter::tree::{ExprId, FnId, StmtId};

/// Syntax node an error is reported against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRef {
    Stmt(StmtId),
    Expr(ExprId),
    Function(FnId),
    /// No cursor (an activation with nothing left to run)
    None,
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Stmt(id) => write!(f, "{}", id),
            NodeRef::Expr(id) => write!(f, "{}", id),
            NodeRef::Function(id) => write!(f, "{}", id),
            NodeRef::None => write!(f, "<no node>"),
        }
    }
}

#[derive(Debug, Error)]
pub enum InterpError {
    #[error("{node}: {kind}")]
    User { node: NodeRef, kind: UserError },

    #[error("internal error at {node}: {message}")]
    Internal { node: NodeRef, message: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl InterpError {
    pub fn user(node: NodeRef, kind: UserError) -> Self {
        InterpError::User { node, kind }
    }

    pub fn internal(node: NodeRef, message: impl Into<String>) -> Self {
        InterpError::Internal {
            node,
            message: message.into(),
        }
    }

    pub fn bad_stage(node: NodeRef, kind: &str, stage: u32) -> Self {
        Self::internal(node, format!("bad stage {} for {}", stage, kind))
    }

    /// The user error kind, if this is one
    pub fn user_kind(&self) -> Option<&UserError> {
        match self {
            InterpError::User { kind, .. } => Some(kind),
            _ => None,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, InterpError::Internal { .. })
    }
}

/// Program errors under interpretation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UserError {
    #[error("accessed empty variable")]
    EmptyVariable,

    #[error("accessed uninitialized variable")]
    UninitializedVariable,

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("unable to resolve function to single function '{name}' ({candidates} visible)")]
    Unresolved { name: String, candidates: usize },

    #[error("call to something other than function name or closure ({0})")]
    NotCallable(String),

    #[error("closures not handled yet")]
    ClosureUnsupported,

    #[error("call with no arguments")]
    EmptyCall,

    #[error("'{name}' expects {expected} arguments, got {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("condition must be bool, found {0}")]
    NotBoolean(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("output failed: {0}")]
    Output(String),
}
