//! Runtime value cells

use std::fmt;

use serde::{Deserialize, Serialize};

use super::heap::ObjRef;
use crate::interpreter::executor::errors::UserError;
use crate::interpreter::tree::{ExprId, FnId, Immediate};

/// Tagged value cell
///
/// The unit of storage for variables, operands and intermediate results.
/// Copies are tag-preserving: cloning a slot clones exactly the active variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Slot {
    /// Never written
    #[default]
    Empty,
    /// Declared but not yet assigned
    Uninitialized,
    Object(ObjRef),
    Immediate(Immediate),
    Function(FnId),
    /// Call target known only by name, carried on the operand stack
    Selector(String),
    /// Representable, but any use is fatal
    Closure(ExprId),
}

impl Slot {
    pub fn bool(v: bool) -> Self {
        Slot::Immediate(Immediate::Bool(v))
    }

    pub fn int(v: i64) -> Self {
        Slot::Immediate(Immediate::Int(v))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Slot::Empty => "empty",
            Slot::Uninitialized => "uninitialized",
            Slot::Object(_) => "object",
            Slot::Immediate(imm) => imm.type_name(),
            Slot::Function(_) => "function",
            Slot::Selector(_) => "selector",
            Slot::Closure(_) => "closure",
        }
    }

    /// Check the slot holds a value; never-written and unassigned slots are errors
    pub fn read(&self) -> Result<&Slot, UserError> {
        match self {
            Slot::Empty => Err(UserError::EmptyVariable),
            Slot::Uninitialized => Err(UserError::UninitializedVariable),
            _ => Ok(self),
        }
    }

    /// Read a condition value
    pub fn as_bool(&self) -> Result<bool, UserError> {
        match self.read()? {
            Slot::Immediate(Immediate::Bool(b)) => Ok(*b),
            other => Err(UserError::NotBoolean(other.kind_name().to_string())),
        }
    }

    pub fn as_int(&self) -> Result<i64, UserError> {
        match self.read()? {
            Slot::Immediate(Immediate::Int(i)) => Ok(*i),
            other => Err(UserError::TypeMismatch(format!(
                "expected int, found {}",
                other.kind_name()
            ))),
        }
    }

    pub fn as_object(&self) -> Option<ObjRef> {
        match self {
            Slot::Object(r) => Some(*r),
            _ => None,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Empty => write!(f, "<empty>"),
            Slot::Uninitialized => write!(f, "<uninitialized>"),
            Slot::Object(r) => write!(f, "<object {}>", r),
            Slot::Immediate(imm) => write!(f, "{}", imm),
            Slot::Function(id) => write!(f, "<{}>", id),
            Slot::Selector(name) => write!(f, "<selector {}>", name),
            Slot::Closure(id) => write!(f, "<closure {}>", id),
        }
    }
}
