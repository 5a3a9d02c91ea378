//! Native primitive implementations
//!
//! Primitives are ordinary functions in the prelude scope: they are found by
//! call resolution like any user function, but run without an activation.

pub mod builtins;
pub mod ops;

use std::io::Write;

use super::errors::UserError;
use super::types::{Heap, Slot};

/* ===================== Primitive Identifiers ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    Not,
    Print,
    Range,
}

impl Primitive {
    pub const ALL: [Primitive; 14] = [
        Primitive::Add,
        Primitive::Sub,
        Primitive::Mul,
        Primitive::Div,
        Primitive::Rem,
        Primitive::Lt,
        Primitive::Le,
        Primitive::Gt,
        Primitive::Ge,
        Primitive::Eq,
        Primitive::Ne,
        Primitive::Not,
        Primitive::Print,
        Primitive::Range,
    ];

    /// Name the primitive is visible under
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Add => "+",
            Primitive::Sub => "-",
            Primitive::Mul => "*",
            Primitive::Div => "/",
            Primitive::Rem => "%",
            Primitive::Lt => "<",
            Primitive::Le => "<=",
            Primitive::Gt => ">",
            Primitive::Ge => ">=",
            Primitive::Eq => "==",
            Primitive::Ne => "!=",
            Primitive::Not => "!",
            Primitive::Print => "print",
            Primitive::Range => "range",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Primitive::Not | Primitive::Print => 1,
            _ => 2,
        }
    }
}

/// What a primitive may touch while it runs
pub struct NativeCx<'a> {
    pub heap: &'a mut Heap,
    pub out: &'a mut dyn Write,
}

/* ===================== Dispatcher ===================== */

/// Run a primitive; `args` excludes the callee and has already been arity-checked
pub fn call_primitive(prim: Primitive, args: &[Slot], cx: &mut NativeCx<'_>) -> Result<Slot, UserError> {
    match prim {
        Primitive::Add => ops::add(&args[0], &args[1]),
        Primitive::Sub => ops::arith(prim, &args[0], &args[1]),
        Primitive::Mul => ops::arith(prim, &args[0], &args[1]),
        Primitive::Div => ops::arith(prim, &args[0], &args[1]),
        Primitive::Rem => ops::arith(prim, &args[0], &args[1]),
        Primitive::Lt | Primitive::Le | Primitive::Gt | Primitive::Ge => {
            ops::compare(prim, &args[0], &args[1])
        }
        Primitive::Eq => ops::equal(&args[0], &args[1]).map(Slot::bool),
        Primitive::Ne => ops::equal(&args[0], &args[1]).map(|eq| Slot::bool(!eq)),
        Primitive::Not => Ok(Slot::bool(!args[0].as_bool()?)),
        Primitive::Print => builtins::print(&args[0], cx),
        Primitive::Range => builtins::range(&args[0], &args[1], cx),
    }
}
