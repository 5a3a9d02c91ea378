//! # Executor - Resumable Explicit-Stack Interpreter
//!
//! Walks the lowered syntax tree without recursing on the host stack.
//!
//! ## Core Principles
//!
//! 1. **Stack-driven execution**: pending statements, expressions, and operands
//!    live in explicit per-activation stacks
//! 2. **Staged nodes**: every node kind advances through numbered stages, so a
//!    context can stop between any two steps and resume later
//! 3. **Uniform calls**: user functions, primitives, and forall messages all go
//!    through one resolution path
//! 4. **Pure executor**: no threads, no async; the driver decides how long each
//!    context runs

pub mod calls;
pub mod errors;
pub mod exec_loop;
pub mod expressions;
pub mod forall;
pub mod statements;
pub mod stdlib;
pub mod types;
pub mod vm;

#[cfg(test)]
mod tests;

// Re-export commonly used items
pub use calls::{invoke, resolve, start};
pub use errors::{InterpError, NodeRef, UserError};
pub use exec_loop::{run_slice, run_until_done, step, ExecCx, RunOutcome};
pub use forall::{ForallMessage, Iterable, RangeIterable, RANGE_TYPE};
pub use types::{Activation, Environment, Heap, NodeKey, ObjRef, Object, Slot};
pub use vm::{Step, Thread};
