//! Type definitions for the executor
//!
//! - Runtime values (Slot) and the managed heap
//! - Activations and environments
//! - Stage encodings for each node kind

pub mod control;
pub mod heap;
pub mod phase;
pub mod values;

pub use control::{Activation, Environment, NodeKey, StmtFlow};
pub use heap::{Heap, ObjRef, Object};
pub use phase::*;
pub use values::Slot;
