//! Execution context state
//!
//! A [`Thread`] holds everything needed to run (and serialize/resume) one
//! logical flow of control:
//! - frames: the chain of activations, caller first, current last
//! - heap: objects reachable from those activations

use serde::{Deserialize, Serialize};

use super::errors::NodeRef;
use super::types::{Activation, Heap, Slot};
use crate::interpreter::tree::{Module, ScopeId, StmtId};

/* ===================== Thread ===================== */

/// Execution context
///
/// `frames[i - 1]` is the caller of `frames[i]`. The link is positional, so a
/// caller never owns its callee and a callee only navigates back to its caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub frames: Vec<Activation>,
    pub heap: Heap,
    /// Steps consumed so far (gotos excluded)
    pub steps: u64,
}

impl Thread {
    /// A context whose single activation runs `body`
    pub fn new(body: Option<StmtId>, scope: ScopeId) -> Self {
        Thread {
            frames: vec![Activation::new(body, scope)],
            heap: Heap::default(),
            steps: 0,
        }
    }

    /// A context running one compilation unit's top-level statements
    pub fn for_module(module: &Module) -> Self {
        Self::new(module.body, module.scope)
    }

    /// A context with an empty activation, reused by the first call made in it
    pub fn idle(scope: ScopeId) -> Self {
        Self::new(None, scope)
    }

    pub fn is_finished(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn current(&self) -> Option<&Activation> {
        self.frames.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut Activation> {
        self.frames.last_mut()
    }

    /// Node under the current activation's cursor
    pub fn cursor(&self) -> NodeRef {
        match self.current() {
            Some(Activation { expr: Some(e), .. }) => NodeRef::Expr(*e),
            Some(Activation { stmt: Some(s), .. }) => NodeRef::Stmt(*s),
            _ => NodeRef::None,
        }
    }

    /// Discard the current activation, handing `value` to its caller
    pub fn detach(&mut self, value: Slot) {
        self.frames.pop();
        if let Some(parent) = self.frames.last_mut() {
            parent.val_stack.push(value);
        }
    }

    /// Free heap objects unreachable from any activation
    pub fn collect_garbage(&mut self) -> usize {
        let Thread { frames, heap, .. } = self;
        heap.collect(frames.iter().flat_map(Activation::roots))
    }
}

/* ===================== Step Result ===================== */

/// Result of executing one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Continue to next step
    Continue,
    /// A goto moved the cursor; does not count against a step budget
    Jumped,
    /// Execution complete
    Done,
}
