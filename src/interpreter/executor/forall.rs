//! Forall iterator protocol
//!
//! An iterator is any value that answers four messages, each sent through the
//! ordinary call mechanism with the iterator as first argument:
//!
//! 1. `start(iter) -> state`
//! 2. `valid(iter, state) -> bool`
//! 3. `index(iter, state) -> element`
//! 4. `next(iter, state) -> state`
//!
//! A forall loop sends `start`, then `valid`/`index`/body/`next` until `valid`
//! answers false. Heap objects whose type has a registered [`Iterable`] are
//! answered natively; everything else resolves the message name against the
//! visible functions.

use super::errors::{InterpError, NodeRef, UserError};
use super::types::{Activation, Heap, Object, Slot};
use crate::interpreter::tree::{Immediate, Program};

/// Type tag of the built-in integer range object
pub const RANGE_TYPE: &str = "range";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForallMessage {
    Start,
    Valid,
    Index,
    Next,
}

impl ForallMessage {
    pub fn selector(self) -> &'static str {
        match self {
            ForallMessage::Start => "start",
            ForallMessage::Valid => "valid",
            ForallMessage::Index => "index",
            ForallMessage::Next => "next",
        }
    }

    pub fn from_selector(name: &str) -> Option<Self> {
        match name {
            "start" => Some(ForallMessage::Start),
            "valid" => Some(ForallMessage::Valid),
            "index" => Some(ForallMessage::Index),
            "next" => Some(ForallMessage::Next),
            _ => None,
        }
    }

    /// Arguments after the selector: the iterator, plus the loop state for all but `start`
    pub fn nargs(self) -> usize {
        match self {
            ForallMessage::Start => 1,
            _ => 2,
        }
    }
}

/// Native implementation of the iterator protocol for one object type
pub trait Iterable: Send + Sync {
    fn start(&self, iter: &Object) -> Result<Slot, UserError>;
    fn valid(&self, iter: &Object, state: &Slot) -> Result<bool, UserError>;
    fn index(&self, iter: &Object, state: &Slot) -> Result<Slot, UserError>;
    fn next(&self, iter: &Object, state: &Slot) -> Result<Slot, UserError>;
}

/// Put a message send on the operand stack: selector, iterator, optional state
///
/// Returns the operand count to call with.
pub fn push_message(frame: &mut Activation, msg: ForallMessage, iter: Slot, state: Option<Slot>) -> usize {
    frame.val_stack.push(Slot::Selector(msg.selector().to_string()));
    frame.val_stack.push(iter);
    if let Some(state) = state {
        frame.val_stack.push(state);
    }
    msg.nargs() + 1
}

/// Answer a message natively when the iterator's type has an [`Iterable`]
///
/// `args` excludes the selector. Returns None when the fast path does not apply.
pub fn try_native(
    program: &Program,
    heap: &Heap,
    name: &str,
    args: &[Slot],
    node: NodeRef,
) -> Option<Result<Slot, InterpError>> {
    let msg = ForallMessage::from_selector(name)?;
    let r = args.first()?.as_object()?;
    let Some(object) = heap.get(r) else {
        return Some(Err(InterpError::internal(node, format!("stale object handle {}", r))));
    };
    let iterable = program.iterable(&object.ty)?;

    if args.len() != msg.nargs() {
        return Some(Err(InterpError::user(
            node,
            UserError::ArityMismatch {
                name: name.to_string(),
                expected: msg.nargs(),
                got: args.len(),
            },
        )));
    }

    let answer = match msg {
        ForallMessage::Start => iterable.start(object),
        ForallMessage::Valid => iterable.valid(object, &args[1]).map(Slot::bool),
        ForallMessage::Index => iterable.index(object, &args[1]),
        ForallMessage::Next => iterable.next(object, &args[1]),
    };
    Some(answer.map_err(|kind| InterpError::user(node, kind)))
}

/* ===================== Built-in range ===================== */

/// Half-open integer range `[lo, hi)`; the loop state is the current integer
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeIterable;

impl RangeIterable {
    fn bounds(iter: &Object) -> Result<(i64, i64), UserError> {
        match iter.fields.as_slice() {
            [lo, hi] => Ok((lo.as_int()?, hi.as_int()?)),
            _ => Err(UserError::TypeMismatch(format!(
                "malformed {} object",
                RANGE_TYPE
            ))),
        }
    }
}

impl Iterable for RangeIterable {
    fn start(&self, iter: &Object) -> Result<Slot, UserError> {
        let (lo, _) = Self::bounds(iter)?;
        Ok(Slot::int(lo))
    }

    fn valid(&self, iter: &Object, state: &Slot) -> Result<bool, UserError> {
        let (_, hi) = Self::bounds(iter)?;
        Ok(state.as_int()? < hi)
    }

    fn index(&self, _iter: &Object, state: &Slot) -> Result<Slot, UserError> {
        Ok(Slot::Immediate(Immediate::Int(state.as_int()?)))
    }

    fn next(&self, _iter: &Object, state: &Slot) -> Result<Slot, UserError> {
        Ok(Slot::int(state.as_int()? + 1))
    }
}
