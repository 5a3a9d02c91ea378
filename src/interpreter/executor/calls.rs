//! Call resolution and function entry
//!
//! A call leaves its callee and arguments on the operand stack, callee
//! deepest. Resolution consumes them and either runs a primitive in place or
//! links a new activation for a user function. The caller keeps its cursor;
//! the result lands on its operand stack when the callee finishes.

use super::errors::{InterpError, NodeRef, UserError};
use super::exec_loop::ExecCx;
use super::forall;
use super::stdlib::{call_primitive, NativeCx};
use super::types::{Activation, NodeKey, Slot};
use super::vm::Thread;
use crate::interpreter::tree::{FnBody, FnId, Program, ScopeId};

/// Resolve a selector to exactly one visible function
pub fn resolve(program: &Program, scope: ScopeId, name: &str) -> Result<FnId, UserError> {
    let visible = program.visible_functions(scope, name);
    match visible.as_slice() {
        [only] => Ok(*only),
        _ => Err(UserError::Unresolved {
            name: name.to_string(),
            candidates: visible.len(),
        }),
    }
}

/// Call with the top `nargs` operands (callee included)
pub fn invoke(thread: &mut Thread, cx: &mut ExecCx<'_>, nargs: usize) -> Result<(), InterpError> {
    let program = cx.program;
    let node = thread.cursor();
    let frame = thread
        .current_mut()
        .ok_or_else(|| InterpError::internal(node, "call with no activation"))?;

    if nargs < 1 {
        return Err(InterpError::user(node, UserError::EmptyCall));
    }
    if frame.val_stack.len() < nargs {
        return Err(InterpError::internal(
            node,
            format!(
                "not enough arguments for call: need {}, operand stack holds {}",
                nargs,
                frame.val_stack.len()
            ),
        ));
    }

    let scope = frame
        .stmt
        .map(|s| program.stmt(s).scope)
        .unwrap_or(frame.scope);
    let mut args = frame.val_stack.split_off(frame.val_stack.len() - nargs);
    let callee = args.remove(0);

    let function = match callee {
        Slot::Function(f) => f,
        Slot::Selector(name) => {
            if let Some(result) = forall::try_native(program, &thread.heap, &name, &args, node) {
                push_result(thread, node, result?)?;
                return Ok(());
            }
            resolve(program, scope, &name).map_err(|kind| InterpError::user(node, kind))?
        }
        Slot::Closure(_) => return Err(InterpError::user(node, UserError::ClosureUnsupported)),
        other => {
            return Err(InterpError::user(
                node,
                UserError::NotCallable(other.kind_name().to_string()),
            ))
        }
    };

    enter(thread, cx, function, args, node)
}

/// Begin a context by calling its entry function
pub fn start(thread: &mut Thread, cx: &mut ExecCx<'_>, entry: FnId) -> Result<(), InterpError> {
    let frame = thread.current_mut().ok_or_else(|| {
        InterpError::internal(NodeRef::Function(entry), "entry call on a finished context")
    })?;
    frame.val_stack.push(Slot::Function(entry));
    invoke(thread, cx, 1)
}

fn enter(
    thread: &mut Thread,
    cx: &mut ExecCx<'_>,
    id: FnId,
    args: Vec<Slot>,
    node: NodeRef,
) -> Result<(), InterpError> {
    let function = cx.program.function(id);
    if args.len() != function.arity() {
        return Err(InterpError::user(
            node,
            UserError::ArityMismatch {
                name: function.name.clone(),
                expected: function.arity(),
                got: args.len(),
            },
        ));
    }

    match &function.body {
        FnBody::Native(prim) => {
            let mut native = NativeCx {
                heap: &mut thread.heap,
                out: &mut *cx.output,
            };
            let value =
                call_primitive(*prim, &args, &mut native).map_err(|kind| InterpError::user(node, kind))?;
            push_result(thread, node, value)
        }

        FnBody::User(body) => {
            let scope = body
                .map(|b| cx.program.stmt(b).scope)
                .unwrap_or(function.scope);

            // The first call made in an idle context runs in its initial activation
            let reuse = thread.current().is_some_and(Activation::is_exhausted);
            if !reuse {
                thread.frames.push(Activation::new(None, scope));
            }
            let frame = thread
                .current_mut()
                .ok_or_else(|| InterpError::internal(node, "no activation to enter"))?;
            frame.stmt = *body;
            frame.stage = 0;
            frame.scope = scope;
            frame.function = Some(id);
            for (param, arg) in function.params.iter().zip(args) {
                frame.env.put(NodeKey::Var(*param), arg);
            }
            Ok(())
        }
    }
}

fn push_result(thread: &mut Thread, node: NodeRef, value: Slot) -> Result<(), InterpError> {
    thread
        .current_mut()
        .ok_or_else(|| InterpError::internal(node, "call result with no activation"))?
        .val_stack
        .push(value);
    Ok(())
}
