//! Expression execution handlers
//!
//! An expression either finishes in one step (leaves) or schedules its
//! sub-expressions one at a time, resuming at the stage recorded next to it on
//! the expression stack. Finished expressions memoize their value in the
//! environment and push it as an operand.

use super::calls::invoke;
use super::errors::{InterpError, NodeRef, UserError};
use super::exec_loop::ExecCx;
use super::statements::pop_operand;
use super::types::{Activation, AssignPhase, CallPhase, CondPhase, LeafPhase, NodeKey, Slot};
use super::vm::Thread;
use crate::interpreter::tree::{ExprId, ExprKind, Program, VarId};

/// Run one unit of work for expression `id`
pub fn execute(thread: &mut Thread, cx: &mut ExecCx<'_>, id: ExprId) -> Result<(), InterpError> {
    let program = cx.program;
    let node = NodeRef::Expr(id);
    let kind = program.expr(id);

    if let ExprKind::Call { callee, args } = kind {
        return execute_call(thread, cx, *callee, args, node);
    }

    let frame = thread
        .current_mut()
        .ok_or_else(|| InterpError::internal(node, "no current activation"))?;

    match kind {
        ExprKind::Assign { target, value } => execute_assign(program, frame, *target, *value, node),
        ExprKind::Cond {
            cond,
            then_e,
            else_e,
        } => execute_cond(frame, *cond, *then_e, *else_e, node),
        _ => {
            if let Err(stage) = LeafPhase::try_from(frame.expr_stage) {
                return Err(InterpError::bad_stage(node, kind.name(), stage));
            }
            let value = eval_leaf(program, frame, kind, node)?;
            frame.finish_expr(value);
            Ok(())
        }
    }
}

/// Value of a single-stage expression
fn eval_leaf(program: &Program, frame: &mut Activation, kind: &ExprKind, node: NodeRef) -> Result<Slot, InterpError> {
    match kind {
        ExprKind::Literal(imm) => Ok(Slot::Immediate(imm.clone())),

        ExprKind::Sym(var) => match frame.env.get(NodeKey::Var(*var)) {
            Some(slot) => slot
                .read()
                .cloned()
                .map_err(|kind| InterpError::user(node, kind)),
            None => Err(unknown_variable(program, *var, node)),
        },

        ExprKind::Def(var) => {
            frame.env.declare(*var);
            Ok(Slot::Empty)
        }

        ExprKind::Name(name) => Ok(Slot::Selector(name.clone())),

        ExprKind::FnRef(function) => Ok(Slot::Function(*function)),

        ExprKind::Closure { .. } => Err(InterpError::user(node, UserError::ClosureUnsupported)),

        ExprKind::Call { .. } | ExprKind::Assign { .. } | ExprKind::Cond { .. } => Err(
            InterpError::internal(node, format!("{} is not a single-stage expression", kind.name())),
        ),
    }
}

fn unknown_variable(program: &Program, var: VarId, node: NodeRef) -> InterpError {
    InterpError::user(node, UserError::UnknownVariable(program.var(var).name.clone()))
}

/// Evaluate the value, then store it into an existing variable slot
fn execute_assign(
    program: &Program,
    frame: &mut Activation,
    target: VarId,
    value: ExprId,
    node: NodeRef,
) -> Result<(), InterpError> {
    match AssignPhase::try_from(frame.expr_stage) {
        Ok(AssignPhase::Eval) => {
            frame.eval(value, AssignPhase::Store.into());
            Ok(())
        }
        Ok(AssignPhase::Store) => {
            let v = pop_operand(frame, node)?;
            if frame.env.get(NodeKey::Var(target)).is_none() {
                return Err(unknown_variable(program, target, node));
            }
            frame.env.put(NodeKey::Var(target), v.clone());
            frame.finish_expr(v);
            Ok(())
        }
        Err(stage) => Err(InterpError::bad_stage(node, "AssignExpr", stage)),
    }
}

/// Conditional expression
///
/// The chosen branch replaces the conditional in place, so the branch's value
/// is the conditional's value.
fn execute_cond(
    frame: &mut Activation,
    cond: ExprId,
    then_e: ExprId,
    else_e: ExprId,
    node: NodeRef,
) -> Result<(), InterpError> {
    match CondPhase::try_from(frame.expr_stage) {
        Ok(CondPhase::Test) => {
            frame.eval(cond, CondPhase::Branch.into());
            Ok(())
        }
        Ok(CondPhase::Branch) => {
            let taken = pop_operand(frame, node)?
                .as_bool()
                .map_err(|kind| InterpError::user(NodeRef::Expr(cond), kind))?;
            frame.expr = Some(if taken { then_e } else { else_e });
            frame.expr_stage = 0;
            Ok(())
        }
        Err(stage) => Err(InterpError::bad_stage(node, "CondExpr", stage)),
    }
}

/// Evaluate callee and arguments left to right, then call
fn execute_call(
    thread: &mut Thread,
    cx: &mut ExecCx<'_>,
    callee: ExprId,
    args: &[ExprId],
    node: NodeRef,
) -> Result<(), InterpError> {
    let frame = thread
        .current_mut()
        .ok_or_else(|| InterpError::internal(node, "no current activation"))?;

    match CallPhase::decode(frame.expr_stage, args.len()) {
        Some(CallPhase::Callee) => {
            frame.eval(callee, 1);
            Ok(())
        }
        Some(CallPhase::Arg(i)) => {
            frame.eval(args[i], (i + 2) as u32);
            Ok(())
        }
        Some(CallPhase::Invoke) => {
            frame.expr_stage = CallPhase::complete_stage(args.len());
            invoke(thread, cx, args.len() + 1)
        }
        Some(CallPhase::Complete) => {
            let result = pop_operand(frame, node)?;
            frame.finish_expr(result);
            Ok(())
        }
        None => Err(InterpError::bad_stage(node, "CallExpr", frame.expr_stage)),
    }
}
