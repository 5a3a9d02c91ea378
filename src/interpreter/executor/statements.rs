//! Statement execution handlers
//!
//! Each statement kind has its own handler that decodes the activation's
//! stage into the kind's phase enum and performs exactly one unit of work:
//! schedule a sub-expression, descend into a child sequence, send a message,
//! or finish.

use super::calls::invoke;
use super::errors::{InterpError, NodeRef};
use super::exec_loop::ExecCx;
use super::forall::{push_message, ForallMessage};
use super::stdlib::ops;
use super::types::{
    Activation, BlockPhase, CondPhase, ExprStmtPhase, ForPhase, LeafPhase, NodeKey, ReturnPhase,
    SelectPhase, Slot, StmtFlow, WhenPhase, WhilePhase,
};
use super::vm::Thread;
use crate::interpreter::tree::{ExprId, Program, StmtId, StmtKind, VarId};

/* ===================== Dispatch ===================== */

/// Run one unit of work for statement `id`
pub fn execute(thread: &mut Thread, cx: &mut ExecCx<'_>, id: StmtId) -> Result<StmtFlow, InterpError> {
    let program = cx.program;
    let node = NodeRef::Stmt(id);

    match &program.stmt(id).kind {
        StmtKind::Expr(expr) => execute_expr_stmt(frame(thread, node)?, *expr, node),

        StmtKind::Block { body } => execute_block(frame(thread, node)?, *body, node),

        StmtKind::While {
            cond,
            body,
            is_while_do,
        } => execute_while(frame(thread, node)?, *cond, *body, *is_while_do, node),

        StmtKind::For {
            indices,
            iterators,
            body,
        } => {
            let (index, iterator) = match (indices.as_slice(), iterators.as_slice()) {
                ([index], [iterator]) => (*index, *iterator),
                ([_], _) => {
                    return Err(InterpError::internal(
                        node,
                        format!("bad number of iterators ({})", iterators.len()),
                    ))
                }
                _ => {
                    return Err(InterpError::internal(
                        node,
                        format!("bad number of indices ({})", indices.len()),
                    ))
                }
            };
            execute_for(thread, cx, id, index, iterator, *body)
        }

        StmtKind::Cond {
            cond,
            then_s,
            else_s,
        } => execute_cond(frame(thread, node)?, *cond, *then_s, *else_s, node),

        StmtKind::Select { selector, whens } => {
            execute_select(frame(thread, node)?, id, *selector, *whens)
        }

        StmtKind::When { cases, body } => execute_when(program, frame(thread, node)?, id, cases, *body),

        StmtKind::Return { value } => execute_return(thread, *value, node),

        StmtKind::Label { .. } => match LeafPhase::try_from(frame(thread, node)?.stage) {
            Ok(LeafPhase::Eval) => Ok(StmtFlow::Complete),
            Err(stage) => Err(InterpError::bad_stage(node, "LabelStmt", stage)),
        },

        StmtKind::Goto { target } => execute_goto(program, frame(thread, node)?, *target, node),
    }
}

fn frame(thread: &mut Thread, node: NodeRef) -> Result<&mut Activation, InterpError> {
    thread
        .current_mut()
        .ok_or_else(|| InterpError::internal(node, "no current activation"))
}

pub(crate) fn pop_operand(frame: &mut Activation, node: NodeRef) -> Result<Slot, InterpError> {
    frame
        .val_stack
        .pop()
        .ok_or_else(|| InterpError::internal(node, "operand stack underflow"))
}

fn pop_bool(frame: &mut Activation, node: NodeRef) -> Result<bool, InterpError> {
    pop_operand(frame, node)?
        .as_bool()
        .map_err(|kind| InterpError::user(node, kind))
}

/* ===================== Statement Handlers ===================== */

/// Execute an expression for its effects
fn execute_expr_stmt(frame: &mut Activation, expr: ExprId, node: NodeRef) -> Result<StmtFlow, InterpError> {
    match ExprStmtPhase::try_from(frame.stage) {
        Ok(ExprStmtPhase::Eval) => {
            frame.eval(expr, ExprStmtPhase::Discard.into());
            Ok(StmtFlow::Pending)
        }
        Ok(ExprStmtPhase::Discard) => {
            frame.val_stack.pop();
            Ok(StmtFlow::Complete)
        }
        Err(stage) => Err(InterpError::bad_stage(node, "ExprStmt", stage)),
    }
}

fn execute_block(frame: &mut Activation, body: Option<StmtId>, node: NodeRef) -> Result<StmtFlow, InterpError> {
    match BlockPhase::try_from(frame.stage) {
        Ok(BlockPhase::Enter) => Ok(frame.descend(body, 0)),
        Err(stage) => Err(InterpError::bad_stage(node, "BlockStmt", stage)),
    }
}

/// Execute while-do and do-while loops
fn execute_while(
    frame: &mut Activation,
    cond: ExprId,
    body: Option<StmtId>,
    is_while_do: bool,
    node: NodeRef,
) -> Result<StmtFlow, InterpError> {
    match WhilePhase::try_from(frame.stage) {
        Ok(WhilePhase::Enter) => {
            if is_while_do {
                frame.stage = WhilePhase::Test.into();
                Ok(StmtFlow::Pending)
            } else {
                Ok(frame.descend(body, WhilePhase::Test.into()))
            }
        }
        Ok(WhilePhase::Test) => {
            frame.eval(cond, WhilePhase::Check.into());
            Ok(StmtFlow::Pending)
        }
        Ok(WhilePhase::Check) => {
            if pop_bool(frame, NodeRef::Expr(cond))? {
                Ok(frame.descend(body, WhilePhase::Test.into()))
            } else {
                Ok(StmtFlow::Complete)
            }
        }
        Err(stage) => Err(InterpError::bad_stage(node, "WhileLoopStmt", stage)),
    }
}

/// Execute a forall loop over one iterator
///
/// The loop state lives in the environment slot keyed by the loop itself; the
/// iterator value is the memoized value of its expression.
fn execute_for(
    thread: &mut Thread,
    cx: &mut ExecCx<'_>,
    id: StmtId,
    index: VarId,
    iterator: ExprId,
    body: Option<StmtId>,
) -> Result<StmtFlow, InterpError> {
    let node = NodeRef::Stmt(id);
    let frame = frame(thread, node)?;

    let nargs = match ForPhase::try_from(frame.stage) {
        Ok(ForPhase::EvalIterator) => {
            frame.eval(iterator, ForPhase::Start.into());
            return Ok(StmtFlow::Pending);
        }
        Ok(ForPhase::Start) => {
            // A conditional iterator memoizes under its branch; keep the value under the loop's own key
            let iter = pop_operand(frame, node)?;
            frame.env.put(NodeKey::Expr(iterator), iter.clone());
            frame.stage = ForPhase::Valid.into();
            push_message(frame, ForallMessage::Start, iter, None)
        }
        Ok(ForPhase::Valid) | Ok(ForPhase::Advance) => {
            let state = pop_operand(frame, node)?;
            frame.env.put(NodeKey::Stmt(id), state.clone());
            let iter = loop_iterator(frame, iterator, node)?;
            frame.stage = ForPhase::Check.into();
            push_message(frame, ForallMessage::Valid, iter, Some(state))
        }
        Ok(ForPhase::Check) => {
            if !pop_bool(frame, node)? {
                return Ok(StmtFlow::Complete);
            }
            let iter = loop_iterator(frame, iterator, node)?;
            let state = loop_state(frame, id)?;
            frame.stage = ForPhase::Body.into();
            push_message(frame, ForallMessage::Index, iter, Some(state))
        }
        Ok(ForPhase::Body) => {
            let element = pop_operand(frame, node)?;
            frame.env.put(NodeKey::Var(index), element);
            return Ok(frame.descend(body, ForPhase::Next.into()));
        }
        Ok(ForPhase::Next) => {
            let iter = loop_iterator(frame, iterator, node)?;
            let state = loop_state(frame, id)?;
            frame.stage = ForPhase::Advance.into();
            push_message(frame, ForallMessage::Next, iter, Some(state))
        }
        Err(stage) => return Err(InterpError::bad_stage(node, "ForLoopStmt", stage)),
    };

    invoke(thread, cx, nargs)?;
    Ok(StmtFlow::Pending)
}

fn loop_iterator(frame: &Activation, iterator: ExprId, node: NodeRef) -> Result<Slot, InterpError> {
    frame
        .env
        .get(NodeKey::Expr(iterator))
        .cloned()
        .ok_or_else(|| InterpError::internal(node, "forall iterator was never evaluated"))
}

fn loop_state(frame: &Activation, id: StmtId) -> Result<Slot, InterpError> {
    frame
        .env
        .get(NodeKey::Stmt(id))
        .cloned()
        .ok_or_else(|| InterpError::internal(NodeRef::Stmt(id), "forall state missing"))
}

fn execute_cond(
    frame: &mut Activation,
    cond: ExprId,
    then_s: Option<StmtId>,
    else_s: Option<StmtId>,
    node: NodeRef,
) -> Result<StmtFlow, InterpError> {
    match CondPhase::try_from(frame.stage) {
        Ok(CondPhase::Test) => {
            frame.eval(cond, CondPhase::Branch.into());
            Ok(StmtFlow::Pending)
        }
        Ok(CondPhase::Branch) => {
            let taken = if pop_bool(frame, NodeRef::Expr(cond))? {
                then_s
            } else {
                else_s
            };
            frame.stage = 0;
            Ok(frame.descend(taken, 0))
        }
        Err(stage) => Err(InterpError::bad_stage(node, "CondStmt", stage)),
    }
}

/// Evaluate the selector once, then try each arm in order
fn execute_select(
    frame: &mut Activation,
    id: StmtId,
    selector: ExprId,
    whens: Option<StmtId>,
) -> Result<StmtFlow, InterpError> {
    match SelectPhase::try_from(frame.stage) {
        Ok(SelectPhase::Eval) => {
            frame.eval(selector, SelectPhase::Dispatch.into());
            Ok(StmtFlow::Pending)
        }
        Ok(SelectPhase::Dispatch) => {
            let value = pop_operand(frame, NodeRef::Stmt(id))?;
            frame.env.put(NodeKey::Stmt(id), value);
            frame.stage = 0;
            Ok(frame.descend(whens, 0))
        }
        Err(stage) => Err(InterpError::bad_stage(NodeRef::Stmt(id), "SelectStmt", stage)),
    }
}

/// One select arm: compare each case with the selector value
///
/// A matching arm runs its body and then leaves the select entirely; an arm
/// with no cases always matches. An arm that does not match completes, so the
/// next arm is tried.
fn execute_when(
    program: &Program,
    frame: &mut Activation,
    id: StmtId,
    cases: &[ExprId],
    body: Option<StmtId>,
) -> Result<StmtFlow, InterpError> {
    let node = NodeRef::Stmt(id);
    let select = match program.stmt(id).parent {
        Some(parent) if matches!(program.stmt(parent).kind, StmtKind::Select { .. }) => parent,
        _ => return Err(InterpError::internal(node, "select arm outside a select")),
    };
    let leave = WhenPhase::leave_stage(cases.len());

    match WhenPhase::decode(frame.stage, cases.len()) {
        Some(WhenPhase::Enter) => match cases.first() {
            None => Ok(frame.descend(body, leave)),
            Some(first) => {
                frame.eval(*first, 1);
                Ok(StmtFlow::Pending)
            }
        },
        Some(WhenPhase::Compare(k)) => {
            let case = pop_operand(frame, node)?;
            let selected = frame
                .env
                .get(NodeKey::Stmt(select))
                .ok_or_else(|| InterpError::internal(node, "select value missing"))?;
            let matched =
                ops::equal(&case, selected).map_err(|kind| InterpError::user(NodeRef::Expr(cases[k]), kind))?;

            if matched {
                Ok(frame.descend(body, leave))
            } else if let Some(next) = cases.get(k + 1) {
                frame.eval(*next, (k + 2) as u32);
                Ok(StmtFlow::Pending)
            } else {
                Ok(StmtFlow::Complete)
            }
        }
        Some(WhenPhase::Leave) => {
            // Leave the select: the arm's continuation is the select itself
            match frame.pop_continuation() {
                Some((parent, 0)) if parent == select => {
                    frame.stmt = Some(select);
                    Ok(StmtFlow::Complete)
                }
                _ => Err(InterpError::internal(node, "select arm lost its select")),
            }
        }
        None => Err(InterpError::bad_stage(node, "WhenStmt", frame.stage)),
    }
}

/// Evaluate the value, then detach the activation
fn execute_return(thread: &mut Thread, value: Option<ExprId>, node: NodeRef) -> Result<StmtFlow, InterpError> {
    let frame = frame(thread, node)?;
    match ReturnPhase::try_from(frame.stage) {
        Ok(ReturnPhase::Eval) => {
            match value {
                Some(expr) => frame.eval(expr, ReturnPhase::Detach.into()),
                None => {
                    frame.val_stack.push(Slot::Empty);
                    frame.stage = ReturnPhase::Detach.into();
                }
            }
            Ok(StmtFlow::Pending)
        }
        Ok(ReturnPhase::Detach) => {
            let value = pop_operand(frame, node)?;
            thread.detach(value);
            Ok(StmtFlow::Returned)
        }
        Err(stage) => Err(InterpError::bad_stage(node, "ReturnStmt", stage)),
    }
}

/// Relocate the cursor to a label, unwinding enclosing statements
fn execute_goto(
    program: &Program,
    frame: &mut Activation,
    target: StmtId,
    node: NodeRef,
) -> Result<StmtFlow, InterpError> {
    if let Err(stage) = LeafPhase::try_from(frame.stage) {
        return Err(InterpError::bad_stage(node, "GotoStmt", stage));
    }

    let label_parent = program.stmt(target).parent;
    loop {
        match frame.stmt_stack.last().copied() {
            Some(top) if Some(top) == label_parent => break,
            Some(_) => {
                frame.pop_continuation();
            }
            None if label_parent.is_none() => break,
            None => {
                return Err(InterpError::internal(
                    node,
                    format!("goto target {} is not in an enclosing sequence", target),
                ))
            }
        }
    }

    frame.stage = 0;
    frame.val_stack.clear();
    frame.stmt = Some(target);
    Ok(StmtFlow::Jumped)
}

