//! Core execution loop
//!
//! This module contains the step() function - the heart of the interpreter.
//! A step dispatches the node under the current activation's cursor to its
//! handler, then either keeps the cursor, advances it past a finished
//! statement, or detaches an exhausted activation.
//!
//! ## Function Organization
//! 1. run_until_done() / run_slice() - drivers (call step repeatedly)
//! 2. step() - one unit of work
//! 3. advance() - cursor movement after a statement completes

use std::io::{BufRead, Write};

use super::errors::InterpError;
use super::types::{Activation, Slot, StmtFlow};
use super::vm::{Step, Thread};
use super::{expressions, statements};
use crate::interpreter::debugger::{DebugController, Resume};
use crate::interpreter::tree::Program;

/// Everything a step may touch outside the execution context itself
pub struct ExecCx<'a> {
    pub program: &'a Program,
    pub debug: &'a mut DebugController,
    /// Debugger command input
    pub input: &'a mut dyn BufRead,
    /// Program output, trace lines, and debugger prompts
    pub output: &'a mut dyn Write,
    /// Collect the heap once this many objects were allocated since the last
    /// collection; 0 disables collection
    pub gc_threshold: usize,
}

/// How a run of the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The context has no activations left
    Finished,
    /// The step budget ran out; the context can be resumed
    Suspended,
    /// The debugger asked to quit
    Quit,
}

/* ===================== Public API ===================== */

/// Run the context until it finishes (or the debugger quits)
pub fn run_until_done(thread: &mut Thread, cx: &mut ExecCx<'_>) -> Result<RunOutcome, InterpError> {
    run(thread, cx, None)
}

/// Run at most `budget` steps; gotos are not counted
pub fn run_slice(thread: &mut Thread, cx: &mut ExecCx<'_>, budget: u64) -> Result<RunOutcome, InterpError> {
    run(thread, cx, Some(budget))
}

fn run(thread: &mut Thread, cx: &mut ExecCx<'_>, budget: Option<u64>) -> Result<RunOutcome, InterpError> {
    let mut used = 0u64;
    loop {
        if thread.is_finished() {
            return Ok(RunOutcome::Finished);
        }
        if budget.is_some_and(|b| used >= b) {
            return Ok(RunOutcome::Suspended);
        }

        if cx.debug.is_interrupted() && cx.debug.interact(&mut *cx.input, &mut *cx.output)? == Resume::Quit {
            return Ok(RunOutcome::Quit);
        }

        match step(thread, cx)? {
            Step::Jumped => continue,
            Step::Continue | Step::Done => {
                used += 1;
                thread.steps += 1;
                cx.debug.node_completed();
            }
        }

        if cx.gc_threshold > 0 && thread.heap.allocated_since_collect() >= cx.gc_threshold {
            let freed = thread.collect_garbage();
            tracing::trace!(freed, live = thread.heap.live_count(), "heap collected");
        }
    }
}

/// Execute one step of the context
///
/// 1. Detach the current activation if it has nothing left to run
/// 2. Otherwise dispatch the current expression, or else the current statement
/// 3. On statement completion, advance the cursor
pub fn step(thread: &mut Thread, cx: &mut ExecCx<'_>) -> Result<Step, InterpError> {
    let Some(frame) = thread.current() else {
        return Ok(Step::Done);
    };

    if frame.is_exhausted() {
        // Ran off the end of the body: the caller gets no value
        thread.detach(Slot::Empty);
        return Ok(done_or_continue(thread));
    }

    trace_node(cx, frame)?;

    let (expr, stmt) = (frame.expr, frame.stmt);
    if let Some(expr) = expr {
        expressions::execute(thread, cx, expr)?;
        return Ok(done_or_continue(thread));
    }

    let Some(stmt) = stmt else {
        return Ok(Step::Continue);
    };
    match statements::execute(thread, cx, stmt)? {
        StmtFlow::Pending | StmtFlow::Returned => {}
        StmtFlow::Jumped => return Ok(Step::Jumped),
        StmtFlow::Complete => {
            if let Some(frame) = thread.current_mut() {
                advance(cx.program, frame);
            }
        }
    }
    Ok(done_or_continue(thread))
}

fn done_or_continue(thread: &Thread) -> Step {
    if thread.is_finished() {
        Step::Done
    } else {
        Step::Continue
    }
}

/* ===================== Cursor Movement ===================== */

/// Move past the statement under the cursor
///
/// The next sibling runs if there is one. Otherwise the enclosing statement
/// is popped: resuming at stage 0 means it finished as well, so the search
/// continues outward; any other stage re-dispatches it.
pub(crate) fn advance(program: &Program, frame: &mut Activation) {
    frame.stage = 0;
    frame.val_stack.clear();

    let Some(mut current) = frame.stmt else {
        return;
    };
    loop {
        if let Some(next) = program.stmt(current).next {
            frame.stmt = Some(next);
            return;
        }
        match frame.pop_continuation() {
            None => {
                frame.stmt = None;
                return;
            }
            Some((parent, 0)) => current = parent,
            Some((parent, stage)) => {
                frame.stmt = Some(parent);
                frame.stage = stage;
                return;
            }
        }
    }
}

/* ===================== Tracing ===================== */

/// Print the node about to run when tracing is on
fn trace_node(cx: &mut ExecCx<'_>, frame: &Activation) -> Result<(), InterpError> {
    let level = cx.debug.trace_level();
    if level == 0 {
        return Ok(());
    }

    let (kind, node, stage) = match (frame.expr, frame.stmt) {
        (Some(e), _) => (cx.program.expr(e).name(), e.to_string(), frame.expr_stage),
        (None, Some(s)) => (cx.program.stmt(s).kind.name(), s.to_string(), frame.stage),
        (None, None) => return Ok(()),
    };

    if level >= 2 {
        writeln!(
            cx.output,
            "{} {} stage={} operands={}",
            kind,
            node,
            stage,
            frame.val_stack.len()
        )?;
    } else {
        writeln!(cx.output, "{} {}", kind, node)?;
    }
    tracing::trace!(kind, %node, stage, "dispatch");
    Ok(())
}
