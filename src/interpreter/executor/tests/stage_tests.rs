//! Tests for per-node stage sequences
//!
//! These step a context one node at a time and inspect the activation
//! between steps.

use super::helpers::*;
use crate::interpreter::executor::{step, NodeKey, Slot, Thread};
use crate::interpreter::tree::{FnBody, Program, StmtId, StmtKind};

fn main_body(program: &Program) -> StmtId {
    let entry = program.entry().unwrap();
    match program.function(entry).body {
        FnBody::User(Some(body)) => body,
        _ => panic!("main has no body"),
    }
}

fn step_once(harness: &mut Harness, thread: &mut Thread) {
    harness.with(|cx| step(thread, cx)).unwrap();
}

#[test]
fn test_while_stage_sequence() {
    let mut harness = Harness::new(main_program(vec![
        while_loop(boolean(false), vec![]),
        label("end"),
    ]));
    let mut thread = harness.entry_thread();
    let while_stmt = main_body(&harness.program);

    step_once(&mut harness, &mut thread);
    let frame = thread.current().unwrap();
    assert_eq!((frame.stage, frame.expr.is_some()), (1, false));

    step_once(&mut harness, &mut thread);
    let frame = thread.current().unwrap();
    assert_eq!((frame.stage, frame.expr.is_some()), (2, true));

    step_once(&mut harness, &mut thread);
    let frame = thread.current().unwrap();
    assert_eq!(frame.expr, None);
    assert_eq!(frame.val_stack, vec![Slot::bool(false)]);

    step_once(&mut harness, &mut thread);
    let frame = thread.current().unwrap();
    assert_eq!(frame.stage, 0);
    assert!(frame.val_stack.is_empty());
    assert_ne!(frame.stmt, Some(while_stmt));
    assert!(matches!(
        harness.program.stmt(frame.stmt.unwrap()).kind,
        StmtKind::Label { .. }
    ));
}

#[test]
fn test_forall_stage_sequence() {
    let mut harness = Harness::new(main_program(vec![forall(
        "k",
        call("range", vec![int(0), int(1)]),
        vec![],
    )]));
    let mut thread = harness.entry_thread();
    let for_stmt = main_body(&harness.program);

    let mut stages = Vec::new();
    while !thread.is_finished() {
        step_once(&mut harness, &mut thread);
        if let Some(frame) = thread.current() {
            if frame.stmt == Some(for_stmt) && frame.expr.is_none() {
                stages.push(frame.stage);
            }
        }
    }

    // start, valid, check, body, next, advance, then check once more
    assert_eq!(stages, vec![1, 2, 3, 4, 5, 6, 3]);
}

#[test]
fn test_unknown_statement_stage_is_internal() {
    let mut harness = Harness::new(main_program(vec![while_loop(boolean(false), vec![])]));
    let mut thread = harness.entry_thread();
    thread.current_mut().unwrap().stage = 7;

    let err = harness.with(|cx| step(&mut thread, cx)).unwrap_err();
    assert!(err.is_internal());
}

#[test]
fn test_unknown_expression_stage_is_internal() {
    let mut harness = Harness::new(main_program(vec![print(int(1))]));
    let mut thread = harness.entry_thread();
    let StmtKind::Expr(call) = harness.program.stmt(main_body(&harness.program)).kind else {
        panic!("expected an expression statement");
    };

    let frame = thread.current_mut().unwrap();
    frame.stage = 1;
    frame.expr = Some(call);
    frame.expr_stage = 42;

    let err = harness.with(|cx| step(&mut thread, cx)).unwrap_err();
    assert!(err.is_internal());
}

#[test]
fn test_completed_expressions_are_memoized() {
    let mut harness = Harness::new(main_program(vec![
        stmt(call("+", vec![int(1), int(2)])),
        label("end"),
    ]));
    let mut thread = harness.entry_thread();
    let StmtKind::Expr(sum) = harness.program.stmt(main_body(&harness.program)).kind else {
        panic!("expected an expression statement");
    };

    loop {
        let frame = thread.current().unwrap();
        let at_label = frame
            .stmt
            .is_some_and(|s| matches!(harness.program.stmt(s).kind, StmtKind::Label { .. }));
        if at_label {
            assert_eq!(frame.env.get(NodeKey::Expr(sum)), Some(&Slot::int(3)));
            break;
        }
        step_once(&mut harness, &mut thread);
    }
}

#[test]
fn test_return_hands_value_to_caller() {
    let def = program(vec![
        function("one", &[], vec![ret(int(1))]),
        function("main", &[], vec![print(call("one", vec![]))]),
    ]);
    let mut harness = Harness::new(def);
    let mut thread = harness.entry_thread();

    let mut entered = false;
    loop {
        step_once(&mut harness, &mut thread);
        match thread.depth() {
            2 => entered = true,
            1 if entered => break,
            _ => {}
        }
    }

    let caller = thread.current().unwrap();
    assert_eq!(caller.val_stack.last(), Some(&Slot::int(1)));
    assert_eq!(caller.function, harness.program.entry());
}
