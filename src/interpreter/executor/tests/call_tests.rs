//! Tests for call resolution and entry

use serde_json::json;

use super::helpers::*;
use crate::interpreter::executor::{invoke, resolve, Slot, Thread, UserError};

#[test]
fn test_arity_mismatch() {
    let def = program(vec![
        function("add1", &["x"], vec![ret(var("x"))]),
        function("main", &[], vec![print(call("add1", vec![int(1), int(2)]))]),
    ]);
    let err = run_program_err(def);
    assert_eq!(
        err.user_kind(),
        Some(&UserError::ArityMismatch {
            name: "add1".to_string(),
            expected: 1,
            got: 2,
        })
    );
}

#[test]
fn test_unknown_function() {
    let err = run_main_err(vec![stmt(call("missing", vec![]))]);
    assert_eq!(
        err.user_kind(),
        Some(&UserError::Unresolved {
            name: "missing".to_string(),
            candidates: 0,
        })
    );
}

#[test]
fn test_ambiguous_function() {
    // `f` is visible both from main's own scope and from the module scope
    let main = json!({
        "name": "main",
        "params": [],
        "functions": [function("f", &[], vec![ret(int(1))])],
        "body": [print(call("f", vec![]))]
    });
    let def = program(vec![function("f", &[], vec![ret(int(2))]), main]);

    let err = run_program_err(def);
    assert_eq!(
        err.user_kind(),
        Some(&UserError::Unresolved {
            name: "f".to_string(),
            candidates: 2,
        })
    );
}

#[test]
fn test_nested_function_is_visible_only_inside() {
    let outer = json!({
        "name": "outer",
        "params": [],
        "functions": [function("helper", &[], vec![ret(int(5))])],
        "body": [ret(call("helper", vec![]))]
    });
    let def = program(vec![
        outer,
        function("main", &[], vec![print(call("outer", vec![])), print(call("helper", vec![]))]),
    ]);

    let mut harness = Harness::new(def);
    let err = harness.run().unwrap_err();
    assert_eq!(harness.output(), "5\n");
    assert_eq!(
        err.user_kind(),
        Some(&UserError::Unresolved {
            name: "helper".to_string(),
            candidates: 0,
        })
    );
}

#[test]
fn test_resolve_requires_exactly_one_match() {
    let def = program(vec![
        function("pair", &["a", "b"], vec![]),
        function("main", &[], vec![]),
    ]);
    let harness = Harness::new(def);
    let module_scope = harness.program.modules()[0].scope;

    assert!(resolve(&harness.program, module_scope, "pair").is_ok());
    assert!(resolve(&harness.program, harness.program.root_scope(), "print").is_ok());
    assert!(matches!(
        resolve(&harness.program, harness.program.root_scope(), "pair"),
        Err(UserError::Unresolved { candidates: 0, .. })
    ));
}

#[test]
fn test_non_callable_callee() {
    let err = run_main_err(vec![stmt(json!({"t": "Call", "callee": int(3), "args": []}))]);
    assert_eq!(err.user_kind(), Some(&UserError::NotCallable("int".to_string())));
}

#[test]
fn test_closure_is_fatal() {
    let closure = json!({"t": "Closure", "params": ["x"], "body": []});
    let err = run_main_err(vec![stmt(closure)]);
    assert_eq!(err.user_kind(), Some(&UserError::ClosureUnsupported));
}

#[test]
fn test_call_with_no_operands() {
    let mut harness = Harness::new(main_program(vec![]));
    let mut thread = Thread::idle(harness.program.root_scope());

    let err = harness.with(|cx| invoke(&mut thread, cx, 0)).unwrap_err();
    assert_eq!(err.user_kind(), Some(&UserError::EmptyCall));
}

#[test]
fn test_operand_underflow_is_internal() {
    let mut harness = Harness::new(main_program(vec![]));
    let mut thread = Thread::idle(harness.program.root_scope());
    thread.current_mut().unwrap().val_stack.push(Slot::int(1));

    let err = harness.with(|cx| invoke(&mut thread, cx, 3)).unwrap_err();
    assert!(err.is_internal());
}

#[test]
fn test_function_slot_calls_primitive_in_place() {
    let mut harness = Harness::new(main_program(vec![]));
    let plus = harness
        .program
        .visible_functions(harness.program.root_scope(), "+")[0];

    let mut thread = Thread::idle(harness.program.root_scope());
    let frame = thread.current_mut().unwrap();
    frame.val_stack.extend([Slot::Function(plus), Slot::int(2), Slot::int(3)]);

    harness.with(|cx| invoke(&mut thread, cx, 3)).unwrap();

    // primitives do not link an activation
    assert_eq!(thread.depth(), 1);
    assert_eq!(thread.current().unwrap().val_stack, vec![Slot::int(5)]);
}

#[test]
fn test_result_lands_on_caller_operand_stack() {
    let def = program(vec![
        function("two", &[], vec![ret(int(2))]),
        function("main", &[], vec![print(call("*", vec![call("two", vec![]), int(21)]))]),
    ]);
    let mut harness = Harness::new(def);
    harness.run().unwrap();
    assert_eq!(harness.output(), "42\n");
}

#[test]
fn test_call_through_bound_function() {
    let def = program(vec![
        function("twice", &["x"], vec![ret(call("*", vec![var("x"), int(2)]))]),
        function(
            "main",
            &[],
            vec![
                print(call_ref("twice", vec![int(21)])),
                print(call_ref("+", vec![int(1), int(2)])),
            ],
        ),
    ]);
    let mut harness = Harness::new(def);
    harness.run().unwrap();
    assert_eq!(harness.output(), "42\n3\n");
}

#[test]
fn test_bound_function_checks_arity() {
    let def = program(vec![
        function("twice", &["x"], vec![ret(var("x"))]),
        function("main", &[], vec![stmt(call_ref("twice", vec![]))]),
    ]);
    let err = run_program_err(def);
    assert_eq!(
        err.user_kind(),
        Some(&UserError::ArityMismatch {
            name: "twice".to_string(),
            expected: 1,
            got: 0,
        })
    );
}
