//! Basic statement and expression tests

use serde_json::json;

use super::helpers::*;
use crate::interpreter::executor::{run_until_done, RunOutcome, Thread};

#[test]
fn test_print_literal() {
    assert_eq!(run_main(vec![print(int(42))]), "42\n");
}

#[test]
fn test_declare_assign_read() {
    // let x; x = 5; print(x + 1)
    let body = [declare("x", int(5)), vec![print(call("+", vec![var("x"), int(1)]))]].concat();
    assert_eq!(run_main(body), "6\n");
}

#[test]
fn test_assignment_yields_value() {
    // let x; print(x = 7)
    let body = vec![stmt(let_var("x")), print(assign("x", int(7))), print(var("x"))];
    assert_eq!(run_main(body), "7\n7\n");
}

#[test]
fn test_string_concatenation() {
    let body = vec![print(call("+", vec![string("step"), string("wise")]))];
    assert_eq!(run_main(body), "stepwise\n");
}

#[test]
fn test_user_function_returns_value() {
    let def = program(vec![
        function("add1", &["x"], vec![ret(call("+", vec![var("x"), int(1)]))]),
        function("main", &[], vec![print(call("add1", vec![int(41)]))]),
    ]);
    let mut harness = Harness::new(def);
    assert_eq!(harness.run().unwrap(), RunOutcome::Finished);
    assert_eq!(harness.output(), "42\n");
}

#[test]
fn test_arguments_evaluate_left_to_right() {
    let def = program(vec![
        function("say", &["x"], vec![print(var("x")), ret(var("x"))]),
        function(
            "main",
            &[],
            vec![print(call(
                "-",
                vec![call("say", vec![int(10)]), call("say", vec![int(3)])],
            ))],
        ),
    ]);
    let mut harness = Harness::new(def);
    harness.run().unwrap();
    assert_eq!(harness.output(), "10\n3\n7\n");
}

#[test]
fn test_cond_statement_branches() {
    let body = vec![
        if_stmt(
            call("<", vec![int(1), int(2)]),
            vec![print(string("yes"))],
            vec![print(string("no"))],
        ),
        if_stmt(boolean(false), vec![print(string("then"))], vec![]),
        print(string("end")),
    ];
    assert_eq!(run_main(body), "yes\nend\n");
}

#[test]
fn test_cond_expression() {
    let choose = |c: bool| json!({"t": "If", "cond": boolean(c), "then_e": int(1), "else_e": int(2)});
    let body = vec![print(choose(true)), print(choose(false))];
    assert_eq!(run_main(body), "1\n2\n");
}

#[test]
fn test_nested_blocks() {
    let body = vec![
        json!({"t": "Block", "body": [
            print(int(1)),
            {"t": "Block", "body": [print(int(2))]},
            {"t": "Block", "body": []}
        ]}),
        print(int(3)),
    ];
    assert_eq!(run_main(body), "1\n2\n3\n");
}

#[test]
fn test_deep_recursion_stays_off_the_host_stack() {
    // sum(n) = n == 0 ? 0 : n + sum(n - 1)
    let sum = function(
        "sum",
        &["n"],
        vec![if_stmt(
            call("==", vec![var("n"), int(0)]),
            vec![ret(int(0))],
            vec![ret(call(
                "+",
                vec![var("n"), call("sum", vec![call("-", vec![var("n"), int(1)])])],
            ))],
        )],
    );
    let def = program(vec![sum, function("main", &[], vec![print(call("sum", vec![int(5000)]))])]);

    let mut harness = Harness::new(def);
    harness.run().unwrap();
    assert_eq!(harness.output(), "12502500\n");
}

#[test]
fn test_entry_call_reuses_initial_activation() {
    let mut harness = Harness::new(main_program(vec![print(int(1))]));
    let thread = harness.entry_thread();

    assert_eq!(thread.depth(), 1);
    let frame = thread.current().unwrap();
    assert_eq!(frame.function, harness.program.entry());
    assert!(!frame.is_exhausted());
}

#[test]
fn test_compilation_unit_body() {
    let def = json!({"modules": [{"name": "m", "body": [print(string("hi")), print(int(2))]}]});
    let mut harness = Harness::new(def);
    let mut thread = Thread::for_module(&harness.program.modules()[0]);

    let outcome = harness.with(|cx| run_until_done(&mut thread, cx)).unwrap();
    assert_eq!(outcome, RunOutcome::Finished);
    assert!(thread.is_finished());
    assert_eq!(harness.output(), "hi\n2\n");
}

#[test]
fn test_empty_function_body() {
    let def = program(vec![
        function("noop", &[], vec![]),
        function("main", &[], vec![stmt(call("noop", vec![])), print(string("ok"))]),
    ]);
    let mut harness = Harness::new(def);
    harness.run().unwrap();
    assert_eq!(harness.output(), "ok\n");
}
