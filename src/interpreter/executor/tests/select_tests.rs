//! Tests for multi-way select

use super::helpers::*;

fn arms() -> Vec<(Vec<serde_json::Value>, Vec<serde_json::Value>)> {
    vec![
        (vec![int(1)], vec![print(string("one"))]),
        (vec![int(2)], vec![print(string("two"))]),
        (vec![], vec![print(string("other"))]),
    ]
}

#[test]
fn test_select_matches_arm() {
    let body = vec![select(int(2), arms()), print(string("after"))];
    assert_eq!(run_main(body), "two\nafter\n");
}

#[test]
fn test_select_falls_back_to_arm_without_cases() {
    let body = vec![select(int(9), arms()), print(string("after"))];
    assert_eq!(run_main(body), "other\nafter\n");
}

#[test]
fn test_select_without_match() {
    let body = vec![
        select(int(9), vec![(vec![int(1)], vec![print(string("one"))])]),
        print(string("after")),
    ];
    assert_eq!(run_main(body), "after\n");
}

#[test]
fn test_select_arm_with_several_cases() {
    let body = vec![select(
        string("b"),
        vec![
            (vec![string("a"), string("b")], vec![print(string("a or b"))]),
            (vec![string("b")], vec![print(string("b only"))]),
        ],
    )];
    assert_eq!(run_main(body), "a or b\n");
}

#[test]
fn test_select_as_last_statement_of_loop_body() {
    let body = [
        declare("i", int(0)),
        vec![
            while_loop(
                call("<", vec![var("i"), int(3)]),
                vec![
                    stmt(assign("i", call("+", vec![var("i"), int(1)]))),
                    select(var("i"), arms()),
                ],
            ),
            print(string("done")),
        ],
    ]
    .concat();
    assert_eq!(run_main(body), "one\ntwo\nother\ndone\n");
}

#[test]
fn test_selector_evaluated_once() {
    let def = program(vec![
        function("pick", &[], vec![print(string("pick")), ret(int(2))]),
        function("main", &[], vec![select(call("pick", vec![]), arms())]),
    ]);
    let mut harness = Harness::new(def);
    harness.run().unwrap();
    assert_eq!(harness.output(), "pick\ntwo\n");
}

#[test]
fn test_select_arm_with_empty_body() {
    let body = vec![
        select(int(1), vec![(vec![int(1)], vec![]), (vec![], vec![print(string("other"))])]),
        print(string("after")),
    ];
    assert_eq!(run_main(body), "after\n");
}
