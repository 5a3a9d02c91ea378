//! Test helpers for executor tests
//!
//! Programs are built as JSON with small constructors, pushed through the
//! loader (serialize, then parse) and run against in-memory input and output.

use std::io::Cursor;

use serde_json::{json, Value};

use crate::interpreter::debugger::DebugController;
use crate::interpreter::executor::{
    invoke, run_until_done, start, ExecCx, InterpError, RunOutcome, Slot, Thread,
};
use crate::interpreter::tree::{parse_program, Program};

/* ===================== Program builders ===================== */

pub fn int(v: i64) -> Value {
    json!({"t": "Int", "v": v})
}

pub fn boolean(v: bool) -> Value {
    json!({"t": "Bool", "v": v})
}

pub fn string(v: &str) -> Value {
    json!({"t": "Str", "v": v})
}

pub fn var(name: &str) -> Value {
    json!({"t": "Var", "name": name})
}

pub fn let_var(name: &str) -> Value {
    json!({"t": "Let", "name": name})
}

pub fn assign(name: &str, value: Value) -> Value {
    json!({"t": "Assign", "name": name, "value": value})
}

/// Call a function by name, resolved at run time
pub fn call(name: &str, args: Vec<Value>) -> Value {
    json!({"t": "Call", "callee": {"t": "Name", "name": name}, "args": args})
}

/// Call a function bound when the program is loaded
pub fn call_ref(name: &str, args: Vec<Value>) -> Value {
    json!({"t": "Call", "callee": {"t": "FnRef", "name": name}, "args": args})
}

pub fn stmt(expr: Value) -> Value {
    json!({"t": "Expr", "expr": expr})
}

pub fn print(expr: Value) -> Value {
    stmt(call("print", vec![expr]))
}

/// `let name; name = value` as two statements
pub fn declare(name: &str, value: Value) -> Vec<Value> {
    vec![stmt(let_var(name)), stmt(assign(name, value))]
}

pub fn if_stmt(cond: Value, then_s: Vec<Value>, else_s: Vec<Value>) -> Value {
    json!({"t": "If", "cond": cond, "then_s": then_s, "else_s": else_s})
}

pub fn while_loop(cond: Value, body: Vec<Value>) -> Value {
    json!({"t": "While", "cond": cond, "body": body})
}

pub fn do_while(cond: Value, body: Vec<Value>) -> Value {
    json!({"t": "While", "cond": cond, "body": body, "do_while": true})
}

pub fn forall(index: &str, iterator: Value, body: Vec<Value>) -> Value {
    json!({"t": "For", "indices": [index], "iterators": [iterator], "body": body})
}

/// Multi-way select; an arm with no cases is the fallback
pub fn select(selector: Value, arms: Vec<(Vec<Value>, Vec<Value>)>) -> Value {
    let whens: Vec<Value> = arms
        .into_iter()
        .map(|(cases, body)| json!({"cases": cases, "body": body}))
        .collect();
    json!({"t": "Select", "selector": selector, "whens": whens})
}

pub fn label(name: &str) -> Value {
    json!({"t": "Label", "name": name})
}

pub fn goto(name: &str) -> Value {
    json!({"t": "Goto", "label": name})
}

pub fn ret(value: Value) -> Value {
    json!({"t": "Return", "value": value})
}

pub fn function(name: &str, params: &[&str], body: Vec<Value>) -> Value {
    json!({"name": name, "params": params, "body": body})
}

/// A single-module program holding `functions`
pub fn program(functions: Vec<Value>) -> Value {
    json!({"modules": [{"name": "test", "functions": functions}]})
}

/// A program whose `main` runs `body`
pub fn main_program(body: Vec<Value>) -> Value {
    program(vec![function("main", &[], body)])
}

/* ===================== Harness ===================== */

pub struct Harness {
    pub program: Program,
    pub debug: DebugController,
    pub input: Cursor<Vec<u8>>,
    pub output: Vec<u8>,
    pub gc_threshold: usize,
}

impl Harness {
    pub fn new(def: Value) -> Self {
        let program = parse_program(&def.to_string()).expect("program failed to load");
        Harness {
            program,
            debug: DebugController::default(),
            input: Cursor::new(Vec::new()),
            output: Vec::new(),
            gc_threshold: 0,
        }
    }

    /// Debugger commands read when the run is interrupted
    pub fn with_input(mut self, input: &str) -> Self {
        self.input = Cursor::new(input.as_bytes().to_vec());
        self
    }

    pub fn with<R>(&mut self, f: impl FnOnce(&mut ExecCx<'_>) -> R) -> R {
        let mut cx = ExecCx {
            program: &self.program,
            debug: &mut self.debug,
            input: &mut self.input,
            output: &mut self.output,
            gc_threshold: self.gc_threshold,
        };
        f(&mut cx)
    }

    /// A context that has just called the entry function
    pub fn entry_thread(&mut self) -> Thread {
        let entry = self.program.entry().expect("program has no entry");
        let mut thread = Thread::idle(self.program.root_scope());
        self.with(|cx| start(&mut thread, cx, entry))
            .expect("entry call failed");
        thread
    }

    /// A context that has called the entry function with `args`
    pub fn entry_thread_with(&mut self, mut thread: Thread, args: Vec<Slot>) -> Thread {
        let entry = self.program.entry().expect("program has no entry");
        let nargs = args.len() + 1;
        let frame = thread.current_mut().expect("idle context");
        frame.val_stack.push(Slot::Function(entry));
        frame.val_stack.extend(args);
        self.with(|cx| invoke(&mut thread, cx, nargs))
            .expect("entry call failed");
        thread
    }

    /// Run the entry function to completion
    pub fn run(&mut self) -> Result<RunOutcome, InterpError> {
        let mut thread = self.entry_thread();
        self.with(|cx| run_until_done(&mut thread, cx))
    }

    pub fn output(&self) -> String {
        String::from_utf8(self.output.clone()).expect("output is utf-8")
    }
}

/// Run `main` and return everything it printed
pub fn run_main(body: Vec<Value>) -> String {
    let mut harness = Harness::new(main_program(body));
    let outcome = harness.run().expect("run failed");
    assert_eq!(outcome, RunOutcome::Finished);
    harness.output()
}

/// Run `main` and return the error it stopped with
pub fn run_main_err(body: Vec<Value>) -> InterpError {
    run_program_err(main_program(body))
}

pub fn run_program_err(def: Value) -> InterpError {
    let mut harness = Harness::new(def);
    harness.run().expect_err("run should fail")
}
