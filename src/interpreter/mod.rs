//! Interpreter driver
//!
//! Runs a loaded [`Program`]: one execution context per compilation unit, in
//! declaration order, each to completion; then one more context that calls
//! the entry function. Contexts are driven one at a time in time slices.

pub mod debugger;
pub mod executor;
pub mod tree;

use std::io::{BufRead, Write};

use crate::config::InterpreterConfig;
use debugger::{DebugController, InterruptHandle};
use executor::{run_slice, run_until_done, start, ExecCx, InterpError, RunOutcome, Thread};
use tree::Program;

pub use executor::{NodeRef, UserError};
pub use tree::{load_program, parse_program, TreeError};

/// How a whole run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every context ran to completion
    Completed,
    /// The operator quit from the debugger
    Quit,
    /// Running was disabled by configuration
    Skipped,
}

pub struct Interpreter<'p> {
    program: &'p Program,
    config: InterpreterConfig,
    debug: DebugController,
    threads: Vec<Thread>,
}

impl<'p> Interpreter<'p> {
    pub fn new(program: &'p Program, config: InterpreterConfig) -> Self {
        let debug = DebugController::new(config.trace_level, config.interrupt);
        Interpreter {
            program,
            config,
            debug,
            threads: Vec::new(),
        }
    }

    /// Handle for asynchronous interrupt sources
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.debug.interrupt_handle()
    }

    /// Contexts created so far, in creation order
    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    /// Run every compilation unit, then the entry function
    pub fn run(&mut self, input: &mut dyn BufRead, output: &mut dyn Write) -> Result<RunStatus, InterpError> {
        if !self.config.run {
            tracing::debug!("interpreter disabled by configuration");
            return Ok(RunStatus::Skipped);
        }

        let program = self.program;
        let mut cx = ExecCx {
            program,
            debug: &mut self.debug,
            input,
            output,
            gc_threshold: self.config.gc_threshold,
        };

        for module in program.modules() {
            tracing::debug!(module = %module.name, "running compilation unit");
            self.threads.push(Thread::for_module(module));
            let thread = self.threads.last_mut().ok_or_else(|| {
                InterpError::internal(NodeRef::None, "compilation unit context vanished")
            })?;
            if drive(thread, &mut cx, self.config.timeslice)? == RunOutcome::Quit {
                return Ok(RunStatus::Quit);
            }
            tracing::debug!(module = %module.name, steps = thread.steps, "compilation unit finished");
        }

        if let Some(entry) = program.entry() {
            let name = &program.function(entry).name;
            tracing::debug!(entry = %name, "running entry point");
            let mut thread = Thread::idle(program.root_scope());
            start(&mut thread, &mut cx, entry)?;
            self.threads.push(thread);
            let thread = self.threads.last_mut().ok_or_else(|| {
                InterpError::internal(NodeRef::Function(entry), "entry context vanished")
            })?;
            if drive(thread, &mut cx, self.config.timeslice)? == RunOutcome::Quit {
                return Ok(RunStatus::Quit);
            }
            tracing::debug!(entry = %name, steps = thread.steps, "entry point finished");
        }

        Ok(RunStatus::Completed)
    }
}

/// Run one context to completion, a time slice at a time
fn drive(thread: &mut Thread, cx: &mut ExecCx<'_>, timeslice: u64) -> Result<RunOutcome, InterpError> {
    if timeslice == 0 {
        return run_until_done(thread, cx);
    }
    loop {
        match run_slice(thread, cx, timeslice)? {
            RunOutcome::Suspended => {
                tracing::trace!(steps = thread.steps, depth = thread.depth(), "time slice exhausted");
            }
            outcome => return Ok(outcome),
        }
    }
}
