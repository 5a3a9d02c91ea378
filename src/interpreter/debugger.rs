//! Debug controller
//!
//! Decides whether the run loop keeps going and talks to the operator when it
//! stops. The loop checks [`DebugController::is_interrupted`] once per step;
//! anything outside the loop (a signal listener, a test) may only set the
//! interrupt flag through an [`InterruptHandle`].

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const PROMPT: &str = "(interpreter) ";

const USAGE: &str = "\
commands:
  help, ?            show this message
  quit, exit         stop the program
  continue           resume execution
  step               execute one node, then stop again
  trace [N|on|off]   set the trace level (no argument toggles)
an empty line repeats the last command";

/* ===================== Interrupt Flag ===================== */

/// Shared, set-only view of the interrupt flag
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    pub fn interrupt(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/* ===================== Commands ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Continue,
    Step,
    Trace(TraceArg),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceArg {
    Toggle,
    Set(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    Unknown(String),
    BadTraceLevel(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandName {
    Help,
    Quit,
    Continue,
    Step,
    Trace,
}

/// Checked in order; the first name the input is a prefix of wins
const COMMANDS: &[(&str, CommandName)] = &[
    ("help", CommandName::Help),
    ("?", CommandName::Help),
    ("quit", CommandName::Quit),
    ("exit", CommandName::Quit),
    ("continue", CommandName::Continue),
    ("step", CommandName::Step),
    ("trace", CommandName::Trace),
];

/// Parse one command line
pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Err(ParseError::Empty);
    };
    let word = word.to_lowercase();

    let name = COMMANDS
        .iter()
        .find(|(name, _)| name.starts_with(word.as_str()))
        .map(|(_, command)| *command)
        .ok_or_else(|| ParseError::Unknown(word.clone()))?;

    Ok(match name {
        CommandName::Help => Command::Help,
        CommandName::Quit => Command::Quit,
        CommandName::Continue => Command::Continue,
        CommandName::Step => Command::Step,
        CommandName::Trace => Command::Trace(parse_trace_arg(words.next())?),
    })
}

fn parse_trace_arg(arg: Option<&str>) -> Result<TraceArg, ParseError> {
    let Some(arg) = arg else {
        return Ok(TraceArg::Toggle);
    };
    match arg.to_lowercase().as_str() {
        "on" | "true" => Ok(TraceArg::Set(1)),
        "off" | "false" => Ok(TraceArg::Set(0)),
        other => other
            .parse()
            .map(TraceArg::Set)
            .map_err(|_| ParseError::BadTraceLevel(arg.to_string())),
    }
}

/// What the run loop does after a debugger session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    Run,
    Quit,
}

/* ===================== Controller ===================== */

#[derive(Debug, Default)]
pub struct DebugController {
    interrupt: InterruptHandle,
    single_step: bool,
    trace_level: u32,
    last_command: Option<String>,
}

impl DebugController {
    pub fn new(trace_level: u32, interrupted: bool) -> Self {
        let controller = DebugController {
            trace_level,
            ..Default::default()
        };
        if interrupted {
            controller.interrupt.interrupt();
        }
        controller
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupt.is_set()
    }

    pub fn is_single_step(&self) -> bool {
        self.single_step
    }

    pub fn trace_level(&self) -> u32 {
        self.trace_level
    }

    /// Called after every step; a pending single step stops the loop again
    pub fn node_completed(&mut self) {
        if self.single_step {
            self.single_step = false;
            self.interrupt.interrupt();
        }
    }

    /// Prompt for commands until one resumes or quits
    pub fn interact(&mut self, input: &mut dyn BufRead, output: &mut dyn Write) -> io::Result<Resume> {
        self.interrupt.clear();
        self.single_step = false;

        loop {
            write!(output, "{}", PROMPT)?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                tracing::debug!("debugger input closed, resuming");
                return Ok(Resume::Run);
            }

            let line = match line.trim() {
                "" => match &self.last_command {
                    Some(last) => last.clone(),
                    None => {
                        writeln!(output, "{}", USAGE)?;
                        continue;
                    }
                },
                text => text.to_string(),
            };

            match parse_command(&line) {
                Ok(command) => {
                    self.last_command = Some(line);
                    if let Some(resume) = self.apply(command, output)? {
                        return Ok(resume);
                    }
                }
                Err(ParseError::BadTraceLevel(arg)) => {
                    writeln!(output, "invalid trace level '{}'", arg)?;
                }
                Err(_) => {
                    writeln!(output, "unknown command")?;
                    writeln!(output, "{}", USAGE)?;
                }
            }
        }
    }

    fn apply(&mut self, command: Command, output: &mut dyn Write) -> io::Result<Option<Resume>> {
        match command {
            Command::Help => {
                writeln!(output, "{}", USAGE)?;
                Ok(None)
            }
            Command::Quit => Ok(Some(Resume::Quit)),
            Command::Continue => Ok(Some(Resume::Run)),
            Command::Step => {
                self.single_step = true;
                Ok(Some(Resume::Run))
            }
            Command::Trace(arg) => {
                self.trace_level = match arg {
                    TraceArg::Toggle if self.trace_level == 0 => 1,
                    TraceArg::Toggle => 0,
                    TraceArg::Set(level) => level,
                };
                writeln!(output, "tracing level set to {}", self.trace_level)?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use maplit::hashmap;

    use super::*;

    fn session(controller: &mut DebugController, script: &str) -> (Resume, String) {
        let mut input = script.as_bytes();
        let mut output = Vec::new();
        let resume = controller.interact(&mut input, &mut output).unwrap();
        (resume, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_prefix_matching_follows_priority_order() {
        let expected = hashmap! {
            "c" => Command::Continue,
            "CONT" => Command::Continue,
            "e" => Command::Quit,
            "q" => Command::Quit,
            "s" => Command::Step,
            "h" => Command::Help,
            "?" => Command::Help,
            "t" => Command::Trace(TraceArg::Toggle),
        };
        for (input, command) in expected {
            assert_eq!(parse_command(input), Ok(command), "input {:?}", input);
        }
        assert_eq!(parse_command("bogus"), Err(ParseError::Unknown("bogus".to_string())));
        assert_eq!(parse_command("   "), Err(ParseError::Empty));
    }

    #[test]
    fn test_trace_arguments() {
        assert_eq!(parse_command("trace on"), Ok(Command::Trace(TraceArg::Set(1))));
        assert_eq!(parse_command("trace FALSE"), Ok(Command::Trace(TraceArg::Set(0))));
        assert_eq!(parse_command("trace 3"), Ok(Command::Trace(TraceArg::Set(3))));
        assert_eq!(
            parse_command("trace loud"),
            Err(ParseError::BadTraceLevel("loud".to_string()))
        );
    }

    #[test]
    fn test_continue_clears_interrupt() {
        let mut controller = DebugController::new(0, true);
        let (resume, output) = session(&mut controller, "c\n");

        assert_eq!(resume, Resume::Run);
        assert!(!controller.is_interrupted());
        assert!(output.starts_with(PROMPT));
    }

    #[test]
    fn test_empty_line_repeats_last_command() {
        let mut controller = DebugController::new(0, true);
        let (resume, output) = session(&mut controller, "trace\n\nc\n");

        assert_eq!(resume, Resume::Run);
        assert!(output.contains("tracing level set to 1"));
        assert!(output.contains("tracing level set to 0"));
        assert_eq!(controller.trace_level(), 0);
    }

    #[test]
    fn test_empty_line_without_history_prints_usage() {
        let mut controller = DebugController::new(0, true);
        let (resume, output) = session(&mut controller, "\ncontinue\n");

        assert_eq!(resume, Resume::Run);
        assert!(output.contains("commands:"));
        assert_eq!(output.matches(PROMPT).count(), 2);
        assert_eq!(controller.last_command.as_deref(), Some("continue"));
    }

    #[test]
    fn test_unknown_command_reprompts_without_side_effects() {
        let mut controller = DebugController::new(2, true);
        let (resume, output) = session(&mut controller, "bogus\nquit\n");

        assert_eq!(resume, Resume::Quit);
        assert!(output.contains("unknown command"));
        assert!(output.contains("commands:"));
        assert_eq!(output.matches(PROMPT).count(), 2);
        assert_eq!(controller.trace_level(), 2);
    }

    #[test]
    fn test_unknown_command_is_not_repeated() {
        let mut controller = DebugController::new(0, true);
        let (resume, _) = session(&mut controller, "help\nbogus\n");
        assert_eq!(resume, Resume::Run);
        assert_eq!(controller.last_command.as_deref(), Some("help"));
    }

    #[test]
    fn test_step_rearms_after_one_node() {
        let mut controller = DebugController::new(0, true);
        let (resume, _) = session(&mut controller, "step\n");

        assert_eq!(resume, Resume::Run);
        assert!(controller.is_single_step());
        assert!(!controller.is_interrupted());

        controller.node_completed();
        assert!(controller.is_interrupted());
        assert!(!controller.is_single_step());
    }

    #[test]
    fn test_end_of_input_resumes() {
        let mut controller = DebugController::new(0, true);
        let (resume, _) = session(&mut controller, "");

        assert_eq!(resume, Resume::Run);
        assert!(!controller.is_interrupted());
    }

    #[test]
    fn test_handle_interrupts_controller() {
        let controller = DebugController::default();
        let handle = controller.interrupt_handle();
        assert!(!controller.is_interrupted());

        handle.interrupt();
        assert!(controller.is_interrupted());
    }
}
