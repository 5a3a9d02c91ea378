use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::interpreter::tree::{parse_program, FnBody, Program};
use crate::interpreter::{Interpreter, RunStatus};
use crate::signals;

#[derive(Parser)]
#[command(name = "stepwise")]
#[command(about = "Stepwise - a resumable, single-steppable tree-walking interpreter", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every compilation unit, then the entry function
    Run {
        /// Program file (JSON syntax tree)
        program: PathBuf,

        /// Start in the debugger before the first step
        #[arg(long)]
        interrupt: bool,

        /// Trace verbosity (1 = nodes, 2 = nodes with stages)
        #[arg(long)]
        trace: Option<u32>,

        /// Steps per time slice (0 = unbounded)
        #[arg(long)]
        timeslice: Option<u64>,

        /// Heap allocations between collections (0 = never collect)
        #[arg(long)]
        gc_threshold: Option<usize>,

        /// Load the program but do not interpret it
        #[arg(long)]
        no_run: bool,
    },

    /// Load and validate a program without running it
    Check {
        /// Program file (JSON syntax tree)
        program: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

/// Run the CLI by parsing process arguments
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli)
}

fn run_cli_with_args(cli: Cli) -> Result<()> {
    let config_path = cli.config.map(PathBuf::from);

    match cli.command {
        Commands::Run {
            program,
            interrupt,
            trace,
            timeslice,
            gc_threshold,
            no_run,
        } => {
            let config = Config::builder()
                .config_path(config_path)
                .run(no_run.then_some(false))
                .interrupt(interrupt.then_some(true))
                .trace_level(trace)
                .timeslice(timeslice)
                .gc_threshold(gc_threshold)
                .build()?;
            let program = load_program_file(&program)?;

            let mut interpreter = Interpreter::new(&program, config.interpreter);
            signals::spawn_interrupt_listener(interpreter.interrupt_handle())
                .context("Failed to install interrupt listener")?;

            let stdin = io::stdin();
            let mut input = stdin.lock();
            let mut output = io::stdout().lock();
            let status = interpreter
                .run(&mut input, &mut output)
                .context("Interpretation aborted")?;
            output.flush()?;

            tracing::debug!(?status, "run finished");
            if status == RunStatus::Quit {
                eprintln!("Quit from debugger");
            }
            std::process::exit(0);
        }

        Commands::Check { program: path } => {
            let program = load_program_file(&path)?;
            let functions = program
                .functions()
                .iter()
                .filter(|f| matches!(f.body, FnBody::User(_)))
                .count();
            println!("✓ {} is valid", path.display());
            println!("  Modules: {}", program.modules().len());
            println!("  Functions: {}", functions);
            match program.entry() {
                Some(entry) => println!("  Entry: {}", program.function(entry).name),
                None => println!("  Entry: (none)"),
            }
        }

        Commands::Config => {
            let config = Config::builder().config_path(config_path).build()?;
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn load_program_file(path: &Path) -> Result<Program> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read program {}", path.display()))?;
    parse_program(&source).with_context(|| format!("Failed to load program {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_flags() {
        let cli = Cli::try_parse_from([
            "stepwise",
            "run",
            "prog.json",
            "--trace",
            "2",
            "--gc-threshold",
            "16",
            "--no-run",
        ])
        .unwrap();

        let Commands::Run {
            program,
            interrupt,
            trace,
            timeslice,
            gc_threshold,
            no_run,
        } = cli.command
        else {
            panic!("expected run command");
        };
        assert_eq!(program, PathBuf::from("prog.json"));
        assert!(!interrupt);
        assert_eq!(trace, Some(2));
        assert_eq!(timeslice, None);
        assert_eq!(gc_threshold, Some(16));
        assert!(no_run);
    }
}
