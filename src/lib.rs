pub mod cli;
pub mod config;
pub mod interpreter;
pub mod signals;

// Re-export main types
pub use config::{Config, InterpreterConfig};
pub use interpreter::{Interpreter, RunStatus};
