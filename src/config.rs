//! Configuration loading
//!
//! Layers, lowest priority first:
//! 1. built-in defaults
//! 2. a TOML file: `--config`, else `STEPWISE_CONFIG_PATH`, else `./stepwise.toml` if present
//! 3. environment variables such as `STEPWISE__INTERPRETER__TRACE_LEVEL`
//! 4. explicit overrides set on the builder (command-line flags)

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG_FILE: &str = "stepwise.toml";
const CONFIG_PATH_VAR: &str = "STEPWISE_CONFIG_PATH";
const ENV_PREFIX: &str = "STEPWISE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub interpreter: InterpreterConfig,
}

/// Knobs read by the interpreter driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Run the program at all
    pub run: bool,
    /// Enter the debugger before the first step
    pub interrupt: bool,
    pub trace_level: u32,
    /// Steps per time slice; 0 runs each context in one go
    pub timeslice: u64,
    /// Heap allocations between collections; 0 disables collection
    pub gc_threshold: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            run: true,
            interrupt: false,
            trace_level: 0,
            timeslice: 0,
            gc_threshold: 1024,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    read_env: Option<bool>,
    run: Option<bool>,
    interrupt: Option<bool>,
    trace_level: Option<u32>,
    timeslice: Option<u64>,
    gc_threshold: Option<usize>,
}

impl ConfigBuilder {
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Whether environment variables are consulted (default: yes)
    pub fn read_env(mut self, read_env: bool) -> Self {
        self.read_env = Some(read_env);
        self
    }

    pub fn run(mut self, run: Option<bool>) -> Self {
        self.run = run;
        self
    }

    pub fn interrupt(mut self, interrupt: Option<bool>) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn trace_level(mut self, level: Option<u32>) -> Self {
        self.trace_level = level;
        self
    }

    pub fn timeslice(mut self, timeslice: Option<u64>) -> Self {
        self.timeslice = timeslice;
        self
    }

    pub fn gc_threshold(mut self, threshold: Option<usize>) -> Self {
        self.gc_threshold = threshold;
        self
    }

    pub fn build(self) -> Result<Config> {
        let read_env = self.read_env.unwrap_or(true);
        let path = self.config_path.clone().or_else(|| {
            read_env
                .then(|| env::var_os(CONFIG_PATH_VAR).map(PathBuf::from))
                .flatten()
        });

        let mut builder = config::Config::builder();
        builder = match &path {
            Some(path) => builder.add_source(config::File::from(path.as_path()).required(true)),
            None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };
        if read_env {
            builder = builder.add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        if let Some(run) = self.run {
            builder = builder.set_override("interpreter.run", run)?;
        }
        if let Some(interrupt) = self.interrupt {
            builder = builder.set_override("interpreter.interrupt", interrupt)?;
        }
        if let Some(level) = self.trace_level {
            builder = builder.set_override("interpreter.trace_level", i64::from(level))?;
        }
        if let Some(timeslice) = self.timeslice {
            builder = builder.set_override("interpreter.timeslice", to_i64(timeslice)?)?;
        }
        if let Some(threshold) = self.gc_threshold {
            builder = builder.set_override("interpreter.gc_threshold", to_i64(threshold)?)?;
        }

        let config: Config = builder
            .build()
            .with_context(|| match &path {
                Some(path) => format!("Failed to load configuration from {}", path.display()),
                None => "Failed to load configuration".to_string(),
            })?
            .try_deserialize()
            .context("Invalid configuration")?;

        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }
}

fn to_i64<T: TryInto<i64>>(value: T) -> Result<i64> {
    value
        .try_into()
        .map_err(|_| anyhow::anyhow!("configuration value out of range"))
}
