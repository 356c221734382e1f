// src/cli.rs

//! CLI argument parsing using `clap`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, ValueEnum};

use crate::types::TaskName;

/// Command-line arguments for `sitepipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sitepipe",
    version,
    about = "Build, watch and serve the assets of a static site.",
    long_about = None
)]
pub struct CliArgs {
    /// What to run: `default`, `build`, `build:<task>`, `watch`, `clean`
    /// or `run:server`.
    #[arg(value_name = "COMMAND", default_value = "default")]
    pub command: Command,

    /// Path to the config file (TOML).
    ///
    /// Default: `Sitepipe.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SITEPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate the config, print the path table and build plan, run nothing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// A named build command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Full build, then watch and serve.
    Default,
    /// Full build in order.
    Build,
    /// A single task.
    BuildTask(TaskName),
    /// Watch sources and rebuild the bound task on change.
    Watch,
    /// Remove the build root.
    Clean,
    /// Same as `default`.
    RunServer,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "default" => Ok(Command::Default),
            "build" => Ok(Command::Build),
            "watch" => Ok(Command::Watch),
            "clean" => Ok(Command::Clean),
            "run:server" => Ok(Command::RunServer),
            other => match other.strip_prefix("build:") {
                Some(task) => task.parse().map(Command::BuildTask),
                None => Err(format!(
                    "unknown command: {other} (expected default, build, build:<task>, watch, clean or run:server)"
                )),
            },
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Default => f.write_str("default"),
            Command::Build => f.write_str("build"),
            Command::BuildTask(task) => write!(f, "build:{task}"),
            Command::Watch => f.write_str("watch"),
            Command::Clean => f.write_str("clean"),
            Command::RunServer => f.write_str("run:server"),
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
