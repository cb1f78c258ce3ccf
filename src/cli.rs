// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `flowdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "flowdag",
    version,
    about = "Schedule and execute a component flow as a dependency graph.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the flow payload (JSON).
    #[arg(long, value_name = "PATH")]
    pub flow: String,

    /// Path to the engine config file (TOML).
    ///
    /// Default: `Flowdag.toml` in the current working directory. A missing
    /// file means default settings.
    #[arg(long, value_name = "PATH", default_value = "Flowdag.toml")]
    pub config: String,

    /// Input text; one run batch per occurrence.
    #[arg(long = "input", value_name = "TEXT")]
    pub inputs: Vec<String>,

    /// Vertex id or display name to report (repeatable).
    ///
    /// If omitted, the flow's output vertices are reported.
    #[arg(long = "output", value_name = "ID")]
    pub outputs: Vec<String>,

    /// Session id handed to every vertex that takes one.
    #[arg(long, value_name = "ID")]
    pub session_id: Option<String>,

    /// Run only this vertex and everything downstream of it.
    #[arg(long, value_name = "ID", conflicts_with = "stop")]
    pub start: Option<String>,

    /// Run only this vertex and everything it depends on.
    #[arg(long, value_name = "ID")]
    pub stop: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FLOWDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the vertices and layers, but don't build
    /// anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the graph in Graphviz DOT format and exit.
    #[arg(long)]
    pub dot: bool,
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

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
