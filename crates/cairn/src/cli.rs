use crate::tracing::{LogLevel, TracingConfig, TracingFormat};
use cairn_core::CairnConfig;
use cairn_core::targets_file::DEFAULT_FILE_NAME;
use clap::Parser;
use miette::{Diagnostic, Report};
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// A target failed
pub const EXIT_BUILD: i32 = 1;
/// CLI, configuration or targets file error
pub const EXIT_CLI: i32 = 2;

/// Command-line arguments for the `cairn` binary
#[derive(Parser, Debug)]
#[command(name = "cairn")]
#[command(about = "Run build targets declared in a Cairnfile")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// Target to run
    #[arg(default_value = cairn_core::DEFAULT_TARGET)]
    pub target: String,

    /// Path to the targets file
    #[arg(short = 'f', long, env = "CAIRN_FILE", default_value = DEFAULT_FILE_NAME)]
    pub file: PathBuf,

    /// Do not echo target output to stdout
    #[arg(short, long, env = "CAIRN_QUIET")]
    pub quiet: bool,

    /// Maximum bytes captured from a command's output
    #[arg(long, env = "CAIRN_MAX_BUFFER_SIZE")]
    pub max_buffer_size: Option<usize>,

    /// List registered targets and exit
    #[arg(long)]
    pub list: bool,

    /// Set logging level
    #[arg(short = 'l', long, default_value = "warn", value_enum)]
    pub level: LogLevel,

    /// Log output format
    #[arg(long, value_enum)]
    pub log_format: Option<TracingFormat>,

    /// Emit build events as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Show every lifecycle event
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Tracing settings implied by the flags. `--json` switches logs to JSON
    /// unless a format is given explicitly.
    #[must_use]
    pub fn tracing_config(&self) -> TracingConfig {
        let format = self.log_format.unwrap_or(if self.json {
            TracingFormat::Json
        } else {
            TracingFormat::Compact
        });
        TracingConfig {
            format,
            level: self.level.into(),
            ..TracingConfig::default()
        }
    }

    /// Apply command-line overrides on top of the file configuration.
    ///
    /// JSON mode is always quiet: console output travels inside events.
    #[must_use]
    pub fn apply_overrides(&self, mut config: CairnConfig) -> CairnConfig {
        if self.quiet || self.json {
            config.quiet = true;
        }
        if let Some(max_buffer_size) = self.max_buffer_size {
            config.max_buffer_size = max_buffer_size;
        }
        config
    }
}

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// CLI or configuration error (exit code 2)
    #[error("Configuration error: {message}")]
    #[diagnostic(code(cairn::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// A target failed (exit code 1)
    #[error("Build '{target}' failed")]
    #[diagnostic(code(cairn::cli::build))]
    Build {
        /// Requested target
        target: String,
        /// What went wrong
        #[source]
        #[diagnostic_source]
        source: cairn_core::Error,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a build failure
    #[must_use]
    pub fn build(target: impl Into<String>, source: cairn_core::Error) -> Self {
        Self::Build {
            target: target.into(),
            source,
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Build { .. } => EXIT_BUILD,
    }
}

/// Render error appropriately based on JSON flag
#[allow(clippy::print_stdout, clippy::print_stderr)]
pub fn render_error(err: CliError, json_mode: bool) {
    if json_mode {
        let envelope = serde_json::json!({
            "status": "error",
            "code": match err {
                CliError::Config { .. } => "config",
                CliError::Build { .. } => "build",
            },
            "message": err.to_string(),
            "cause": std::error::Error::source(&err).map(ToString::to_string),
        });
        println!("{envelope}");
    } else {
        let report = Report::new(err);
        eprintln!("{report:?}");
        // Ensure output is flushed before potential process exit
        let _ = io::stderr().flush();
    }
}

/// Parse the process arguments, exiting with clap's usage message on error.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
