//! Error types for target resolution and execution.
//!
//! [`Error`] is `Clone`: the same value is handed to `targetExecutionFailed` /
//! `buildFailed` listeners and returned to the caller, so every non-`Clone`
//! source is held behind an `Arc`.

use cairn_events::SharedError;
use miette::Diagnostic;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Main error type for cairn operations
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum Error {
    /// A value does not describe a target, or a top-level name is not a string
    #[error("Classification error: {message}")]
    #[diagnostic(code(cairn::target::classification))]
    Classification {
        /// What was wrong with the value
        message: String,
    },

    /// A named target is not in the registry
    #[error("Target '{name}' does not exist")]
    #[diagnostic(
        code(cairn::target::not_found),
        help("Run with --list to see the registered targets")
    )]
    NotFound {
        /// The missing registry key
        name: String,
    },

    /// A name resolves back to itself through the registry
    #[error("Target cycle detected: {}", chain.join(" -> "))]
    #[diagnostic(
        code(cairn::target::cycle),
        help("Break the cycle by removing one of the references")
    )]
    Cycle {
        /// Names in resolution order, ending with the repeated name
        chain: Vec<String>,
    },

    /// An action returned an error
    #[error(transparent)]
    #[diagnostic(code(cairn::action::failed))]
    Action(SharedError),

    /// An action panicked, either while being invoked or while running
    #[error("Target '{target}' panicked: {message}")]
    #[diagnostic(code(cairn::action::panicked))]
    ActionPanicked {
        /// Reporting name of the action
        target: String,
        /// The panic payload, if it was a string
        message: String,
    },

    /// A command exited unsuccessfully or could not be run
    #[error("Command `{command}` {reason}")]
    #[diagnostic(code(cairn::process::failed))]
    Process {
        /// The command line that was run
        command: String,
        /// How it failed
        reason: ProcessFailure,
        /// Tail of captured stderr
        stderr: String,
    },

    /// A filesystem operation failed
    #[error("I/O error during {operation}: {source}")]
    #[diagnostic(
        code(cairn::io::error),
        help("Check file permissions and ensure the path is valid")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: Arc<std::io::Error>,
        /// The path where the I/O error occurred, if applicable
        path: Option<Box<Path>>,
        /// Description of the operation that failed
        operation: String,
    },

    /// Invalid configuration or targets file
    #[error("Configuration error: {message}")]
    #[diagnostic(code(cairn::config::invalid))]
    Config {
        /// The error message describing the configuration issue
        message: String,
    },
}

/// Why a command failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessFailure {
    /// The process exited with a non-zero code
    ExitCode(i32),
    /// The process was terminated by a signal
    Signal(i32),
    /// The process wrote more than the allowed number of bytes
    OutputLimit(usize),
    /// The process could not be spawned or awaited
    Spawn(String),
}

impl fmt::Display for ProcessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExitCode(code) => write!(f, "failed with exit code {code}"),
            Self::Signal(signal) => write!(f, "was terminated by signal {signal}"),
            Self::OutputLimit(limit) => write!(f, "exceeded the output limit of {limit} bytes"),
            Self::Spawn(reason) => write!(f, "could not be started: {reason}"),
        }
    }
}

impl Error {
    /// Create a classification error
    pub fn classification(message: impl Into<String>) -> Self {
        Self::Classification {
            message: message.into(),
        }
    }

    /// Create a "target does not exist" error
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create a cycle error from the resolution chain
    pub fn cycle(chain: Vec<String>) -> Self {
        Self::Cycle { chain }
    }

    /// Wrap an arbitrary error raised by an action
    pub fn action<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Action(Arc::new(error))
    }

    /// Create an action error from a plain message
    pub fn message(message: impl Into<String>) -> Self {
        Self::Action(Arc::new(ActionMessage(message.into())))
    }

    /// Create a process error
    pub fn process(
        command: impl Into<String>,
        reason: ProcessFailure,
        stderr: impl Into<String>,
    ) -> Self {
        Self::Process {
            command: command.into(),
            reason,
            stderr: stderr.into(),
        }
    }

    /// Create an I/O error with context
    pub fn io(source: std::io::Error, path: Option<PathBuf>, operation: impl Into<String>) -> Self {
        Self::Io {
            source: Arc::new(source),
            path: path.map(PathBuf::into_boxed_path),
            operation: operation.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether two errors are the same failure (shared sources compared by identity).
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Action(a), Self::Action(b)) => Arc::ptr_eq(a, b),
            (Self::Io { source: a, .. }, Self::Io { source: b, .. }) => Arc::ptr_eq(a, b),
            _ => self.to_string() == other.to_string(),
        }
    }
}

#[derive(Debug)]
struct ActionMessage(String);

impl fmt::Display for ActionMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ActionMessage {}

/// Result type alias for cairn operations
pub type Result<T> = std::result::Result<T, Error>;
