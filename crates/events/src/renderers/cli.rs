//! CLI renderer for build events.
//!
//! Renders lifecycle events to stderr for terminal display. Console output is
//! left alone because `Cairn::print` already writes it to stdout.
//! This module is allowed to use eprintln! as it's the output layer.

#![allow(clippy::print_stderr)]

use crate::bus::EventReceiver;
use crate::event::{Event, EventPayload};
use std::io::{self, IsTerminal};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// CLI renderer configuration.
#[derive(Debug, Clone)]
pub struct CliRendererConfig {
    /// Whether to use ANSI colors.
    pub colors: bool,
    /// Whether to show verbose output.
    pub verbose: bool,
}

impl Default for CliRendererConfig {
    fn default() -> Self {
        Self {
            colors: io::stderr().is_terminal(),
            verbose: false,
        }
    }
}

/// CLI renderer that outputs events to stderr.
#[derive(Debug)]
pub struct CliRenderer {
    config: CliRendererConfig,
}

impl CliRenderer {
    /// Create a new CLI renderer with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: CliRendererConfig::default(),
        }
    }

    /// Create a new CLI renderer with the given configuration.
    #[must_use]
    pub fn with_config(config: CliRendererConfig) -> Self {
        Self { config }
    }

    /// Run the renderer, consuming events from the receiver.
    pub async fn run(self, mut receiver: EventReceiver) {
        while let Some(event) = receiver.recv().await {
            self.render(&event);
        }
    }

    /// Render a single event.
    pub fn render(&self, event: &Event) {
        if let Some(line) = self.format(event) {
            eprintln!("{line}");
        }
    }

    /// Format an event as a display line, or `None` if it is not shown.
    #[must_use]
    pub fn format(&self, event: &Event) -> Option<String> {
        match &event.payload {
            EventPayload::BuildStarted { target } => self
                .config
                .verbose
                .then(|| format!("> Building '{target}'")),
            EventPayload::BuildComplete { target } => {
                Some(format!("> Build '{target}' {}", self.paint("complete", GREEN)))
            }
            EventPayload::BuildFailed { target, error } => Some(format!(
                "> Build '{target}' {}: {error}",
                self.paint("failed", RED)
            )),
            EventPayload::TargetExecutionStarted { target } => {
                Some(format!("> [{}] started", display_name(target.as_deref())))
            }
            EventPayload::TargetExecutionCompleted { target } => self.config.verbose.then(|| {
                format!(
                    "> [{}] {}",
                    display_name(target.as_deref()),
                    self.paint("completed", GREEN)
                )
            }),
            EventPayload::TargetExecutionFailed { target, error } => Some(format!(
                "> [{}] {}: {error}",
                display_name(target.as_deref()),
                self.paint("failed", RED)
            )),
            EventPayload::ConsoleOutput { .. } => None,
        }
    }

    fn paint(&self, text: &str, color: &str) -> String {
        if self.config.colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

impl Default for CliRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn display_name(target: Option<&str>) -> &str {
    target.unwrap_or("<anonymous>")
}
