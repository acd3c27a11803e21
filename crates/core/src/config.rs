//! Facade configuration.

use serde::{Deserialize, Serialize};

/// Default ceiling for captured command output, in bytes.
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 200 * 1024;

/// Configuration shared by every execution of a [`Cairn`](crate::Cairn).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CairnConfig {
    /// Suppress writing `print` output to stdout.
    #[serde(default)]
    pub quiet: bool,
    /// Ceiling in bytes for captured command output.
    #[serde(default = "default_max_buffer_size", alias = "max_buffer_size")]
    pub max_buffer_size: usize,
}

fn default_max_buffer_size() -> usize {
    DEFAULT_MAX_BUFFER_SIZE
}

impl Default for CairnConfig {
    fn default() -> Self {
        Self {
            quiet: false,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
        }
    }
}

impl CairnConfig {
    /// Return a copy with `quiet` set.
    #[must_use]
    pub const fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Return a copy with a different output ceiling.
    #[must_use]
    pub const fn with_max_buffer_size(mut self, max_buffer_size: usize) -> Self {
        self.max_buffer_size = max_buffer_size;
        self
    }
}
