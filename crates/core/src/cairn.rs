//! The [`Cairn`] facade.

use crate::DEFAULT_TARGET;
use crate::builder::CairnBuilder;
use crate::config::CairnConfig;
use crate::engine::Executor;
use crate::error::{Error, Result};
use crate::target::{Context, Target};
use cairn_events::{Event, EventKind, EventReceiver, ListenerId, NotificationBus};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Named targets available to a [`Cairn`].
pub type Registry = HashMap<String, Target>;

/// Build runner: owns the target registry, the configuration and the
/// notification bus.
///
/// Cloning is cheap; every clone shares the same registry and bus. Actions
/// receive a clone so they can run sub-targets, print, and call the
/// filesystem and process helpers.
///
/// ```rust
/// use cairn_core::{Cairn, Context, Target};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> cairn_core::Result<()> {
/// let cairn = Cairn::builder()
///     .with_target("hello", Target::action(|cairn, _| async move {
///         cairn.print("hello", Some("hello"));
///         Ok(())
///     }))
///     .with_target("default", "hello")
///     .build();
///
/// cairn.execute_target("default", Context::none()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Cairn {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,
    config: CairnConfig,
    bus: NotificationBus,
}

impl Cairn {
    /// Start configuring a new instance.
    #[must_use]
    pub fn builder() -> CairnBuilder {
        CairnBuilder::new()
    }

    pub(crate) fn from_parts(registry: Registry, config: CairnConfig, bus: NotificationBus) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                config,
                bus,
            }),
        }
    }

    /// Run a registered target as a build.
    ///
    /// Emits `buildStarted` first and exactly one of `buildComplete` or
    /// `buildFailed` last. The error carried by `buildFailed` is the one
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `name` (or any name it reaches) is not
    /// registered, or the first error raised while running it.
    pub async fn execute_target(&self, name: &str, context: Context) -> Result<()> {
        tracing::info!(target_name = %name, "Build started");
        self.inner.bus.build_started(name);

        let result = Executor::new(self.clone(), context)
            .run(&Target::name(name), None)
            .await;

        match result {
            Ok(()) => {
                tracing::info!(target_name = %name, "Build complete");
                self.inner.bus.build_complete(name);
                Ok(())
            }
            Err(error) => {
                tracing::info!(target_name = %name, error = %error, "Build failed");
                self.inner.bus.build_failed(name, Arc::new(error.clone()));
                Err(error)
            }
        }
    }

    /// Run a build whose name arrives as untyped data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Classification`] without emitting any event if `name`
    /// is not a JSON string; otherwise as [`Cairn::execute_target`].
    pub async fn execute_value(&self, name: &serde_json::Value, context: Context) -> Result<()> {
        let Some(name) = name.as_str() else {
            return Err(Error::classification("target name must be a string"));
        };
        self.execute_target(name, context).await
    }

    /// Run a target value directly, without build events.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while running `target`.
    pub async fn execute(&self, target: &Target, context: Context) -> Result<()> {
        Executor::new(self.clone(), context).run(target, None).await
    }

    /// Run the target named by the first positional process argument, or
    /// `"default"`.
    ///
    /// # Errors
    ///
    /// As [`Cairn::execute_target`].
    pub async fn run_args(&self, context: Context) -> Result<()> {
        self.run_args_from(std::env::args(), context).await
    }

    /// Like [`Cairn::run_args`] with explicit arguments. The first item is the
    /// program name; arguments starting with `-` are skipped, and so is the
    /// value following one of the `cairn` binary's value-taking flags
    /// (`-f`/`--file`, `-l`/`--level`, `--log-format`, `--max-buffer-size`).
    ///
    /// # Errors
    ///
    /// As [`Cairn::execute_target`].
    pub async fn run_args_from<I, S>(&self, args: I, context: Context) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = target_from_args(args);
        self.execute_target(&name, context).await
    }

    /// Register a listener for one event kind.
    pub fn add_listener<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.inner.bus.add_listener(kind, listener)
    }

    /// Unregister a listener. Returns whether it was registered.
    pub fn remove_listener(&self, kind: EventKind, id: ListenerId) -> bool {
        self.inner.bus.remove_listener(kind, id)
    }

    /// Unregister every listener of every kind.
    pub fn remove_all_listeners(&self) {
        self.inner.bus.remove_all_listeners();
    }

    /// Stream every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        self.inner.bus.subscribe()
    }

    /// Emit `consoleOutput` and, unless quiet, write `content` to stdout.
    pub fn print(&self, content: &str, target: Option<&str>) {
        self.inner.bus.console_output(content, target);
        if !self.inner.config.quiet {
            let mut stdout = std::io::stdout().lock();
            // A closed stdout must not fail the build.
            let _ = writeln!(stdout, "{content}");
        }
    }

    /// Run a shell command with the configured output ceiling and return its
    /// stdout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Process`] as described in [`crate::process::run_command`].
    pub async fn exec(&self, command: &str) -> Result<String> {
        crate::process::run_command(command, self.inner.config.max_buffer_size).await
    }

    /// Create a directory and its parents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on failure.
    pub async fn mkdirp(&self, path: impl AsRef<Path>) -> Result<()> {
        crate::fs::mkdirp(path.as_ref()).await
    }

    /// Remove a file or directory tree; a missing path is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on failure.
    pub async fn rmrf(&self, path: impl AsRef<Path>) -> Result<()> {
        crate::fs::rmrf(path.as_ref()).await
    }

    /// Registered target names, sorted.
    #[must_use]
    pub fn target_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.inner.registry.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn has_target(&self, name: &str) -> bool {
        self.inner.registry.contains_key(name)
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &CairnConfig {
        &self.inner.config
    }

    /// The notification bus.
    #[must_use]
    pub fn bus(&self) -> &NotificationBus {
        &self.inner.bus
    }

    /// The target registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }
}

impl std::fmt::Debug for Cairn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cairn")
            .field("targets", &self.target_names())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// Flags of the `cairn` binary whose value is passed as the next argument.
const VALUE_FLAGS: [&str; 6] = [
    "-f",
    "--file",
    "-l",
    "--level",
    "--log-format",
    "--max-buffer-size",
];

fn target_from_args<I, S>(args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut args = args.into_iter().skip(1);
    while let Some(arg) = args.next() {
        let arg = arg.as_ref();
        if VALUE_FLAGS.iter().any(|flag| *flag == arg) {
            args.next();
        } else if !arg.starts_with('-') {
            return arg.to_string();
        }
    }
    DEFAULT_TARGET.to_string()
}
