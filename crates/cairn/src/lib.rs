//! cairn - run build targets declared in a `Cairnfile.toml`.
//!
//! The binary is a thin layer over [`cairn_core`]: it loads the targets file,
//! applies command-line overrides, wires a renderer onto the notification bus
//! and maps the build result onto an exit code.

/// CLI argument parsing, errors and exit codes.
pub mod cli;
/// Tracing and logging configuration.
pub mod tracing;

use crate::cli::{Cli, CliError};
use cairn_core::{Cairn, Context, EventKind};
use cairn_events::{CliRenderer, CliRendererConfig, JsonRenderer};
use ::tracing::Instrument;
use std::io::Write;
use std::sync::Arc;

/// Run the CLI with parsed arguments.
///
/// # Errors
///
/// Returns [`CliError::Config`] if tracing or the targets file cannot be set
/// up, and [`CliError::Build`] if the requested target fails.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    tracing::init_tracing(cli.tracing_config())
        .map_err(|e| CliError::config(format!("Failed to initialize tracing: {e}")))?;

    let (file_config, registry) = cairn_core::targets_file::load(&cli.file).map_err(|e| {
        CliError::config_with_help(
            e.to_string(),
            format!(
                "Create {} or point to a targets file with --file",
                cli.file.display()
            ),
        )
    })?;

    let cairn = Cairn::builder()
        .with_targets(registry)
        .with_config(cli.apply_overrides(file_config))
        .build();

    if cli.list {
        list_targets(&cairn);
        return Ok(());
    }

    attach_renderer(&cairn, &cli);

    ::tracing::debug!(file = %cli.file.display(), target_name = %cli.target, "Running target");

    cairn
        .execute_target(&cli.target, Context::none())
        .instrument(crate::build_span!(cli.target))
        .await
        .map_err(|e| CliError::build(&cli.target, e))
}

fn attach_renderer(cairn: &Cairn, cli: &Cli) {
    if cli.json {
        let renderer = Arc::new(JsonRenderer::new());
        for kind in EventKind::ALL {
            let renderer = Arc::clone(&renderer);
            cairn.add_listener(kind, move |event| renderer.render(event));
        }
    } else {
        let renderer = Arc::new(CliRenderer::with_config(CliRendererConfig {
            verbose: cli.verbose,
            ..CliRendererConfig::default()
        }));
        for kind in EventKind::ALL {
            let renderer = Arc::clone(&renderer);
            cairn.add_listener(kind, move |event| renderer.render(event));
        }
    }
}

fn list_targets(cairn: &Cairn) {
    let mut stdout = std::io::stdout().lock();
    for name in cairn.target_names() {
        // Ignore broken pipes (e.g. `cairn --list | head`)
        let _ = writeln!(stdout, "{name}");
    }
}
