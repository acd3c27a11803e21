//! `Cairnfile.toml` loader.
//!
//! ```toml
//! [config]
//! quiet = false
//!
//! [targets]
//! default = "build"
//! build = [true, "clean", "compile"]
//! clean = { rmrf = "dist" }
//! compile = [{ mkdirp = "dist" }, { run = "cc -o dist/app main.c" }]
//! ```
//!
//! Booleans, strings and arrays map onto [`Target`] the same way literal
//! values do. A table must hold exactly one built-in step: `run`, `mkdirp`,
//! `rmrf` or `print`.

use crate::cairn::Registry;
use crate::config::CairnConfig;
use crate::error::{Error, Result};
use crate::target::Target;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// Conventional targets file name.
pub const DEFAULT_FILE_NAME: &str = "Cairnfile.toml";

const STEPS: [&str; 4] = ["run", "mkdirp", "rmrf", "print"];

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TargetsFile {
    #[serde(default)]
    config: CairnConfig,
    #[serde(default)]
    targets: toml::Table,
}

/// Read and parse a targets file.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read, otherwise as [`parse`].
pub fn load(path: &Path) -> Result<(CairnConfig, Registry)> {
    tracing::debug!(path = %path.display(), "Loading targets file");
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::io(e, Some(path.to_path_buf()), "read targets file"))?;
    parse(&content)
}

/// Parse targets file content.
///
/// # Errors
///
/// Returns [`Error::Config`] for malformed TOML or an invalid `[config]` table
/// and [`Error::Classification`] for a target value of unsupported shape.
pub fn parse(content: &str) -> Result<(CairnConfig, Registry)> {
    let file: TargetsFile =
        toml::from_str(content).map_err(|e| Error::config(e.message().to_string()))?;

    let mut registry = Registry::with_capacity(file.targets.len());
    for (name, value) in file.targets {
        let target = classify(&name, value)?;
        registry.insert(name, target);
    }
    Ok((file.config, registry))
}

fn classify(name: &str, value: toml::Value) -> Result<Target> {
    match value {
        toml::Value::Boolean(flag) => Ok(Target::from(flag)),
        toml::Value::String(reference) => Ok(Target::Name(reference)),
        toml::Value::Array(items) => items
            .into_iter()
            .map(|item| classify(name, item))
            .collect::<Result<Vec<_>>>()
            .map(Target::sequence),
        toml::Value::Table(table) => step(name, table),
        other => Err(Error::classification(format!(
            "target '{name}': unsupported target type: {}",
            other.type_str()
        ))),
    }
}

fn step(name: &str, table: toml::Table) -> Result<Target> {
    let mut entries = table.into_iter();
    let (Some((key, value)), None) = (entries.next(), entries.next()) else {
        return Err(Error::classification(format!(
            "target '{name}': a table must contain exactly one of {}",
            STEPS.join(", ")
        )));
    };
    let found = value.type_str();
    let toml::Value::String(argument) = value else {
        return Err(Error::classification(format!(
            "target '{name}': `{key}` expects a string, found {found}"
        )));
    };

    let owner: Arc<str> = Arc::from(name);
    let argument: Arc<str> = Arc::from(argument);
    let target = match key.as_str() {
        "run" => Target::action(move |cairn, _| {
            let owner = Arc::clone(&owner);
            let command = Arc::clone(&argument);
            async move {
                let stdout = cairn.exec(&command).await?;
                let stdout = stdout.trim_end();
                if !stdout.is_empty() {
                    cairn.print(stdout, Some(&*owner));
                }
                Ok(())
            }
        }),
        "mkdirp" => Target::action(move |cairn, _| {
            let path = Arc::clone(&argument);
            async move { cairn.mkdirp(&*path).await }
        }),
        "rmrf" => Target::action(move |cairn, _| {
            let path = Arc::clone(&argument);
            async move { cairn.rmrf(&*path).await }
        }),
        "print" => Target::action(move |cairn, _| {
            cairn.print(&argument, Some(&*owner));
            async { Ok(()) }
        }),
        unknown => {
            return Err(Error::classification(format!(
                "target '{name}': unknown step `{unknown}`, expected one of {}",
                STEPS.join(", ")
            )));
        }
    };
    Ok(target)
}
