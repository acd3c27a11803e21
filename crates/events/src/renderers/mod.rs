//! Output renderers for build events.

mod cli;
mod json;

pub use cli::{CliRenderer, CliRendererConfig};
pub use json::JsonRenderer;
