//! Target resolution and execution for cairn.
//!
//! A build is a tree of [`Target`]s: names resolved through a registry,
//! composites that run their elements serially or in parallel, and actions
//! that do the actual work. [`Cairn`] owns the registry and a
//! [`NotificationBus`] and reports every step of a build on it.
//!
//! ```rust
//! use cairn_core::{Cairn, Context, EventKind, Target, targets};
//! use std::sync::{Arc, Mutex};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> cairn_core::Result<()> {
//! let order = Arc::new(Mutex::new(Vec::new()));
//! let record = |name: &'static str| {
//!     let order = Arc::clone(&order);
//!     Target::action(move |_, _| {
//!         order.lock().unwrap().push(name);
//!         async { Ok(()) }
//!     })
//! };
//!
//! let cairn = Cairn::builder()
//!     .with_target("all", targets![true, "a", "b"])
//!     .with_target("a", record("a"))
//!     .with_target("b", record("b"))
//!     .build();
//!
//! cairn.add_listener(EventKind::BuildComplete, |event| {
//!     assert_eq!(event.target(), Some("all"));
//! });
//! cairn.execute_target("all", Context::none()).await?;
//! assert_eq!(*order.lock().unwrap(), ["a", "b"]);
//! # Ok(())
//! # }
//! ```

mod builder;
mod cairn;
pub mod config;
pub mod engine;
pub mod error;
pub mod fs;
pub mod process;
pub mod target;
pub mod targets_file;

pub use builder::CairnBuilder;
pub use cairn::{Cairn, Registry};
pub use config::CairnConfig;
pub use error::{Error, ProcessFailure, Result};
pub use target::{Action, ActionFuture, Composite, Context, ExecutionMode, Target};

// Re-exports so callers do not need a direct cairn-events dependency
pub use cairn_events::{Event, EventKind, EventPayload, EventReceiver, ListenerId, SharedError};

/// Target run when no name is given on the command line.
pub const DEFAULT_TARGET: &str = "default";
