//! Build lifecycle events for cairn.
//!
//! This crate defines the typed event schema emitted while targets run and the
//! [`NotificationBus`] that delivers those events to listeners and async
//! subscribers. Renderers turn events into terminal or JSON output.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                         cairn-events                          │
//! │  ┌──────────────┐  ┌──────────────────┐  ┌─────────────────┐  │
//! │  │ Event Schema │  │ NotificationBus  │  │ Renderers       │  │
//! │  │ (typed)      │  │ (listeners +     │  │ (CLI / JSON)    │  │
//! │  │              │  │  broadcast)      │  │                 │  │
//! │  └──────────────┘  └──────────────────┘  └─────────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use cairn_events::{EventKind, NotificationBus};
//!
//! let bus = NotificationBus::new();
//! let id = bus.add_listener(EventKind::BuildStarted, |event| {
//!     assert_eq!(event.target(), Some("all"));
//! });
//! bus.build_started("all");
//! bus.remove_listener(EventKind::BuildStarted, id);
//! ```

pub mod bus;
pub mod event;
pub mod renderers;

// Re-exports for convenience
pub use bus::{EventReceiver, Listener, ListenerId, NotificationBus};
pub use event::{Event, EventKind, EventPayload, SharedError};
pub use renderers::{CliRenderer, CliRendererConfig, JsonRenderer};
