//! Event type definitions for build lifecycle notifications.
//!
//! Every event carries an id and a timestamp plus a typed payload. There is one
//! payload variant per [`EventKind`], so each kind always has the right shape.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Error shared between the failing call site and every event that reports it.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// A build lifecycle event.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: Uuid,
    /// When the event was emitted.
    pub timestamp: DateTime<Utc>,
    /// The event payload.
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl Event {
    /// Wrap a payload into a new event stamped with the current time.
    #[must_use]
    pub fn new(payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            payload,
        }
    }

    /// The kind of this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// Name of the target this event is attributed to, if any.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::BuildStarted { target }
            | EventPayload::BuildComplete { target }
            | EventPayload::BuildFailed { target, .. } => Some(target),
            EventPayload::TargetExecutionStarted { target }
            | EventPayload::TargetExecutionCompleted { target }
            | EventPayload::TargetExecutionFailed { target, .. }
            | EventPayload::ConsoleOutput { target, .. } => target.as_deref(),
        }
    }

    /// The error carried by failure events.
    #[must_use]
    pub fn error(&self) -> Option<&SharedError> {
        match &self.payload {
            EventPayload::BuildFailed { error, .. }
            | EventPayload::TargetExecutionFailed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Event kinds that listeners can register for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    /// A top-level build was requested.
    BuildStarted,
    /// A top-level build finished successfully.
    BuildComplete,
    /// A top-level build failed.
    BuildFailed,
    /// An action is about to be invoked.
    TargetExecutionStarted,
    /// An action settled successfully.
    TargetExecutionCompleted,
    /// An action settled with an error.
    TargetExecutionFailed,
    /// Text was printed through the facade.
    ConsoleOutput,
}

impl EventKind {
    /// All kinds, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::BuildStarted,
        Self::BuildComplete,
        Self::BuildFailed,
        Self::TargetExecutionStarted,
        Self::TargetExecutionCompleted,
        Self::TargetExecutionFailed,
        Self::ConsoleOutput,
    ];

    /// The wire name of the kind (`buildStarted`, `consoleOutput`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BuildStarted => "buildStarted",
            Self::BuildComplete => "buildComplete",
            Self::BuildFailed => "buildFailed",
            Self::TargetExecutionStarted => "targetExecutionStarted",
            Self::TargetExecutionCompleted => "targetExecutionCompleted",
            Self::TargetExecutionFailed => "targetExecutionFailed",
            Self::ConsoleOutput => "consoleOutput",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown event kind: {s}"))
    }
}

/// Typed payload, one variant per [`EventKind`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EventPayload {
    /// A top-level build was requested.
    BuildStarted {
        /// Requested target name.
        target: String,
    },
    /// A top-level build finished successfully.
    BuildComplete {
        /// Requested target name.
        target: String,
    },
    /// A top-level build failed.
    BuildFailed {
        /// Requested target name.
        target: String,
        /// The error the build failed with.
        #[serde(serialize_with = "serialize_error")]
        error: SharedError,
    },
    /// An action is about to be invoked.
    TargetExecutionStarted {
        /// Reporting name of the action.
        target: Option<String>,
    },
    /// An action settled successfully.
    TargetExecutionCompleted {
        /// Reporting name of the action.
        target: Option<String>,
    },
    /// An action settled with an error.
    TargetExecutionFailed {
        /// Reporting name of the action.
        target: Option<String>,
        /// The error the action failed with.
        #[serde(serialize_with = "serialize_error")]
        error: SharedError,
    },
    /// Text was printed through the facade.
    ConsoleOutput {
        /// Printed content.
        content: String,
        /// Target the output is attributed to.
        target: Option<String>,
    },
}

impl EventPayload {
    /// The kind of this payload.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::BuildStarted { .. } => EventKind::BuildStarted,
            Self::BuildComplete { .. } => EventKind::BuildComplete,
            Self::BuildFailed { .. } => EventKind::BuildFailed,
            Self::TargetExecutionStarted { .. } => EventKind::TargetExecutionStarted,
            Self::TargetExecutionCompleted { .. } => EventKind::TargetExecutionCompleted,
            Self::TargetExecutionFailed { .. } => EventKind::TargetExecutionFailed,
            Self::ConsoleOutput { .. } => EventKind::ConsoleOutput,
        }
    }
}

fn serialize_error<S: Serializer>(error: &SharedError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("boom")
        }
    }

    impl std::error::Error for Boom {}

    #[test]
    fn test_event_creation() {
        let event = Event::new(EventPayload::BuildStarted {
            target: "all".to_string(),
        });
        assert!(!event.id.is_nil());
        assert_eq!(event.kind(), EventKind::BuildStarted);
        assert_eq!(event.target(), Some("all"));
        assert!(event.error().is_none());
    }

    #[test]
    fn test_event_serialization_uses_camel_case_kind() {
        let event = Event::new(EventPayload::TargetExecutionStarted {
            target: Some("compile".to_string()),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "targetExecutionStarted");
        assert_eq!(json["target"], "compile");
        assert!(json["id"].is_string());
    }

    #[test]
    fn test_failure_event_serializes_error_message() {
        let error: SharedError = Arc::new(Boom);
        let event = Event::new(EventPayload::BuildFailed {
            target: "all".to_string(),
            error,
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"buildFailed\""));
        assert!(json.contains("\"boom\""));
        assert_eq!(event.error().map(ToString::to_string).as_deref(), Some("boom"));
    }

    #[test]
    fn test_anonymous_action_has_no_target() {
        let event = Event::new(EventPayload::TargetExecutionCompleted { target: None });
        assert_eq!(event.target(), None);
    }

    #[test]
    fn test_event_kind_round_trips_through_str() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
        assert!("nope".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_payload_kind_matches_serialized_tag() {
        let payload = EventPayload::ConsoleOutput {
            content: "hi".to_string(),
            target: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], payload.kind().as_str());
    }
}
