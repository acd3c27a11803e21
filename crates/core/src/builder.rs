//! Builder for configuring a [`Cairn`].

use crate::cairn::{Cairn, Registry};
use crate::config::CairnConfig;
use crate::target::Target;
use cairn_events::NotificationBus;

/// Builder for creating a [`Cairn`] instance.
///
/// Use [`Cairn::builder()`] to create a new builder.
#[derive(Debug, Default)]
pub struct CairnBuilder {
    registry: Registry,
    config: CairnConfig,
    event_capacity: Option<usize>,
}

impl CairnBuilder {
    /// Create a builder with no targets and the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a target under `name`, replacing any previous binding.
    #[must_use]
    pub fn with_target(mut self, name: impl Into<String>, target: impl Into<Target>) -> Self {
        self.registry.insert(name.into(), target.into());
        self
    }

    /// Register every entry of `targets`.
    #[must_use]
    pub fn with_targets<I, K>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = (K, Target)>,
        K: Into<String>,
    {
        self.registry
            .extend(targets.into_iter().map(|(name, target)| (name.into(), target)));
        self
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: CairnConfig) -> Self {
        self.config = config;
        self
    }

    /// Set how many events a lagging subscriber may fall behind by.
    #[must_use]
    pub const fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = Some(capacity);
        self
    }

    /// Freeze the registry and create the instance.
    #[must_use]
    pub fn build(self) -> Cairn {
        let bus = self
            .event_capacity
            .map_or_else(NotificationBus::new, NotificationBus::with_capacity);
        tracing::debug!(targets = self.registry.len(), "Building cairn");
        Cairn::from_parts(self.registry, self.config, bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_bindings_replace_earlier_ones() {
        let cairn = CairnBuilder::new()
            .with_target("a", "b")
            .with_target("a", false)
            .build();
        assert!(matches!(cairn.registry().get("a"), Some(Target::Absent)));
    }

    #[test]
    fn test_with_targets_and_config() {
        let cairn = CairnBuilder::new()
            .with_targets([("x", Target::from(true)), ("y", Target::name("x"))])
            .with_config(CairnConfig::default().with_max_buffer_size(64))
            .with_event_capacity(8)
            .build();
        assert_eq!(cairn.target_names(), ["x", "y"]);
        assert_eq!(cairn.config().max_buffer_size, 64);
    }
}
