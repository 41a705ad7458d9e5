//! Per-subscription options.

use crate::core::ChangeTrigger;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options controlling a single subscription.
///
/// Provides a fluent interface; the defaults wait indefinitely, include
/// the whole subtree, and wake on any kind of change.
///
/// # Examples
///
/// ```rust
/// use regwatch::prelude::*;
/// use std::time::Duration;
///
/// let options = SubscribeOptions::new()
///     .with_duration(Duration::from_secs(30))
///     .include_subtree(false)
///     .with_triggers(ChangeTrigger::VALUE | ChangeTrigger::ATTRIBUTES);
///
/// assert!(!options.is_unbounded());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscribeOptions {
    /// Maximum time the subscription may stay blocked; zero means forever
    #[serde(rename = "duration_ms", with = "millis")]
    pub duration: Duration,
    /// Report changes to descendant keys as well
    pub include_subtree: bool,
    /// Kinds of change that wake the subscription
    pub triggers: ChangeTrigger,
}

impl SubscribeOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            duration: Duration::ZERO,
            include_subtree: true,
            triggers: ChangeTrigger::ANY,
        }
    }

    /// Bound the subscription to `duration`; `Duration::ZERO` waits until cancelled.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Whether changes to descendant keys also wake the subscription.
    pub fn include_subtree(mut self, include: bool) -> Self {
        self.include_subtree = include;
        self
    }

    /// Set the kinds of change that wake the subscription.
    pub fn with_triggers(mut self, triggers: ChangeTrigger) -> Self {
        self.triggers = triggers;
        self
    }

    /// True when the subscription only ends through cancellation.
    pub fn is_unbounded(&self) -> bool {
        self.duration.is_zero()
    }

    /// Parse options from a TOML table.
    ///
    /// Missing fields take their defaults.
    ///
    /// ```toml
    /// duration_ms = 5000
    /// include_subtree = false
    /// triggers = "VALUE | SECURITY"
    /// ```
    #[cfg(feature = "toml")]
    pub fn from_toml_str(input: &str) -> crate::error::Result<Self> {
        toml::from_str(input).map_err(|e| crate::error::WatchError::InvalidConfig(e.to_string()))
    }
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self::new()
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(ms)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
