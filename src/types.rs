//! Core types shared by queues and hubs.

use crate::error::{CourierError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a bounded queue or hub does when an enqueue would exceed capacity.
///
/// Unbounded structures never consult the strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverflowStrategy {
    /// Suspend the producer until room is available.
    #[default]
    Backpressure,

    /// Discard the new item and report `accepted = false`.
    Dropping,

    /// Evict the oldest item to make room. The new item is always accepted.
    Sliding,
}

impl fmt::Display for OverflowStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowStrategy::Backpressure => write!(f, "backpressure"),
            OverflowStrategy::Dropping => write!(f, "dropping"),
            OverflowStrategy::Sliding => write!(f, "sliding"),
        }
    }
}

/// Queue configuration.
///
/// Capacity and strategy are fixed for the lifetime of the queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum buffered items (None = unbounded).
    /// Default: None
    #[serde(default)]
    pub capacity: Option<usize>,

    /// Overflow handling for bounded queues.
    /// Default: Backpressure
    #[serde(default)]
    pub strategy: OverflowStrategy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: None,
            strategy: OverflowStrategy::Backpressure,
        }
    }
}

impl QueueConfig {
    /// Unbounded; every offer succeeds immediately.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Bounded with backpressure.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            strategy: OverflowStrategy::Backpressure,
        }
    }

    /// Bounded, dropping new items when full.
    pub fn dropping(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            strategy: OverflowStrategy::Dropping,
        }
    }

    /// Bounded, evicting the oldest item when full.
    pub fn sliding(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            strategy: OverflowStrategy::Sliding,
        }
    }

    /// Reject misuse eagerly, before any structure is built.
    pub fn validate(&self) -> Result<()> {
        match self.capacity {
            Some(0) => Err(CourierError::InvalidCapacity(0)),
            _ => Ok(()),
        }
    }
}

/// Hubs are configured exactly like queues; capacity bounds the distance
/// between the newest entry and the slowest live subscriber.
pub type HubConfig = QueueConfig;

/// Position in a hub's shared log.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Sequence(pub u64);

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seq({})", self.0)
    }
}

impl Sequence {
    pub fn next(self) -> Self {
        Sequence(self.0 + 1)
    }

    /// Number of entries in `[self, end)`.
    pub fn distance_to(self, end: Sequence) -> usize {
        end.0.saturating_sub(self.0) as usize
    }
}

/// Unique identifier for a hub subscription.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_rejected() {
        let result = QueueConfig::bounded(0).validate();
        assert_eq!(result, Err(CourierError::InvalidCapacity(0)));
        assert!(QueueConfig::sliding(1).validate().is_ok());
        assert!(QueueConfig::unbounded().validate().is_ok());
    }

    #[test]
    fn test_sequence_distance() {
        assert_eq!(Sequence(3).distance_to(Sequence(7)), 4);
        assert_eq!(Sequence(7).distance_to(Sequence(3)), 0);
        assert_eq!(Sequence(5).next(), Sequence(6));
    }

    #[test]
    fn test_config_from_json() {
        let config: QueueConfig =
            serde_json::from_str(r#"{"capacity": 16, "strategy": "sliding"}"#).unwrap();
        assert_eq!(config, QueueConfig::sliding(16));

        let config: QueueConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, QueueConfig::unbounded());
    }
}
