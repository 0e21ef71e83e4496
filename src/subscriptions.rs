//! Fan-out of mutation results to field subscribers.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::broadcast;

/// Default buffered capacity per field channel.
pub const SUBSCRIPTION_CAPACITY: usize = 64;

/// Per-field broadcast channels.
///
/// A subscriber receives every value published to its field after the
/// moment it subscribed; there is no replay and no deduplication. A
/// publish with no subscribers is delivered to no one and is not an
/// error.
#[derive(Debug)]
pub struct SubscriptionHub {
    channels: RwLock<HashMap<String, broadcast::Sender<Value>>>,
    capacity: usize,
}

impl SubscriptionHub {
    /// Creates a hub with the given per-field capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Registers a field as subscribable.
    pub fn register(&self, field: impl Into<String>) {
        let mut channels = self.channels.write();
        let capacity = self.capacity;
        channels
            .entry(field.into())
            .or_insert_with(|| broadcast::channel(capacity).0);
    }

    /// Subscribes to a registered field.
    #[must_use]
    pub fn subscribe(&self, field: &str) -> Option<broadcast::Receiver<Value>> {
        self.channels.read().get(field).map(broadcast::Sender::subscribe)
    }

    /// Publishes a value to a field's subscribers.
    ///
    /// Returns the number of subscribers at the time of publish, or zero
    /// for an unregistered field.
    pub fn publish(&self, field: &str, value: Value) -> usize {
        let channels = self.channels.read();
        let Some(sender) = channels.get(field) else {
            return 0;
        };
        let count = sender.receiver_count();
        let _ = sender.send(value);
        count
    }
}

impl Default for SubscriptionHub {
    fn default() -> Self {
        Self::new(SUBSCRIPTION_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn subscribers_receive_published_values() {
        let hub = SubscriptionHub::default();
        hub.register("publish");

        let mut rx = hub.subscribe("publish").unwrap();
        let delivered = hub.publish("publish", json!("hello"));

        assert_eq!(delivered, 1);
        assert_eq!(rx.recv().await.unwrap(), json!("hello"));
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let hub = SubscriptionHub::default();
        hub.register("publish");
        assert_eq!(hub.publish("publish", json!("nobody home")), 0);
    }

    #[test]
    fn unregistered_fields_cannot_be_subscribed() {
        let hub = SubscriptionHub::default();
        assert!(hub.subscribe("mystery").is_none());
        assert_eq!(hub.publish("mystery", json!("x")), 0);
    }

    #[tokio::test]
    async fn late_subscribers_miss_earlier_values() {
        let hub = SubscriptionHub::default();
        hub.register("publish");

        hub.publish("publish", json!("early"));
        let mut rx = hub.subscribe("publish").unwrap();
        hub.publish("publish", json!("late"));

        assert_eq!(rx.recv().await.unwrap(), json!("late"));
        assert!(rx.try_recv().is_err());
    }
}
