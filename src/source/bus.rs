//! Named-topic push channel.
//!
//! In-process stand-in for the external delivery mechanism: producers
//! publish raw payloads by topic, consumers hold a [`Subscription`] whose
//! drop unsubscribes. Pairing subscribe with a guaranteed unsubscribe on
//! every exit path keeps updates from being delivered into a torn-down
//! store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::mpsc;

/// Topic the metrics producer pushes updates on.
pub const METRICS_TOPIC: &str = "metrics-update";

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    topics: HashMap<String, Vec<(u64, mpsc::UnboundedSender<Value>)>>,
}

/// A named-topic publish/subscribe bus carrying raw JSON payloads.
///
/// Cheap to clone; all clones share one subscriber registry.
#[derive(Debug, Clone, Default)]
pub struct UpdateBus {
    registry: Arc<Mutex<Registry>>,
}

impl UpdateBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber on `topic`.
    ///
    /// Dropping the returned subscription unregisters it.
    pub fn subscribe(&self, topic: &str) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut registry = self.registry.lock().unwrap();
        registry.next_id += 1;
        let id = registry.next_id;
        registry
            .topics
            .entry(topic.to_string())
            .or_default()
            .push((id, tx));

        Subscription {
            bus: self.clone(),
            topic: topic.to_string(),
            id,
            rx,
        }
    }

    /// Deliver a payload to every current subscriber of `topic`.
    ///
    /// Returns the number of subscribers that received it. Subscribers whose
    /// receiving end is gone are pruned on the way through.
    pub fn publish(&self, topic: &str, payload: &Value) -> usize {
        let mut registry = self.registry.lock().unwrap();
        let Some(subscribers) = registry.topics.get_mut(topic) else {
            return 0;
        };
        subscribers.retain(|(_, tx)| tx.send(payload.clone()).is_ok());
        let delivered = subscribers.len();
        if subscribers.is_empty() {
            registry.topics.remove(topic);
        }
        delivered
    }

    /// Number of live subscribers on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.registry
            .lock()
            .unwrap()
            .topics
            .get(topic)
            .map_or(0, Vec::len)
    }

    fn unsubscribe(&self, topic: &str, id: u64) {
        let mut registry = self.registry.lock().unwrap();
        if let Some(subscribers) = registry.topics.get_mut(topic) {
            subscribers.retain(|(sub_id, _)| *sub_id != id);
            if subscribers.is_empty() {
                registry.topics.remove(topic);
            }
        }
    }
}

/// A live registration on one topic. Unsubscribes on drop.
#[derive(Debug)]
pub struct Subscription {
    bus: UpdateBus,
    topic: String,
    id: u64,
    rx: mpsc::UnboundedReceiver<Value>,
}

impl Subscription {
    /// Receive the next payload published on this topic.
    pub async fn recv(&mut self) -> Option<Value> {
        self.rx.recv().await
    }

    /// Receive without waiting; `None` when nothing is pending.
    pub fn try_recv(&mut self) -> Option<Value> {
        self.rx.try_recv().ok()
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(&self.topic, self.id);
    }
}
