//! Subscription registry.
//!
//! Tracks the destination → handler mapping independently of the transport
//! session, so subscriptions survive a reconnect: the connection manager
//! replays a snapshot of the registry against every fresh session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use deskrelay_core::message::InboundMessage;

/// Callback invoked for each inbound message on a subscribed destination.
pub type MessageHandler = Arc<dyn Fn(&InboundMessage) + Send + Sync>;

/// One registry entry. The subscription id is stable across reconnects so
/// UNSUBSCRIBE frames reference the id the broker saw.
#[derive(Clone)]
struct SubscriptionEntry {
    id: String,
    handler: MessageHandler,
    headers: HashMap<String, String>,
}

/// A snapshot row used for resubscription: `(destination, id, headers)`.
pub type SubscriptionSnapshot = Vec<(String, String, HashMap<String, String>)>;

#[derive(Default)]
struct RegistryInner {
    entries: HashMap<String, SubscriptionEntry>,
    next_id: u64,
}

/// Durable destination → handler mapping, keyed uniquely by destination.
#[derive(Clone, Default)]
pub struct SubscriptionRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `destination`.
    ///
    /// Returns `Some(subscription_id)` if the destination is new, or `None`
    /// if it was already registered — the existing subscription stays live
    /// and the new handler is dropped (idempotent subscribe).
    pub fn insert(
        &self,
        destination: &str,
        handler: MessageHandler,
        headers: HashMap<String, String>,
    ) -> Option<String> {
        let mut inner = self.inner.lock().unwrap();
        if inner.entries.contains_key(destination) {
            return None;
        }
        let id = format!("sub-{}", inner.next_id);
        inner.next_id += 1;
        inner.entries.insert(
            destination.to_string(),
            SubscriptionEntry { id: id.clone(), handler, headers },
        );
        Some(id)
    }

    /// Remove the entry for `destination`, returning its subscription id.
    /// Removing a nonexistent destination is a no-op returning `None`.
    pub fn remove(&self, destination: &str) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .entries
            .remove(destination)
            .map(|e| e.id)
    }

    /// The handler registered for `destination`, if any.
    pub fn handler_for(&self, destination: &str) -> Option<MessageHandler> {
        self.inner
            .lock()
            .unwrap()
            .entries
            .get(destination)
            .map(|e| Arc::clone(&e.handler))
    }

    /// Snapshot of all entries, for replay against a fresh session.
    pub fn snapshot(&self) -> SubscriptionSnapshot {
        self.inner
            .lock()
            .unwrap()
            .entries
            .iter()
            .map(|(dest, e)| (dest.clone(), e.id.clone(), e.headers.clone()))
            .collect()
    }

    /// Drop every entry. Called on explicit disconnect.
    pub fn clear(&self) {
        self.inner.lock().unwrap().entries.clear();
    }

    pub fn contains(&self, destination: &str) -> bool {
        self.inner.lock().unwrap().entries.contains_key(destination)
    }

    /// Number of registered destinations.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    /// Returns `true` if no destination is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_handler() -> MessageHandler {
        Arc::new(|_| {})
    }

    #[test]
    fn insert_assigns_stable_ids() {
        let registry = SubscriptionRegistry::new();
        let a = registry.insert("/topic/a", noop_handler(), HashMap::new());
        let b = registry.insert("/topic/b", noop_handler(), HashMap::new());
        assert_eq!(a.as_deref(), Some("sub-0"));
        assert_eq!(b.as_deref(), Some("sub-1"));
    }

    #[test]
    fn second_insert_is_noop() {
        let registry = SubscriptionRegistry::new();
        assert!(registry.insert("/topic/a", noop_handler(), HashMap::new()).is_some());
        assert!(registry.insert("/topic/a", noop_handler(), HashMap::new()).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_returns_id() {
        let registry = SubscriptionRegistry::new();
        registry.insert("/topic/a", noop_handler(), HashMap::new());
        assert_eq!(registry.remove("/topic/a").as_deref(), Some("sub-0"));
        assert!(registry.remove("/topic/a").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn snapshot_lists_all_entries() {
        let registry = SubscriptionRegistry::new();
        registry.insert("/topic/a", noop_handler(), HashMap::new());
        registry.insert("/topic/b", noop_handler(), HashMap::new());
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 2);
        let mut dests: Vec<_> = snapshot.iter().map(|(d, _, _)| d.as_str()).collect();
        dests.sort_unstable();
        assert_eq!(dests, ["/topic/a", "/topic/b"]);
    }

    #[test]
    fn clear_empties_registry() {
        let registry = SubscriptionRegistry::new();
        registry.insert("/topic/a", noop_handler(), HashMap::new());
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.handler_for("/topic/a").is_none());
    }
}
