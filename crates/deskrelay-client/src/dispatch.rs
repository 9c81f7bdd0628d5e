//! Inbound frame routing and notification fan-out.
//!
//! Each MESSAGE frame goes to the single handler registered for its
//! destination. Frames on notification-class destinations additionally fan
//! out to every registered observer, in registration order. Parse failures
//! and panicking callbacks are logged and isolated per frame; they never
//! tear down the connection or starve the remaining observers.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use deskrelay_core::destination;
use deskrelay_core::frame::Frame;
use deskrelay_core::message::{ChatEvent, InboundMessage, MessageBody, Notification};

use crate::registry::SubscriptionRegistry;

/// Generic observer invoked for every inbound notification, regardless of
/// which notification destination carried it.
pub trait NotificationObserver: Send + Sync + 'static {
    fn on_notification(&self, notification: &Notification);
}

/// Routes inbound frames and owns the notification observer list.
///
/// The observer list is ordered, identity-keyed and duplicate-free.
#[derive(Clone, Default)]
pub struct MessageDispatcher {
    observers: Arc<Mutex<Vec<Arc<dyn NotificationObserver>>>>,
}

impl MessageDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observer. Returns `false` if this exact observer (by
    /// identity) is already registered.
    pub fn add_observer(&self, observer: Arc<dyn NotificationObserver>) -> bool {
        let mut observers = self.observers.lock().unwrap();
        if observers.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            return false;
        }
        observers.push(observer);
        true
    }

    /// Remove an observer by identity. Returns `false` if it was not
    /// registered.
    pub fn remove_observer(&self, observer: &Arc<dyn NotificationObserver>) -> bool {
        let mut observers = self.observers.lock().unwrap();
        let before = observers.len();
        observers.retain(|o| !Arc::ptr_eq(o, observer));
        observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().unwrap().len()
    }

    /// Route one inbound MESSAGE frame.
    pub fn dispatch(&self, registry: &SubscriptionRegistry, frame: &Frame) {
        let Some(dest) = frame.destination() else {
            tracing::warn!("MESSAGE frame without destination header");
            return;
        };

        if destination::is_notification(dest) {
            self.dispatch_notification(registry, dest, &frame.body);
        } else {
            self.dispatch_chat(registry, dest, &frame.body);
        }
    }

    fn dispatch_notification(&self, registry: &SubscriptionRegistry, dest: &str, body: &str) {
        let notification: Notification = match serde_json::from_str(body) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(destination = %dest, error = %e, "malformed notification body");
                return;
            }
        };

        // Fan out to every observer; one panicking observer must not starve
        // the rest.
        let observers = self.observers.lock().unwrap().clone();
        for observer in observers {
            if catch_unwind(AssertUnwindSafe(|| observer.on_notification(&notification)))
                .is_err()
            {
                tracing::error!(destination = %dest, "notification observer panicked");
            }
        }

        let message = InboundMessage {
            destination: dest.to_string(),
            body: MessageBody::Notification(notification),
        };
        self.invoke_handler(registry, dest, &message);
    }

    fn dispatch_chat(&self, registry: &SubscriptionRegistry, dest: &str, body: &str) {
        let event: ChatEvent = match serde_json::from_str(body) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(destination = %dest, error = %e, "unknown or malformed chat event");
                return;
            }
        };
        let message = InboundMessage {
            destination: dest.to_string(),
            body: MessageBody::Chat(event),
        };
        self.invoke_handler(registry, dest, &message);
    }

    fn invoke_handler(&self, registry: &SubscriptionRegistry, dest: &str, message: &InboundMessage) {
        let Some(handler) = registry.handler_for(dest) else {
            tracing::debug!(destination = %dest, "no handler registered");
            return;
        };
        if catch_unwind(AssertUnwindSafe(|| handler(message))).is_err() {
            tracing::error!(destination = %dest, "message handler panicked");
        }
    }
}
