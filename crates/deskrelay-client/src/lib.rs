//! deskrelay-client — realtime transport client with auto-reconnect.
//!
//! # Features
//! - One persistent STOMP-over-WebSocket connection per manager
//! - Durable subscriptions, replayed automatically after every reconnect
//! - Exponential reconnect backoff with a hard attempt ceiling
//! - Send-only heartbeat while connected
//! - Notification fan-out to an ordered, identity-keyed observer list

pub mod dispatch;
mod heartbeat;
pub mod manager;
pub mod registry;
pub mod state;
pub mod ws;

pub use dispatch::{MessageDispatcher, NotificationObserver};
pub use manager::{ClientConfig, ConnectedCallback, ConnectionManager, ErrorCallback};
pub use registry::{MessageHandler, SubscriptionRegistry};
pub use state::ConnectionState;
pub use ws::WsTransport;
