//! deskrelay-core — foundation types for the Deskrelay realtime client.
//!
//! # Overview
//!
//! Deskrelay keeps a helpdesk UI connected to its server-side message bus:
//! one persistent STOMP-over-WebSocket connection, durable subscriptions,
//! bounded reconnect, heartbeats. The core crate defines:
//!
//! - [`Frame`] — the STOMP-style text frame codec
//! - [`ChatEvent`] / [`Notification`] — typed message bodies
//! - [`destination`] — channel naming and classification
//! - [`ClientError`] — structured error type
//! - [`policy`] module — reconnect backoff
//! - [`Transport`] / [`CredentialProvider`] — injection seams

pub mod destination;
pub mod error;
pub mod frame;
pub mod message;
pub mod policy;
pub mod transport;

pub use error::ClientError;
pub use frame::{Command, Frame, HEARTBEAT};
pub use message::{ChatEvent, InboundMessage, MessageBody, Notification};
pub use policy::{BackoffConfig, BackoffPolicy};
pub use transport::{
    CredentialProvider, StaticToken, Transport, TransportEvent, TransportSession,
};
