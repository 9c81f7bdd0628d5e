//! Reconnection policy.

pub mod backoff;

pub use backoff::{BackoffConfig, BackoffPolicy};
