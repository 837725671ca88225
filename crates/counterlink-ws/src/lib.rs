//! counterlink-ws — reconnecting real-time channel over WebSocket.
//!
//! # Features
//! - Idempotent connect with a fixed open timeout
//! - Status tracking (`connecting` / `connected` / `disconnected` / `error`)
//! - Ordered message, error and status observers with disposers
//! - Bounded auto-reconnect with linear backoff
//! - Pluggable [`Connector`](counterlink_core::Connector); [`WsConnector`] by default

pub mod channel;
pub mod connector;

pub use channel::{ChannelConfig, RealtimeChannel};
pub use connector::WsConnector;
