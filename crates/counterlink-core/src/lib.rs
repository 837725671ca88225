//! counterlink-core — foundation types for the Counterlink client.
//!
//! # Overview
//!
//! Counterlink talks to a small "counter" backend over two transports: a
//! primary HTTP API and an optional real-time WebSocket channel carrying the
//! same operations. This crate holds what both sides share:
//!
//! - [`Message`] — the JSON envelope exchanged over the real-time channel
//! - [`ConnectionStatus`] — the channel's state machine states
//! - [`ObserverList`] / [`Subscription`] — ordered callback registries
//! - [`ChannelError`] — structured error type
//! - [`Connector`] — the seam between the channel and a concrete transport
//! - [`policy`] module — linear reconnect and exponential request retry
//! - [`endpoint`] module — HTTP base URL to WebSocket URL derivation

pub mod endpoint;
pub mod error;
pub mod message;
pub mod observer;
pub mod policy;
pub mod status;
pub mod transport;

pub use endpoint::realtime_url;
pub use error::ChannelError;
pub use message::Message;
pub use observer::{ObserverList, Subscription};
pub use status::ConnectionStatus;
pub use transport::{Connector, Outbound, TransportEvent, TransportLink};
