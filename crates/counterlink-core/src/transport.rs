//! The `Connector` trait — the seam between the channel and a wire transport.
//!
//! A connector opens one transport and hands back a [`TransportLink`]: an
//! outbound command queue and an inbound event stream. The channel never sees
//! sockets directly, which keeps it testable with in-memory links.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ChannelError;

/// Something the transport observed.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A text frame arrived.
    Text(String),
    /// The transport hit an error. A `Closed` event usually follows.
    Error(String),
    /// The transport is closed. `code` is `None` when no close frame was seen.
    Closed { code: Option<u16>, reason: String },
}

/// A command for the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Write one text frame.
    Text(String),
    /// Close the connection (best-effort).
    Close,
}

/// The channel's end of an open transport.
#[derive(Debug)]
pub struct TransportLink {
    pub outbound: mpsc::UnboundedSender<Outbound>,
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

impl TransportLink {
    /// Create a link plus the transport-side ends of both queues.
    pub fn pair() -> (
        Self,
        mpsc::UnboundedReceiver<Outbound>,
        mpsc::UnboundedSender<TransportEvent>,
    ) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        (
            Self {
                outbound: out_tx,
                inbound: in_rx,
            },
            out_rx,
            in_tx,
        )
    }
}

/// Opens transports to a URL.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; the channel shares one connector
/// across every connection attempt it makes.
///
/// # Cancellation
/// The channel drops the returned future when its connect window elapses or
/// the channel is disconnected. Dropping it must abandon the attempt.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a transport. Resolves once the transport is open.
    async fn connect(&self, url: &str) -> Result<TransportLink, ChannelError>;
}
