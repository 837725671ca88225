//! Channel-level error types.

use thiserror::Error;

/// Errors produced by the real-time channel.
///
/// Only [`ChannelError::NotConnected`] is ever returned synchronously (from
/// `send`). Everything else reaches callers through error observers.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// `send` was called while the channel was not connected.
    #[error("realtime channel is not connected")]
    NotConnected,

    /// The transport did not open within the connect window.
    #[error("connection timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// WebSocket connect/send/receive error.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// The peer closed the connection before it opened.
    #[error("connection closed (code {code}): {reason}")]
    Closed { code: u16, reason: String },

    /// The endpoint URL could not be turned into a real-time URL.
    #[error("invalid endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    /// A message could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ChannelError {
    /// The close code this error stands for when it ends a connection attempt.
    ///
    /// Failures without a code of their own count as an abnormal closure
    /// (1006), the same code a browser reports for a refused socket.
    pub fn close_code(&self) -> u16 {
        match self {
            Self::Closed { code, .. } => *code,
            _ => crate::policy::reconnect::CLOSE_ABNORMAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_code_defaults_to_abnormal() {
        assert_eq!(ChannelError::WebSocket("refused".into()).close_code(), 1006);
        let closed = ChannelError::Closed {
            code: 1011,
            reason: "server error".into(),
        };
        assert_eq!(closed.close_code(), 1011);
    }
}
