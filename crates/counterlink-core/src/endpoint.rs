//! Real-time endpoint derivation.

use url::Url;

use crate::error::ChannelError;

/// Derive the WebSocket URL for an HTTP(S) API base URL.
///
/// `http` becomes `ws` and `https` becomes `wss`; host, port, path and query
/// are kept. URLs that are already `ws`/`wss` pass through.
pub fn realtime_url(api_base: &str) -> Result<String, ChannelError> {
    let invalid = |reason: String| ChannelError::InvalidEndpoint {
        url: api_base.to_string(),
        reason,
    };

    let mut url = Url::parse(api_base).map_err(|e| invalid(e.to_string()))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(invalid(format!("unsupported scheme `{other}`"))),
    };
    url.set_scheme(scheme)
        .map_err(|()| invalid(format!("cannot switch scheme to `{scheme}`")))?;
    Ok(url.into())
}
