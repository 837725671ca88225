//! Reconnecting real-time channel.
//!
//! [`RealtimeChannel`] owns at most one transport at a time and turns its
//! events into the channel model:
//!
//! ```text
//!                 connect()
//! disconnected ───────────────▶ connecting ──open──▶ connected
//!      ▲  ▲                        │   │                 │
//!      │  └──── timeout (terminal) ┘   └─ failure ─▶ error
//!      │                                                 │
//!      └──────────── close (maybe schedule reconnect) ◀──┘
//! ```
//!
//! Every connect and disconnect starts a new *epoch*. Transport events and
//! reconnect timers carry the epoch they were created in and are ignored once
//! it is stale, which is how a manual `disconnect()` cancels a pending
//! reconnect.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde_json::Number;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use counterlink_core::endpoint::realtime_url;
use counterlink_core::error::ChannelError;
use counterlink_core::message::Message;
use counterlink_core::observer::{ObserverList, Subscription};
use counterlink_core::policy::{CloseDisposition, ReconnectConfig, ReconnectPolicy, RetryState};
use counterlink_core::status::ConnectionStatus;
use counterlink_core::transport::{Connector, Outbound, TransportEvent, TransportLink};

use crate::connector::WsConnector;

/// Configuration for a [`RealtimeChannel`].
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// How long a transport may take to open before the endpoint is
    /// considered not to support the channel.
    pub connect_timeout: Duration,
    /// Automatic reconnect budget and backoff.
    pub reconnect: ReconnectConfig,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            reconnect: ReconnectConfig::default(),
        }
    }
}

struct State {
    status: ConnectionStatus,
    retry: RetryState,
    epoch: u64,
    outbound: Option<mpsc::UnboundedSender<Outbound>>,
    driver: Option<JoinHandle<()>>,
    reconnect_pending: bool,
}

impl State {
    /// Returns the new status if it actually changed.
    fn set_status(&mut self, next: ConnectionStatus) -> Option<ConnectionStatus> {
        if self.status == next {
            return None;
        }
        self.status = next;
        Some(next)
    }
}

struct Shared {
    url: String,
    connect_timeout: Duration,
    policy: ReconnectPolicy,
    connector: Arc<dyn Connector>,
    state: Mutex<State>,
    messages: ObserverList<Message>,
    errors: ObserverList<ChannelError>,
    statuses: ObserverList<ConnectionStatus>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit_status(&self, changed: Option<ConnectionStatus>) {
        if let Some(status) = changed {
            self.statuses.notify(&status);
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(outbound) = state.outbound.take() {
            let _ = outbound.send(Outbound::Close);
        }
        if let Some(driver) = state.driver.take() {
            driver.abort();
        }
    }
}

/// A real-time channel to one endpoint.
///
/// Cloning yields another handle to the same channel. The channel is torn
/// down when the last handle is dropped.
///
/// `connect` and the reconnect timer spawn Tokio tasks, so the channel must
/// be driven from inside a Tokio runtime.
#[derive(Clone)]
pub struct RealtimeChannel {
    shared: Arc<Shared>,
}

impl RealtimeChannel {
    /// Channel to a `ws://` or `wss://` URL over a real WebSocket.
    pub fn new(url: impl Into<String>, config: ChannelConfig) -> Self {
        Self::with_connector(url, config, WsConnector)
    }

    /// Channel for an HTTP(S) API base URL; see [`realtime_url`].
    pub fn for_api(api_base: &str, config: ChannelConfig) -> Result<Self, ChannelError> {
        Ok(Self::new(realtime_url(api_base)?, config))
    }

    /// Channel over a custom transport.
    pub fn with_connector(
        url: impl Into<String>,
        config: ChannelConfig,
        connector: impl Connector,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                url: url.into(),
                connect_timeout: config.connect_timeout,
                policy: ReconnectPolicy::new(config.reconnect),
                connector: Arc::new(connector),
                state: Mutex::new(State {
                    status: ConnectionStatus::Disconnected,
                    retry: RetryState::default(),
                    epoch: 0,
                    outbound: None,
                    driver: None,
                    reconnect_pending: false,
                }),
                messages: ObserverList::new(),
                errors: ObserverList::new(),
                statuses: ObserverList::new(),
            }),
        }
    }

    pub fn url(&self) -> &str {
        &self.shared.url
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared.state().status
    }

    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    /// Reconnect attempts spent since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.state().retry.attempts()
    }

    /// Returns `true` while a reconnect timer is armed.
    pub fn reconnect_pending(&self) -> bool {
        self.shared.state().reconnect_pending
    }

    /// Start connecting. Does nothing while connecting or connected.
    ///
    /// Returns immediately; watch [`on_status_change`](Self::on_status_change)
    /// for the outcome.
    pub fn connect(&self) {
        let (epoch, changed) = {
            let mut state = self.shared.state();
            if state.status.is_active() {
                tracing::debug!(status = %state.status, "connect ignored");
                return;
            }
            state.epoch += 1;
            state.reconnect_pending = false;
            // Reconnecting from `error` may leave the failed transport open.
            if let Some(stale) = state.outbound.take() {
                let _ = stale.send(Outbound::Close);
            }
            if let Some(stale) = state.driver.take() {
                stale.abort();
            }
            (state.epoch, state.set_status(ConnectionStatus::Connecting))
        };

        tracing::info!(url = %self.shared.url, "connecting realtime channel");
        self.shared.emit_status(changed);

        let mut state = self.shared.state();
        // A status observer may already have disconnected us.
        if state.epoch == epoch {
            state.driver = Some(tokio::spawn(drive(Arc::downgrade(&self.shared), epoch)));
        }
    }

    /// Tear down the connection and cancel any pending reconnect.
    ///
    /// Safe to call repeatedly.
    pub fn disconnect(&self) {
        let changed = {
            let mut state = self.shared.state();
            state.retry.exhaust(&self.shared.policy);
            state.epoch += 1;
            state.reconnect_pending = false;
            if let Some(outbound) = state.outbound.take() {
                let _ = outbound.send(Outbound::Close);
            }
            if let Some(driver) = state.driver.take() {
                driver.abort();
            }
            state.set_status(ConnectionStatus::Disconnected)
        };

        if changed.is_some() {
            tracing::info!(url = %self.shared.url, "realtime channel disconnected");
        }
        self.shared.emit_status(changed);
    }

    /// Serialize `message` and write it as one text frame.
    ///
    /// Fails with [`ChannelError::NotConnected`] unless the channel is connected.
    pub fn send(&self, message: &Message) -> Result<(), ChannelError> {
        let state = self.shared.state();
        if !state.status.is_connected() {
            return Err(ChannelError::NotConnected);
        }
        let outbound = state.outbound.as_ref().ok_or(ChannelError::NotConnected)?;
        let text = serde_json::to_string(message)?;
        outbound
            .send(Outbound::Text(text))
            .map_err(|_| ChannelError::NotConnected)?;
        tracing::trace!(kind = %message.kind, "realtime message queued");
        Ok(())
    }

    /// Send `{"type":"add","data":{"a":a,"b":b}}`.
    pub fn send_add_numbers(
        &self,
        a: impl Into<Number>,
        b: impl Into<Number>,
    ) -> Result<(), ChannelError> {
        self.send(&Message::add(a, b))
    }

    /// Send `{"type":"health"}`.
    pub fn send_health_check(&self) -> Result<(), ChannelError> {
        self.send(&Message::health())
    }

    /// Observe every well-formed inbound message.
    pub fn on_message<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.shared.messages.subscribe(handler)
    }

    /// Observe asynchronous failures (timeouts, transport errors).
    pub fn on_error<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ChannelError) + Send + Sync + 'static,
    {
        self.shared.errors.subscribe(handler)
    }

    /// Observe status transitions. Only actual changes are reported.
    pub fn on_status_change<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ConnectionStatus) + Send + Sync + 'static,
    {
        self.shared.statuses.subscribe(handler)
    }

    // ─── Transport event handlers ────────────────────────────────────────────

    fn is_current(&self, epoch: u64) -> bool {
        self.shared.state().epoch == epoch
    }

    fn on_open(&self, epoch: u64, outbound: mpsc::UnboundedSender<Outbound>) -> bool {
        let changed = {
            let mut state = self.shared.state();
            if state.epoch != epoch {
                let _ = outbound.send(Outbound::Close);
                return false;
            }
            state.outbound = Some(outbound);
            state.retry.reset();
            state.set_status(ConnectionStatus::Connected)
        };

        tracing::info!(url = %self.shared.url, "realtime channel connected");
        self.shared.emit_status(changed);
        true
    }

    fn on_timeout(&self, epoch: u64) {
        let changed = {
            let mut state = self.shared.state();
            if state.epoch != epoch {
                return;
            }
            state.retry.exhaust(&self.shared.policy);
            state.outbound = None;
            state.driver = None;
            state.set_status(ConnectionStatus::Disconnected)
        };

        let ms = self.shared.connect_timeout.as_millis() as u64;
        tracing::info!(
            url = %self.shared.url,
            timeout_ms = ms,
            "realtime endpoint did not open in time; channel unsupported, not retrying"
        );
        self.shared.emit_status(changed);
        self.shared.errors.notify(&ChannelError::Timeout { ms });
    }

    fn on_connect_failed(&self, epoch: u64, error: ChannelError) {
        let changed = {
            let mut state = self.shared.state();
            if state.epoch != epoch {
                return;
            }
            state.set_status(ConnectionStatus::Error)
        };

        tracing::warn!(url = %self.shared.url, error = %error, "realtime connect failed");
        self.shared.emit_status(changed);
        self.shared.errors.notify(&error);
        self.on_close(epoch, Some(error.close_code()), &error.to_string());
    }

    fn on_text(&self, epoch: u64, text: &str) -> bool {
        if !self.is_current(epoch) {
            return false;
        }
        match serde_json::from_str::<Message>(text) {
            Ok(message) => self.shared.messages.notify(&message),
            Err(e) => {
                tracing::debug!(error = %e, "dropping malformed realtime message");
            }
        }
        true
    }

    fn on_transport_error(&self, epoch: u64, diagnostic: String) -> bool {
        let changed = {
            let mut state = self.shared.state();
            if state.epoch != epoch {
                return false;
            }
            state.set_status(ConnectionStatus::Error)
        };

        tracing::warn!(url = %self.shared.url, error = %diagnostic, "realtime transport error");
        self.shared.emit_status(changed);
        self.shared.errors.notify(&ChannelError::WebSocket(diagnostic));
        true
    }

    fn on_close(&self, epoch: u64, code: Option<u16>, reason: &str) {
        let (changed, next) = {
            let mut state = self.shared.state();
            if state.epoch != epoch {
                return;
            }
            state.outbound = None;
            state.driver = None;
            let next = match CloseDisposition::classify(code) {
                CloseDisposition::Normal => None,
                CloseDisposition::Terminal => {
                    state.retry.exhaust(&self.shared.policy);
                    None
                }
                CloseDisposition::Retryable => state.retry.next_attempt(&self.shared.policy),
            };
            state.reconnect_pending = next.is_some();
            (state.set_status(ConnectionStatus::Disconnected), next)
        };

        match next {
            Some((attempt, delay)) => tracing::warn!(
                url = %self.shared.url,
                code,
                reason,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "realtime channel closed, reconnecting"
            ),
            None => tracing::info!(
                url = %self.shared.url,
                code,
                reason,
                "realtime channel closed, not reconnecting"
            ),
        }
        self.shared.emit_status(changed);

        if let Some((_, delay)) = next {
            self.schedule_reconnect(epoch, delay);
        }
    }

    fn schedule_reconnect(&self, epoch: u64, delay: Duration) {
        let weak = Arc::downgrade(&self.shared);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = weak.upgrade() {
                RealtimeChannel { shared }.fire_reconnect(epoch);
            }
        });
    }

    fn fire_reconnect(&self, epoch: u64) {
        {
            let mut state = self.shared.state();
            if state.epoch != epoch {
                tracing::debug!("reconnect superseded");
                return;
            }
            state.reconnect_pending = false;
            if state.status != ConnectionStatus::Disconnected {
                tracing::debug!(status = %state.status, "reconnect skipped");
                return;
            }
        }
        self.connect();
    }
}

impl std::fmt::Debug for RealtimeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeChannel")
            .field("url", &self.shared.url)
            .field("status", &self.status())
            .finish()
    }
}

/// Per-connection task: opens the transport under the connect window, then
/// feeds its events to the channel until it closes or the epoch goes stale.
///
/// Holds only a weak reference between events so dropping the last channel
/// handle ends it.
async fn drive(weak: Weak<Shared>, epoch: u64) {
    let Some(shared) = weak.upgrade() else { return };
    let connector = Arc::clone(&shared.connector);
    let url = shared.url.clone();
    let window = shared.connect_timeout;
    drop(shared);

    let opened = tokio::time::timeout(window, connector.connect(&url)).await;

    let Some(shared) = weak.upgrade() else { return };
    let channel = RealtimeChannel { shared };
    let mut inbound = match opened {
        Err(_elapsed) => {
            channel.on_timeout(epoch);
            return;
        }
        Ok(Err(error)) => {
            channel.on_connect_failed(epoch, error);
            return;
        }
        Ok(Ok(TransportLink { outbound, inbound })) => {
            if !channel.on_open(epoch, outbound) {
                return;
            }
            inbound
        }
    };
    drop(channel);

    while let Some(event) = inbound.recv().await {
        let Some(shared) = weak.upgrade() else { return };
        let channel = RealtimeChannel { shared };
        let current = match event {
            TransportEvent::Text(text) => channel.on_text(epoch, &text),
            TransportEvent::Error(diagnostic) => channel.on_transport_error(epoch, diagnostic),
            TransportEvent::Closed { code, reason } => {
                channel.on_close(epoch, code, &reason);
                return;
            }
        };
        if !current {
            return;
        }
    }

    if let Some(shared) = weak.upgrade() {
        RealtimeChannel { shared }.on_close(epoch, None, "transport dropped");
    }
}
