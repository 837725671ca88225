//! Bounded linear-backoff reconnect policy for the real-time channel.

use std::time::Duration;

/// Normal closure.
pub const CLOSE_NORMAL: u16 = 1000;
/// Protocol error.
pub const CLOSE_PROTOCOL_ERROR: u16 = 1002;
/// Abnormal closure: refused, or dropped without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Configuration for the reconnect policy.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Maximum automatic reconnect attempts between successful opens.
    pub max_attempts: u32,
    /// Delay unit; attempt `n` waits `n * base_delay`.
    pub base_delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
        }
    }
}

/// What a closure means for reconnection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDisposition {
    /// Deliberate close; do not reconnect.
    Normal,
    /// The endpoint refused or spoke the wrong protocol; never reconnect.
    Terminal,
    /// Reconnect if budget remains.
    Retryable,
}

impl CloseDisposition {
    /// Classify a close code. A missing code counts as abnormal.
    pub fn classify(code: Option<u16>) -> Self {
        match code.unwrap_or(CLOSE_ABNORMAL) {
            CLOSE_NORMAL => Self::Normal,
            CLOSE_PROTOCOL_ERROR | CLOSE_ABNORMAL => Self::Terminal,
            _ => Self::Retryable,
        }
    }
}

/// Stateless policy: computes the delay before the `attempt`-th reconnect.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub config: ReconnectConfig,
}

impl ReconnectPolicy {
    pub fn new(config: ReconnectConfig) -> Self {
        Self { config }
    }

    /// Delay before the `attempt`-th reconnect (1-based).
    /// Returns `None` outside `1..=max_attempts`.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.config.max_attempts {
            return None;
        }
        Some(self.config.base_delay * attempt)
    }
}

/// Attempt counter owned by one channel.
#[derive(Debug, Clone, Default)]
pub struct RetryState {
    attempts: u32,
}

impl RetryState {
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Called on every successful open.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Spend the whole budget; no automatic reconnect until the next open.
    pub fn exhaust(&mut self, policy: &ReconnectPolicy) {
        self.attempts = policy.config.max_attempts;
    }

    pub fn is_exhausted(&self, policy: &ReconnectPolicy) -> bool {
        self.attempts >= policy.config.max_attempts
    }

    /// Claim the next attempt and its delay, or `None` once the bound is hit.
    pub fn next_attempt(&mut self, policy: &ReconnectPolicy) -> Option<(u32, Duration)> {
        if self.is_exhausted(policy) {
            return None;
        }
        self.attempts += 1;
        policy.delay_for(self.attempts).map(|delay| (self.attempts, delay))
    }
}
