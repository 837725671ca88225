//! Client configuration: optional YAML file, then environment, then flags.
//!
//! ```yaml
//! api_url: https://api.example.com
//! channel:
//!   connect_timeout_ms: 5000
//!   max_reconnect_attempts: 5
//!   reconnect_delay_ms: 1000
//! http:
//!   request_timeout_ms: 10000
//!   max_retries: 2
//! log:
//!   level: info
//!   components:
//!     counterlink-ws: debug
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use counterlink_core::policy::{ReconnectConfig, RetryConfig};
use counterlink_http::ApiClientConfig;
use counterlink_ws::ChannelConfig;

use crate::logging::LogConfig;

/// Environment variable overriding `api_url`.
pub const API_URL_ENV: &str = "COUNTERLINK_API_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the counter HTTP API. The real-time URL is derived from it.
    pub api_url: String,
    pub channel: ChannelSettings,
    pub http: HttpSettings,
    pub log: LogConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000".into(),
            channel: ChannelSettings::default(),
            http: HttpSettings::default(),
            log: LogConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSettings {
    pub connect_timeout_ms: u64,
    pub max_reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5000,
            max_reconnect_attempts: 5,
            reconnect_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub request_timeout_ms: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
            max_retries: 2,
            initial_backoff_ms: 200,
            max_backoff_ms: 5_000,
        }
    }
}

impl ClientConfig {
    /// Load from `path` (if any), then apply the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                Self::from_yaml(&raw)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => Self::default(),
        };
        if let Ok(url) = std::env::var(API_URL_ENV) {
            config.api_url = url;
        }
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            connect_timeout: Duration::from_millis(self.channel.connect_timeout_ms),
            reconnect: ReconnectConfig {
                max_attempts: self.channel.max_reconnect_attempts,
                base_delay: Duration::from_millis(self.channel.reconnect_delay_ms),
            },
        }
    }

    pub fn api_client_config(&self) -> ApiClientConfig {
        ApiClientConfig {
            retry: RetryConfig {
                max_retries: self.http.max_retries,
                initial_backoff: Duration::from_millis(self.http.initial_backoff_ms),
                max_backoff: Duration::from_millis(self.http.max_backoff_ms),
                multiplier: 2.0,
            },
            request_timeout: Duration::from_millis(self.http.request_timeout_ms),
        }
    }
}
