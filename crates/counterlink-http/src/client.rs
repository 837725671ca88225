//! HTTP API client backed by `reqwest`.
//!
//! Transient failures (connection errors, 5xx, 429) are retried with
//! exponential backoff; rejected input is returned immediately.

use std::time::Duration;

use serde::de::DeserializeOwned;
use url::Url;

use counterlink_core::endpoint::realtime_url;
use counterlink_core::error::ChannelError;
use counterlink_core::policy::{RetryConfig, RetryPolicy};

use crate::error::ApiError;
use crate::types::{AddResponse, ErrorBody, HealthResponse, InfoResponse};

/// Configuration for `ApiClient`.
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub retry: RetryConfig,
    pub request_timeout: Duration,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Client for one counter API base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    http: reqwest::Client,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Create a client for `base_url` (e.g. `http://localhost:3000`).
    pub fn new(base_url: &str, config: ApiClientConfig) -> Result<Self, ApiError> {
        let invalid = |reason: String| ApiError::InvalidUrl {
            url: base_url.to_string(),
            reason,
        };
        let base = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme `{}`", base.scheme())));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Http(e.to_string()))?;

        Ok(Self {
            base,
            http,
            retry: RetryPolicy::new(config.retry),
        })
    }

    /// Create with default configuration.
    pub fn default_for(base_url: &str) -> Result<Self, ApiError> {
        Self::new(base_url, ApiClientConfig::default())
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// The real-time channel URL that pairs with this API.
    pub fn realtime_url(&self) -> Result<String, ChannelError> {
        realtime_url(self.base.as_str())
    }

    /// `GET /health`
    pub async fn health(&self) -> Result<HealthResponse, ApiError> {
        self.get("health", &[]).await
    }

    /// `GET /`
    pub async fn info(&self) -> Result<InfoResponse, ApiError> {
        self.get("", &[]).await
    }

    /// `GET /add?a=&b=` — returns the sum computed by the server.
    pub async fn add(&self, a: f64, b: f64) -> Result<f64, ApiError> {
        let resp: AddResponse = self
            .get("add", &[("a", a.to_string()), ("b", b.to_string())])
            .await?;
        Ok(resp.result)
    }

    /// Resolve `path` below the base URL, keeping any base path prefix.
    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        if !path.is_empty() {
            url.path_segments_mut()
                .map_err(|()| ApiError::InvalidUrl {
                    url: self.base.to_string(),
                    reason: "base URL cannot have path segments".into(),
                })?
                .pop_if_empty()
                .push(path);
        }
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.get_once(&url, query).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() => match self.retry.next_delay(attempt) {
                    Some(delay) => {
                        tracing::warn!(
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            url = %url,
                            "retrying request"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        tracing::error!(attempt, error = %e, url = %url, "max retries exceeded");
                        return Err(e);
                    }
                },
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        url: &Url,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let resp = self
            .http
            .get(url.clone())
            .query(query)
            .send()
            .await
            .map_err(|e| ApiError::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ApiError::Http(e.to_string()))?;

        if !status.is_success() {
            let status = status.as_u16();
            return Err(match serde_json::from_str::<ErrorBody>(&body) {
                Ok(ErrorBody { error }) if status < 500 => ApiError::Rejected {
                    status,
                    message: error,
                },
                _ => ApiError::Status { status, body },
            });
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Deserialization(e.to_string()))
    }
}
