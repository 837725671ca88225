//! Retry policies.
//!
//! ```text
//! realtime channel: close → [ReconnectPolicy] (linear, bounded) → connect
//! HTTP client:      request → [RetryPolicy] (exponential, capped) → send
//! ```

pub mod reconnect;
pub mod retry;

pub use reconnect::{CloseDisposition, ReconnectConfig, ReconnectPolicy, RetryState};
pub use retry::{RetryConfig, RetryPolicy};
