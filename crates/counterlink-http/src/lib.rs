//! counterlink-http — client for the counter backend's HTTP API.
//!
//! The HTTP API is the primary transport; the real-time channel in
//! `counterlink-ws` is optional and mirrors the same operations.
//!
//! | Method | Path              | Response                     |
//! |--------|-------------------|------------------------------|
//! | GET    | `/health`         | `{status, message}`          |
//! | GET    | `/`               | `{message, apiBase?}`        |
//! | GET    | `/add?a=&b=`      | `{result}` or `{error}`      |

pub mod client;
pub mod error;
pub mod types;

pub use client::{ApiClient, ApiClientConfig};
pub use error::ApiError;
pub use types::{AddResponse, HealthResponse, InfoResponse};
