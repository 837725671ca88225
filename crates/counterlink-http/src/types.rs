//! Response bodies of the counter API.

use serde::{Deserialize, Serialize};

/// `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// `GET /`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoResponse {
    pub message: String,
    #[serde(rename = "apiBase", default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

/// `GET /add` on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddResponse {
    pub result: f64,
}

/// Body of a rejected request.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_api_base_is_optional() {
        let info: InfoResponse = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(info.api_base, None);

        let info: InfoResponse =
            serde_json::from_str(r#"{"message":"hi","apiBase":"https://api.example.com"}"#).unwrap();
        assert_eq!(info.api_base.as_deref(), Some("https://api.example.com"));
    }

    #[test]
    fn add_result_accepts_integers() {
        let add: AddResponse = serde_json::from_str(r#"{"result":8}"#).unwrap();
        assert_eq!(add.result, 8.0);
    }
}
