//! Request and response bodies specific to the HTTP layer
//!
//! Registry wire types (`JoinRequest`, `JoinResponse`, `Pong`, `Client`) live
//! in `roster_registry`.

use serde::{Deserialize, Serialize};

/// Error response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("bad_request", message)
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Leave acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveResponse {
    pub left: String,
}

/// `?id=` query of leave and ping
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientIdQuery {
    #[serde(default)]
    pub id: String,
}

/// `?service=` query of list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub service: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response() {
        let err = ErrorResponse::bad_request("missing id");
        assert_eq!(err.code, "bad_request");
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            serde_json::json!({"code": "bad_request", "message": "missing id"})
        );
    }
}
