//! Error types for the nutrition API client.
//!
//! # Design
//! Every call ends in success or one of these variants. `Api` carries the
//! server's `detail` string verbatim so the UI can show it inline; `Server`
//! is the fallback when a failed response has no usable `detail`.

use serde::Deserialize;
use thiserror::Error;

use crate::http::HttpResponse;

/// Errors returned by `NutritionClient` and the hosts that drive it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The base URL (or an endpoint joined to it) is not an absolute http(s) URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The endpoint requires a bearer token and none is stored.
    #[error("not authenticated")]
    NotAuthenticated,

    /// No response was received.
    #[error("network error: {0}")]
    Transport(String),

    /// Non-2xx response without a decodable `detail`.
    #[error("server error (HTTP {status})")]
    Server { status: u16 },

    /// Non-2xx response with `{"detail": "..."}`. Displays as the detail alone.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The token store could not be read or written.
    #[error("credential storage failed: {0}")]
    Storage(String),
}

impl ApiError {
    /// Map a failed response to `Api` or `Server`.
    pub fn from_response(response: &HttpResponse) -> Self {
        match serde_json::from_str::<ErrorBody>(&response.body) {
            Ok(body) => ApiError::Api {
                status: response.status,
                message: body.detail,
            },
            Err(_) => ApiError::Server {
                status: response.status,
            },
        }
    }

    /// HTTP status code, when the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status } | ApiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the caller has no valid credential: nothing stored, or the
    /// server rejected the one we sent.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::NotAuthenticated) || self.status() == Some(401)
    }
}

/// FastAPI error body. Validation failures put an array in `detail`, which
/// fails to decode here and falls through to `ApiError::Server`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}
