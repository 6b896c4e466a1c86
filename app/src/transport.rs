//! Network execution of core requests.
//!
//! # Design
//! The core never touches the network; a `Transport` takes the `HttpRequest`
//! it built and hands back the raw `HttpResponse`. Status codes are data at
//! this layer: a 401 or 500 is a successful round-trip, and only a missing
//! response becomes `ApiError::Transport`. That keeps all status handling in
//! `NutritionClient::parse_*`.

use std::time::Duration;

use async_trait::async_trait;
use nutai_core::{ApiError, HttpMethod, HttpRequest, HttpResponse};
use tracing::{debug, warn};

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// `reqwest`-backed transport with a per-request timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_builder() {
        return ApiError::InvalidUrl(err.to_string());
    }
    warn!(error = %err, timeout = err.is_timeout(), "no response");
    ApiError::Transport(err.to_string())
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut builder = self.client.request(method(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(transport_error)?;
        debug!(status, url = %request.url, "response received");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
