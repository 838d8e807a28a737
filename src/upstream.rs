//! Outbound access to the upstream weather API
//!
//! Every tool that needs upstream data issues exactly one GET through a
//! [`WeatherUpstream`]. The HTTP implementation shares a `reqwest::Client`
//! but keeps no state between calls.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, redirect, Client};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::errors::AppError;

pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl UpstreamRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

#[async_trait]
pub trait WeatherUpstream: Send + Sync {
    /// Performs a single GET and returns decoded JSON, or `{"raw": body}` for
    /// non-JSON responses.
    async fn get_json(&self, request: &UpstreamRequest) -> Result<Value, AppError>;
}

#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: Client,
    api_base: String,
}

impl HttpForwarder {
    pub fn new(api_base: impl Into<String>) -> Result<Self, AppError> {
        Self::with_timeout(api_base, UPSTREAM_TIMEOUT)
    }

    pub fn with_timeout(api_base: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|err| AppError::internal(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl WeatherUpstream for HttpForwarder {
    async fn get_json(&self, request: &UpstreamRequest) -> Result<Value, AppError> {
        let url = format!("{}{}", self.api_base, request.path);
        let started_at = Instant::now();

        let response = self
            .client
            .get(&url)
            .query(&request.query)
            .send()
            .await
            .map_err(|err| {
                warn!(path = %request.path, error = %err, "upstream request failed");
                AppError::upstream(None, format!("request to {url} failed: {err}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                path = %request.path,
                status = status.as_u16(),
                "upstream returned error status"
            );
            return Err(AppError::upstream(
                Some(status.as_u16()),
                format!("upstream responded with {status}"),
            ));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.text().await.map_err(|err| {
            AppError::upstream(Some(status.as_u16()), format!("failed to read body: {err}"))
        })?;

        debug!(
            path = %request.path,
            status = status.as_u16(),
            duration_ms = started_at.elapsed().as_millis(),
            "upstream call completed"
        );

        decode_body(&content_type, status.as_u16(), body)
    }
}

pub fn decode_body(content_type: &str, status: u16, body: String) -> Result<Value, AppError> {
    if content_type.contains("application/json") {
        return serde_json::from_str(&body).map_err(|err| {
            AppError::upstream(Some(status), format!("upstream sent invalid json: {err}"))
        });
    }

    Ok(json!({ "raw": body }))
}
