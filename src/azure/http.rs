//! Authenticated HTTP transport shared by the ARM and Graph clients.
//!
//! Handles bearer authentication, bounded retry of transient failures, and
//! mapping of HTTP status codes and Azure error bodies onto [`ApiError`].

use reqwest::header::{self, HeaderMap};
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::{ApiError, AzadError, Result};

use super::auth::TokenSource;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Maximum number of attempts for transient failures.
const MAX_RETRIES: u32 = 3;

/// Delay between retries in milliseconds.
const RETRY_DELAY_MS: u64 = 1000;

/// Rate-limit wait when the server sends no `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// A successful API response with its body already read.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Parsed JSON body; `None` when the body was empty.
    pub body: Option<serde_json::Value>,
}

impl ApiResponse {
    /// Returns a header value as a string, if present and valid.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the `Retry-After` header as a duration.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        self.header(header::RETRY_AFTER.as_str())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }

    /// Deserializes the body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is empty or does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let body = self
            .body
            .clone()
            .ok_or_else(|| ApiError::invalid_response("empty response body"))?;

        serde_json::from_value(body)
            .map_err(|e| ApiError::invalid_response(format!("Failed to parse response: {e}")).into())
    }
}

/// ARM error envelope: `{ "error": { "code", "message" } }`.
#[derive(Debug, Deserialize)]
struct ArmErrorBody {
    error: ArmErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ArmErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Graph error envelope: `{ "odata.error": { "code", "message": { "value" } } }`.
#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    #[serde(rename = "odata.error")]
    error: GraphErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GraphErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<GraphErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct GraphErrorMessage {
    #[serde(default)]
    value: Option<String>,
}

/// Authenticated HTTP transport for one token audience.
#[derive(Clone)]
pub struct AzureHttp {
    client: Client,
    tokens: Arc<dyn TokenSource>,
    audience: String,
    retry_delay: Duration,
}

impl fmt::Debug for AzureHttp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureHttp")
            .field("audience", &self.audience)
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}

impl AzureHttp {
    /// Creates a transport that authenticates against `audience`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(tokens: Arc<dyn TokenSource>, audience: impl Into<String>) -> Result<Self> {
        Self::with_timeout(tokens, audience, DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a transport with a custom request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_timeout(
        tokens: Arc<dyn TokenSource>,
        audience: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ApiError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            tokens,
            audience: audience.into(),
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        })
    }

    /// Sets the base delay between retries of transient failures.
    #[must_use]
    pub const fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Sends a request, retrying transient failures.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after all retries or the
    /// response has a non-success status.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<ApiResponse> {
        let mut last_error: Option<AzadError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let mut delay = self.retry_delay * attempt;
                if let Some(AzadError::Api(ApiError::RateLimited { retry_after_secs })) = &last_error {
                    delay = delay.max(Duration::from_secs(*retry_after_secs));
                }
                debug!("Retry attempt {attempt} of {MAX_RETRIES} for {method} {url} in {delay:?}");
                tokio::time::sleep(delay).await;
            }

            match self.send_once(method.clone(), url, body).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if e.is_retryable() {
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            AzadError::Api(ApiError::NetworkError {
                message: String::from("Max retries exceeded"),
            })
        }))
    }

    /// Sends a single request.
    async fn send_once(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<ApiResponse> {
        trace!("{method} {url}");

        let token = self.tokens.token(&self.audience).await?;

        let mut request = self
            .client
            .request(method, url)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::network(format!("Request failed: {e}")))?;

        let status = response.status();
        let headers = response.headers().clone();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::network(format!("Failed to read response: {e}")))?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = headers
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);

            return Err(ApiError::RateLimited {
                retry_after_secs: retry_after,
            }
            .into());
        }

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound {
                url: url.to_string(),
            }
            .into());
        }

        if !status.is_success() {
            let (code, message) = parse_error_body(&text);
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(ApiError::AuthenticationFailed {
                    message: format!("{code}: {message}"),
                }
                .into());
            }
            return Err(ApiError::request_failed(status.as_u16(), code, message).into());
        }

        let body = if text.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str(&text).map_err(|e| {
                ApiError::invalid_response(format!("Failed to parse response from {url}: {e}"))
            })?)
        };

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

/// Extracts `(code, message)` from an ARM or Graph error body.
fn parse_error_body(text: &str) -> (String, String) {
    if let Ok(arm) = serde_json::from_str::<ArmErrorBody>(text) {
        return (
            arm.error.code.unwrap_or_else(|| String::from("Unknown")),
            arm.error.message.unwrap_or_default(),
        );
    }

    if let Ok(graph) = serde_json::from_str::<GraphErrorBody>(text) {
        return (
            graph.error.code.unwrap_or_else(|| String::from("Unknown")),
            graph
                .error
                .message
                .and_then(|m| m.value)
                .unwrap_or_default(),
        );
    }

    (String::from("Unknown"), text.trim().to_string())
}
