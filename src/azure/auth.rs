//! Credentials for Azure Resource Manager and Azure AD Graph.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{ApiError, Result};

/// Tokens are refreshed this long before they expire.
const REFRESH_MARGIN_SECS: i64 = 300;

/// Token request timeout in seconds.
const TOKEN_TIMEOUT_SECS: u64 = 30;

/// Supplies bearer tokens for an audience.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Returns a bearer token valid for `audience`.
    async fn token(&self, audience: &str) -> Result<String>;
}

/// A fixed, pre-acquired bearer token.
#[derive(Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    /// Wraps an existing token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken(***)")
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self, _audience: &str) -> Result<String> {
        Ok(self.token.clone())
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Utc::now() + ChronoDuration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

/// OAuth2 token endpoint response. `expires_in` is a string on the v1
/// endpoint and a number on v2.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
}

impl TokenResponse {
    fn expires_in_secs(&self) -> i64 {
        match &self.expires_in {
            Some(serde_json::Value::Number(n)) => n.as_i64().unwrap_or(3600),
            Some(serde_json::Value::String(s)) => s.parse().unwrap_or(3600),
            _ => 3600,
        }
    }
}

/// Client-credentials grant against the Azure AD token endpoint.
pub struct ClientSecretCredential {
    client: Client,
    authority: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    cache: Mutex<HashMap<String, CachedToken>>,
}

impl fmt::Debug for ClientSecretCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecretCredential")
            .field("authority", &self.authority)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl ClientSecretCredential {
    /// Creates a credential for a service principal secret.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(
        authority: impl Into<String>,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(TOKEN_TIMEOUT_SECS))
            .build()
            .map_err(|e| ApiError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            authority: authority.into().trim_end_matches('/').to_string(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            cache: Mutex::new(HashMap::new()),
        })
    }

    async fn request_token(&self, audience: &str) -> Result<CachedToken> {
        let url = format!("{}/{}/oauth2/token", self.authority, self.tenant_id);
        info!("Requesting token for {audience}");

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("resource", audience),
        ];

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ApiError::network(format!("Token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::AuthenticationFailed {
                message: format!("token endpoint returned {status}: {}", body.trim()),
            }
            .into());
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ApiError::invalid_response(format!("Failed to parse token response: {e}")))?;

        Ok(CachedToken {
            expires_at: Utc::now() + ChronoDuration::seconds(token.expires_in_secs()),
            access_token: token.access_token,
        })
    }
}

#[async_trait]
impl TokenSource for ClientSecretCredential {
    async fn token(&self, audience: &str) -> Result<String> {
        let mut cache = self.cache.lock().await;

        if let Some(cached) = cache.get(audience).filter(|t| t.is_fresh()) {
            return Ok(cached.access_token.clone());
        }

        debug!("No fresh token cached for {audience}");
        let fresh = self.request_token(audience).await?;
        let access_token = fresh.access_token.clone();
        cache.insert(audience.to_string(), fresh);
        Ok(access_token)
    }
}
