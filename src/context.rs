//! Per-run provider context.
//!
//! Everything a handler needs to talk to Azure is built once from the
//! configuration and passed down explicitly.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::azure::{ArmClient, AzureHttp, ClientSecretCredential, GraphClient, StaticToken, TokenSource};
use crate::config::AzadConfig;
use crate::error::{ConfigError, Result};
use crate::lro::LroReconciler;

/// Environment variable holding the service principal secret.
pub const ENV_CLIENT_SECRET: &str = "AZURE_CLIENT_SECRET";
/// Environment variable holding a pre-acquired Resource Manager token.
pub const ENV_ARM_TOKEN: &str = "AZAD_ARM_TOKEN";
/// Environment variable holding a pre-acquired Azure AD Graph token.
pub const ENV_GRAPH_TOKEN: &str = "AZAD_GRAPH_TOKEN";

/// Token sources for both audiences.
#[derive(Clone)]
pub struct Credentials {
    arm: Arc<dyn TokenSource>,
    graph: Arc<dyn TokenSource>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

impl Credentials {
    /// Uses explicit token sources.
    #[must_use]
    pub fn new(arm: Arc<dyn TokenSource>, graph: Arc<dyn TokenSource>) -> Self {
        Self { arm, graph }
    }

    /// Resolves credentials from variables read through `lookup`.
    ///
    /// A static token wins for its audience; otherwise the client secret is
    /// exchanged for tokens on demand.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredentials`] if an audience has neither
    /// a static token nor a client ID and secret.
    pub fn from_env<F>(config: &AzadConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let provider = &config.provider;

        let secret = match (&provider.client_id, get(ENV_CLIENT_SECRET)) {
            (Some(client_id), Some(secret)) if !client_id.is_empty() => {
                debug!("Using client secret credential for {client_id}");
                let credential = ClientSecretCredential::new(
                    provider.authority(),
                    provider.tenant_id.clone(),
                    client_id.clone(),
                    secret,
                )?;
                Some(Arc::new(credential) as Arc<dyn TokenSource>)
            }
            _ => None,
        };

        let pick = |token: Option<String>, audience: &str| -> Result<Arc<dyn TokenSource>> {
            if let Some(token) = token {
                debug!("Using static token for {audience}");
                return Ok(Arc::new(StaticToken::new(token)));
            }
            secret.clone().ok_or_else(|| {
                ConfigError::MissingCredentials {
                    message: format!(
                        "no credentials for {audience}: set {ENV_ARM_TOKEN}/{ENV_GRAPH_TOKEN}, or provider.client_id and {ENV_CLIENT_SECRET}"
                    ),
                }
                .into()
            })
        };

        Ok(Self {
            arm: pick(get(ENV_ARM_TOKEN), "Resource Manager")?,
            graph: pick(get(ENV_GRAPH_TOKEN), "Azure AD Graph")?,
        })
    }
}

/// Clients and the reconciler shared by every handler in a run.
#[derive(Debug, Clone)]
pub struct ProviderContext {
    arm: ArmClient,
    graph: GraphClient,
    reconciler: LroReconciler,
}

impl ProviderContext {
    /// Assembles a context from prebuilt parts.
    #[must_use]
    pub const fn new(arm: ArmClient, graph: GraphClient, reconciler: LroReconciler) -> Self {
        Self {
            arm,
            graph,
            reconciler,
        }
    }

    /// Builds clients for the configured cloud.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be created.
    pub fn from_config(config: &AzadConfig, credentials: Credentials, cancel: CancellationToken) -> Result<Self> {
        let provider = &config.provider;
        info!(
            "Targeting subscription {} in the {} cloud",
            provider.subscription_id, provider.cloud
        );

        let arm_http = AzureHttp::new(credentials.arm, provider.cloud.arm_audience())?;
        let graph_http = AzureHttp::new(credentials.graph, provider.cloud.graph_endpoint())?;

        Ok(Self::new(
            ArmClient::new(arm_http, provider.arm_endpoint(), provider.subscription_id.clone()),
            GraphClient::new(graph_http, provider.graph_endpoint(), provider.tenant_id.clone()),
            LroReconciler::new(config.polling.to_settings(), cancel),
        ))
    }

    /// Resource Manager client.
    #[must_use]
    pub const fn arm(&self) -> &ArmClient {
        &self.arm
    }

    /// Azure AD Graph client.
    #[must_use]
    pub const fn graph(&self) -> &GraphClient {
        &self.graph
    }

    /// Long-running operation reconciler.
    #[must_use]
    pub const fn reconciler(&self) -> &LroReconciler {
        &self.reconciler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigParser, ENV_CLIENT_ID};
    use crate::error::AzadError;
    use std::collections::HashMap;

    fn config() -> AzadConfig {
        ConfigParser::new()
            .parse_yaml(
                "provider:\n  subscription_id: sub\n  tenant_id: tenant\n",
                None,
            )
            .expect("config parses")
    }

    fn env(pairs: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |key| map.get(key).map(|v| (*v).to_string())
    }

    #[test]
    fn test_missing_credentials() {
        let err = Credentials::from_env(&config(), env(&[(ENV_ARM_TOKEN, "arm")])).unwrap_err();
        assert!(matches!(err, AzadError::Config(ConfigError::MissingCredentials { .. })));
        assert!(err.to_string().contains("Azure AD Graph"));
    }

    #[test]
    fn test_secret_without_client_id_is_not_enough() {
        let err = Credentials::from_env(&config(), env(&[(ENV_CLIENT_SECRET, "s")])).unwrap_err();
        assert!(matches!(err, AzadError::Config(ConfigError::MissingCredentials { .. })));
    }

    #[tokio::test]
    async fn test_static_tokens() {
        let creds = Credentials::from_env(
            &config(),
            env(&[(ENV_ARM_TOKEN, "arm-token"), (ENV_GRAPH_TOKEN, "graph-token")]),
        )
        .expect("credentials");

        assert_eq!(creds.arm.token("x").await.expect("arm token"), "arm-token");
        assert_eq!(creds.graph.token("y").await.expect("graph token"), "graph-token");
    }

    #[test]
    fn test_client_secret_covers_both_audiences() {
        let mut cfg = config();
        crate::config::apply_env_overrides(&mut cfg, env(&[(ENV_CLIENT_ID, "app")]));

        let creds = Credentials::from_env(&cfg, env(&[(ENV_CLIENT_SECRET, "secret")])).expect("credentials");
        let context = ProviderContext::from_config(&cfg, creds, CancellationToken::new()).expect("context");

        assert_eq!(context.arm().subscription_id(), "sub");
        assert_eq!(context.graph().tenant_id(), "tenant");
        assert_eq!(context.reconciler().settings().interval.as_secs(), 10);
    }
}
