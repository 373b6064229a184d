//! Configuration types for the provisioning system.
//!
//! This module defines all the structs that map to the `azad.yaml` file.
//! These types are declarative and fully describe the desired state.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::lro::PollSettings;

/// The root configuration structure for an azad project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AzadConfig {
    /// Provider (subscription, tenant, credentials) configuration.
    pub provider: ProviderSettings,
    /// Long-running operation polling configuration.
    #[serde(default)]
    pub polling: PollingConfig,
    /// State backend configuration.
    #[serde(default)]
    pub state: StateConfig,
    /// Azure AD Domain Services instances to manage.
    #[serde(default)]
    pub domain_services: Vec<DomainServicesConfig>,
}

/// Provider-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ProviderSettings {
    /// Subscription that owns managed resources.
    #[serde(default)]
    pub subscription_id: String,
    /// Azure AD tenant used for authentication and directory lookups.
    #[serde(default)]
    pub tenant_id: String,
    /// Service principal client ID for the client-credentials grant.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Azure cloud environment.
    #[serde(default)]
    pub cloud: CloudEnvironment,
    /// Overrides the cloud's Resource Manager endpoint.
    #[serde(default)]
    pub arm_endpoint: Option<String>,
    /// Overrides the cloud's Azure AD Graph endpoint.
    #[serde(default)]
    pub graph_endpoint: Option<String>,
    /// Overrides the cloud's Azure AD authority.
    #[serde(default)]
    pub authority: Option<String>,
}

impl ProviderSettings {
    /// Resource Manager endpoint, honouring any override.
    #[must_use]
    pub fn arm_endpoint(&self) -> &str {
        self.arm_endpoint
            .as_deref()
            .unwrap_or_else(|| self.cloud.arm_endpoint())
    }

    /// Azure AD Graph endpoint, honouring any override.
    #[must_use]
    pub fn graph_endpoint(&self) -> &str {
        self.graph_endpoint
            .as_deref()
            .unwrap_or_else(|| self.cloud.graph_endpoint())
    }

    /// Azure AD authority, honouring any override.
    #[must_use]
    pub fn authority(&self) -> &str {
        self.authority
            .as_deref()
            .unwrap_or_else(|| self.cloud.authority())
    }
}

/// Azure cloud environments.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CloudEnvironment {
    /// Azure public cloud.
    #[default]
    Public,
    /// Azure China (21Vianet).
    China,
    /// Azure US Government.
    UsGovernment,
}

impl CloudEnvironment {
    /// Resource Manager endpoint.
    #[must_use]
    pub const fn arm_endpoint(self) -> &'static str {
        match self {
            Self::Public => "https://management.azure.com",
            Self::China => "https://management.chinacloudapi.cn",
            Self::UsGovernment => "https://management.usgovcloudapi.net",
        }
    }

    /// Token audience for Resource Manager.
    #[must_use]
    pub const fn arm_audience(self) -> &'static str {
        match self {
            Self::Public => "https://management.core.windows.net/",
            Self::China => "https://management.core.chinacloudapi.cn/",
            Self::UsGovernment => "https://management.core.usgovcloudapi.net/",
        }
    }

    /// Azure AD Graph endpoint, also its token audience.
    #[must_use]
    pub const fn graph_endpoint(self) -> &'static str {
        match self {
            Self::Public | Self::UsGovernment => "https://graph.windows.net/",
            Self::China => "https://graph.chinacloudapi.cn/",
        }
    }

    /// Azure AD authority host.
    #[must_use]
    pub const fn authority(self) -> &'static str {
        match self {
            Self::Public => "https://login.microsoftonline.com",
            Self::China => "https://login.chinacloudapi.cn",
            Self::UsGovernment => "https://login.microsoftonline.us",
        }
    }
}

impl std::fmt::Display for CloudEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::China => write!(f, "china"),
            Self::UsGovernment => write!(f, "usgovernment"),
        }
    }
}

/// Polling configuration for long-running operations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollingConfig {
    /// Seconds between polls.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Upper bound on a server-suggested delay, in seconds.
    #[serde(default = "default_max_interval_secs")]
    pub max_interval_secs: u64,
    /// Overall deadline per operation, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_interval_secs: default_max_interval_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl PollingConfig {
    /// Converts to reconciler settings.
    #[must_use]
    pub const fn to_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.interval_secs),
            max_interval: Duration::from_secs(self.max_interval_secs),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// State backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StateConfig {
    /// Directory holding the state file, relative to the config file.
    /// Defaults to `.azad`.
    #[serde(default)]
    pub path: Option<String>,
}

/// A managed Azure AD Domain Services instance.
///
/// Every argument forces replacement when changed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomainServicesConfig {
    /// Local name of the block, the key in state.
    pub name: String,
    /// Resource group holding the instance.
    pub resource_group_name: String,
    /// DNS name of the managed domain, also the ARM resource name.
    pub domain_name: String,
    /// Azure AD tenant the domain serves.
    pub tenant_id: String,
    /// ARM ID of the virtual network.
    pub virtual_network_id: String,
    /// ARM ID of the subnet the domain controllers join.
    pub subnet_id: String,
}

fn default_interval_secs() -> u64 {
    10
}

fn default_max_interval_secs() -> u64 {
    60
}

fn default_timeout_secs() -> u64 {
    3600
}

impl AzadConfig {
    /// Finds a Domain Services block by name.
    #[must_use]
    pub fn find_domain_services(&self, name: &str) -> Option<&DomainServicesConfig> {
        self.domain_services.iter().find(|d| d.name == name)
    }

    /// Names of every managed block, in file order.
    #[must_use]
    pub fn resource_names(&self) -> Vec<&str> {
        self.domain_services.iter().map(|d| d.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cloud_endpoints() {
        assert_eq!(CloudEnvironment::Public.arm_endpoint(), "https://management.azure.com");
        assert_eq!(CloudEnvironment::China.graph_endpoint(), "https://graph.chinacloudapi.cn/");
        assert_eq!(
            CloudEnvironment::UsGovernment.authority(),
            "https://login.microsoftonline.us"
        );
    }

    #[test]
    fn test_endpoint_overrides_win() {
        let provider = ProviderSettings {
            arm_endpoint: Some(String::from("http://127.0.0.1:9000")),
            ..ProviderSettings::default()
        };
        assert_eq!(provider.arm_endpoint(), "http://127.0.0.1:9000");
        assert_eq!(provider.graph_endpoint(), "https://graph.windows.net/");
    }

    #[test]
    fn test_polling_defaults() {
        let settings = PollingConfig::default().to_settings();
        assert_eq!(settings, PollSettings::default());
    }
}
