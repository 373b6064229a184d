//! Configuration validation for `azad.yaml`.
//!
//! Collects every problem in one pass so users can fix a file in a single
//! round trip. Errors block planning; warnings are reported and ignored.

use crate::azure::ResourceId;
use crate::error::{AzadError, ConfigError, Result};
use std::collections::HashSet;
use tracing::debug;

use super::spec::{AzadConfig, DomainServicesConfig, PollingConfig, ProviderSettings};

/// Validator for project configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a configuration.
    ///
    /// # Errors
    ///
    /// Returns the first error if validation fails; [`Self::check`] returns
    /// all of them.
    pub fn validate(&self, config: &AzadConfig) -> Result<ValidationResult> {
        let result = self.check(config);

        match result.errors.first() {
            None => {
                debug!("Configuration validation passed");
                Ok(result)
            }
            Some(first) => Err(AzadError::Config(ConfigError::validation(
                first.message.clone(),
                first.field.clone(),
            ))),
        }
    }

    /// Runs every check and returns all findings.
    #[must_use]
    pub fn check(&self, config: &AzadConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_provider(&config.provider, &mut result);
        Self::validate_polling(&config.polling, &mut result);
        Self::validate_domain_services(&config.domain_services, &mut result);

        result
    }

    fn validate_provider(provider: &ProviderSettings, result: &mut ValidationResult) {
        if provider.subscription_id.is_empty() {
            result.error(
                "provider.subscription_id",
                "Subscription ID is required (set it in azad.yaml or AZAD_SUBSCRIPTION_ID)",
            );
        }

        if provider.tenant_id.is_empty() {
            result.error(
                "provider.tenant_id",
                "Tenant ID is required (set it in azad.yaml or AZAD_TENANT_ID)",
            );
        } else if !is_guid(&provider.tenant_id) {
            result.warnings.push(format!(
                "provider.tenant_id '{}' is not a GUID; tenant domain names work for Graph but not every API",
                provider.tenant_id
            ));
        }

        if provider.client_id.as_ref().is_some_and(String::is_empty) {
            result.error("provider.client_id", "Client ID cannot be empty when set");
        }
    }

    fn validate_polling(polling: &PollingConfig, result: &mut ValidationResult) {
        if polling.interval_secs == 0 {
            result.error("polling.interval_secs", "Polling interval must be at least 1 second");
        }

        if polling.timeout_secs == 0 {
            result.error("polling.timeout_secs", "Polling timeout must be at least 1 second");
        }

        if polling.interval_secs > polling.timeout_secs {
            result.warnings.push(format!(
                "polling.interval_secs ({}) exceeds polling.timeout_secs ({}); operations get a single poll",
                polling.interval_secs, polling.timeout_secs
            ));
        }

        if polling.max_interval_secs < polling.interval_secs {
            result.warnings.push(format!(
                "polling.max_interval_secs ({}) is below polling.interval_secs ({}) and will be ignored",
                polling.max_interval_secs, polling.interval_secs
            ));
        }
    }

    fn validate_domain_services(blocks: &[DomainServicesConfig], result: &mut ValidationResult) {
        let mut names = HashSet::new();
        let mut domains = HashSet::new();

        for (i, block) in blocks.iter().enumerate() {
            let prefix = format!("domain_services[{i}]");

            if block.name.is_empty() {
                result.error(format!("{prefix}.name"), "Name cannot be empty");
            } else if !is_valid_name(&block.name) {
                result.error(
                    format!("{prefix}.name"),
                    format!(
                        "Name '{}' is invalid. Must be lowercase alphanumeric with hyphens or underscores.",
                        block.name
                    ),
                );
            } else if !names.insert(block.name.as_str()) {
                result.error(
                    format!("{prefix}.name"),
                    format!("Duplicate resource name: {}", block.name),
                );
            }

            for (field, value) in [
                ("resource_group_name", &block.resource_group_name),
                ("domain_name", &block.domain_name),
                ("tenant_id", &block.tenant_id),
                ("virtual_network_id", &block.virtual_network_id),
                ("subnet_id", &block.subnet_id),
            ] {
                if value.is_empty() {
                    result.error(format!("{prefix}.{field}"), format!("{field} is required"));
                }
            }

            if !block.domain_name.is_empty()
                && !domains.insert(block.domain_name.to_ascii_lowercase())
            {
                result.warnings.push(format!(
                    "{prefix}.domain_name '{}' is managed by more than one block",
                    block.domain_name
                ));
            }

            if !block.tenant_id.is_empty() && !is_guid(&block.tenant_id) {
                result.warnings.push(format!(
                    "{prefix}.tenant_id '{}' is not a GUID",
                    block.tenant_id
                ));
            }

            Self::validate_network(&prefix, block, result);
        }
    }

    fn validate_network(prefix: &str, block: &DomainServicesConfig, result: &mut ValidationResult) {
        let vnet = parse_id(&format!("{prefix}.virtual_network_id"), &block.virtual_network_id, result);
        let subnet = parse_id(&format!("{prefix}.subnet_id"), &block.subnet_id, result);

        if let (Some(vnet), Some(subnet)) = (vnet, subnet)
            && !subnet.is_within(&vnet)
        {
            result.warnings.push(format!(
                "{prefix}.subnet_id is not inside {prefix}.virtual_network_id ({})",
                block.virtual_network_id
            ));
        }
    }
}

/// Parses a non-empty ARM ID, recording a warning when it is malformed.
fn parse_id(field: &str, value: &str, result: &mut ValidationResult) -> Option<ResourceId> {
    if value.is_empty() {
        return None;
    }

    match value.parse::<ResourceId>() {
        Ok(id) => Some(id),
        Err(e) => {
            result.warnings.push(format!("{field}: {e}"));
            None
        }
    }
}

/// Validates that a name follows the naming convention.
/// Names must be lowercase alphanumeric with hyphens or underscores,
/// starting with a letter.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();

    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_lowercase() {
        return false;
    }

    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

/// Returns true for a canonical 8-4-4-4-12 hex GUID.
fn is_guid(value: &str) -> bool {
    let groups: Vec<&str> = value.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(g, len)| g.len() == len && g.chars().all(|c| c.is_ascii_hexdigit()))
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StateConfig;

    const TENANT: &str = "72f988bf-86f1-41af-91ab-2d7cd011db47";
    const VNET: &str = "/subscriptions/s/resourceGroups/net/providers/Microsoft.Network/virtualNetworks/hub";

    fn block(name: &str) -> DomainServicesConfig {
        DomainServicesConfig {
            name: name.to_string(),
            resource_group_name: String::from("identity-rg"),
            domain_name: format!("{name}.example.com"),
            tenant_id: TENANT.to_string(),
            virtual_network_id: VNET.to_string(),
            subnet_id: format!("{VNET}/subnets/aadds"),
        }
    }

    fn config(blocks: Vec<DomainServicesConfig>) -> AzadConfig {
        AzadConfig {
            provider: ProviderSettings {
                subscription_id: String::from("s"),
                tenant_id: TENANT.to_string(),
                ..ProviderSettings::default()
            },
            polling: PollingConfig::default(),
            state: StateConfig::default(),
            domain_services: blocks,
        }
    }

    #[test]
    fn test_valid_name() {
        assert!(is_valid_name("corp"));
        assert!(is_valid_name("corp_domain-2"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("Corp"));
        assert!(!is_valid_name("1corp"));
        assert!(!is_valid_name("corp.example"));
    }

    #[test]
    fn test_is_guid() {
        assert!(is_guid(TENANT));
        assert!(!is_guid("contoso.onmicrosoft.com"));
        assert!(!is_guid("72f988bf-86f1-41af-91ab-2d7cd011db4"));
    }

    #[test]
    fn test_valid_config_passes() {
        let result = ConfigValidator::new()
            .validate(&config(vec![block("corp")]))
            .expect("valid config");
        assert_eq!(result.warning_count(), 0);
    }

    #[test]
    fn test_all_errors_are_collected() {
        let mut cfg = config(vec![block("corp"), block("corp")]);
        cfg.provider.subscription_id.clear();
        cfg.domain_services[0].resource_group_name.clear();

        let result = ConfigValidator::new().check(&cfg);
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();

        assert_eq!(result.error_count(), 3);
        assert!(fields.contains(&"provider.subscription_id"));
        assert!(fields.contains(&"domain_services[0].resource_group_name"));
        assert!(fields.contains(&"domain_services[1].name"));
        assert!(ConfigValidator::new().validate(&cfg).is_err());
    }

    #[test]
    fn test_network_warnings() {
        let mut subnet_elsewhere = block("corp");
        subnet_elsewhere.subnet_id = String::from(
            "/subscriptions/s/resourceGroups/net/providers/Microsoft.Network/virtualNetworks/spoke/subnets/aadds",
        );
        let mut malformed = block("lab");
        malformed.virtual_network_id = String::from("hub");

        let result = ConfigValidator::new().check(&config(vec![subnet_elsewhere, malformed]));

        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 2);
        assert!(result.warnings[0].contains("is not inside"));
        assert!(result.warnings[1].contains("virtual_network_id"));
    }

    #[test]
    fn test_polling_and_tenant_warnings() {
        let mut cfg = config(Vec::new());
        cfg.provider.tenant_id = String::from("contoso.onmicrosoft.com");
        cfg.polling.interval_secs = 120;
        cfg.polling.timeout_secs = 60;

        let result = ConfigValidator::new().check(&cfg);

        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 3);
    }
}
