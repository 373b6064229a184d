//! Configuration module for the azad provisioning system.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `azad.yaml`
//! - Validation of configuration values
//! - Computing fingerprints for change detection

mod spec;
mod parser;
mod validator;
mod hash;

pub use spec::{
    AzadConfig, CloudEnvironment, DomainServicesConfig, PollingConfig, ProviderSettings,
    StateConfig,
};
pub use parser::{
    ConfigParser, DEFAULT_CONFIG_FILES, ENV_CLIENT_ID, ENV_SUBSCRIPTION_ID, ENV_TENANT_ID,
    apply_env_overrides, find_config_file,
};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
pub use hash::ConfigHasher;
