//! State types for tracking managed resources.
//!
//! These types record what was last provisioned, so planning can decide
//! between create, replace, delete and no-op without querying Azure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current version of the state format.
pub const STATE_VERSION: &str = "1";

/// The complete provider state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderState {
    /// State format version.
    pub version: String,
    /// Subscription the resources live in.
    pub subscription_id: String,
    /// Tracked resources keyed by local name.
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceRecord>,
    /// When the state was last updated.
    pub last_updated: DateTime<Utc>,
}

/// Kinds of managed resources.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// `Microsoft.AAD/domainServices`.
    DomainServices,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DomainServices => write!(f, "domain_services"),
        }
    }
}

/// The recorded state of one managed resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceRecord {
    /// Resource kind.
    pub kind: ResourceKind,
    /// ARM resource ID.
    pub id: String,
    /// Fingerprint of the replace-on-change arguments when provisioned.
    pub fingerprint: String,
    /// Last observed attributes.
    #[serde(default)]
    pub attributes: serde_json::Value,
    /// When the resource was created or imported.
    pub created_at: DateTime<Utc>,
    /// When the record was last refreshed.
    pub updated_at: DateTime<Utc>,
}

impl ProviderState {
    /// Creates an empty state for a subscription.
    #[must_use]
    pub fn new(subscription_id: &str) -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            subscription_id: subscription_id.to_string(),
            resources: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }

    /// Gets a resource by local name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ResourceRecord> {
        self.resources.get(name)
    }

    /// Adds or replaces a resource.
    pub fn set(&mut self, name: &str, record: ResourceRecord) {
        self.resources.insert(name.to_string(), record);
        self.last_updated = Utc::now();
    }

    /// Removes a resource by local name.
    pub fn remove(&mut self, name: &str) -> Option<ResourceRecord> {
        let result = self.resources.remove(name);
        if result.is_some() {
            self.last_updated = Utc::now();
        }
        result
    }

    /// Returns all tracked names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }
}

impl ResourceRecord {
    /// Creates a record for a freshly provisioned resource.
    #[must_use]
    pub fn new(kind: ResourceKind, id: &str, fingerprint: &str, attributes: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            kind,
            id: id.to_string(),
            fingerprint: fingerprint.to_string(),
            attributes,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces the observed attributes.
    pub fn refresh(&mut self, attributes: serde_json::Value) {
        self.attributes = attributes;
        self.updated_at = Utc::now();
    }
}
