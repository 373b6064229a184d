//! Parsing and formatting of Azure Resource Manager resource IDs.

use std::fmt;
use std::str::FromStr;

use crate::error::ApiError;

/// A parsed ARM resource ID.
///
/// IDs are sequences of `key/value` segment pairs, e.g.
/// `/subscriptions/{s}/resourceGroups/{rg}/providers/{ns}/{type}/{name}`.
/// Keys compare case-insensitively; values are kept as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    segments: Vec<(String, String)>,
}

impl ResourceId {
    /// Builds the ID of a resource in a resource group.
    #[must_use]
    pub fn in_resource_group(
        subscription_id: &str,
        resource_group: &str,
        provider: &str,
        resource_type: &str,
        name: &str,
    ) -> Self {
        Self {
            segments: vec![
                (String::from("subscriptions"), subscription_id.to_string()),
                (String::from("resourceGroups"), resource_group.to_string()),
                (String::from("providers"), provider.to_string()),
                (resource_type.to_string(), name.to_string()),
            ],
        }
    }

    /// Builds the ID of a subscription-scoped resource.
    #[must_use]
    pub fn in_subscription(subscription_id: &str, provider: &str, resource_type: &str, name: &str) -> Self {
        Self {
            segments: vec![
                (String::from("subscriptions"), subscription_id.to_string()),
                (String::from("providers"), provider.to_string()),
                (resource_type.to_string(), name.to_string()),
            ],
        }
    }

    /// Returns the value of the first segment with `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.segments
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Subscription ID.
    #[must_use]
    pub fn subscription_id(&self) -> Option<&str> {
        self.get("subscriptions")
    }

    /// Resource group name.
    #[must_use]
    pub fn resource_group(&self) -> Option<&str> {
        self.get("resourceGroups")
    }

    /// Resource provider namespace.
    #[must_use]
    pub fn provider(&self) -> Option<&str> {
        self.get("providers")
    }

    /// Type key of the last segment, e.g. `domainServices`.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        self.segments.last().map_or("", |(k, _)| k.as_str())
    }

    /// Name of the resource (the last segment's value).
    #[must_use]
    pub fn name(&self) -> &str {
        self.segments.last().map_or("", |(_, v)| v.as_str())
    }

    /// Returns true if `self` is `other` or nested beneath it.
    #[must_use]
    pub fn is_within(&self, other: &Self) -> bool {
        other.segments.len() <= self.segments.len()
            && other
                .segments
                .iter()
                .zip(&self.segments)
                .all(|((ok, ov), (sk, sv))| ok.eq_ignore_ascii_case(sk) && ov.eq_ignore_ascii_case(sv))
    }

    /// Returns this ID's path, suitable for appending to an ARM endpoint.
    #[must_use]
    pub fn path(&self) -> String {
        self.to_string()
    }
}

impl FromStr for ResourceId {
    type Err = ApiError;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ApiError::InvalidResourceId {
            id: id.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = id
            .strip_prefix('/')
            .ok_or_else(|| invalid("must start with '/'"))?
            .trim_end_matches('/');

        let parts: Vec<&str> = trimmed.split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid("contains an empty segment"));
        }
        if parts.len() % 2 != 0 {
            return Err(invalid("segments must come in key/value pairs"));
        }

        let segments: Vec<(String, String)> = parts
            .chunks_exact(2)
            .map(|pair| (pair[0].to_string(), pair[1].to_string()))
            .collect();

        let parsed = Self { segments };
        if parsed.subscription_id().is_none() {
            return Err(invalid("missing subscriptions segment"));
        }
        Ok(parsed)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.segments {
            write!(f, "/{key}/{value}")?;
        }
        Ok(())
    }
}
