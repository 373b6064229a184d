//! Policy definition data source.

use serde::Serialize;

use crate::azure::{ArmClient, PolicyDefinition, ResourceId};
use crate::error::{LookupError, Result};

/// Policy definitions API version.
pub const API_VERSION: &str = "2016-12-01";

/// A resolved policy definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyDefinitionData {
    /// ARM resource ID.
    pub id: String,
    /// Definition name.
    pub name: String,
    /// Display name.
    pub display_name: String,
    /// `BuiltIn`, `Custom` or `NotSpecified`.
    pub policy_type: String,
}

/// Reads a subscription-visible policy definition by name.
///
/// # Errors
///
/// Returns [`LookupError::NotFound`] if no definition has that name, or the
/// request error otherwise.
pub async fn read_policy_definition(arm: &ArmClient, name: &str) -> Result<PolicyDefinitionData> {
    if name.is_empty() {
        return Err(LookupError::MissingKey { allowed: vec!["name"] }.into());
    }

    let id = ResourceId::in_subscription(
        arm.subscription_id(),
        "Microsoft.Authorization",
        "policyDefinitions",
        name,
    );

    let definition: PolicyDefinition = arm
        .get(&id, API_VERSION)
        .await
        .map_err(|e| e.context(format!("Error making Read request on ARM policy definition with name {name:?}")))?
        .ok_or_else(|| LookupError::not_found(format!("ARM policy definition with name {name:?} was not found")))?;

    Ok(PolicyDefinitionData {
        id: definition.id.unwrap_or_else(|| id.to_string()),
        name: definition.name.unwrap_or_else(|| name.to_string()),
        display_name: definition.properties.display_name.unwrap_or_default(),
        policy_type: definition.properties.policy_type.unwrap_or_default(),
    })
}
