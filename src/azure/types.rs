//! Wire types for Azure Resource Manager and Azure AD Graph.

use serde::{Deserialize, Serialize};

use crate::lookup::{FilterField, Matchable};

/// An Azure AD Domain Services instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomainService {
    /// ARM resource ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Resource name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Resource properties.
    #[serde(default)]
    pub properties: DomainServiceProperties,
}

/// Properties of a Domain Services instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DomainServiceProperties {
    /// Azure AD tenant the managed domain serves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// DNS name of the managed domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_name: Option<String>,
    /// Virtual network the domain controllers join.
    #[serde(rename = "vnetSiteID", default, skip_serializing_if = "Option::is_none")]
    pub vnet_site_id: Option<String>,
    /// Subnet the domain controllers join.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    /// Domain controller IP addresses, once provisioned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_controller_ip_address: Option<Vec<String>>,
    /// ARM provisioning state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

/// An Azure Policy definition.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct PolicyDefinition {
    /// ARM resource ID.
    #[serde(default)]
    pub id: Option<String>,
    /// Definition name.
    #[serde(default)]
    pub name: Option<String>,
    /// Definition properties.
    #[serde(default)]
    pub properties: PolicyDefinitionProperties,
}

/// Properties of a policy definition.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDefinitionProperties {
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// `BuiltIn`, `Custom` or `NotSpecified`.
    #[serde(default)]
    pub policy_type: Option<String>,
}

/// Body of an `Azure-AsyncOperation` status monitor.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationStatusBody {
    /// `InProgress`, `Succeeded`, `Failed` or `Canceled`.
    pub status: String,
    /// Failure detail.
    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

/// Azure error detail.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorDetail {
    /// Error code.
    #[serde(default)]
    pub code: Option<String>,
    /// Error message.
    #[serde(default)]
    pub message: Option<String>,
}

/// An Azure AD service principal.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipal {
    /// Directory object ID.
    #[serde(default)]
    pub object_id: Option<String>,
    /// Application (client) ID.
    #[serde(default)]
    pub app_id: Option<String>,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Matchable for ServicePrincipal {
    fn field(&self, field: FilterField) -> Option<&str> {
        match field {
            FilterField::DisplayName => self.display_name.as_deref(),
            FilterField::ApplicationId => self.app_id.as_deref(),
        }
    }
}

/// An Azure AD application registration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    /// Directory object ID.
    #[serde(default)]
    pub object_id: Option<String>,
    /// Application (client) ID.
    #[serde(default)]
    pub app_id: Option<String>,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Homepage URL.
    #[serde(default)]
    pub homepage: Option<String>,
    /// Identifier URIs.
    #[serde(default)]
    pub identifier_uris: Vec<String>,
    /// Reply URLs.
    #[serde(default)]
    pub reply_urls: Vec<String>,
    /// Whether the implicit OAuth2 flow is allowed.
    #[serde(default)]
    pub oauth2_allow_implicit_flow: Option<bool>,
}

impl Matchable for Application {
    fn field(&self, field: FilterField) -> Option<&str> {
        match field {
            FilterField::DisplayName => self.display_name.as_deref(),
            FilterField::ApplicationId => self.app_id.as_deref(),
        }
    }
}

/// A page of an OData listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ODataPage<T> {
    /// Entities on this page.
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    /// Relative or absolute link to the next page.
    #[serde(rename = "odata.nextLink", default)]
    pub next_link: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_service_body_uses_arm_field_names() {
        let body = DomainService {
            properties: DomainServiceProperties {
                tenant_id: Some(String::from("t")),
                domain_name: Some(String::from("corp.example.com")),
                vnet_site_id: Some(String::from("/vnet")),
                subnet_id: Some(String::from("/vnet/subnets/aadds")),
                ..DomainServiceProperties::default()
            },
            ..DomainService::default()
        };

        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "properties": {
                    "tenantId": "t",
                    "domainName": "corp.example.com",
                    "vnetSiteID": "/vnet",
                    "subnetId": "/vnet/subnets/aadds"
                }
            })
        );
    }

    #[test]
    fn test_application_parses_graph_fields() {
        let app: Application = serde_json::from_value(serde_json::json!({
            "objectId": "o1",
            "appId": "a1",
            "displayName": "acctest",
            "homepage": "http://acctest",
            "identifierUris": ["api://acctest"],
            "replyUrls": [],
            "oauth2AllowImplicitFlow": true
        }))
        .expect("parse");

        assert_eq!(app.identifier_uris, vec![String::from("api://acctest")]);
        assert_eq!(app.oauth2_allow_implicit_flow, Some(true));
        assert_eq!(app.field(FilterField::DisplayName), Some("acctest"));
    }
}
