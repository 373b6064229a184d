//! Azure API integration module.
//!
//! This module provides the HTTP clients for Azure Resource Manager and
//! Azure AD Graph, credential handling, and ARM resource-ID parsing.

mod arm;
mod auth;
mod graph;
mod http;
mod resource_id;
mod types;

pub use arm::ArmClient;
pub use auth::{ClientSecretCredential, StaticToken, TokenSource};
pub use graph::{GRAPH_API_VERSION, GraphClient};
pub use http::{ApiResponse, AzureHttp};
pub use resource_id::ResourceId;
pub use types::{
    Application, DomainService, DomainServiceProperties, ErrorDetail, ODataPage, OperationStatusBody,
    PolicyDefinition, PolicyDefinitionProperties, ServicePrincipal,
};
