//! Resource lifecycle handlers and data sources.
//!
//! Handlers translate user-facing arguments into Azure calls; long-running
//! calls go through the reconciler, directory reads through the lookup.

pub mod application;
pub mod domain_services;
pub mod policy_definition;
pub mod service_principal;

pub use application::{ApplicationArgs, ApplicationData, read_application};
pub use domain_services::{DomainServicesResource, DomainServicesState};
pub use policy_definition::{PolicyDefinitionData, read_policy_definition};
pub use service_principal::{ServicePrincipalArgs, ServicePrincipalData, read_service_principal};
