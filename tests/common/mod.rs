//! Shared fixtures for the integration tests.
//!
//! Clients point at a wiremock server, authenticate with a static token,
//! and poll fast enough that a full operation finishes in milliseconds.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use azad_provision::azure::{ArmClient, AzureHttp, GraphClient, StaticToken};
use azad_provision::config::DomainServicesConfig;
use azad_provision::context::ProviderContext;
use azad_provision::lro::{LroReconciler, PollSettings};
use tokio_util::sync::CancellationToken;
use wiremock::MockServer;

pub const SUBSCRIPTION: &str = "11111111-1111-1111-1111-111111111111";
pub const TENANT: &str = "22222222-2222-2222-2222-222222222222";
pub const TOKEN: &str = "test-token";

pub fn http() -> AzureHttp {
    AzureHttp::new(Arc::new(StaticToken::new(TOKEN)), "https://management.azure.com/")
        .expect("http client")
        .with_retry_delay(Duration::from_millis(5))
}

pub fn arm(server: &MockServer) -> ArmClient {
    ArmClient::new(http(), &server.uri(), SUBSCRIPTION)
}

pub fn graph(server: &MockServer) -> GraphClient {
    GraphClient::new(http(), &server.uri(), TENANT)
}

pub fn fast_settings() -> PollSettings {
    PollSettings {
        interval: Duration::from_millis(10),
        max_interval: Duration::from_millis(50),
        timeout: Duration::from_secs(5),
    }
}

pub fn reconciler(cancel: CancellationToken) -> LroReconciler {
    LroReconciler::new(fast_settings(), cancel)
}

pub fn context(server: &MockServer) -> ProviderContext {
    ProviderContext::new(arm(server), graph(server), reconciler(CancellationToken::new()))
}

pub fn domain_path(resource_group: &str, domain_name: &str) -> String {
    format!(
        "/subscriptions/{SUBSCRIPTION}/resourceGroups/{resource_group}/providers/Microsoft.AAD/domainServices/{domain_name}"
    )
}

pub fn block(name: &str, domain_name: &str) -> DomainServicesConfig {
    let vnet = format!(
        "/subscriptions/{SUBSCRIPTION}/resourceGroups/network-rg/providers/Microsoft.Network/virtualNetworks/core"
    );
    DomainServicesConfig {
        name: name.to_string(),
        resource_group_name: String::from("identity-rg"),
        domain_name: domain_name.to_string(),
        tenant_id: TENANT.to_string(),
        subnet_id: format!("{vnet}/subnets/aadds"),
        virtual_network_id: vnet,
    }
}

/// The body ARM returns for a provisioned instance of `block`.
pub fn domain_body(block: &DomainServicesConfig) -> serde_json::Value {
    serde_json::json!({
        "id": domain_path(&block.resource_group_name, &block.domain_name),
        "name": block.domain_name,
        "type": "Microsoft.AAD/domainServices",
        "properties": {
            "tenantId": block.tenant_id,
            "domainName": block.domain_name,
            "vnetSiteID": block.virtual_network_id,
            "subnetId": block.subnet_id,
            "domainControllerIpAddress": ["10.0.1.4", "10.0.1.5"],
            "provisioningState": "Succeeded"
        }
    })
}
