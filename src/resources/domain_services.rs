//! Azure AD Domain Services lifecycle handler.
//!
//! Create and delete are long-running on the ARM side, often taking close to
//! an hour, so both run through the [`LroReconciler`].

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::azure::{ArmClient, DomainService, DomainServiceProperties, ResourceId};
use crate::config::DomainServicesConfig;
use crate::error::{ApiError, AzadError, Result, StateError};
use crate::lro::{LroReconciler, OperationContext};

/// Domain Services API version.
pub const API_VERSION: &str = "2017-01-01";

/// Resource provider namespace.
pub const PROVIDER: &str = "Microsoft.AAD";

/// Resource type within the provider.
pub const RESOURCE_TYPE: &str = "domainServices";

/// Observed state of a Domain Services instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainServicesState {
    /// ARM resource ID.
    pub id: String,
    /// Resource group holding the instance.
    pub resource_group_name: String,
    /// DNS name of the managed domain.
    pub domain_name: String,
    /// Azure AD tenant the domain serves.
    pub tenant_id: String,
    /// ARM ID of the virtual network.
    pub virtual_network_id: String,
    /// ARM ID of the subnet.
    pub subnet_id: String,
    /// Domain controller addresses; empty until provisioned.
    pub internal_ip_addresses: Vec<String>,
}

impl DomainServicesState {
    fn from_remote(resource_group_name: &str, remote: DomainService) -> Result<Self> {
        let Some(id) = remote.id else {
            return Err(ApiError::invalid_response("response carries no resource ID").into());
        };

        let props = remote.properties;
        Ok(Self {
            id,
            resource_group_name: resource_group_name.to_string(),
            domain_name: props.domain_name.or(remote.name).unwrap_or_default(),
            tenant_id: props.tenant_id.unwrap_or_default(),
            virtual_network_id: props.vnet_site_id.unwrap_or_default(),
            subnet_id: props.subnet_id.unwrap_or_default(),
            internal_ip_addresses: props.domain_controller_ip_address.unwrap_or_default(),
        })
    }

    /// Returns true if `args` describes this instance. Resource group names
    /// compare case-insensitively.
    #[must_use]
    pub fn matches(&self, args: &DomainServicesConfig) -> bool {
        self.resource_group_name.eq_ignore_ascii_case(&args.resource_group_name)
            && self.domain_name == args.domain_name
            && self.tenant_id == args.tenant_id
            && self.virtual_network_id == args.virtual_network_id
            && self.subnet_id == args.subnet_id
    }

    /// Serializes for storage in state.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_attributes(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self)
            .map_err(|e| StateError::serialization(format!("Failed to serialize Domain Services state: {e}")).into())
    }
}

/// Create, read, delete and import for `Microsoft.AAD/domainServices`.
#[derive(Debug, Clone, Copy)]
pub struct DomainServicesResource<'a> {
    arm: &'a ArmClient,
    reconciler: &'a LroReconciler,
}

impl<'a> DomainServicesResource<'a> {
    /// Creates a handler.
    #[must_use]
    pub const fn new(arm: &'a ArmClient, reconciler: &'a LroReconciler) -> Self {
        Self { arm, reconciler }
    }

    /// ARM ID of an instance in the client's subscription.
    #[must_use]
    pub fn resource_id(&self, resource_group_name: &str, domain_name: &str) -> ResourceId {
        ResourceId::in_resource_group(
            self.arm.subscription_id(),
            resource_group_name,
            PROVIDER,
            RESOURCE_TYPE,
            domain_name,
        )
    }

    /// Creates (or updates) an instance and waits for provisioning to finish.
    ///
    /// # Errors
    ///
    /// Returns the reconciler's error if the request is rejected, the
    /// operation fails or times out, or an error if the instance cannot be
    /// read back afterwards.
    pub async fn create(&self, args: &DomainServicesConfig) -> Result<DomainServicesState> {
        let id = self.resource_id(&args.resource_group_name, &args.domain_name);
        let body = DomainService {
            properties: DomainServiceProperties {
                tenant_id: Some(args.tenant_id.clone()),
                domain_name: Some(args.domain_name.clone()),
                vnet_site_id: Some(args.virtual_network_id.clone()),
                subnet_id: Some(args.subnet_id.clone()),
                ..DomainServiceProperties::default()
            },
            ..DomainService::default()
        };
        let body = serde_json::to_value(&body)
            .map_err(|e| AzadError::internal(format!("Failed to encode request body: {e}")))?;

        let context = OperationContext::new("Creating/Updating", describe(&args.domain_name, &args.resource_group_name));
        self.reconciler
            .reconcile(&context, || self.arm.begin_put(&id, API_VERSION, &body), self.arm)
            .await?;

        let read_failed = || {
            format!(
                "Error reading the ID of AAD Domain Services {:?} (Resource Group {:?})",
                args.domain_name, args.resource_group_name
            )
        };
        let remote = self
            .arm
            .get::<DomainService>(&id, API_VERSION)
            .await
            .map_err(|e| e.context(read_failed()))?
            .ok_or_else(|| AzadError::Api(ApiError::NotFound { url: id.to_string() }).context(read_failed()))?;

        let state = DomainServicesState::from_remote(&args.resource_group_name, remote)
            .map_err(|e| e.context(read_failed()))?;
        info!("Provisioned {} ({})", state.domain_name, state.id);
        Ok(state)
    }

    /// Reads an instance. A missing instance is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for any reason other than 404.
    pub async fn read(&self, resource_group_name: &str, domain_name: &str) -> Result<Option<DomainServicesState>> {
        let id = self.resource_id(resource_group_name, domain_name);
        self.read_id(&id, resource_group_name).await
    }

    async fn read_id(&self, id: &ResourceId, resource_group_name: &str) -> Result<Option<DomainServicesState>> {
        let remote = self.arm.get::<DomainService>(id, API_VERSION).await.map_err(|e| {
            e.context(format!(
                "Error retrieving Azure AD Domain Services with name {:?} (Resource Group {resource_group_name:?})",
                id.name()
            ))
        })?;

        let Some(remote) = remote else {
            debug!(
                "Azure AD Domain Services with name {:?} (Resource Group {resource_group_name:?}) was not found - removing from state",
                id.name()
            );
            return Ok(None);
        };

        DomainServicesState::from_remote(resource_group_name, remote).map(Some)
    }

    /// Deletes an instance and waits for it to be gone. An instance that is
    /// already gone counts as deleted.
    ///
    /// # Errors
    ///
    /// Returns the reconciler's error if the request is rejected, the
    /// operation fails or times out.
    pub async fn delete(&self, resource_group_name: &str, domain_name: &str) -> Result<()> {
        let id = self.resource_id(resource_group_name, domain_name);
        let context = OperationContext::new("Deleting", describe(domain_name, resource_group_name));

        self.reconciler
            .reconcile(&context, || self.arm.begin_delete(&id, API_VERSION), self.arm)
            .await?;

        info!("Deleted {domain_name}");
        Ok(())
    }

    /// Adopts an existing instance by ARM ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the ID is not a Domain Services ID, or the
    /// instance does not exist.
    pub async fn import(&self, resource_id: &str) -> Result<DomainServicesState> {
        let id: ResourceId = resource_id.parse()?;

        let invalid = |reason: &str| ApiError::InvalidResourceId {
            id: resource_id.to_string(),
            reason: reason.to_string(),
        };
        if !id.provider().is_some_and(|p| p.eq_ignore_ascii_case(PROVIDER))
            || !id.resource_type().eq_ignore_ascii_case(RESOURCE_TYPE)
        {
            return Err(invalid("not a Microsoft.AAD/domainServices ID").into());
        }
        let resource_group_name = id
            .resource_group()
            .ok_or_else(|| invalid("missing resourceGroups segment"))?
            .to_string();

        info!("Importing {id}");
        self.read_id(&id, &resource_group_name)
            .await?
            .ok_or_else(|| {
                AzadError::Api(ApiError::NotFound { url: id.to_string() })
                    .context(format!("Cannot import AAD Domain Services {:?}", id.name()))
            })
    }
}

fn describe(domain_name: &str, resource_group_name: &str) -> String {
    format!("AAD Domain Services {domain_name:?} (Resource Group {resource_group_name:?})")
}
