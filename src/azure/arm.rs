//! Azure Resource Manager client.
//!
//! Starts long-running PUT and DELETE operations and polls them following the
//! ARM asynchronous-operation protocol: an `Azure-AsyncOperation` status
//! monitor when the service returns one, else the `Location` header, else the
//! resource's own `provisioningState`.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::Result;
use crate::lro::{
    OperationFailure, OperationHandle, OperationPoller, OperationStatus, PollKind, PollOutcome,
};

use super::http::{ApiResponse, AzureHttp};
use super::resource_id::ResourceId;
use super::types::OperationStatusBody;

/// Header naming the status monitor of an asynchronous operation.
const ASYNC_OPERATION_HEADER: &str = "azure-asyncoperation";

/// Header naming the location to poll for a 202 response.
const LOCATION_HEADER: &str = "location";

/// Azure Resource Manager client scoped to one subscription.
#[derive(Debug, Clone)]
pub struct ArmClient {
    http: AzureHttp,
    endpoint: String,
    subscription_id: String,
}

impl ArmClient {
    /// Creates a client for `endpoint` and `subscription_id`.
    #[must_use]
    pub fn new(http: AzureHttp, endpoint: &str, subscription_id: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            subscription_id: subscription_id.into(),
        }
    }

    /// The subscription this client operates in.
    #[must_use]
    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// Builds the request URL for a resource.
    #[must_use]
    pub fn url(&self, id: &ResourceId, api_version: &str) -> String {
        format!("{}{}?api-version={api_version}", self.endpoint, id.path())
    }

    /// Reads a resource. A missing resource is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be parsed.
    pub async fn get<T: DeserializeOwned>(&self, id: &ResourceId, api_version: &str) -> Result<Option<T>> {
        let url = self.url(id, api_version);
        match self.http.send(Method::GET, &url, None).await {
            Ok(response) => response.json().map(Some),
            Err(e) if e.is_not_found() => {
                debug!("Resource not found: {id}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Starts a create-or-update.
    ///
    /// # Errors
    ///
    /// Returns an error if the service rejects the request.
    pub async fn begin_put(
        &self,
        id: &ResourceId,
        api_version: &str,
        body: &serde_json::Value,
    ) -> Result<OperationHandle> {
        let url = self.url(id, api_version);
        info!("PUT {id}");
        let response = self.http.send(Method::PUT, &url, Some(body)).await?;
        Ok(Self::handle_for(&response, url))
    }

    /// Starts a delete. A resource that is already gone yields a completed
    /// handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the service rejects the request.
    pub async fn begin_delete(&self, id: &ResourceId, api_version: &str) -> Result<OperationHandle> {
        let url = self.url(id, api_version);
        info!("DELETE {id}");
        match self.http.send(Method::DELETE, &url, None).await {
            Ok(response) => Ok(Self::handle_for(&response, url)),
            Err(e) if e.is_not_found() => {
                debug!("{id} is already gone");
                Ok(OperationHandle::completed(url))
            }
            Err(e) => Err(e),
        }
    }

    /// Picks the polling strategy for an initiating response.
    fn handle_for(response: &ApiResponse, resource_url: String) -> OperationHandle {
        let retry_after = response.retry_after();

        if let Some(monitor) = response.header(ASYNC_OPERATION_HEADER) {
            return OperationHandle::new(monitor, PollKind::StatusMonitor).with_retry_after(retry_after);
        }

        if response.status == StatusCode::ACCEPTED
            && let Some(location) = response.header(LOCATION_HEADER)
        {
            return OperationHandle::new(location, PollKind::Location).with_retry_after(retry_after);
        }

        let state = response
            .body
            .as_ref()
            .and_then(|b| b.pointer("/properties/provisioningState"))
            .and_then(serde_json::Value::as_str);

        match state {
            Some(s) if !is_terminal_state(s) => {
                OperationHandle::new(resource_url, PollKind::ProvisioningState).with_retry_after(retry_after)
            }
            _ if response.status == StatusCode::CREATED || response.status == StatusCode::ACCEPTED => {
                OperationHandle::new(resource_url, PollKind::ProvisioningState).with_retry_after(retry_after)
            }
            _ => OperationHandle::completed(resource_url),
        }
    }

    async fn poll_status_monitor(&self, handle: &mut OperationHandle) -> Result<PollOutcome<Option<serde_json::Value>>> {
        let response = self.http.send(Method::GET, handle.poll_url(), None).await?;
        handle.set_retry_after(response.retry_after());

        let status: OperationStatusBody = response.json()?;
        debug!("Operation status: {}", status.status);

        Ok(outcome_for_state(&status.status, || {
            let error = status.error.clone().unwrap_or_default();
            OperationFailure::new(
                error.code.unwrap_or_else(|| status.status.clone()),
                error.message.unwrap_or_default(),
            )
        }, response.body.clone()))
    }

    async fn poll_location(&self, handle: &mut OperationHandle) -> Result<PollOutcome<Option<serde_json::Value>>> {
        let response = self.http.send(Method::GET, handle.poll_url(), None).await?;
        handle.set_retry_after(response.retry_after());

        if response.status == StatusCode::ACCEPTED {
            return Ok(PollOutcome::InProgress);
        }
        Ok(PollOutcome::Succeeded(response.body))
    }

    async fn poll_provisioning_state(
        &self,
        handle: &mut OperationHandle,
    ) -> Result<PollOutcome<Option<serde_json::Value>>> {
        let response = match self.http.send(Method::GET, handle.poll_url(), None).await {
            Ok(response) => response,
            // A delete polled through the resource URL ends with a 404.
            Err(e) if e.is_not_found() => return Ok(PollOutcome::Succeeded(None)),
            Err(e) => return Err(e),
        };
        handle.set_retry_after(response.retry_after());

        let state = response
            .body
            .as_ref()
            .and_then(|b| b.pointer("/properties/provisioningState"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or("Succeeded")
            .to_string();
        debug!("Provisioning state: {state}");

        Ok(outcome_for_state(
            &state,
            || OperationFailure::new(state.clone(), format!("provisioning ended in state {state}")),
            response.body.clone(),
        ))
    }
}

#[async_trait]
impl OperationPoller for ArmClient {
    type Output = Option<serde_json::Value>;

    async fn poll(&self, handle: &mut OperationHandle) -> Result<PollOutcome<Self::Output>> {
        match handle.kind() {
            PollKind::Immediate => {
                handle.set_status(OperationStatus::Succeeded);
                Ok(PollOutcome::Succeeded(None))
            }
            PollKind::StatusMonitor => self.poll_status_monitor(handle).await,
            PollKind::Location => self.poll_location(handle).await,
            PollKind::ProvisioningState => self.poll_provisioning_state(handle).await,
        }
    }
}

/// Returns true for provisioning states that end an operation.
fn is_terminal_state(state: &str) -> bool {
    ["Succeeded", "Failed", "Canceled", "Cancelled"]
        .iter()
        .any(|s| s.eq_ignore_ascii_case(state))
}

/// Maps an ARM status string onto a poll outcome.
fn outcome_for_state<F>(
    state: &str,
    failure: F,
    body: Option<serde_json::Value>,
) -> PollOutcome<Option<serde_json::Value>>
where
    F: FnOnce() -> OperationFailure,
{
    if state.eq_ignore_ascii_case("Succeeded") {
        PollOutcome::Succeeded(body)
    } else if is_terminal_state(state) {
        PollOutcome::Failed(failure())
    } else {
        PollOutcome::InProgress
    }
}
