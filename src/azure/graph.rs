//! Azure AD Graph client.
//!
//! Reads service principals and applications from the directory, either by
//! object ID or page by page through `odata.nextLink`.

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::Result;
use crate::lookup::{EntitySource, Page};

use super::http::AzureHttp;
use super::types::{Application, ODataPage, ServicePrincipal};

/// AAD Graph API version.
pub const GRAPH_API_VERSION: &str = "1.6";

/// Azure AD Graph client scoped to one tenant.
#[derive(Debug, Clone)]
pub struct GraphClient {
    http: AzureHttp,
    endpoint: String,
    tenant_id: String,
}

impl GraphClient {
    /// Creates a client for `endpoint` and `tenant_id`.
    #[must_use]
    pub fn new(http: AzureHttp, endpoint: &str, tenant_id: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            tenant_id: tenant_id.into(),
        }
    }

    /// The tenant this client reads from.
    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Builds a request URL for a tenant-relative path.
    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}/{path}?api-version={GRAPH_API_VERSION}",
            self.endpoint, self.tenant_id
        )
    }

    /// Resolves an `odata.nextLink`, which is usually tenant-relative and
    /// already carries a query string.
    fn next_url(&self, link: &str) -> String {
        let base = if link.starts_with("http://") || link.starts_with("https://") {
            link.to_string()
        } else {
            format!("{}/{}/{}", self.endpoint, self.tenant_id, link.trim_start_matches('/'))
        };

        if base.contains("api-version=") {
            base
        } else if base.contains('?') {
            format!("{base}&api-version={GRAPH_API_VERSION}")
        } else {
            format!("{base}?api-version={GRAPH_API_VERSION}")
        }
    }

    async fn get_object<T: DeserializeOwned>(&self, collection: &str, object_id: &str) -> Result<Option<T>> {
        let url = self.url(&format!("{collection}/{object_id}"));
        match self.http.send(Method::GET, &url, None).await {
            Ok(response) => response.json().map(Some),
            Err(e) if e.is_not_found() => {
                debug!("{collection}/{object_id} not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn list<T: DeserializeOwned>(&self, collection: &str, next_link: Option<String>) -> Result<Page<T>> {
        let url = next_link.map_or_else(|| self.url(collection), |link| self.next_url(&link));
        debug!("Listing {collection}: {url}");

        let response = self.http.send(Method::GET, &url, None).await?;
        let page: ODataPage<T> = response.json()?;

        Ok(Page {
            items: page.value,
            next_link: page.next_link.filter(|l| !l.is_empty()),
        })
    }

    /// Fetches a service principal by object ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get_service_principal(&self, object_id: &str) -> Result<Option<ServicePrincipal>> {
        self.get_object("servicePrincipals", object_id).await
    }

    /// Lists one page of service principals.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_service_principals(&self, next_link: Option<String>) -> Result<Page<ServicePrincipal>> {
        self.list("servicePrincipals", next_link).await
    }

    /// Fetches an application by object ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get_application(&self, object_id: &str) -> Result<Option<Application>> {
        self.get_object("applications", object_id).await
    }

    /// Lists one page of applications.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_applications(&self, next_link: Option<String>) -> Result<Page<Application>> {
        self.list("applications", next_link).await
    }
}

#[async_trait]
impl EntitySource<ServicePrincipal> for GraphClient {
    async fn get(&self, id: &str) -> Result<Option<ServicePrincipal>> {
        self.get_service_principal(id).await
    }

    async fn list_page(&self, next_link: Option<String>) -> Result<Page<ServicePrincipal>> {
        self.list_service_principals(next_link).await
    }
}

#[async_trait]
impl EntitySource<Application> for GraphClient {
    async fn get(&self, id: &str) -> Result<Option<Application>> {
        self.get_application(id).await
    }

    async fn list_page(&self, next_link: Option<String>) -> Result<Page<Application>> {
        self.list_applications(next_link).await
    }
}
