//! Service principal data source.

use serde::Serialize;

use crate::azure::ServicePrincipal;
use crate::error::Result;
use crate::lookup::{self, EntitySource, FilterField, LookupQuery};

/// Entity kind used in lookup messages.
const KIND: &str = "Service Principal";

/// Lookup arguments; exactly one must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServicePrincipalArgs {
    /// Directory object ID.
    pub object_id: Option<String>,
    /// Exact display name.
    pub display_name: Option<String>,
    /// Application (client) ID.
    pub application_id: Option<String>,
}

/// A resolved service principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServicePrincipalData {
    /// Identifier of the data source result, the object ID.
    pub id: String,
    /// Directory object ID.
    pub object_id: String,
    /// Application (client) ID.
    pub application_id: String,
    /// Display name.
    pub display_name: String,
}

impl From<ServicePrincipal> for ServicePrincipalData {
    fn from(sp: ServicePrincipal) -> Self {
        let object_id = sp.object_id.unwrap_or_default();
        Self {
            id: object_id.clone(),
            object_id,
            application_id: sp.app_id.unwrap_or_default(),
            display_name: sp.display_name.unwrap_or_default(),
        }
    }
}

/// Resolves a service principal by object ID, display name or application ID.
///
/// # Errors
///
/// Returns a lookup error if the arguments are ambiguous or empty, nothing
/// matches, or the directory calls fail.
pub async fn read_service_principal<S>(source: &S, args: &ServicePrincipalArgs) -> Result<ServicePrincipalData>
where
    S: EntitySource<ServicePrincipal> + ?Sized,
{
    let query = LookupQuery::new()
        .direct("object_id", "Object ID", args.object_id.as_deref())
        .filter("display_name", "Display Name", FilterField::DisplayName, args.display_name.as_deref())
        .filter_for(
            "application_id",
            "Application ID",
            FilterField::ApplicationId,
            args.application_id.as_deref(),
        );

    let found: ServicePrincipal = lookup::resolve(source, KIND, &query).await?;
    Ok(found.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::Page;
    use async_trait::async_trait;

    struct Fixed(Vec<ServicePrincipal>);

    #[async_trait]
    impl EntitySource<ServicePrincipal> for Fixed {
        async fn get(&self, id: &str) -> Result<Option<ServicePrincipal>> {
            Ok(self.0.iter().find(|sp| sp.object_id.as_deref() == Some(id)).cloned())
        }

        async fn list_page(&self, _next_link: Option<String>) -> Result<Page<ServicePrincipal>> {
            Ok(Page::last(self.0.clone()))
        }
    }

    fn directory() -> Fixed {
        Fixed(vec![
            ServicePrincipal {
                object_id: Some(String::from("o1")),
                app_id: Some(String::from("a1")),
                display_name: Some(String::from("deployer")),
            },
            ServicePrincipal {
                object_id: Some(String::from("o2")),
                app_id: Some(String::from("a2")),
                display_name: None,
            },
        ])
    }

    #[tokio::test]
    async fn test_by_application_id() {
        let args = ServicePrincipalArgs {
            application_id: Some(String::from("a2")),
            ..ServicePrincipalArgs::default()
        };
        let data = read_service_principal(&directory(), &args).await.expect("found");

        assert_eq!(data.id, "o2");
        assert_eq!(data.object_id, "o2");
        assert_eq!(data.display_name, "");
    }

    #[tokio::test]
    async fn test_by_display_name() {
        let args = ServicePrincipalArgs {
            display_name: Some(String::from("deployer")),
            ..ServicePrincipalArgs::default()
        };
        let data = read_service_principal(&directory(), &args).await.expect("found");
        assert_eq!(data.application_id, "a1");
    }

    #[tokio::test]
    async fn test_no_arguments() {
        let err = read_service_principal(&directory(), &ServicePrincipalArgs::default())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "one of object_id, display_name, application_id must be set"
        );
    }
}
