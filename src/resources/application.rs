//! Application registration data source.

use serde::Serialize;

use crate::azure::Application;
use crate::error::Result;
use crate::lookup::{self, EntitySource, FilterField, LookupQuery};

const KIND: &str = "Application";

/// Lookup arguments; exactly one must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationArgs {
    /// Directory object ID.
    pub object_id: Option<String>,
    /// Exact display name.
    pub name: Option<String>,
}

/// A resolved application registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationData {
    /// Identifier of the data source result, the object ID.
    pub id: String,
    /// Directory object ID.
    pub object_id: String,
    /// Application (client) ID.
    pub application_id: String,
    /// Display name.
    pub name: String,
    /// Homepage URL.
    pub homepage: String,
    /// Identifier URIs.
    pub identifier_uris: Vec<String>,
    /// Reply URLs.
    pub reply_urls: Vec<String>,
    /// Whether the implicit OAuth2 flow is allowed.
    pub oauth2_allow_implicit_flow: bool,
}

impl From<Application> for ApplicationData {
    fn from(app: Application) -> Self {
        let object_id = app.object_id.unwrap_or_default();
        Self {
            id: object_id.clone(),
            object_id,
            application_id: app.app_id.unwrap_or_default(),
            name: app.display_name.unwrap_or_default(),
            homepage: app.homepage.unwrap_or_default(),
            identifier_uris: app.identifier_uris,
            reply_urls: app.reply_urls,
            oauth2_allow_implicit_flow: app.oauth2_allow_implicit_flow.unwrap_or(false),
        }
    }
}

/// Resolves an application by object ID or display name.
///
/// # Errors
///
/// Returns a lookup error if the arguments are ambiguous or empty, nothing
/// matches, or the directory calls fail.
pub async fn read_application<S>(source: &S, args: &ApplicationArgs) -> Result<ApplicationData>
where
    S: EntitySource<Application> + ?Sized,
{
    let query = LookupQuery::new()
        .direct("object_id", "Object ID", args.object_id.as_deref())
        .filter("name", "name", FilterField::DisplayName, args.name.as_deref());

    let found: Application = lookup::resolve(source, KIND, &query).await?;
    Ok(found.into())
}
