//! Disambiguating lookup of directory entities.
//!
//! A data source may identify an entity by one of several mutually exclusive
//! keys. A direct key (an object ID) is fetched in a single call; any other
//! key is resolved by scanning the paged listing for the first entity whose
//! field equals the requested value.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{LookupError, Result};

/// Entity fields a listing can be filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    /// The entity's display name.
    DisplayName,
    /// The application (client) ID.
    ApplicationId,
}

/// Exposes the filterable fields of an entity.
pub trait Matchable {
    /// Returns the value of `field`, or `None` if the entity lacks it.
    fn field(&self, field: FilterField) -> Option<&str>;
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<E> {
    /// Entities on this page.
    pub items: Vec<E>,
    /// Link to the next page, if any.
    pub next_link: Option<String>,
}

impl<E> Page<E> {
    /// Creates a final page.
    #[must_use]
    pub const fn last(items: Vec<E>) -> Self {
        Self {
            items,
            next_link: None,
        }
    }
}

/// A remote collection that can be fetched by ID or listed page by page.
#[async_trait]
pub trait EntitySource<E>: Send + Sync {
    /// Fetches one entity by its direct key. A missing entity is `None`.
    async fn get(&self, id: &str) -> Result<Option<E>>;

    /// Fetches a page of the listing. `None` starts from the beginning.
    async fn list_page(&self, next_link: Option<String>) -> Result<Page<E>>;
}

/// The single key a query resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupKey {
    /// Fetch by ID.
    Direct {
        /// Argument name.
        name: &'static str,
        /// Human label used in messages.
        label: &'static str,
        /// The ID.
        value: String,
    },
    /// Scan the listing.
    Filter {
        /// Argument name.
        name: &'static str,
        /// Human label used in messages.
        label: &'static str,
        /// Words joining the kind and the label in a not-found message,
        /// e.g. `with the` or `for`.
        phrase: &'static str,
        /// Field to compare.
        field: FilterField,
        /// Value to match exactly.
        value: String,
    },
}

#[derive(Debug, Clone)]
enum Selector {
    Direct,
    Filter(FilterField),
}

#[derive(Debug, Clone)]
struct QueryKey {
    name: &'static str,
    label: &'static str,
    phrase: &'static str,
    selector: Selector,
    value: Option<String>,
}

/// A set of candidate keys, at most one of which may be populated.
///
/// Empty strings count as unset.
#[derive(Debug, Clone, Default)]
pub struct LookupQuery {
    keys: Vec<QueryKey>,
}

impl LookupQuery {
    /// Creates an empty query.
    #[must_use]
    pub const fn new() -> Self {
        Self { keys: Vec::new() }
    }

    /// Adds a direct-fetch key.
    #[must_use]
    pub fn direct(mut self, name: &'static str, label: &'static str, value: Option<&str>) -> Self {
        self.keys.push(QueryKey {
            name,
            label,
            phrase: "with",
            selector: Selector::Direct,
            value: value.map(str::to_string),
        });
        self
    }

    /// Adds a listing-filter key, reported as "A {kind} with the {label} ...".
    #[must_use]
    pub fn filter(self, name: &'static str, label: &'static str, field: FilterField, value: Option<&str>) -> Self {
        self.filter_phrased(name, label, "with the", field, value)
    }

    /// Adds a listing-filter key, reported as "A {kind} for {label} ...".
    #[must_use]
    pub fn filter_for(self, name: &'static str, label: &'static str, field: FilterField, value: Option<&str>) -> Self {
        self.filter_phrased(name, label, "for", field, value)
    }

    fn filter_phrased(
        mut self,
        name: &'static str,
        label: &'static str,
        phrase: &'static str,
        field: FilterField,
        value: Option<&str>,
    ) -> Self {
        self.keys.push(QueryKey {
            name,
            label,
            phrase,
            selector: Selector::Filter(field),
            value: value.map(str::to_string),
        });
        self
    }

    /// Resolves the query to its single populated key.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::AmbiguousInput`] if more than one key is
    /// populated and [`LookupError::MissingKey`] if none is.
    pub fn key(&self) -> std::result::Result<LookupKey, LookupError> {
        let populated: Vec<&QueryKey> = self
            .keys
            .iter()
            .filter(|k| k.value.as_deref().is_some_and(|v| !v.is_empty()))
            .collect();

        match populated.as_slice() {
            [] => Err(LookupError::MissingKey {
                allowed: self.keys.iter().map(|k| k.name).collect(),
            }),
            [key] => {
                let value = key.value.clone().unwrap_or_default();
                Ok(match key.selector {
                    Selector::Direct => LookupKey::Direct {
                        name: key.name,
                        label: key.label,
                        value,
                    },
                    Selector::Filter(field) => LookupKey::Filter {
                        name: key.name,
                        label: key.label,
                        phrase: key.phrase,
                        field,
                        value,
                    },
                })
            }
            _ => Err(LookupError::AmbiguousInput {
                allowed: self.keys.iter().map(|k| k.name).collect(),
                populated: populated.iter().map(|k| k.name).collect(),
            }),
        }
    }
}

/// Resolves `query` to exactly one entity from `source`.
///
/// `kind` names the entity in messages, e.g. `Service Principal`.
///
/// # Errors
///
/// Returns a [`LookupError`] if the query is ambiguous or empty, if nothing
/// matches, or if the remote calls fail.
pub async fn resolve<E, S>(source: &S, kind: &'static str, query: &LookupQuery) -> Result<E>
where
    S: EntitySource<E> + ?Sized,
    E: Matchable + Send,
{
    match query.key()? {
        LookupKey::Direct { label, value, .. } => {
            debug!("Fetching {kind} by {label} {value:?}");

            let entity = source
                .get(&value)
                .await
                .map_err(|e| LookupError::FetchFailed {
                    kind,
                    id: value.clone(),
                    source: Box::new(e),
                })?;

            entity.ok_or_else(|| {
                LookupError::not_found(format!("{kind} with {label} {value:?} was not found")).into()
            })
        }
        LookupKey::Filter {
            label,
            phrase,
            field,
            value,
            ..
        } => {
            debug!("Scanning {kind} listing for {label} {value:?}");

            let mut next_link = None;
            let mut scanned = 0usize;
            loop {
                let page = source
                    .list_page(next_link)
                    .await
                    .map_err(|e| LookupError::ListFailed {
                        kind,
                        source: Box::new(e),
                    })?;

                scanned += page.items.len();
                if let Some(found) = page
                    .items
                    .into_iter()
                    .find(|e| e.field(field) == Some(value.as_str()))
                {
                    return Ok(found);
                }

                match page.next_link {
                    Some(link) => next_link = Some(link),
                    None => break,
                }
            }

            debug!("No {kind} matched after scanning {scanned} entries");
            Err(LookupError::not_found(format!(
                "{} {kind} {phrase} {label} {value:?} was not found",
                article(kind)
            ))
            .into())
        }
    }
}

fn article(kind: &str) -> &'static str {
    if kind.starts_with(['A', 'E', 'I', 'O', 'U']) { "An" } else { "A" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, AzadError};
    use mockall::mock;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Principal {
        id: &'static str,
        name: Option<&'static str>,
        app: Option<&'static str>,
    }

    impl Matchable for Principal {
        fn field(&self, field: FilterField) -> Option<&str> {
            match field {
                FilterField::DisplayName => self.name,
                FilterField::ApplicationId => self.app,
            }
        }
    }

    mock! {
        Directory {}

        #[async_trait]
        impl EntitySource<Principal> for Directory {
            async fn get(&self, id: &str) -> Result<Option<Principal>>;
            async fn list_page(&self, next_link: Option<String>) -> Result<Page<Principal>>;
        }
    }

    const fn principal(id: &'static str, name: Option<&'static str>, app: Option<&'static str>) -> Principal {
        Principal { id, name, app }
    }

    fn query(object_id: Option<&str>, display_name: Option<&str>, application_id: Option<&str>) -> LookupQuery {
        LookupQuery::new()
            .direct("object_id", "Object ID", object_id)
            .filter("display_name", "Display Name", FilterField::DisplayName, display_name)
            .filter_for("application_id", "Application ID", FilterField::ApplicationId, application_id)
    }

    #[tokio::test]
    async fn test_direct_key_fetches_once_without_listing() {
        let mut directory = MockDirectory::new();
        directory
            .expect_get()
            .withf(|id| id == "abc-123")
            .times(1)
            .returning(|_| Ok(Some(principal("abc-123", Some("app-1"), Some("c1")))));
        directory.expect_list_page().never();

        let found = resolve(&directory, "Service Principal", &query(Some("abc-123"), None, None))
            .await
            .expect("lookup should succeed");

        assert_eq!(found.id, "abc-123");
    }

    #[tokio::test]
    async fn test_direct_key_missing_is_not_found() {
        let mut directory = MockDirectory::new();
        directory.expect_get().times(1).returning(|_| Ok(None));

        let err = resolve(&directory, "Service Principal", &query(Some("gone"), None, None))
            .await
            .expect_err("lookup should fail");

        assert_eq!(
            err.to_string(),
            "Service Principal with Object ID \"gone\" was not found"
        );
    }

    #[tokio::test]
    async fn test_filter_returns_first_match_across_pages() {
        let mut directory = MockDirectory::new();
        directory.expect_get().never();
        directory
            .expect_list_page()
            .withf(Option::is_none)
            .times(1)
            .returning(|_| {
                Ok(Page {
                    items: vec![principal("1", Some("other"), None), principal("2", None, None)],
                    next_link: Some(String::from("page-2")),
                })
            });
        directory
            .expect_list_page()
            .withf(|link| link.as_deref() == Some("page-2"))
            .times(1)
            .returning(|_| {
                Ok(Page::last(vec![
                    principal("3", Some("app-1"), None),
                    principal("4", Some("app-1"), None),
                ]))
            });

        let found = resolve(&directory, "Service Principal", &query(None, Some("app-1"), None))
            .await
            .expect("lookup should succeed");

        assert_eq!(found.id, "3");
    }

    #[tokio::test]
    async fn test_filter_without_match_is_not_found() {
        let mut directory = MockDirectory::new();
        directory
            .expect_list_page()
            .times(1)
            .returning(|_| Ok(Page::last(vec![principal("1", Some("app-2"), Some("c2"))])));

        let err = resolve(&directory, "Service Principal", &query(None, None, Some("c9")))
            .await
            .expect_err("lookup should fail");

        assert_eq!(
            err.to_string(),
            "A Service Principal for Application ID \"c9\" was not found"
        );
    }

    #[tokio::test]
    async fn test_ambiguous_query_makes_no_calls() {
        let mut directory = MockDirectory::new();
        directory.expect_get().never();
        directory.expect_list_page().never();

        let err = resolve(&directory, "Service Principal", &query(Some("abc"), Some("app-1"), None))
            .await
            .expect_err("ambiguous input should be rejected");

        assert!(matches!(
            err,
            AzadError::Lookup(LookupError::AmbiguousInput { .. })
        ));
    }

    #[tokio::test]
    async fn test_listing_failure_is_wrapped() {
        let mut directory = MockDirectory::new();
        directory
            .expect_list_page()
            .returning(|_| Err(ApiError::network("connection reset").into()));

        let err = resolve(&directory, "Service Principal", &query(None, Some("app-1"), None))
            .await
            .expect_err("listing failure should surface");

        assert!(matches!(
            err,
            AzadError::Lookup(LookupError::ListFailed { .. })
        ));
    }

    #[test]
    fn test_empty_strings_count_as_unset() {
        let key = query(Some(""), Some("app-1"), Some(""))
            .key()
            .expect("one key is populated");

        assert_eq!(
            key,
            LookupKey::Filter {
                name: "display_name",
                label: "Display Name",
                phrase: "with the",
                field: FilterField::DisplayName,
                value: String::from("app-1"),
            }
        );
    }

    #[test]
    fn test_no_key_is_rejected() {
        let err = query(None, None, None).key().expect_err("no key populated");
        assert!(matches!(err, LookupError::MissingKey { .. }));
    }
}
