//! Diff engine for comparing desired configuration against recorded state.
//!
//! Every Domain Services argument forces replacement, so the diff only needs
//! fingerprints: a new name is a create, a changed fingerprint a replace, a
//! name missing from the configuration a delete.

use std::fmt;
use tracing::debug;

use crate::config::{AzadConfig, ConfigHasher};
use crate::state::ProviderState;

/// Engine for computing diffs between desired and recorded states.
#[derive(Debug, Default)]
pub struct DiffEngine {
    hasher: ConfigHasher,
}

/// Difference for a single resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDiff {
    /// Resource name.
    pub name: String,
    /// Type of difference.
    pub diff_type: DiffType,
    /// ARM ID recorded in state, if any.
    pub resource_id: Option<String>,
    /// Fingerprint recorded in state, if any.
    pub old_hash: Option<String>,
    /// Fingerprint of the configuration, if the resource is configured.
    pub new_hash: Option<String>,
}

/// Type of difference detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffType {
    /// Resource needs to be created.
    Create,
    /// Resource must be destroyed and recreated.
    Replace,
    /// Resource needs to be deleted.
    Delete,
    /// Resource is unchanged.
    NoChange,
}

/// Complete diff result.
#[derive(Debug, Default)]
pub struct DiffResult {
    /// All resource diffs, configured resources first.
    pub diffs: Vec<ResourceDiff>,
}

impl DiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            hasher: ConfigHasher::new(),
        }
    }

    /// Computes the diff between configuration and state.
    #[must_use]
    pub fn compute_diff(&self, config: &AzadConfig, state: Option<&ProviderState>) -> DiffResult {
        let mut diffs = Vec::new();

        for block in &config.domain_services {
            let new_hash = self.hasher.hash_domain_services(block);
            let record = state.and_then(|s| s.get(&block.name));

            let diff_type = match record {
                None => DiffType::Create,
                Some(r) if r.fingerprint == new_hash => DiffType::NoChange,
                Some(r) => {
                    debug!(
                        "{} fingerprint changed: {} -> {}",
                        block.name,
                        ConfigHasher::short_hash(&r.fingerprint),
                        ConfigHasher::short_hash(&new_hash)
                    );
                    DiffType::Replace
                }
            };

            diffs.push(ResourceDiff {
                name: block.name.clone(),
                diff_type,
                resource_id: record.map(|r| r.id.clone()),
                old_hash: record.map(|r| r.fingerprint.clone()),
                new_hash: Some(new_hash),
            });
        }

        if let Some(state) = state {
            for (name, record) in &state.resources {
                if config.find_domain_services(name).is_none() {
                    debug!("Found orphaned resource: {name}");
                    diffs.push(ResourceDiff {
                        name: name.clone(),
                        diff_type: DiffType::Delete,
                        resource_id: Some(record.id.clone()),
                        old_hash: Some(record.fingerprint.clone()),
                        new_hash: None,
                    });
                }
            }
        }

        DiffResult { diffs }
    }
}

impl DiffResult {
    /// Number of diffs of `diff_type`.
    #[must_use]
    pub fn count(&self, diff_type: DiffType) -> usize {
        self.diffs.iter().filter(|d| d.diff_type == diff_type).count()
    }

    /// Returns true if nothing needs to change.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.diffs.iter().any(|d| d.diff_type != DiffType::NoChange)
    }
}

impl fmt::Display for DiffType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Replace => "replace",
            Self::Delete => "delete",
            Self::NoChange => "no change",
        };
        write!(f, "{s}")
    }
}
