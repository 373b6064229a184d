//! Provisioning plan types and construction.
//!
//! A plan is an ordered list of create and delete actions. Replacements
//! expand into a delete followed by a dependent create.

use chrono::{DateTime, Utc};

use crate::config::{AzadConfig, DomainServicesConfig};
use crate::state::ProviderState;

use super::diff::{DiffResult, DiffType};

/// A complete provisioning plan.
#[derive(Debug)]
pub struct ProvisionPlan {
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
    /// Planned actions in execution order.
    pub actions: Vec<PlannedAction>,
    /// Resources left as they are.
    pub unchanged: Vec<String>,
}

/// A single planned action.
#[derive(Debug, Clone)]
pub struct PlannedAction {
    /// Action type.
    pub action_type: ActionType,
    /// Resource name.
    pub resource_name: String,
    /// Desired configuration, for creates.
    pub config: Option<DomainServicesConfig>,
    /// ARM ID, for deletes.
    pub resource_id: Option<String>,
    /// Reason for this action.
    pub reason: String,
    /// Fingerprint recorded after a create.
    pub new_hash: Option<String>,
    /// Action indices that must succeed first.
    pub dependencies: Vec<usize>,
}

/// Types of actions in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    /// Create a Domain Services instance.
    Create,
    /// Delete a Domain Services instance.
    Delete,
}

impl ProvisionPlan {
    /// Creates a plan from a diff result.
    #[must_use]
    pub fn from_diff(diff: &DiffResult, config: &AzadConfig) -> Self {
        let mut actions = Vec::new();
        let mut unchanged = Vec::new();

        // Deletes first, so a domain name moving between blocks is freed
        // before it is claimed again.
        for resource_diff in &diff.diffs {
            if resource_diff.diff_type == DiffType::Delete {
                actions.push(PlannedAction {
                    action_type: ActionType::Delete,
                    resource_name: resource_diff.name.clone(),
                    config: None,
                    resource_id: resource_diff.resource_id.clone(),
                    reason: String::from("removed from configuration"),
                    new_hash: None,
                    dependencies: vec![],
                });
            }
        }

        for resource_diff in &diff.diffs {
            let Some(block) = config.find_domain_services(&resource_diff.name) else {
                continue;
            };

            match resource_diff.diff_type {
                DiffType::Create => actions.push(PlannedAction {
                    action_type: ActionType::Create,
                    resource_name: resource_diff.name.clone(),
                    config: Some(block.clone()),
                    resource_id: None,
                    reason: String::from("defined in configuration"),
                    new_hash: resource_diff.new_hash.clone(),
                    dependencies: vec![],
                }),
                DiffType::Replace => {
                    let delete_idx = actions.len();
                    actions.push(PlannedAction {
                        action_type: ActionType::Delete,
                        resource_name: resource_diff.name.clone(),
                        config: None,
                        resource_id: resource_diff.resource_id.clone(),
                        reason: String::from("replace-on-change argument changed"),
                        new_hash: None,
                        dependencies: vec![],
                    });
                    actions.push(PlannedAction {
                        action_type: ActionType::Create,
                        resource_name: resource_diff.name.clone(),
                        config: Some(block.clone()),
                        resource_id: None,
                        reason: String::from("replace-on-change argument changed"),
                        new_hash: resource_diff.new_hash.clone(),
                        dependencies: vec![delete_idx],
                    });
                }
                DiffType::NoChange => unchanged.push(resource_diff.name.clone()),
                DiffType::Delete => {}
            }
        }

        Self {
            created_at: Utc::now(),
            actions,
            unchanged,
        }
    }

    /// Creates a plan that deletes every tracked resource.
    #[must_use]
    pub fn destroy(state: &ProviderState) -> Self {
        let actions = state
            .resources
            .iter()
            .map(|(name, record)| PlannedAction {
                action_type: ActionType::Delete,
                resource_name: name.clone(),
                config: None,
                resource_id: Some(record.id.clone()),
                reason: String::from("destroy requested"),
                new_hash: None,
                dependencies: vec![],
            })
            .collect();

        Self {
            created_at: Utc::now(),
            actions,
            unchanged: vec![],
        }
    }

    /// Returns true if the plan is empty (no changes).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Returns the number of create actions.
    #[must_use]
    pub fn create_count(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| a.action_type == ActionType::Create)
            .count()
    }

    /// Returns the number of delete actions.
    #[must_use]
    pub fn delete_count(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| a.action_type == ActionType::Delete)
            .count()
    }
}

impl PlannedAction {
    /// Returns a human-readable description of the action.
    #[must_use]
    pub fn description(&self) -> String {
        match self.action_type {
            ActionType::Create => format!("Create domain services '{}'", self.resource_name),
            ActionType::Delete => format!("Delete domain services '{}'", self.resource_name),
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for PlannedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.action_type, self.resource_name)?;
        if !self.reason.is_empty() {
            write!(f, " ({})", self.reason)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for ProvisionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.actions.is_empty() {
            return write!(f, "No changes required");
        }

        writeln!(f, "Plan ({} actions):", self.actions.len())?;
        for (i, action) in self.actions.iter().enumerate() {
            writeln!(f, "  {i}. {action}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigHasher, PollingConfig, ProviderSettings, StateConfig};
    use crate::planner::DiffEngine;
    use crate::state::{ResourceKind, ResourceRecord};

    fn block(name: &str, subnet: &str) -> DomainServicesConfig {
        DomainServicesConfig {
            name: name.to_string(),
            resource_group_name: String::from("rg"),
            domain_name: format!("{name}.example.com"),
            tenant_id: String::from("t"),
            virtual_network_id: String::from("/vnet"),
            subnet_id: subnet.to_string(),
        }
    }

    fn config(blocks: Vec<DomainServicesConfig>) -> AzadConfig {
        AzadConfig {
            provider: ProviderSettings::default(),
            polling: PollingConfig::default(),
            state: StateConfig::default(),
            domain_services: blocks,
        }
    }

    fn state_with(blocks: &[DomainServicesConfig]) -> ProviderState {
        let mut state = ProviderState::new("s");
        for b in blocks {
            state.set(
                &b.name,
                ResourceRecord::new(
                    ResourceKind::DomainServices,
                    &format!("/id/{}", b.name),
                    &ConfigHasher::new().hash_domain_services(b),
                    serde_json::Value::Null,
                ),
            );
        }
        state
    }

    #[test]
    fn test_replace_expands_to_delete_then_create() {
        let state = state_with(&[block("corp", "/s1"), block("old", "/s1")]);
        let desired = config(vec![block("corp", "/s2")]);

        let diff = DiffEngine::new().compute_diff(&desired, Some(&state));
        let plan = ProvisionPlan::from_diff(&diff, &desired);

        let kinds: Vec<(ActionType, &str)> = plan
            .actions
            .iter()
            .map(|a| (a.action_type, a.resource_name.as_str()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (ActionType::Delete, "old"),
                (ActionType::Delete, "corp"),
                (ActionType::Create, "corp"),
            ]
        );
        assert_eq!(plan.actions[2].dependencies, vec![1]);
        assert_eq!(plan.actions[1].resource_id.as_deref(), Some("/id/corp"));
        assert_eq!(plan.create_count(), 1);
        assert_eq!(plan.delete_count(), 2);
    }

    #[test]
    fn test_unchanged_resources_are_listed() {
        let corp = block("corp", "/s1");
        let state = state_with(std::slice::from_ref(&corp));
        let desired = config(vec![corp]);

        let plan = ProvisionPlan::from_diff(&DiffEngine::new().compute_diff(&desired, Some(&state)), &desired);

        assert!(plan.is_empty());
        assert_eq!(plan.unchanged, vec![String::from("corp")]);
        assert_eq!(plan.to_string(), "No changes required");
    }

    #[test]
    fn test_destroy_deletes_everything() {
        let plan = ProvisionPlan::destroy(&state_with(&[block("a", "/s"), block("b", "/s")]));
        assert_eq!(plan.delete_count(), 2);
        assert!(plan.actions.iter().all(|a| a.resource_id.is_some()));
    }
}
