//! Plan executor for applying provisioning plans.
//!
//! State is saved after every action that changes it, so an interrupted run
//! never forgets a resource it already created.

use std::collections::HashSet;
use tracing::{error, info, warn};

use crate::azure::ResourceId;
use crate::config::{AzadConfig, ConfigHasher};
use crate::context::ProviderContext;
use crate::error::{AzadError, ConfigError, OperationError, Result};
use crate::resources::DomainServicesResource;
use crate::state::{ProviderState, ResourceKind, ResourceRecord, StateStore};

use super::plan::{ActionType, PlannedAction, ProvisionPlan};

/// Message recorded for actions skipped after a failed dependency.
const SKIPPED: &str = "Skipped due to dependency failure";

/// Executor for provisioning plans.
pub struct PlanExecutor<'a> {
    context: &'a ProviderContext,
    store: &'a dyn StateStore,
    continue_on_error: bool,
}

impl std::fmt::Debug for PlanExecutor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanExecutor")
            .field("backend", &self.store.backend_type())
            .field("continue_on_error", &self.continue_on_error)
            .finish_non_exhaustive()
    }
}

/// Result of executing a single action.
#[derive(Debug)]
pub struct ActionResult {
    /// Action index.
    pub index: usize,
    /// Action that was executed.
    pub action: PlannedAction,
    /// Whether the action succeeded.
    pub success: bool,
    /// ARM ID of the affected resource, when known.
    pub resource_id: Option<String>,
    /// Error message (if failed).
    pub error: Option<String>,
}

/// Result of executing the entire plan.
#[derive(Debug)]
pub struct ExecutionResult {
    /// Individual action results.
    pub results: Vec<ActionResult>,
    /// Number of successful actions.
    pub successful: usize,
    /// Number of failed actions.
    pub failed: usize,
    /// Number of skipped actions (due to dependency failures).
    pub skipped: usize,
    /// Whether a cancellation stopped the run.
    pub cancelled: bool,
}

/// Result of refreshing state against Azure.
#[derive(Debug, Default)]
pub struct RefreshResult {
    /// Resources whose attributes were updated.
    pub refreshed: Vec<String>,
    /// Resources that no longer exist and were dropped from state.
    pub removed: Vec<String>,
}

impl<'a> PlanExecutor<'a> {
    /// Creates a new plan executor.
    #[must_use]
    pub const fn new(context: &'a ProviderContext, store: &'a dyn StateStore) -> Self {
        Self {
            context,
            store,
            continue_on_error: false,
        }
    }

    /// Sets whether to continue on errors.
    #[must_use]
    pub const fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    fn domain_services(&self) -> DomainServicesResource<'a> {
        DomainServicesResource::new(self.context.arm(), self.context.reconciler())
    }

    /// Parses a stored ID, refusing IDs from another subscription.
    fn tracked_id(&self, raw: &str) -> Result<ResourceId> {
        let id: ResourceId = raw.parse()?;
        let configured = self.context.arm().subscription_id();
        match id.subscription_id() {
            Some(subscription) if subscription.eq_ignore_ascii_case(configured) => Ok(id),
            other => Err(ConfigError::validation_general(format!(
                "{raw} belongs to subscription {}, not the configured {configured}",
                other.unwrap_or("(none)")
            ))
            .into()),
        }
    }

    /// Executes a plan, updating and saving `state` as actions complete.
    ///
    /// # Errors
    ///
    /// Returns an error only if state cannot be saved; action failures are
    /// reported in the result.
    pub async fn execute(&self, plan: &ProvisionPlan, state: &mut ProviderState) -> Result<ExecutionResult> {
        info!("Executing plan with {} actions", plan.actions.len());

        let mut results: Vec<ActionResult> = Vec::new();
        let mut failed_indices: HashSet<usize> = HashSet::new();
        let mut cancelled = false;

        for (idx, action) in plan.actions.iter().enumerate() {
            if action.dependencies.iter().any(|dep| failed_indices.contains(dep)) {
                warn!("Skipping action {idx} due to failed dependencies");
                results.push(ActionResult {
                    index: idx,
                    action: action.clone(),
                    success: false,
                    resource_id: None,
                    error: Some(String::from(SKIPPED)),
                });
                failed_indices.insert(idx);
                continue;
            }

            info!("Executing action {idx}: {}", action.description());
            let outcome = match action.action_type {
                ActionType::Create => self.execute_create(action, state).await,
                ActionType::Delete => self.execute_delete(action, state).await,
            };

            match outcome {
                Ok(resource_id) => {
                    self.store.save(state).await?;
                    results.push(ActionResult {
                        index: idx,
                        action: action.clone(),
                        success: true,
                        resource_id,
                        error: None,
                    });
                }
                Err(e) => {
                    error!("Action {idx} ({}) failed: {e}", action.description());
                    cancelled = matches!(
                        e,
                        AzadError::Operation(OperationError::Timeout { cancelled: true, .. })
                    );
                    failed_indices.insert(idx);
                    results.push(ActionResult {
                        index: idx,
                        action: action.clone(),
                        success: false,
                        resource_id: action.resource_id.clone(),
                        error: Some(e.to_string()),
                    });

                    if cancelled || !self.continue_on_error {
                        break;
                    }
                }
            }
        }

        let skipped = results.iter().filter(|r| r.error.as_deref() == Some(SKIPPED)).count();
        let failed = results.iter().filter(|r| !r.success).count() - skipped;

        Ok(ExecutionResult {
            successful: results.iter().filter(|r| r.success).count(),
            failed,
            skipped,
            cancelled,
            results,
        })
    }

    async fn execute_create(&self, action: &PlannedAction, state: &mut ProviderState) -> Result<Option<String>> {
        let Some(block) = &action.config else {
            return Err(AzadError::internal(format!(
                "create action for {} has no configuration",
                action.resource_name
            )));
        };

        let created = self.domain_services().create(block).await?;
        let record = ResourceRecord::new(
            ResourceKind::DomainServices,
            &created.id,
            action.new_hash.as_deref().unwrap_or_default(),
            created.to_attributes()?,
        );
        state.set(&action.resource_name, record);

        info!("Created {} ({})", action.resource_name, created.id);
        Ok(Some(created.id))
    }

    async fn execute_delete(&self, action: &PlannedAction, state: &mut ProviderState) -> Result<Option<String>> {
        let resource_id = action
            .resource_id
            .clone()
            .or_else(|| state.get(&action.resource_name).map(|r| r.id.clone()));

        let Some(resource_id) = resource_id else {
            warn!("No resource ID for {}, dropping it from state", action.resource_name);
            state.remove(&action.resource_name);
            return Ok(None);
        };

        let id = self.tracked_id(&resource_id)?;
        let resource_group = id.resource_group().unwrap_or_default();
        self.domain_services().delete(resource_group, id.name()).await?;

        state.remove(&action.resource_name);
        info!("Deleted {} ({resource_id})", action.resource_name);
        Ok(Some(resource_id))
    }

    /// Re-reads every tracked resource, updating attributes and dropping
    /// resources that no longer exist.
    ///
    /// # Errors
    ///
    /// Returns an error if a read fails or state cannot be saved.
    pub async fn refresh(&self, state: &mut ProviderState) -> Result<RefreshResult> {
        let mut result = RefreshResult::default();
        let names: Vec<String> = state.resources.keys().cloned().collect();

        for name in names {
            let Some(record) = state.get(&name) else {
                continue;
            };
            let id = self.tracked_id(&record.id)?;
            let resource_group = id.resource_group().unwrap_or_default();

            match self.domain_services().read(resource_group, id.name()).await? {
                Some(observed) => {
                    let attributes = observed.to_attributes()?;
                    if let Some(record) = state.resources.get_mut(&name) {
                        record.refresh(attributes);
                    }
                    result.refreshed.push(name);
                }
                None => {
                    warn!("{name} no longer exists, removing it from state");
                    state.remove(&name);
                    result.removed.push(name);
                }
            }
        }

        self.store.save(state).await?;
        Ok(result)
    }

    /// Adopts an existing Domain Services instance under `name`.
    ///
    /// The recorded fingerprint comes from the configuration block of the
    /// same name when there is one, so a matching block plans as unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the ID is invalid, the instance does not exist,
    /// or state cannot be saved.
    pub async fn import(
        &self,
        config: &AzadConfig,
        name: &str,
        resource_id: &str,
        state: &mut ProviderState,
    ) -> Result<ResourceRecord> {
        self.tracked_id(resource_id)?;
        let observed = self.domain_services().import(resource_id).await?;

        let fingerprint = match config.find_domain_services(name) {
            Some(block) if observed.matches(block) => ConfigHasher::new().hash_domain_services(block),
            Some(_) => {
                warn!("Imported {name} differs from its configuration block; the next apply will replace it");
                String::new()
            }
            None => {
                warn!("{name} has no configuration block; the next apply will delete it");
                String::new()
            }
        };

        let record = ResourceRecord::new(
            ResourceKind::DomainServices,
            &observed.id,
            &fingerprint,
            observed.to_attributes()?,
        );
        state.set(name, record.clone());
        self.store.save(state).await?;

        info!("Imported {name} ({})", observed.id);
        Ok(record)
    }
}

impl ExecutionResult {
    /// Returns true if all actions succeeded.
    #[must_use]
    pub const fn all_successful(&self) -> bool {
        self.failed == 0 && self.skipped == 0 && !self.cancelled
    }
}

impl std::fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Executed {} actions: {} successful, {} failed, {} skipped",
            self.results.len(),
            self.successful,
            self.failed,
            self.skipped
        )?;
        if self.cancelled {
            write!(f, " (cancelled; in-flight Azure operations may still be running)")?;
        }
        Ok(())
    }
}
