//! Output formatting for CLI commands.
//!
//! Every formatter returns a string; the binary decides where it goes.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::ConfigHasher;
use crate::planner::{ActionType, ExecutionResult, ProvisionPlan, RefreshResult};
use crate::state::{LockInfo, ProviderState};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug, Clone, Copy)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Plan action row for table display.
#[derive(Tabled)]
struct PlanActionRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Managed resource row for table display.
#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Fingerprint")]
    fingerprint: String,
    #[tabled(rename = "ID")]
    id: String,
}

/// Field/value row for data source results.
#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Returns the configured format.
    #[must_use]
    pub const fn format(&self) -> OutputFormat {
        self.format
    }

    /// Formats a provisioning plan for display.
    #[must_use]
    pub fn format_plan(&self, plan: &ProvisionPlan) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&PlanJson::from(plan)).unwrap_or_default(),
            OutputFormat::Text => Self::format_plan_text(plan),
        }
    }

    fn format_plan_text(plan: &ProvisionPlan) -> String {
        if plan.is_empty() {
            return format!("{} No changes required. Azure matches the configuration.\n", "✓".green());
        }

        let mut output = String::from("\nProvisioning Plan\n\n");

        let rows: Vec<PlanActionRow> = plan
            .actions
            .iter()
            .enumerate()
            .map(|(i, a)| PlanActionRow {
                index: i + 1,
                action: Self::format_action_type(a.action_type),
                resource: a.resource_name.clone(),
                reason: Self::truncate(&a.reason, 40),
            })
            .collect();

        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        let _ = write!(
            output,
            "\nPlan: {} to create, {} to destroy, {} unchanged\n",
            plan.create_count().to_string().green(),
            plan.delete_count().to_string().red(),
            plan.unchanged.len()
        );

        output
    }

    /// Formats the result of an apply or destroy.
    #[must_use]
    pub fn format_execution(&self, result: &ExecutionResult) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&ExecutionJson::from(result)).unwrap_or_default(),
            OutputFormat::Text => {
                let status = if result.all_successful() {
                    format!("{} {result}", "✓".green())
                } else {
                    format!("{} {result}", "✗".red())
                };

                let mut output = format!("{status}\n");
                for action in result.results.iter().filter(|r| !r.success) {
                    let _ = writeln!(
                        output,
                        "   - {}: {}",
                        action.action.description(),
                        action.error.as_deref().unwrap_or("unknown error")
                    );
                }
                output
            }
        }
    }

    /// Formats the result of a refresh.
    #[must_use]
    pub fn format_refresh(&self, result: &RefreshResult) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "refreshed": result.refreshed,
                "removed": result.removed,
            }))
            .unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = format!(
                    "{} Refreshed {} resources\n",
                    "✓".green(),
                    result.refreshed.len()
                );
                for name in &result.removed {
                    let _ = writeln!(output, "   {} {name} no longer exists and was removed", "-".red());
                }
                output
            }
        }
    }

    /// Formats recorded state, with the current lock if any.
    #[must_use]
    pub fn format_state(&self, state: &ProviderState, lock: Option<&LockInfo>) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "state": state,
                "lock": lock,
            }))
            .unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = String::from("\nState\n\n");
                let _ = writeln!(output, "   Version: {}", state.version);
                let _ = writeln!(output, "   Subscription: {}", state.subscription_id);
                let _ = writeln!(output, "   Last updated: {}", state.last_updated.format("%Y-%m-%d %H:%M:%S"));

                if let Some(lock) = lock {
                    let _ = writeln!(
                        output,
                        "   {} Locked by {} ({}s remaining, lock ID {})",
                        "⚠".yellow(),
                        lock.holder,
                        lock.remaining_secs(),
                        lock.lock_id
                    );
                }

                if state.resources.is_empty() {
                    output.push_str("\n   No managed resources.\n");
                    return output;
                }

                let rows: Vec<ResourceRow> = state
                    .resources
                    .iter()
                    .map(|(name, record)| ResourceRow {
                        name: name.clone(),
                        kind: record.kind.to_string(),
                        fingerprint: ConfigHasher::short_hash(&record.fingerprint).to_string(),
                        id: record.id.clone(),
                    })
                    .collect();

                output.push('\n');
                output.push_str(&Table::new(rows).to_string());
                output.push('\n');
                output
            }
        }
    }

    /// Formats a data source result as a field table or JSON.
    #[must_use]
    pub fn format_data<T: Serialize>(&self, title: &str, data: &T) -> String {
        let value = serde_json::to_value(data).unwrap_or_default();
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&value).unwrap_or_default(),
            OutputFormat::Text => {
                let rows: Vec<FieldRow> = value
                    .as_object()
                    .into_iter()
                    .flatten()
                    .map(|(field, v)| FieldRow {
                        field: field.clone(),
                        value: Self::display_value(v),
                    })
                    .collect();

                format!("\n{}\n\n{}\n", title.bold(), Table::new(rows))
            }
        }
    }

    fn display_value(value: &serde_json::Value) -> String {
        match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(items) => items.iter().map(Self::display_value).collect::<Vec<_>>().join(", "),
            other => other.to_string(),
        }
    }

    /// Formats an action type with color.
    fn format_action_type(action_type: ActionType) -> String {
        match action_type {
            ActionType::Create => "+create".green().to_string(),
            ActionType::Delete => "-delete".red().to_string(),
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }
}

// JSON serialization helpers

#[derive(Serialize)]
struct PlanJson {
    creates: usize,
    deletes: usize,
    unchanged: Vec<String>,
    actions: Vec<ActionJson>,
}

#[derive(Serialize)]
struct ActionJson {
    action_type: String,
    resource: String,
    resource_id: Option<String>,
    reason: String,
    depends_on: Vec<usize>,
}

impl From<&ProvisionPlan> for PlanJson {
    fn from(plan: &ProvisionPlan) -> Self {
        Self {
            creates: plan.create_count(),
            deletes: plan.delete_count(),
            unchanged: plan.unchanged.clone(),
            actions: plan
                .actions
                .iter()
                .map(|a| ActionJson {
                    action_type: a.action_type.to_string(),
                    resource: a.resource_name.clone(),
                    resource_id: a.resource_id.clone(),
                    reason: a.reason.clone(),
                    depends_on: a.dependencies.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct ExecutionJson {
    successful: usize,
    failed: usize,
    skipped: usize,
    cancelled: bool,
    results: Vec<ActionResultJson>,
}

#[derive(Serialize)]
struct ActionResultJson {
    action_type: String,
    resource: String,
    success: bool,
    resource_id: Option<String>,
    error: Option<String>,
}

impl From<&ExecutionResult> for ExecutionJson {
    fn from(result: &ExecutionResult) -> Self {
        Self {
            successful: result.successful,
            failed: result.failed,
            skipped: result.skipped,
            cancelled: result.cancelled,
            results: result
                .results
                .iter()
                .map(|r| ActionResultJson {
                    action_type: r.action.action_type.to_string(),
                    resource: r.action.resource_name.clone(),
                    success: r.success,
                    resource_id: r.resource_id.clone(),
                    error: r.error.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::PolicyDefinitionData;

    #[test]
    fn test_truncate() {
        assert_eq!(OutputFormatter::truncate("short", 10), "short");
        assert_eq!(OutputFormatter::truncate("abcdefghijkl", 8), "abcde...");
    }

    #[test]
    fn test_data_as_json() {
        let data = PolicyDefinitionData {
            id: String::from("/providers/Microsoft.Authorization/policyDefinitions/p"),
            name: String::from("p"),
            display_name: String::from("Allowed locations"),
            policy_type: String::from("BuiltIn"),
        };

        let json = OutputFormatter::new(OutputFormat::Json).format_data("Policy", &data);
        let value: serde_json::Value = serde_json::from_str(&json).expect("json");
        assert_eq!(value["display_name"], "Allowed locations");
    }

    #[test]
    fn test_data_as_text_lists_fields() {
        colored::control::set_override(false);
        let data = serde_json::json!({ "name": "web", "reply_urls": ["https://a", "https://b"] });

        let text = OutputFormatter::new(OutputFormat::Text).format_data("Application", &data);
        assert!(text.contains("https://a, https://b"));
        assert!(text.contains("Application"));
    }

    #[test]
    fn test_empty_plan_text() {
        colored::control::set_override(false);
        let plan = ProvisionPlan::destroy(&ProviderState::new("s"));
        let text = OutputFormatter::new(OutputFormat::Text).format_plan(&plan);
        assert!(text.contains("No changes required"));
    }
}
