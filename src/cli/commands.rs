//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// azad - Declarative Azure AD Domain Services provisioning.
#[derive(Parser, Debug)]
#[command(name = "azad")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "AZAD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Log format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub log_format: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter `azad.yaml`.
    Init {
        /// Directory to initialize (defaults to current directory).
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Force overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the configuration.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Show what apply would change.
    Plan,

    /// Create, replace and delete Domain Services to match the configuration.
    Apply {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,

        /// Keep going after a failed action.
        #[arg(long)]
        continue_on_error: bool,
    },

    /// Re-read every managed resource and update state.
    Refresh,

    /// Delete every managed resource.
    Destroy {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Adopt an existing Domain Services instance.
    Import {
        /// Name of the configuration block to record it under.
        name: String,

        /// ARM ID of the instance.
        resource_id: String,
    },

    /// Look up directory and policy objects.
    Lookup {
        /// Lookup subcommand.
        #[command(subcommand)]
        command: LookupCommands,
    },

    /// Inspect or unlock the state file.
    State {
        /// State subcommand.
        #[command(subcommand)]
        command: StateCommands,
    },
}

/// Lookup subcommands. Exactly one key must be given.
#[derive(Subcommand, Debug)]
pub enum LookupCommands {
    /// Find a service principal.
    ServicePrincipal {
        /// Directory object ID.
        #[arg(long)]
        object_id: Option<String>,

        /// Exact display name.
        #[arg(long)]
        display_name: Option<String>,

        /// Application (client) ID.
        #[arg(long)]
        application_id: Option<String>,
    },

    /// Find an application registration.
    Application {
        /// Directory object ID.
        #[arg(long)]
        object_id: Option<String>,

        /// Exact display name.
        #[arg(long)]
        name: Option<String>,
    },

    /// Read a policy definition.
    PolicyDefinition {
        /// Definition name.
        #[arg(long)]
        name: String,
    },
}

/// State management subcommands.
#[derive(Subcommand, Debug)]
pub enum StateCommands {
    /// Show current state.
    Show,

    /// Unlock the state.
    Unlock {
        /// Lock ID to unlock.
        #[arg(long)]
        lock_id: Option<String>,

        /// Remove the lock whoever holds it.
        #[arg(long)]
        force: bool,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}
