//! azad CLI entrypoint.
//!
//! This is the main entrypoint for the azad command-line tool.

use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use azad_provision::cli::{Cli, Commands, LookupCommands, OutputFormat, OutputFormatter, StateCommands};
use azad_provision::config::{find_config_file, AzadConfig, ConfigParser, ConfigValidator};
use azad_provision::context::{Credentials, ProviderContext};
use azad_provision::error::{AzadError, ConfigError, Result};
use azad_provision::planner::{DiffEngine, PlanExecutor, ProvisionPlan};
use azad_provision::resources::{
    read_application, read_policy_definition, read_service_principal, ApplicationArgs, ServicePrincipalArgs,
};
use azad_provision::state::{
    generate_holder_id, hold_lock, LocalStateStore, ProviderState, StateStore, LOCK_REFRESH_INTERVAL, STATE_DIR,
};

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_format);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool, format: OutputFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    match format {
        OutputFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        OutputFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init(),
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init { path, force } => cmd_init(&path, force),
        Commands::Validate { warnings } => cmd_validate(config_path, warnings, formatter),
        Commands::Plan => cmd_plan(config_path, formatter).await,
        Commands::Apply { yes, continue_on_error } => cmd_apply(config_path, yes, continue_on_error, formatter).await,
        Commands::Refresh => cmd_refresh(config_path, formatter).await,
        Commands::Destroy { yes } => cmd_destroy(config_path, yes, formatter).await,
        Commands::Import { name, resource_id } => cmd_import(config_path, &name, &resource_id, formatter).await,
        Commands::Lookup { command } => cmd_lookup(config_path, command, formatter).await,
        Commands::State { command } => cmd_state(config_path, command, formatter).await,
    }
}

/// Write a starter configuration.
fn cmd_init(path: &Path, force: bool) -> Result<()> {
    info!("Initializing azad project in: {}", path.display());

    let config_path = path.join("azad.yaml");
    let env_path = path.join(".env.example");
    let gitignore_path = path.join(".gitignore");

    if !force && config_path.exists() {
        eprintln!("Configuration file already exists: {}", config_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(());
    }

    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    std::fs::write(&config_path, include_str!("../templates/azad.yaml"))?;
    eprintln!("Created: {}", config_path.display());

    std::fs::write(&env_path, include_str!("../templates/.env.example"))?;
    eprintln!("Created: {}", env_path.display());

    let state_entry = format!("{STATE_DIR}/");
    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        let missing: Vec<&str> = [".env", state_entry.as_str()]
            .into_iter()
            .filter(|entry| !existing.lines().any(|line| line.trim() == *entry))
            .collect();
        if !missing.is_empty() {
            let mut file = std::fs::OpenOptions::new().append(true).open(&gitignore_path)?;
            writeln!(file, "\n# azad")?;
            for entry in missing {
                writeln!(file, "{entry}")?;
            }
            eprintln!("Updated: {}", gitignore_path.display());
        }
    } else {
        std::fs::write(&gitignore_path, format!(".env\n{state_entry}\n"))?;
        eprintln!("Created: {}", gitignore_path.display());
    }

    eprintln!("\nProject initialized.");
    eprintln!("Next steps:");
    eprintln!("  1. Copy .env.example to .env and set AZURE_CLIENT_SECRET");
    eprintln!("  2. Edit azad.yaml with your subscription and managed domains");
    eprintln!("  3. Run 'azad validate' to check the configuration");
    eprintln!("  4. Run 'azad plan' to see what will be provisioned");
    eprintln!("  5. Run 'azad apply' to provision");

    Ok(())
}

/// Validate configuration, reporting every problem at once.
fn cmd_validate(config_path: Option<&Path>, show_warnings: bool, formatter: OutputFormatter) -> Result<()> {
    let (config, _) = load_config(config_path, false)?;
    let result = ConfigValidator::new().check(&config);

    if formatter.format() == OutputFormat::Json {
        let json = serde_json::json!({
            "valid": result.is_valid(),
            "errors": result.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "warnings": result.warnings,
        });
        println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
    } else {
        for error in &result.errors {
            eprintln!("  error: {error}");
        }
        if show_warnings || !result.is_valid() {
            for warning in &result.warnings {
                eprintln!("  warning: {warning}");
            }
        }
        if result.is_valid() {
            eprintln!("Configuration is valid!");
            eprintln!("\nConfiguration summary:");
            eprintln!("  Subscription: {}", config.provider.subscription_id);
            eprintln!("  Cloud: {}", config.provider.cloud);
            eprintln!("  Domain Services: {}", config.domain_services.len());
        }
    }

    if result.is_valid() {
        Ok(())
    } else {
        Err(ConfigError::validation_general(format!("configuration has {} errors", result.error_count())).into())
    }
}

/// Show what apply would change. Reads only local state.
async fn cmd_plan(config_path: Option<&Path>, formatter: OutputFormatter) -> Result<()> {
    let (config, base_dir) = load_config(config_path, true)?;
    let store = open_store(&config, &base_dir);

    let state = store.load().await?;
    if let Some(state) = &state {
        check_subscription(&config, state);
    }

    let diff = DiffEngine::new().compute_diff(&config, state.as_ref());
    let plan = ProvisionPlan::from_diff(&diff, &config);

    println!("{}", formatter.format_plan(&plan));
    Ok(())
}

/// Apply the plan under the state lock.
async fn cmd_apply(
    config_path: Option<&Path>,
    auto_approve: bool,
    continue_on_error: bool,
    formatter: OutputFormatter,
) -> Result<()> {
    let (config, base_dir) = load_config(config_path, true)?;
    let store = open_store(&config, &base_dir);
    let context = connect(&config)?;

    let lock = store.acquire_lock(&generate_holder_id()).await?;
    let outcome = apply_locked(
        &config,
        &store,
        &lock.lock_id,
        &context,
        auto_approve,
        continue_on_error,
        formatter,
    )
    .await;
    store.release_lock(&lock.lock_id).await?;
    outcome
}

async fn apply_locked(
    config: &AzadConfig,
    store: &LocalStateStore,
    lock_id: &str,
    context: &ProviderContext,
    auto_approve: bool,
    continue_on_error: bool,
    formatter: OutputFormatter,
) -> Result<()> {
    let mut state = store
        .load()
        .await?
        .unwrap_or_else(|| ProviderState::new(&config.provider.subscription_id));
    check_subscription(config, &state);

    let diff = DiffEngine::new().compute_diff(config, Some(&state));
    let plan = ProvisionPlan::from_diff(&diff, config);

    if plan.is_empty() {
        eprintln!("No changes to apply.");
        return Ok(());
    }

    eprintln!("{}", formatter.format_plan(&plan));

    if !auto_approve && !confirm("Do you want to apply this plan? [y/N]: ", "y")? {
        eprintln!("Apply cancelled.");
        return Ok(());
    }

    let executor = PlanExecutor::new(context, store).with_continue_on_error(continue_on_error);
    let result = hold_lock(
        store,
        lock_id,
        LOCK_REFRESH_INTERVAL,
        interruptible(context, executor.execute(&plan, &mut state)),
    )
    .await?;

    println!("{}", formatter.format_execution(&result));
    if result.all_successful() {
        Ok(())
    } else {
        Err(AzadError::internal("apply did not complete"))
    }
}

/// Re-read every managed resource.
async fn cmd_refresh(config_path: Option<&Path>, formatter: OutputFormatter) -> Result<()> {
    let (config, base_dir) = load_config(config_path, true)?;
    let store = open_store(&config, &base_dir);
    let context = connect(&config)?;

    let lock = store.acquire_lock(&generate_holder_id()).await?;
    let outcome = refresh_locked(&store, &context, formatter).await;
    store.release_lock(&lock.lock_id).await?;
    outcome
}

async fn refresh_locked(store: &LocalStateStore, context: &ProviderContext, formatter: OutputFormatter) -> Result<()> {
    let Some(mut state) = store.load().await? else {
        eprintln!("No state found. Nothing to refresh.");
        return Ok(());
    };

    let result = PlanExecutor::new(context, store).refresh(&mut state).await?;
    println!("{}", formatter.format_refresh(&result));
    Ok(())
}

/// Delete every managed resource.
async fn cmd_destroy(config_path: Option<&Path>, auto_approve: bool, formatter: OutputFormatter) -> Result<()> {
    let (config, base_dir) = load_config(config_path, true)?;
    let store = open_store(&config, &base_dir);
    let context = connect(&config)?;

    let lock = store.acquire_lock(&generate_holder_id()).await?;
    let outcome = destroy_locked(&store, &lock.lock_id, &context, auto_approve, formatter).await;
    store.release_lock(&lock.lock_id).await?;
    outcome
}

async fn destroy_locked(
    store: &LocalStateStore,
    lock_id: &str,
    context: &ProviderContext,
    auto_approve: bool,
    formatter: OutputFormatter,
) -> Result<()> {
    let Some(mut state) = store.load().await? else {
        eprintln!("No state found. Nothing to destroy.");
        return Ok(());
    };

    let plan = ProvisionPlan::destroy(&state);
    if plan.is_empty() {
        eprintln!("No managed resources to destroy.");
        return Ok(());
    }

    eprintln!("The following resources will be destroyed:");
    for action in &plan.actions {
        eprintln!(
            "  - {} ({})",
            action.resource_name,
            action.resource_id.as_deref().unwrap_or("unknown ID")
        );
    }

    if !auto_approve && !confirm("\nThis action is IRREVERSIBLE. Type 'destroy' to confirm: ", "destroy")? {
        eprintln!("Destruction cancelled.");
        return Ok(());
    }

    let executor = PlanExecutor::new(context, store).with_continue_on_error(true);
    let result = hold_lock(
        store,
        lock_id,
        LOCK_REFRESH_INTERVAL,
        interruptible(context, executor.execute(&plan, &mut state)),
    )
    .await?;

    println!("{}", formatter.format_execution(&result));
    if result.all_successful() {
        Ok(())
    } else {
        Err(AzadError::internal("destroy did not complete"))
    }
}

/// Adopt an existing instance into state.
async fn cmd_import(
    config_path: Option<&Path>,
    name: &str,
    resource_id: &str,
    formatter: OutputFormatter,
) -> Result<()> {
    let (config, base_dir) = load_config(config_path, true)?;
    let store = open_store(&config, &base_dir);
    let context = connect(&config)?;

    let lock = store.acquire_lock(&generate_holder_id()).await?;
    let outcome = import_locked(&config, &store, &context, name, resource_id, formatter).await;
    store.release_lock(&lock.lock_id).await?;
    outcome
}

async fn import_locked(
    config: &AzadConfig,
    store: &LocalStateStore,
    context: &ProviderContext,
    name: &str,
    resource_id: &str,
    formatter: OutputFormatter,
) -> Result<()> {
    let mut state = store
        .load()
        .await?
        .unwrap_or_else(|| ProviderState::new(&config.provider.subscription_id));
    if state.get(name).is_some() {
        return Err(AzadError::internal(format!(
            "{name} is already managed; remove it from state before importing"
        )));
    }

    let record = PlanExecutor::new(context, store)
        .import(config, name, resource_id, &mut state)
        .await?;
    println!("{}", formatter.format_data(&format!("Imported {name}"), &record));
    Ok(())
}

/// Resolve a directory or policy object.
async fn cmd_lookup(config_path: Option<&Path>, command: LookupCommands, formatter: OutputFormatter) -> Result<()> {
    let (config, _) = load_config(config_path, true)?;
    let context = connect(&config)?;

    let output = match command {
        LookupCommands::ServicePrincipal {
            object_id,
            display_name,
            application_id,
        } => {
            let args = ServicePrincipalArgs {
                object_id,
                display_name,
                application_id,
            };
            let found = read_service_principal(context.graph(), &args).await?;
            formatter.format_data("Service Principal", &found)
        }
        LookupCommands::Application { object_id, name } => {
            let found = read_application(context.graph(), &ApplicationArgs { object_id, name }).await?;
            formatter.format_data("Application", &found)
        }
        LookupCommands::PolicyDefinition { name } => {
            let found = read_policy_definition(context.arm(), &name).await?;
            formatter.format_data("Policy Definition", &found)
        }
    };

    println!("{output}");
    Ok(())
}

/// State management commands.
async fn cmd_state(config_path: Option<&Path>, command: StateCommands, formatter: OutputFormatter) -> Result<()> {
    let (config, base_dir) = load_config(config_path, false)?;
    let store = open_store(&config, &base_dir);

    match command {
        StateCommands::Show => {
            let lock = store.get_lock_info().await?;
            match store.load().await? {
                Some(state) => println!("{}", formatter.format_state(&state, lock.as_ref())),
                None => eprintln!("No state found at {}", store.state_path().display()),
            }
        }
        StateCommands::Unlock { lock_id, force } => {
            if force {
                match store.force_unlock().await? {
                    Some(lock) => eprintln!("State forcefully unlocked (was held by {}).", lock.holder),
                    None => eprintln!("State is not locked."),
                }
            } else if let Some(id) = lock_id {
                store.release_lock(&id).await?;
                eprintln!("State unlocked.");
            } else {
                eprintln!("Please provide --lock-id or use --force");
            }
        }
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Loads `.env` and the configuration, returning it with its directory.
fn load_config(config_path: Option<&Path>, validate: bool) -> Result<(AzadConfig, PathBuf)> {
    let config_file = config_path.map_or_else(|| find_config_file("."), |path| Ok(path.to_path_buf()))?;
    debug!("Loading configuration from: {}", config_file.display());

    let base_dir = config_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    let parser = ConfigParser::new().with_base_path(&base_dir);
    parser.load_dotenv()?;
    let config = parser.load_with_env(&config_file)?;

    if validate {
        let result = ConfigValidator::new().validate(&config)?;
        for warning in &result.warnings {
            warn!("{warning}");
        }
    }

    Ok((config, base_dir))
}

/// Opens the state store configured for this project.
fn open_store(config: &AzadConfig, base_dir: &Path) -> LocalStateStore {
    let dir = config
        .state
        .path
        .as_ref()
        .map_or_else(|| base_dir.join(STATE_DIR), |path| base_dir.join(path));
    LocalStateStore::with_base_dir(dir)
}

/// Builds the provider context.
fn connect(config: &AzadConfig) -> Result<ProviderContext> {
    let credentials = Credentials::from_env(config, |key| std::env::var(key).ok())?;
    ProviderContext::from_config(config, credentials, CancellationToken::new())
}

/// Runs `work` with Ctrl-C cancelling the context's operations.
///
/// Until the first call, Ctrl-C ends the process as usual.
async fn interruptible<T>(context: &ProviderContext, work: impl Future<Output = Result<T>>) -> Result<T> {
    let token = context.reconciler().cancellation().clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; abandoning in-flight operations. They keep running in Azure.");
            token.cancel();
        }
    });

    let outcome = work.await;
    watcher.abort();
    outcome
}

fn check_subscription(config: &AzadConfig, state: &ProviderState) {
    if !state.subscription_id.eq_ignore_ascii_case(&config.provider.subscription_id) {
        warn!(
            "State was recorded for subscription {} but the configuration targets {}",
            state.subscription_id, config.provider.subscription_id
        );
    }
}

/// Prompts on stderr and compares the answer with `expected`.
fn confirm(prompt: &str, expected: &str) -> Result<bool> {
    eprint!("{prompt}");
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    Ok(input.trim().eq_ignore_ascii_case(expected))
}
