//! CLI entrypoint for toolmesh
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde_json::Map;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use toolmesh_application::{ExecutionObserver, LocalFunctionRegistry, NoObserver, ProtocolExecutor, ToolRouter};
use toolmesh_domain::{AgentCapabilities, CapabilityRegistry, RunStatus};
use toolmesh_infrastructure::{
    ConfigLoader, ConnectionManager, FileConfig, HttpTransportFactory, ProtocolLoader, builtin_registry,
};
use toolmesh_presentation::{Cli, Command, ConsoleFormatter, ProgressReporter, SimpleProgress};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Interval between job status polls for `run --async`
const JOB_POLL_INTERVAL: Duration = Duration::from_millis(200);

type Router = ToolRouter<ConnectionManager>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_guard = init_logging(&cli)?;

    if cli.command == Command::Config {
        print_config_sources(cli.config.as_deref());
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())?
    };
    let formatter = ConsoleFormatter::new(cli.output);
    let loader = ProtocolLoader::new(config.executor.protocols_dir.clone());

    // Validation needs no connections
    if let Command::Validate { protocol } = &cli.command {
        let definition = loader
            .load(protocol)
            .with_context(|| format!("Invalid protocol '{}'", protocol))?;
        print!("{}", formatter.validated(&definition));
        return Ok(());
    }

    info!("Starting toolmesh");

    // === Dependency Injection ===
    let functions = builtin_registry();
    let registry = capability_registry(&config, &functions);

    let manager = Arc::new(
        ConnectionManager::new(Arc::new(HttpTransportFactory::new()))
            .with_settings(config.health.to_health_settings()),
    );
    for provider in config.provider_configs() {
        if let Err(e) = manager.connect(provider).await {
            warn!("Skipping provider: {}", e);
        }
    }

    let cancel = CancellationToken::new();
    let monitor = manager.spawn_health_monitor(cancel.clone());

    let router = Arc::new(
        ToolRouter::new(registry, functions, Arc::clone(&manager))
            .with_params(config.router.to_router_params()),
    );

    let outcome = run_command(&cli, &config, &loader, &formatter, &manager, router).await;

    cancel.cancel();
    let _ = monitor.await;
    manager.shutdown().await;

    if !outcome? {
        drop(log_guard);
        std::process::exit(1);
    }
    Ok(())
}

/// Execute the selected command. Returns `false` when a run failed.
async fn run_command(
    cli: &Cli,
    config: &FileConfig,
    loader: &ProtocolLoader,
    formatter: &ConsoleFormatter,
    manager: &Arc<ConnectionManager>,
    router: Arc<Router>,
) -> Result<bool> {
    match &cli.command {
        Command::Run {
            protocol,
            vars,
            run_async,
            agent,
        } => {
            let definition = loader
                .load(protocol)
                .with_context(|| format!("Failed to load protocol '{}'", protocol))?;
            let variables: Map<String, serde_json::Value> = vars.iter().cloned().collect();

            let mut params = config.executor.to_execution_params();
            if let Some(agent) = agent {
                params = params.with_agent(agent);
            }
            let executor = Arc::new(ProtocolExecutor::new(router).with_params(params));

            let status = if *run_async {
                run_as_job(cli, formatter, &executor, definition, variables).await?
            } else {
                let result = if cli.quiet {
                    executor.execute_with_observer(&definition, variables, &NoObserver).await
                } else if formatter.is_json() {
                    executor.execute_with_observer(&definition, variables, &SimpleProgress).await
                } else {
                    let progress = ProgressReporter::new();
                    executor.execute_with_observer(&definition, variables, &progress).await
                };
                print!("{}", formatter.run_result(&result));
                result.status
            };
            Ok(status == RunStatus::Completed)
        }
        Command::Tools { agent } => {
            let tools = router.list_tools_for_agent(agent).await?;
            print!("{}", formatter.tools(agent, &tools));
            Ok(true)
        }
        Command::Resolve { agent, tool } => {
            let reference = router.resolve(agent, tool).await?;
            print!("{}", formatter.reference(agent, tool, &reference));
            Ok(true)
        }
        Command::Health => {
            let health = manager.health().await;
            print!("{}", formatter.health(&health));
            Ok(health.iter().all(|p| p.healthy))
        }
        Command::Validate { .. } | Command::Config => Ok(true),
    }
}

async fn run_as_job(
    cli: &Cli,
    formatter: &ConsoleFormatter,
    executor: &Arc<ProtocolExecutor<Router>>,
    definition: toolmesh_domain::ProtocolDefinition,
    variables: Map<String, serde_json::Value>,
) -> Result<RunStatus> {
    let observer: Arc<dyn ExecutionObserver> = if cli.quiet {
        Arc::new(NoObserver)
    } else {
        Arc::new(SimpleProgress)
    };
    let id = executor
        .execute_async_with_observer(definition, variables, observer)
        .await;
    if !cli.quiet {
        eprintln!("Started job {}", id);
    }

    let mut ticker = tokio::time::interval(JOB_POLL_INTERVAL);
    loop {
        ticker.tick().await;
        let job = executor.get_job(&id).await?;
        if job.is_finished() {
            print!("{}", formatter.job(&job));
            return Ok(job.status);
        }
    }
}

/// Agents from the config, or a single executor agent granted every
/// built-in function and every configured provider.
fn capability_registry(config: &FileConfig, functions: &LocalFunctionRegistry) -> CapabilityRegistry {
    let registry = config.capability_registry();
    if !registry.is_empty() {
        return registry;
    }

    let agent = functions
        .names()
        .into_iter()
        .fold(AgentCapabilities::new(&config.executor.agent), |agent, name| {
            agent.with_local_function(name)
        });
    let agent = config
        .providers
        .iter()
        .fold(agent, |agent, provider| agent.with_provider(&provider.name));
    info!(agent = %agent.name, "No agents configured, using default executor agent");
    CapabilityRegistry::from_agents([agent])
}

fn init_logging(cli: &Cli) -> Result<Option<WorkerGuard>> {
    // Initialize logging based on verbosity level
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match &cli.log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let Some(file) = path.file_name() else {
                bail!("Invalid log file path: {}", path.display());
            };
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file));
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

fn print_config_sources(explicit: Option<&Path>) {
    println!("Configuration sources (highest priority first):");
    println!("  env       TOOLMESH_* variables");
    if let Some(path) = explicit {
        println!("  explicit  {}", path.display());
    }
    for (name, path) in ConfigLoader::config_sources() {
        match path {
            Some(path) => println!("  {:<9} {}", name, path.display()),
            None => println!("  {:<9} (not found)", name),
        }
    }
}
