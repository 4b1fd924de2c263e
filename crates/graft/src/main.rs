mod batch;
mod config;
mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::{debug, info};
use thiserror::Error;

use graft_core::kernel::constants::{APP_NAME, APP_VERSION};
use graft_core::plugin_system::{PluginSystemError, RunError};
use graft_core::{LifecycleContext, PluginOrchestrator, SharedContext};

use crate::batch::BatchFile;
use crate::config::HostConfig;

/// Graft: compose plugin contributions into a shared context and drive their lifecycle
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Host configuration file (.json, .yaml, .yml or .toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the resolved plugin order of a batch
    Order {
        /// Batch file describing the plugins
        batch: PathBuf,
    },
    /// Apply every plugin's contributions and print the resulting context
    Apply {
        batch: PathBuf,
        /// Also print which plugin owns each contributed property
        #[arg(long)]
        owners: bool,
    },
    /// Run the full lifecycle around a simulated script
    Run {
        batch: PathBuf,
        /// Make the simulated script fail so the on-error hooks fire
        #[arg(long)]
        fail_script: bool,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] graft_core::Error),

    #[error(transparent)]
    Plugin(#[from] PluginSystemError),

    /// The run ended in an error that was already handed to on-error hooks
    #[error(transparent)]
    Aborted(RunError),

    #[error("Failed to render context: {0}")]
    Render(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
#[error("script '{script}' exited with a failure")]
struct ScriptFailed {
    script: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config = match HostConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let level = if args.verbose { "debug" } else { config.log_level.as_str() };
    if let Err(e) = logging::init(level) {
        eprintln!("warning: {}", e);
    }
    debug!("{} v{} starting", APP_NAME, APP_VERSION);

    let result = match args.command {
        Commands::Order { batch } => order(&config, &batch),
        Commands::Apply { batch, owners } => apply(&config, &batch, owners).await,
        Commands::Run { batch, fail_script } => run(&config, &batch, fail_script).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn orchestrator(config: &HostConfig, batch: &Path) -> Result<PluginOrchestrator, CliError> {
    let records = BatchFile::load(batch)?.into_records(config.default_conflict_strategy);
    Ok(PluginOrchestrator::new(records))
}

fn order(config: &HostConfig, batch: &Path) -> Result<(), CliError> {
    let mut orchestrator = orchestrator(config, batch)?;
    let order = orchestrator.resolve_order()?;
    for (position, plugin) in order.iter().enumerate() {
        if plugin.dependencies().is_empty() {
            println!("{}. {} (priority {})", position + 1, plugin.name(), plugin.priority());
        } else {
            println!(
                "{}. {} (priority {}, after {})",
                position + 1,
                plugin.name(),
                plugin.priority(),
                plugin.dependencies().join(", ")
            );
        }
    }
    Ok(())
}

async fn apply(config: &HostConfig, batch: &Path, owners: bool) -> Result<(), CliError> {
    let mut orchestrator = orchestrator(config, batch)?;
    orchestrator.resolve_order()?;

    let mut context = SharedContext::with_namespaces(&config.namespaces);
    let report = orchestrator.apply_extensions(&mut context).await?;
    debug!("{} write(s) committed", report.writes_committed);

    println!("{}", serde_json::to_string_pretty(&context.to_json())?);
    if owners {
        println!("Owners:");
        for (path, owner) in &report.ownership {
            println!("  {} -> {}", path, owner);
        }
    }
    Ok(())
}

async fn run(config: &HostConfig, batch: &Path, fail_script: bool) -> Result<(), CliError> {
    let mut orchestrator = orchestrator(config, batch)?;
    orchestrator.resolve_order()?;

    let mut context = SharedContext::with_namespaces(&config.namespaces);
    orchestrator.apply_extensions(&mut context).await?;

    let script = batch.display().to_string();
    let lifecycle = LifecycleContext::new().with_attribute("script", script.as_str());

    if let Err(e) = orchestrator.run_before_run(&lifecycle).await {
        let error: RunError = Arc::new(e);
        orchestrator.run_on_error(&lifecycle, Arc::clone(&error)).await?;
        return Err(CliError::Aborted(error));
    }

    info!("Running script '{}'", script);
    if fail_script {
        let error: RunError = Arc::new(ScriptFailed { script });
        orchestrator.run_on_error(&lifecycle, Arc::clone(&error)).await?;
        return Err(CliError::Aborted(error));
    }

    let summary = orchestrator.run_after_run(&lifecycle).await?;
    println!(
        "Run completed ({} after-run hooks, {} failed)",
        summary.hooks_invoked,
        summary.failures.len()
    );
    Ok(())
}
