mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod ui;

use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};
use crate::ui::{UiEvent, UiManager};
use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    match run_app(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Let the UI task clear its bars before the message lands.
            tokio::time::sleep(Duration::from_millis(50)).await;
            eprintln!("\n❌ Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn install_panic_report() -> Result<()> {
    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default()
        .display_env_section(false)
        .into_hooks();
    eyre_hook
        .install()
        .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to install the error report hook: {e}")))?;
    std::panic::set_hook(Box::new(move |info| {
        error!("{}", panic_hook.panic_report(info));
    }));
    Ok(())
}

fn configure_threads(threads: Option<usize>) -> Result<()> {
    let Some(n) = threads else {
        return Ok(());
    };
    info!(threads = n, "Configuring the global Rayon pool.");
    rayon::ThreadPoolBuilder::new()
        .num_threads(n)
        .build_global()
        .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to build global thread pool: {e}")))
}

async fn dispatch(command: Commands, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    match command {
        Commands::Molecules(args) => commands::molecules::run(args, ui_sender).await,
        Commands::Unwrap(args) => commands::unwrap::run(args, ui_sender).await,
        Commands::Rdf(args) => commands::rdf::run(args, ui_sender).await,
        Commands::Env(args) => commands::env::run(args, ui_sender).await,
        Commands::Descriptor(args) => commands::descriptor::run(args, ui_sender).await,
    }
}

async fn run_app(cli: Cli) -> Result<()> {
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.clone())?;
    install_panic_report()?;

    let (ui_manager, ui_sender, shutdown_sender) = UiManager::new();
    let ui_handle = tokio::spawn(ui_manager.run());

    info!("eltraj v{} starting.", env!("CARGO_PKG_VERSION"));
    debug!(?cli, "Parsed arguments.");
    let command_name = cli.command.name();

    let outcome = match configure_threads(cli.threads) {
        Ok(()) => dispatch(cli.command, ui_sender).await,
        Err(e) => Err(e),
    };

    match &outcome {
        Ok(()) => info!(command = command_name, "Finished."),
        Err(e) => error!(command = command_name, "Failed: {e}"),
    }

    if shutdown_sender.send(true).is_err() {
        warn!("UI task exited before the shutdown signal.");
    }
    ui_handle
        .await
        .map_err(|e| CliError::Other(anyhow::anyhow!("UI task failed: {e}")))?;

    if outcome.is_ok() && !cli.quiet {
        println!("✅ {command_name} completed.");
    }
    outcome
}
