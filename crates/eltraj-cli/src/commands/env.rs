use super::{load, progress};
use crate::cli::EnvArgs;
use crate::config::build_env_config;
use crate::error::Result;
use crate::ui::UiEvent;
use eltraj::workflows;
use tokio::sync::mpsc;
use tracing::info;

pub async fn run(args: EnvArgs, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let app = build_env_config(&args)?;
    let (handler, reporter) = progress(ui_sender);

    let loaded = load(&app.loader, &reporter)?;

    info!("Invoking the environment workflow...");
    tokio::task::block_in_place(|| workflows::environment::run(&loaded, &app.task, &reporter))?;

    handler.log(format!(
        "✓ Environment counts (rcut {} A) written to: {}",
        app.task.rcut,
        app.task.output_path.display()
    ));
    Ok(())
}
