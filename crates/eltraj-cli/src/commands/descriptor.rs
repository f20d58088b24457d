use super::{load, progress};
use crate::cli::DescriptorArgs;
use crate::config::build_descriptor_config;
use crate::error::{CliError, Result};
use crate::ui::UiEvent;
use eltraj::engine::descriptor::{CommandBackend, DescriptorParams};
use eltraj::workflows;
use tokio::sync::mpsc;
use tracing::info;

pub async fn run(args: DescriptorArgs, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let app = build_descriptor_config(&args)?;
    let (handler, reporter) = progress(ui_sender);

    let descriptor_string = app.task.params.descriptor_string()?;
    if args.print_only {
        println!("{}", descriptor_string);
        if let DescriptorParams::Turbo(turbo) = &app.task.params {
            println!("{}", turbo.gap_fit_string()?);
        }
        return Ok(());
    }

    let program = app.task.program.clone().ok_or_else(|| {
        CliError::Config(
            "A descriptor program is required either via --program or `descriptor.backend.program`."
                .to_string(),
        )
    })?;

    let loaded = load(&app.loader, &reporter)?;
    if let Some(shift) = loaded.species_shift {
        handler.log(format!("Species of the shifted atoms were offset by {}", shift));
    }

    let config = app
        .task
        .resolve(loaded.trajectory.len())
        .map_err(|e| CliError::Config(e.to_string()))?;
    let backend = CommandBackend::new(program, app.task.args.clone(), descriptor_string);

    info!("Invoking the descriptor workflow...");
    let output = tokio::task::block_in_place(|| {
        workflows::descriptor::run(&loaded.trajectory, &config, &backend, &reporter)
    })?;

    for path in &output.written {
        handler.log(format!("✓ Written: {}", path.display()));
    }
    Ok(())
}
