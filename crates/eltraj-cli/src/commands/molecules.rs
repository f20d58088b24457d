use super::{kind_summary, load, progress};
use crate::cli::MoleculesArgs;
use crate::config::build_molecules_config;
use crate::error::Result;
use crate::ui::UiEvent;
use tokio::sync::mpsc;
use tracing::info;

pub async fn run(args: MoleculesArgs, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let app = build_molecules_config(&args)?;
    let (handler, reporter) = progress(ui_sender);

    let loaded = load(&app.loader, &reporter)?;

    let blocks: Vec<String> = loaded
        .assignment
        .composition()
        .iter()
        .map(|(molecules, atoms)| format!("{molecules} x {atoms} atoms"))
        .collect();
    handler.log(format!(
        "{} molecules ({}) over {} frames; composition: {}",
        loaded.assignment.n_molecules(),
        kind_summary(&loaded.kinds),
        loaded.trajectory.len(),
        blocks.join(", ")
    ));
    handler.log(format!("✓ Labelled frames written to: {}", app.task.display()));
    Ok(())
}
