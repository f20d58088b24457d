use super::{load, progress};
use crate::cli::RdfArgs;
use crate::config::build_rdf_config;
use crate::error::Result;
use crate::ui::UiEvent;
use eltraj::workflows;
use tokio::sync::mpsc;
use tracing::info;

pub async fn run(args: RdfArgs, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let app = build_rdf_config(&args)?;
    let (handler, reporter) = progress(ui_sender);

    let loaded = load(&app.loader, &reporter)?;

    info!("Invoking the RDF workflow...");
    let stats = tokio::task::block_in_place(|| {
        workflows::rdf::run(&loaded.trajectory, &app.loader.cutoffs, &app.task, &reporter)
    })?;

    handler.log(format!(
        "{} curves averaged over {} window(s) of {} frame(s)",
        stats.curves.len(),
        stats.windows,
        app.task.window
    ));
    handler.log(format!(
        "✓ RDF table written to: {}",
        app.task.output_path.display()
    ));
    Ok(())
}
