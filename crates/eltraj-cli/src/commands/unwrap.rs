use super::{load, progress};
use crate::cli::UnwrapArgs;
use crate::config::build_unwrap_config;
use crate::error::Result;
use crate::ui::UiEvent;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub async fn run(args: UnwrapArgs, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let app = build_unwrap_config(&args)?;
    let (handler, reporter) = progress(ui_sender);

    let loaded = load(&app.loader, &reporter)?;

    for (species, tracks) in &loaded.unwrapped {
        if tracks.is_empty() {
            warn!("No molecules of kind '{}' were found.", species);
        }
        handler.log(format!("  {}: {} tracks", species, tracks.len()));
    }
    for path in &loaded.written {
        handler.log(format!("✓ Written: {}", path.display()));
    }
    Ok(())
}
