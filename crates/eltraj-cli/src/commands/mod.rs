pub mod descriptor;
pub mod env;
pub mod molecules;
pub mod rdf;
pub mod unwrap;

use crate::error::Result;
use crate::ui::{ProgressForwarder, UiEvent};
use eltraj::engine::config::LoaderConfig;
use eltraj::engine::progress::ProgressReporter;
use eltraj::workflows::{self, loader::LoadedTrajectory};
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tracing::info;

fn progress(ui_sender: mpsc::Sender<UiEvent>) -> (ProgressForwarder, ProgressReporter<'static>) {
    let handler = ProgressForwarder::new(ui_sender);
    let reporter = ProgressReporter::with_callback(handler.callback());
    (handler, reporter)
}

fn load(config: &LoaderConfig, reporter: &ProgressReporter) -> Result<LoadedTrajectory> {
    info!("Invoking the trajectory loader workflow...");
    let loaded = tokio::task::block_in_place(|| workflows::loader::run(config, reporter))?;
    Ok(loaded)
}

/// `"12 EC, 3 Li"`, kinds in alphabetical order.
fn kind_summary(kinds: &[String]) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for kind in kinds {
        *counts.entry(kind.as_str()).or_default() += 1;
    }
    counts
        .iter()
        .map(|(kind, n)| format!("{n} {kind}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_summary_counts_each_kind() {
        let kinds: Vec<String> = ["EC", "Li", "EC", "PF6", "Li", "EC"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(kind_summary(&kinds), "3 EC, 2 Li, 1 PF6");
        assert_eq!(kind_summary(&[]), "");
    }
}
