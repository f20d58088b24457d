use super::ensure_parent;
use super::loader::LoadedTrajectory;
use crate::engine::config::EnvironmentConfig;
use crate::engine::environment::{EnvironmentTable, molecule_environments};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use std::path::Path;
use tracing::{info, instrument};

/// Neighbour-kind counts of every molecule in every frame, written as CSV.
#[instrument(skip_all, name = "environment_workflow", fields(rcut = config.rcut))]
pub fn run(
    loaded: &LoadedTrajectory,
    config: &EnvironmentConfig,
    reporter: &ProgressReporter,
) -> Result<EnvironmentTable, EngineError> {
    reporter.report(Progress::phase("Molecular Environments"));
    let labels = match &config.labels {
        Some(labels) => labels.clone(),
        None => loaded
            .centres
            .first()
            .map(|c| c.kind_labels())
            .unwrap_or_default(),
    };
    let table = molecule_environments(&loaded.centres, &labels, config.rcut)?;
    reporter.report(Progress::PhaseFinish);

    write_table(&table, &config.output_path)?;
    info!(path = %config.output_path.display(), "Environment counts written.");
    Ok(table)
}

/// Columns `kind` then one count column per label; one row per molecule and frame.
pub fn write_table(table: &EnvironmentTable, path: &Path) -> Result<(), EngineError> {
    let table_error = |source| EngineError::Table {
        path: path.display().to_string(),
        source,
    };
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path).map_err(table_error)?;

    let mut header = vec!["kind".to_string()];
    header.extend(table.labels.iter().cloned());
    writer.write_record(&header).map_err(table_error)?;

    for (kind, rows) in &table.rows {
        for row in rows {
            let mut record = vec![kind.clone()];
            record.extend(row.iter().map(usize::to_string));
            writer.write_record(&record).map_err(table_error)?;
        }
    }
    writer.flush().map_err(|e| table_error(e.into()))?;
    Ok(())
}
