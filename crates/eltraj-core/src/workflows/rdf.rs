use super::ensure_parent;
use crate::core::models::trajectory::Trajectory;
use crate::engine::config::RdfConfig;
use crate::engine::connectivity::CutoffSpec;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::rdf::{RdfStats, compute_rdfs_traj_stats};
use std::path::Path;
use tracing::{info, instrument};

/// Windowed RDF statistics over a trajectory, written as CSV to `config.output_path`.
///
/// Frames without stored molecule labels are segmented with `cutoffs`.
#[instrument(skip_all, name = "rdf_workflow")]
pub fn run(
    trajectory: &Trajectory,
    cutoffs: &CutoffSpec,
    config: &RdfConfig,
    reporter: &ProgressReporter,
) -> Result<RdfStats, EngineError> {
    reporter.report(Progress::phase("Computing RDFs"));
    let stats = compute_rdfs_traj_stats(
        trajectory.frames(),
        cutoffs,
        config.rmax,
        config.nbins,
        config.window,
        reporter,
    )?;
    reporter.report(Progress::PhaseFinish);

    write_table(&stats, &config.output_path)?;
    info!(
        path = %config.output_path.display(),
        curves = stats.curves.len(),
        windows = stats.windows,
        "RDF statistics written."
    );
    Ok(stats)
}

/// One row per bin: `r`, then `{key}_avg` and `{key}_std` for every curve.
pub fn write_table(stats: &RdfStats, path: &Path) -> Result<(), EngineError> {
    let table_error = |source| EngineError::Table {
        path: path.display().to_string(),
        source,
    };
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path).map_err(table_error)?;

    let mut header = vec!["r".to_string()];
    for key in stats.curves.keys() {
        header.push(format!("{key}_avg"));
        header.push(format!("{key}_std"));
    }
    writer.write_record(&header).map_err(table_error)?;

    for (bin, r) in stats.r.iter().enumerate() {
        let mut record = vec![r.to_string()];
        for curve in stats.curves.values() {
            record.push(curve.avg[bin].to_string());
            record.push(curve.std[bin].to_string());
        }
        writer.write_record(&record).map_err(table_error)?;
    }
    writer.flush().map_err(|e| table_error(e.into()))?;
    Ok(())
}
