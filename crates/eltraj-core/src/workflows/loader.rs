use super::ensure_dir;
use crate::core::io::boxfile::apply_box_source;
use crate::core::io::npy::{save_npy, tracks_to_array};
use crate::core::io::traits::TrajectoryFile;
use crate::core::io::xyz::XyzFile;
use crate::core::models::trajectory::Trajectory;
use crate::engine::config::{LoaderConfig, UnwrapConfig};
use crate::engine::connectivity::{MoleculeAssignment, assign_molecules_traj};
use crate::engine::error::EngineError;
use crate::engine::molecules::{
    CentreMode, MoleculeCentres, apply_species_shift, extract_centres_traj, molecule_kinds,
};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::unwrap::{mean_squared_displacement, unwrap_species};
use nalgebra::Point3;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone)]
pub struct LoadedTrajectory {
    /// Frames with molecule labels stored, and shifted atomic numbers if requested.
    pub trajectory: Trajectory,
    pub assignment: MoleculeAssignment,
    /// Kind of every molecule, in label order.
    pub kinds: Vec<String>,
    /// Molecular centres of every frame, computed before any species shift.
    pub centres: Vec<MoleculeCentres>,
    pub unwrapped: BTreeMap<String, Vec<Vec<Point3<f64>>>>,
    /// Amount added to the shifted atomic numbers.
    pub species_shift: Option<u16>,
    pub written: Vec<PathBuf>,
}

#[instrument(skip_all, name = "loader_workflow")]
pub fn run(config: &LoaderConfig, reporter: &ProgressReporter) -> Result<LoadedTrajectory, EngineError> {
    // === Phase 1: Read frames and box dimensions ===
    reporter.report(Progress::phase("Loading Trajectory"));
    let path = config.trajectory_path.display().to_string();
    info!(path = %path, range = %config.range, "Reading trajectory.");
    let mut trajectory = XyzFile::read_from_path(&config.trajectory_path, &config.range)?;
    if trajectory.is_empty() {
        return Err(EngineError::EmptyTrajectory(path));
    }
    if let Some(source) = &config.box_source {
        apply_box_source(&mut trajectory, source, &config.range)?;
    }
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Molecules from the first frame ===
    reporter.report(Progress::phase("Assigning Molecules"));
    let assignment = assign_molecules_traj(&mut trajectory, &config.cutoffs)?;
    let first = trajectory
        .first()
        .ok_or_else(|| EngineError::EmptyTrajectory(path.clone()))?;
    let kinds = molecule_kinds(first, &assignment, &config.registry)?;

    let mut written = Vec::new();
    if let Some(out) = &config.molecules_output {
        super::ensure_parent(out)?;
        XyzFile::write_to_path(trajectory.frames(), out)?;
        info!(path = %out.display(), "Wrote frames with molecule labels.");
        written.push(out.clone());
    }
    reporter.report(Progress::PhaseFinish);

    // === Phase 3: Molecular centres ===
    reporter.report(Progress::phase("Extracting Centres"));
    let centres = extract_centres_traj(
        &trajectory,
        &assignment,
        &kinds,
        &config.cutoffs,
        CentreMode::Whole,
    )?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 4: Unwrapping (optional) ===
    let mut unwrapped = BTreeMap::new();
    if let Some(unwrap) = &config.unwrap {
        let label = trajectory.range_label();
        unwrapped = unwrap_and_save(&centres, unwrap, config, &label, reporter, &mut written)?;
    }

    // === Phase 5: Species shift (optional) ===
    let species_shift = match &config.species_shift {
        Some(shift) => {
            reporter.report(Progress::phase("Shifting Species"));
            let amount = apply_species_shift(
                &mut trajectory,
                &assignment,
                &kinds,
                &shift.kind,
                &shift.numbers,
            )?;
            reporter.report(Progress::PhaseFinish);
            Some(amount)
        }
        None => None,
    };

    info!(
        frames = trajectory.len(),
        molecules = assignment.n_molecules(),
        "Trajectory loaded."
    );
    Ok(LoadedTrajectory {
        trajectory,
        assignment,
        kinds,
        centres,
        unwrapped,
        species_shift,
        written,
    })
}

fn unwrap_and_save(
    centres: &[MoleculeCentres],
    unwrap: &UnwrapConfig,
    config: &LoaderConfig,
    label: &str,
    reporter: &ProgressReporter,
    written: &mut Vec<PathBuf>,
) -> Result<BTreeMap<String, Vec<Vec<Point3<f64>>>>, EngineError> {
    reporter.report(Progress::phase(format!("Unwrapping ({})", unwrap.method)));
    reporter.report(Progress::TaskStart {
        total: unwrap.species.len() as u64,
    });
    ensure_dir(&config.output_dir)?;

    let mut result = BTreeMap::new();
    for species in &unwrap.species {
        let tracks = unwrap_species(centres, species, unwrap.method)?;
        if tracks.is_empty() {
            warn!(species = %species, "No molecules of this kind to unwrap.");
        }

        let method = unwrap.method.name();
        let tracks_path = config
            .output_dir
            .join(format!("{method}_unwrap_traj_{species}_{label}"));
        written.push(save_npy(&tracks_path, &tracks_to_array(&tracks)?)?);

        let msd_path = config
            .output_dir
            .join(format!("{method}_msd_{species}_{label}"));
        written.push(save_npy(&msd_path, &mean_squared_displacement(&tracks))?);

        info!(species = %species, molecules = tracks.len(), "Saved unwrapped tracks.");
        result.insert(species.clone(), tracks);
        reporter.tick();
    }

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);
    Ok(result)
}
