use super::connectivity::{ConnectivityError, CutoffSpec, MoleculeAssignment, assignment_for};
use super::neighbors::NeighborList;
use super::progress::{Progress, ProgressReporter};
use crate::core::models::element::symbol_for;
use crate::core::models::frame::Frame;
use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt;
use thiserror::Error;
use tracing::{info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RdfError {
    #[error("Invalid RDF binning: rmax = {rmax}, nbins = {nbins}")]
    InvalidBinning { rmax: f64, nbins: usize },
    #[error("RDF requires a cell with non-zero volume")]
    NoVolume,
    #[error("Assignment covers {expected} atoms but the frame has {actual}")]
    AssignmentMismatch { expected: usize, actual: usize },
    #[error("RDF window must hold at least one frame")]
    ZeroWindow,
    #[error("Window of {window} frames does not fit into {frames} frames")]
    WindowTooLarge { window: usize, frames: usize },
    #[error(transparent)]
    Connectivity(#[from] ConnectivityError),
}

/// Whether a pair belongs to one molecule or to two different ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PairKind {
    Intra,
    Inter,
}

impl PairKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PairKind::Intra => "intra",
            PairKind::Inter => "inter",
        }
    }
}

/// Identifies one partial RDF: pair kind and an ordered species pair `z1 <= z2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RdfKey {
    pub kind: PairKind,
    pub z1: u16,
    pub z2: u16,
}

impl fmt::Display for RdfKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}_{}",
            symbol_for(self.z1),
            symbol_for(self.z2),
            self.kind.as_str()
        )
    }
}

/// Partial RDF curves sharing one set of bin centres.
#[derive(Debug, Clone, PartialEq)]
pub struct RdfSet {
    pub r: Vec<f64>,
    pub curves: BTreeMap<RdfKey, Vec<f64>>,
}

/// Per-bin mean and population standard deviation over windows.
#[derive(Debug, Clone, PartialEq)]
pub struct RdfBinStats {
    pub avg: Vec<f64>,
    pub std: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RdfStats {
    pub r: Vec<f64>,
    pub windows: usize,
    pub curves: BTreeMap<RdfKey, RdfBinStats>,
}

/// Centres `(i - 1/2) dr` of bins `i = 1..=nbins`.
pub fn bin_centres(rmax: f64, nbins: usize) -> Vec<f64> {
    let dr = rmax / nbins as f64;
    (1..=nbins).map(|i| (i as f64 - 0.5) * dr).collect()
}

fn check_binning(rmax: f64, nbins: usize) -> Result<(), RdfError> {
    if nbins == 0 || !(rmax > 0.0) {
        return Err(RdfError::InvalidBinning { rmax, nbins });
    }
    Ok(())
}

/// Half the smallest perpendicular width over the periodic axes, when `rmax` exceeds it.
///
/// Only minimum images are counted, so bins beyond this radius are undercounted.
pub fn minimum_image_limit(frame: &Frame, rmax: f64) -> Option<f64> {
    let widths = frame.cell().perpendicular_widths();
    let limit = (0..3)
        .filter(|&axis| frame.pbc()[axis])
        .map(|axis| widths[axis] / 2.0)
        .fold(f64::INFINITY, f64::min);
    (rmax > limit).then_some(limit)
}

/// Intra- and intermolecular partial RDFs of one frame.
///
/// For every species pair `z1 <= z2` present in the frame, ordered pairs at
/// distance `r` fall into bin `ceil(r / dr)`; coincident atoms and pairs beyond
/// `rmax` are discarded. Bin `i` is divided by
/// `4 pi dr (N_z1 / V) N ((i - 1/2)^2 dr^2 + dr^2 / 12)`, doubled for unlike species,
/// and scaled by `N_z1 / N`.
pub fn compute_rdfs(
    frame: &Frame,
    assignment: &MoleculeAssignment,
    rmax: f64,
    nbins: usize,
) -> Result<RdfSet, RdfError> {
    check_binning(rmax, nbins)?;
    if assignment.n_atoms() != frame.len() {
        return Err(RdfError::AssignmentMismatch {
            expected: assignment.n_atoms(),
            actual: frame.len(),
        });
    }
    let volume = frame.volume();
    if volume <= 0.0 {
        return Err(RdfError::NoVolume);
    }
    if let Some(limit) = minimum_image_limit(frame, rmax) {
        warn!(rmax, limit, "rmax exceeds half the cell width; outer bins are undercounted.");
    }

    let counts = frame.species_counts();
    let species: Vec<u16> = counts.keys().copied().collect();
    let mut histograms: BTreeMap<RdfKey, Vec<f64>> = BTreeMap::new();
    for kind in [PairKind::Intra, PairKind::Inter] {
        for (a, &z1) in species.iter().enumerate() {
            for &z2 in &species[a..] {
                histograms.insert(RdfKey { kind, z1, z2 }, vec![0.0; nbins]);
            }
        }
    }

    let dr = rmax / nbins as f64;
    let numbers = frame.numbers();
    let pairs = NeighborList::within(frame, rmax);
    for (i, j) in pairs.pairs() {
        let d = frame.distance(i, j);
        let index = (d / dr).ceil() as usize;
        if index == 0 || index > nbins {
            continue;
        }
        let (z1, z2) = if numbers[i] <= numbers[j] {
            (numbers[i], numbers[j])
        } else {
            (numbers[j], numbers[i])
        };
        let kind = if assignment.same_molecule(i, j) {
            PairKind::Intra
        } else {
            PairKind::Inter
        };
        // Both orderings of a like pair are counted; an unlike pair is counted
        // once and doubled afterwards.
        if let Some(hist) = histograms.get_mut(&RdfKey { kind, z1, z2 }) {
            hist[index - 1] += if z1 == z2 { 2.0 } else { 1.0 };
        }
    }

    let n = frame.len() as f64;
    let curves = histograms
        .into_iter()
        .map(|(key, hist)| {
            let n_z1 = counts[&key.z1] as f64;
            let norm = 4.0 * PI * dr * (n_z1 / volume) * n;
            let multiplicity = if key.z1 == key.z2 { 1.0 } else { 2.0 };
            let factor = multiplicity * n_z1 / n;
            let curve = hist
                .iter()
                .enumerate()
                .map(|(b, &count)| {
                    let r = (b as f64 + 0.5) * dr;
                    count / (norm * (r * r + dr * dr / 12.0)) * factor
                })
                .collect();
            (key, curve)
        })
        .collect();

    Ok(RdfSet {
        r: bin_centres(rmax, nbins),
        curves,
    })
}

fn average(sets: &[RdfSet], rmax: f64, nbins: usize) -> RdfSet {
    let mut curves: BTreeMap<RdfKey, Vec<f64>> = BTreeMap::new();
    for set in sets {
        for (key, curve) in &set.curves {
            let acc = curves.entry(*key).or_insert_with(|| vec![0.0; nbins]);
            for (a, v) in acc.iter_mut().zip(curve) {
                *a += v;
            }
        }
    }
    let n = sets.len().max(1) as f64;
    for curve in curves.values_mut() {
        for v in curve.iter_mut() {
            *v /= n;
        }
    }
    RdfSet {
        r: bin_centres(rmax, nbins),
        curves,
    }
}

fn per_frame(
    frames: &[Frame],
    spec: &CutoffSpec,
    rmax: f64,
    nbins: usize,
    reporter: &ProgressReporter,
) -> Result<Vec<RdfSet>, RdfError> {
    #[cfg(not(feature = "parallel"))]
    let iterator = frames.iter();

    #[cfg(feature = "parallel")]
    let iterator = frames.par_iter();

    iterator
        .map(|frame| {
            let assignment = assignment_for(frame, spec)?;
            let set = compute_rdfs(frame, &assignment, rmax, nbins);
            reporter.tick();
            set
        })
        .collect()
}

/// Frame-averaged partial RDFs. Species missing from a frame contribute zeros.
#[instrument(skip_all, name = "rdf_traj_avg")]
pub fn compute_rdfs_traj_avg(
    frames: &[Frame],
    spec: &CutoffSpec,
    rmax: f64,
    nbins: usize,
) -> Result<RdfSet, RdfError> {
    check_binning(rmax, nbins)?;
    let sets = per_frame(frames, spec, rmax, nbins, &ProgressReporter::new())?;
    Ok(average(&sets, rmax, nbins))
}

/// Mean and spread of window-averaged RDFs over `floor(n / window)` consecutive windows.
#[instrument(skip_all, name = "rdf_traj_stats", fields(frames = frames.len(), window = window))]
pub fn compute_rdfs_traj_stats(
    frames: &[Frame],
    spec: &CutoffSpec,
    rmax: f64,
    nbins: usize,
    window: usize,
    reporter: &ProgressReporter,
) -> Result<RdfStats, RdfError> {
    check_binning(rmax, nbins)?;
    if window == 0 {
        return Err(RdfError::ZeroWindow);
    }
    let n_windows = frames.len() / window;
    if n_windows == 0 {
        return Err(RdfError::WindowTooLarge {
            window,
            frames: frames.len(),
        });
    }

    let used = &frames[..n_windows * window];
    reporter.report(Progress::TaskStart {
        total: used.len() as u64,
    });
    let sets = per_frame(used, spec, rmax, nbins, reporter)?;
    reporter.report(Progress::TaskFinish);

    let window_means: Vec<RdfSet> = sets
        .chunks(window)
        .map(|chunk| average(chunk, rmax, nbins))
        .collect();

    let mut keys: Vec<RdfKey> = window_means
        .iter()
        .flat_map(|s| s.curves.keys().copied())
        .collect();
    keys.sort_unstable();
    keys.dedup();

    let zeros = vec![0.0; nbins];
    let curves = keys
        .into_iter()
        .map(|key| {
            let samples: Vec<&Vec<f64>> = window_means
                .iter()
                .map(|s| s.curves.get(&key).unwrap_or(&zeros))
                .collect();
            let m = samples.len() as f64;
            let avg: Vec<f64> = (0..nbins)
                .map(|b| samples.iter().map(|c| c[b]).sum::<f64>() / m)
                .collect();
            let std = (0..nbins)
                .map(|b| {
                    let var = samples.iter().map(|c| (c[b] - avg[b]).powi(2)).sum::<f64>() / m;
                    var.sqrt()
                })
                .collect();
            (key, RdfBinStats { avg, std })
        })
        .collect();

    info!(windows = n_windows, "RDF statistics complete.");
    Ok(RdfStats {
        r: bin_centres(rmax, nbins),
        windows: n_windows,
        curves,
    })
}
