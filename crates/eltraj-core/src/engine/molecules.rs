use super::connectivity::{ConnectivityError, CutoffSpec, MoleculeAssignment, bond_graph};
use super::neighbors::DEFAULT_SKIN;
use crate::core::models::element::{ElementError, symbol_for};
use crate::core::models::frame::{Frame, FrameError};
use crate::core::models::trajectory::Trajectory;
use crate::core::utils::geometry::center_of_mass;
use nalgebra::{Point3, Vector3};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use thiserror::Error;
use tracing::{info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MoleculeError {
    #[error("Unknown molecular formula '{0}'")]
    UnknownFormula(String),
    #[error(transparent)]
    Element(#[from] ElementError),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Connectivity(#[from] ConnectivityError),
    #[error("Assignment covers {expected} atoms/molecules but {actual} were given")]
    AssignmentMismatch { expected: usize, actual: usize },
    #[error("Molecule {0} has no mass")]
    Massless(usize),
}

/// Chemical formula in Hill order: carbon, then hydrogen, then the remaining
/// symbols alphabetically. Without carbon every symbol is alphabetical.
/// Counts of one are omitted.
pub fn hill_formula(numbers: &[u16]) -> String {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for &z in numbers {
        *counts.entry(symbol_for(z).into_owned()).or_insert(0) += 1;
    }
    let mut ordered: Vec<(String, usize)> = Vec::with_capacity(counts.len());
    if let Some(c) = counts.remove("C") {
        ordered.push(("C".to_string(), c));
        if let Some(h) = counts.remove("H") {
            ordered.push(("H".to_string(), h));
        }
    }
    ordered.extend(counts);
    ordered
        .into_iter()
        .map(|(symbol, n)| {
            if n == 1 {
                symbol
            } else {
                format!("{symbol}{n}")
            }
        })
        .collect()
}

/// Maps Hill formulas to molecule kind names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct MoleculeRegistry {
    kinds: BTreeMap<String, String>,
}

impl Default for MoleculeRegistry {
    fn default() -> Self {
        let kinds = [
            ("C3H4O3", "EC"),
            ("C4H8O3", "EMC"),
            ("Li", "Li"),
            ("F6P", "PF6"),
        ]
        .into_iter()
        .map(|(f, k)| (f.to_string(), k.to_string()))
        .collect();
        Self { kinds }
    }
}

impl MoleculeRegistry {
    pub fn empty() -> Self {
        Self {
            kinds: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, formula: impl Into<String>, kind: impl Into<String>) {
        self.kinds.insert(formula.into(), kind.into());
    }

    /// Adds every entry of `other`, replacing existing formulas.
    pub fn extend(&mut self, other: &MoleculeRegistry) {
        self.kinds
            .extend(other.kinds.iter().map(|(f, k)| (f.clone(), k.clone())));
    }

    pub fn kind_of(&self, formula: &str) -> Result<&str, MoleculeError> {
        self.kinds
            .get(formula)
            .map(String::as_str)
            .ok_or_else(|| MoleculeError::UnknownFormula(formula.to_string()))
    }
}

/// Kind name of every molecule of `frame`, in label order.
pub fn molecule_kinds(
    frame: &Frame,
    assignment: &MoleculeAssignment,
    registry: &MoleculeRegistry,
) -> Result<Vec<String>, MoleculeError> {
    check_assignment(frame, assignment)?;
    assignment
        .molecules()
        .iter()
        .map(|atoms| {
            let numbers: Vec<u16> = atoms.iter().map(|&i| frame.numbers()[i]).collect();
            registry.kind_of(&hill_formula(&numbers)).map(str::to_string)
        })
        .collect()
}

/// How molecular centres are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CentreMode {
    /// Centre of mass of the atoms exactly as stored.
    Raw,
    /// Molecules are first made whole across the boundary; centres are wrapped into the cell.
    #[default]
    Whole,
    /// Centre of mass of the stored atoms, wrapped into the cell.
    Wrapped,
}

/// One point per molecule plus the molecule kinds, sharing the frame's cell.
#[derive(Debug, Clone, PartialEq)]
pub struct MoleculeCentres {
    frame: Frame,
    kinds: Vec<String>,
}

impl MoleculeCentres {
    pub fn new(frame: Frame, kinds: Vec<String>) -> Result<Self, MoleculeError> {
        if frame.len() != kinds.len() {
            return Err(MoleculeError::AssignmentMismatch {
                expected: frame.len(),
                actual: kinds.len(),
            });
        }
        Ok(Self { frame, kinds })
    }

    /// The centres as a frame of placeholder atoms (atomic number 0).
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        self.frame.positions()
    }

    pub fn kinds(&self) -> &[String] {
        &self.kinds
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Distinct kinds, sorted.
    pub fn kind_labels(&self) -> Vec<String> {
        self.kinds
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn indices_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = usize> + 'a {
        self.kinds
            .iter()
            .enumerate()
            .filter(move |(_, k)| *k == kind)
            .map(|(i, _)| i)
    }
}

fn check_assignment(frame: &Frame, assignment: &MoleculeAssignment) -> Result<(), MoleculeError> {
    if assignment.n_atoms() != frame.len() {
        return Err(MoleculeError::AssignmentMismatch {
            expected: assignment.n_atoms(),
            actual: frame.len(),
        });
    }
    Ok(())
}

/// Moves every atom of a molecule onto the periodic image nearest to the bonded
/// atom it was reached from, walking the bond graph breadth first from the
/// molecule's first atom.
fn make_whole(
    frame: &Frame,
    atoms: &[usize],
    spec: &CutoffSpec,
) -> Result<Vec<Point3<f64>>, MoleculeError> {
    let molecule = frame.subset(atoms)?;
    let mut positions = molecule.positions().to_vec();
    if positions.len() < 2 {
        return Ok(positions);
    }
    let graph = bond_graph(&molecule, spec, DEFAULT_SKIN)?;
    let mut seen = vec![false; positions.len()];
    let mut queue = VecDeque::from([0]);
    seen[0] = true;
    while let Some(i) = queue.pop_front() {
        for &j in graph.neighbors(i) {
            if !seen[j] {
                let delta = molecule
                    .cell()
                    .minimum_image(&(positions[j] - positions[i]), molecule.pbc());
                positions[j] = positions[i] + delta;
                seen[j] = true;
                queue.push_back(j);
            }
        }
    }
    Ok(positions)
}

/// Centres of all molecules and the atom positions consistent with them.
fn place_molecules(
    frame: &Frame,
    assignment: &MoleculeAssignment,
    spec: &CutoffSpec,
    mode: CentreMode,
) -> Result<(Vec<Point3<f64>>, Vec<Point3<f64>>), MoleculeError> {
    check_assignment(frame, assignment)?;
    let masses = frame.masses()?;
    let mut positions = frame.positions().to_vec();
    let mut centres = Vec::with_capacity(assignment.n_molecules());

    for (label, atoms) in assignment.molecules().iter().enumerate() {
        let mut local: Vec<Point3<f64>> = match mode {
            CentreMode::Whole => make_whole(frame, atoms, spec)?,
            CentreMode::Raw | CentreMode::Wrapped => atoms.iter().map(|&i| positions[i]).collect(),
        };
        let local_masses: Vec<f64> = atoms.iter().map(|&i| masses[i]).collect();
        let com = center_of_mass(&local, &local_masses).ok_or(MoleculeError::Massless(label))?;

        let centre = match mode {
            CentreMode::Raw => com,
            CentreMode::Whole | CentreMode::Wrapped => frame.cell().wrap(&com, frame.pbc()),
        };
        let shift: Vector3<f64> = centre - com;
        for p in local.iter_mut() {
            *p += shift;
        }
        for (&atom, p) in atoms.iter().zip(local) {
            positions[atom] = p;
        }
        centres.push(centre);
    }
    Ok((centres, positions))
}

fn centres_frame(frame: &Frame, centres: Vec<Point3<f64>>) -> Result<Frame, MoleculeError> {
    let n = centres.len();
    Ok(Frame::new(
        vec![0; n],
        centres,
        frame.cell().clone(),
        frame.pbc(),
    )?)
}

/// Molecular centres of one frame. The frame itself is left untouched.
pub fn molecule_centres(
    frame: &Frame,
    assignment: &MoleculeAssignment,
    kinds: &[String],
    spec: &CutoffSpec,
    mode: CentreMode,
) -> Result<MoleculeCentres, MoleculeError> {
    if kinds.len() != assignment.n_molecules() {
        return Err(MoleculeError::AssignmentMismatch {
            expected: assignment.n_molecules(),
            actual: kinds.len(),
        });
    }
    let (centres, _) = place_molecules(frame, assignment, spec, mode)?;
    MoleculeCentres::new(centres_frame(frame, centres)?, kinds.to_vec())
}

/// Wraps every molecule into the cell as a whole, rewriting the frame's atom positions.
///
/// With `complete`, molecules broken across the boundary are first made whole.
pub fn wrap_molecules(
    frame: &mut Frame,
    assignment: &MoleculeAssignment,
    kinds: &[String],
    spec: &CutoffSpec,
    complete: bool,
) -> Result<MoleculeCentres, MoleculeError> {
    let mode = if complete {
        CentreMode::Whole
    } else {
        CentreMode::Wrapped
    };
    let (centres, positions) = place_molecules(frame, assignment, spec, mode)?;
    frame.positions_mut().copy_from_slice(&positions);
    MoleculeCentres::new(centres_frame(frame, centres)?, kinds.to_vec())
}

/// Molecular centres of every frame, using one fixed assignment.
#[instrument(skip_all, name = "extract_centres_traj")]
pub fn extract_centres_traj(
    traj: &Trajectory,
    assignment: &MoleculeAssignment,
    kinds: &[String],
    spec: &CutoffSpec,
    mode: CentreMode,
) -> Result<Vec<MoleculeCentres>, MoleculeError> {
    #[cfg(not(feature = "parallel"))]
    let iterator = traj.frames().iter();

    #[cfg(feature = "parallel")]
    let iterator = traj.frames().par_iter();

    let centres = iterator
        .map(|frame| molecule_centres(frame, assignment, kinds, spec, mode))
        .collect::<Result<Vec<_>, _>>()?;
    info!(
        frames = centres.len(),
        molecules = assignment.n_molecules(),
        ?mode,
        "Extracted molecular centres."
    );
    Ok(centres)
}

/// Atomic numbers of frame zero with the selected species of one molecule kind
/// shifted by the largest atomic number present, applied to every frame.
///
/// Returns the shift that was added.
#[instrument(skip_all, name = "apply_species_shift", fields(kind = target_kind))]
pub fn apply_species_shift(
    traj: &mut Trajectory,
    assignment: &MoleculeAssignment,
    kinds: &[String],
    target_kind: &str,
    numbers: &[u16],
) -> Result<u16, MoleculeError> {
    let Some(first) = traj.first() else {
        return Ok(0);
    };
    check_assignment(first, assignment)?;
    let shift = first.numbers().iter().copied().max().unwrap_or(0);

    let mut shifted = first.numbers().to_vec();
    let mut changed = 0usize;
    for (atom, z) in shifted.iter_mut().enumerate() {
        let kind = kinds.get(assignment.label(atom)).ok_or(
            MoleculeError::AssignmentMismatch {
                expected: assignment.n_molecules(),
                actual: kinds.len(),
            },
        )?;
        if kind == target_kind && numbers.contains(z) {
            *z += shift;
            changed += 1;
        }
    }
    if changed == 0 {
        warn!(kind = target_kind, "No atoms matched the species shift.");
    }

    for frame in traj.frames_mut() {
        check_assignment(frame, assignment)?;
        frame.numbers_mut().copy_from_slice(&shifted);
    }
    info!(shift, atoms = changed, "Applied species shift.");
    Ok(shift)
}

/// Every molecule as its own frame, in label order, with the cell scaled by `scale`.
pub fn split_molecules(
    frame: &Frame,
    assignment: &MoleculeAssignment,
    scale: f64,
) -> Result<Vec<Frame>, MoleculeError> {
    check_assignment(frame, assignment)?;
    assignment
        .molecules()
        .iter()
        .map(|atoms| {
            let mut molecule = frame.subset(atoms)?;
            molecule.set_cell(frame.cell().scaled(scale));
            Ok(molecule)
        })
        .collect()
}

/// Copies of `frame` rescaled to each of the given volume fractions.
///
/// Molecules are first made whole and wrapped. With `frozen`, molecules move
/// rigidly with their centre; otherwise every atom coordinate is scaled.
pub fn scan_volume(
    frame: &Frame,
    assignment: &MoleculeAssignment,
    spec: &CutoffSpec,
    volume_fractions: &[f64],
    frozen: bool,
) -> Result<Vec<Frame>, MoleculeError> {
    let (centres, positions) = place_molecules(frame, assignment, spec, CentreMode::Whole)?;
    let mut base = frame.clone();
    base.positions_mut().copy_from_slice(&positions);

    Ok(volume_fractions
        .iter()
        .map(|fraction| {
            let f = fraction.cbrt();
            let mut scaled = base.clone();
            scaled.set_cell(base.cell().scaled(f));
            for (atom, p) in scaled.positions_mut().iter_mut().enumerate() {
                if frozen {
                    *p += centres[assignment.label(atom)].coords * (f - 1.0);
                } else {
                    *p = Point3::from(p.coords * f);
                }
            }
            scaled
        })
        .collect())
}
