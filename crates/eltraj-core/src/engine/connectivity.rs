use super::neighbors::{DEFAULT_SKIN, NeighborList};
use crate::core::models::element::{Element, ElementError, symbol_for};
use crate::core::models::frame::{Frame, FrameError};
use crate::core::models::trajectory::Trajectory;
use serde::Deserialize;
use std::collections::{BTreeMap, VecDeque};
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConnectivityError {
    #[error("No cutoff multiplier given for species '{0}'")]
    MissingSpeciesCutoff(String),
    #[error(transparent)]
    Element(#[from] ElementError),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("Molecule assignment covers {expected} atoms but frame {frame} has {actual}")]
    AtomCountMismatch {
        frame: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Cannot assign molecules on an empty trajectory")]
    EmptyTrajectory,
}

/// Multiplier(s) applied to covalent radii to obtain per-atom bonding cutoffs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(
    untagged,
    expecting = "a cutoff multiplier (number) or a table of per-species multipliers"
)]
pub enum CutoffSpec {
    Uniform(f64),
    PerSpecies(BTreeMap<String, f64>),
}

impl Default for CutoffSpec {
    fn default() -> Self {
        CutoffSpec::Uniform(1.0)
    }
}

/// Per-atom cutoff radii: covalent radius times the multiplier of the atom's species.
///
/// # Errors
///
/// Fails when an atomic number is outside the element table or a per-species
/// table lacks an entry for a species present in the frame.
pub fn resolve_cutoffs(frame: &Frame, spec: &CutoffSpec) -> Result<Vec<f64>, ConnectivityError> {
    frame
        .numbers()
        .iter()
        .map(|&z| {
            let radius = Element::from_number(z)?.covalent_radius;
            let factor = match spec {
                CutoffSpec::Uniform(mult) => *mult,
                CutoffSpec::PerSpecies(table) => {
                    let symbol = symbol_for(z);
                    *table
                        .get(symbol.as_ref())
                        .ok_or_else(|| ConnectivityError::MissingSpeciesCutoff(symbol.into_owned()))?
                }
            };
            Ok(radius * factor)
        })
        .collect()
}

/// Bonded neighbour lists of a frame under a cutoff specification.
pub fn bond_graph(
    frame: &Frame,
    spec: &CutoffSpec,
    skin: f64,
) -> Result<NeighborList, ConnectivityError> {
    let radii = resolve_cutoffs(frame, spec)?;
    Ok(NeighborList::from_radii(frame, &radii, skin)?)
}

/// Per-atom molecule labels from the connected components of a bond graph.
///
/// Labels are dense, `0..n_molecules`, and numbered in the order of the lowest
/// atom index of each molecule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoleculeAssignment {
    labels: Vec<usize>,
    n_molecules: usize,
}

impl MoleculeAssignment {
    /// Builds an assignment from arbitrary labels, renumbering them densely.
    pub fn from_labels(raw: &[usize]) -> Self {
        let mut remap = BTreeMap::new();
        let labels = raw
            .iter()
            .map(|label| {
                let next = remap.len();
                *remap.entry(*label).or_insert(next)
            })
            .collect();
        Self {
            labels,
            n_molecules: remap.len(),
        }
    }

    fn from_graph(graph: &NeighborList) -> Self {
        const UNVISITED: usize = usize::MAX;
        let mut labels = vec![UNVISITED; graph.len()];
        let mut n_molecules = 0;
        let mut queue = VecDeque::new();

        for start in 0..graph.len() {
            if labels[start] != UNVISITED {
                continue;
            }
            labels[start] = n_molecules;
            queue.push_back(start);
            while let Some(atom) = queue.pop_front() {
                for &next in graph.neighbors(atom) {
                    if labels[next] == UNVISITED {
                        labels[next] = n_molecules;
                        queue.push_back(next);
                    }
                }
            }
            n_molecules += 1;
        }
        Self {
            labels,
            n_molecules,
        }
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn label(&self, atom: usize) -> usize {
        self.labels[atom]
    }

    pub fn n_atoms(&self) -> usize {
        self.labels.len()
    }

    pub fn n_molecules(&self) -> usize {
        self.n_molecules
    }

    pub fn same_molecule(&self, i: usize, j: usize) -> bool {
        self.labels[i] == self.labels[j]
    }

    /// Atom indices of every molecule, each list ascending.
    pub fn molecules(&self) -> Vec<Vec<usize>> {
        let mut molecules = vec![Vec::new(); self.n_molecules];
        for (atom, &label) in self.labels.iter().enumerate() {
            molecules[label].push(atom);
        }
        molecules
    }

    /// `(n_molecules, atoms_per_molecule)` pairs, ordered by molecule size.
    pub fn composition(&self) -> Vec<(usize, usize)> {
        let mut sizes = vec![0usize; self.n_molecules];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        let mut by_size: BTreeMap<usize, usize> = BTreeMap::new();
        for size in sizes {
            *by_size.entry(size).or_insert(0) += 1;
        }
        by_size.into_iter().map(|(size, n)| (n, size)).collect()
    }
}

/// Segments a frame into molecules with the default neighbour skin.
pub fn assign_molecules(
    frame: &Frame,
    spec: &CutoffSpec,
) -> Result<MoleculeAssignment, ConnectivityError> {
    assign_molecules_with_skin(frame, spec, DEFAULT_SKIN)
}

pub fn assign_molecules_with_skin(
    frame: &Frame,
    spec: &CutoffSpec,
    skin: f64,
) -> Result<MoleculeAssignment, ConnectivityError> {
    let graph = bond_graph(frame, spec, skin)?;
    let assignment = MoleculeAssignment::from_graph(&graph);
    debug!(
        atoms = frame.len(),
        molecules = assignment.n_molecules(),
        "Connected components computed."
    );
    Ok(assignment)
}

/// The molecule labels stored on `frame`, or a fresh assignment when it has none.
pub fn assignment_for(
    frame: &Frame,
    spec: &CutoffSpec,
) -> Result<MoleculeAssignment, ConnectivityError> {
    match frame.mol_ids() {
        Some(ids) => Ok(MoleculeAssignment::from_labels(ids)),
        None => assign_molecules(frame, spec),
    }
}

/// Assigns molecules from the first frame and stores the labels on every frame.
///
/// The topology is assumed fixed over the trajectory.
#[instrument(skip_all, name = "assign_molecules_traj")]
pub fn assign_molecules_traj(
    traj: &mut Trajectory,
    spec: &CutoffSpec,
) -> Result<MoleculeAssignment, ConnectivityError> {
    let first = traj.first().ok_or(ConnectivityError::EmptyTrajectory)?;
    let assignment = assign_molecules(first, spec)?;
    for (index, frame) in traj.frames_mut().iter_mut().enumerate() {
        if frame.len() != assignment.n_atoms() {
            return Err(ConnectivityError::AtomCountMismatch {
                frame: index,
                expected: assignment.n_atoms(),
                actual: frame.len(),
            });
        }
        frame.set_mol_ids(assignment.labels().to_vec())?;
    }
    info!(
        molecules = assignment.n_molecules(),
        composition = ?assignment.composition(),
        "Molecule labels assigned."
    );
    Ok(assignment)
}
