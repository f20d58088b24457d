use crate::core::models::frame::{Frame, FrameError};
use nalgebra::Vector3;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Extra margin added to every per-atom radius, in Angstrom.
pub const DEFAULT_SKIN: f64 = 0.3;

/// Symmetric per-atom neighbour lists of a single frame.
///
/// Each list is sorted, excludes the atom itself, and holds every partner at most
/// once (the minimum image).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborList {
    neighbors: Vec<Vec<usize>>,
}

struct Grid {
    dims: [usize; 3],
    cell_of: Vec<usize>,
    members: Vec<Vec<usize>>,
}

impl NeighborList {
    /// Atoms `i` and `j` are neighbours when their minimum-image distance is below
    /// `radii[i] + radii[j] + 2 * skin`.
    pub fn from_radii(frame: &Frame, radii: &[f64], skin: f64) -> Result<Self, FrameError> {
        if radii.len() != frame.len() {
            return Err(FrameError::LengthMismatch {
                name: "cutoffs",
                expected: frame.len(),
                actual: radii.len(),
            });
        }
        let max_radius = radii.iter().copied().fold(0.0, f64::max);
        let reach = 2.0 * (max_radius + skin);
        Ok(Self::build(frame, reach, |i, j, d| {
            d < radii[i] + radii[j] + 2.0 * skin
        }))
    }

    /// Atoms within `cutoff` (inclusive) of each other.
    pub fn within(frame: &Frame, cutoff: f64) -> Self {
        Self::build(frame, cutoff, |_, _, d| d <= cutoff)
    }

    fn build<F>(frame: &Frame, reach: f64, accept: F) -> Self
    where
        F: Fn(usize, usize, f64) -> bool + Sync,
    {
        let n = frame.len();
        let grid = Grid::new(frame, reach);
        debug!(
            atoms = n,
            reach,
            cell_list = grid.is_some(),
            "Building neighbour list."
        );

        let neighbors_of = |i: usize| -> Vec<usize> {
            let mut found: Vec<usize> = match &grid {
                Some(grid) => grid
                    .candidates(i)
                    .filter(|&j| j != i && accept(i, j, frame.distance(i, j)))
                    .collect(),
                None => (0..n)
                    .filter(|&j| j != i && accept(i, j, frame.distance(i, j)))
                    .collect(),
            };
            found.sort_unstable();
            found
        };

        #[cfg(not(feature = "parallel"))]
        let iterator = 0..n;

        #[cfg(feature = "parallel")]
        let iterator = (0..n).into_par_iter();

        let neighbors = iterator.map(neighbors_of).collect();
        Self { neighbors }
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    pub fn neighbors(&self, i: usize) -> &[usize] {
        &self.neighbors[i]
    }

    /// Number of neighbours of every atom.
    pub fn counts(&self) -> Vec<usize> {
        self.neighbors.iter().map(Vec::len).collect()
    }

    /// Each neighbouring pair once, as `(i, j)` with `i < j`, in lexicographic order.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.neighbors.iter().enumerate().flat_map(|(i, list)| {
            list.iter().filter(move |&&j| j > i).map(move |&j| (i, j))
        })
    }
}

impl Grid {
    /// A periodic cell list, or `None` when the frame is not fully periodic or the
    /// cell cannot hold three bins of width `reach` along every axis.
    fn new(frame: &Frame, reach: f64) -> Option<Self> {
        if frame.pbc() != [true; 3] || frame.cell().is_degenerate() || reach <= 0.0 {
            return None;
        }
        let widths = frame.cell().perpendicular_widths();
        let dims = [0, 1, 2].map(|axis| (widths[axis] / reach).floor() as usize);
        if dims.iter().any(|&d| d < 3) {
            return None;
        }

        let fractional: Vec<Vector3<f64>> = frame
            .positions()
            .iter()
            .map(|p| frame.cell().fractional(p).ok())
            .collect::<Option<_>>()?;

        let mut members = vec![Vec::new(); dims[0] * dims[1] * dims[2]];
        let cell_of: Vec<usize> = fractional
            .iter()
            .map(|s| {
                let bin = |axis: usize| {
                    let wrapped = s[axis] - s[axis].floor();
                    ((wrapped * dims[axis] as f64) as usize).min(dims[axis] - 1)
                };
                Self::flat(dims, [bin(0), bin(1), bin(2)])
            })
            .collect();
        for (atom, &cell) in cell_of.iter().enumerate() {
            members[cell].push(atom);
        }
        Some(Self {
            dims,
            cell_of,
            members,
        })
    }

    fn flat(dims: [usize; 3], idx: [usize; 3]) -> usize {
        (idx[0] * dims[1] + idx[1]) * dims[2] + idx[2]
    }

    fn unflat(&self, flat: usize) -> [usize; 3] {
        let [_, ny, nz] = self.dims;
        [flat / (ny * nz), (flat / nz) % ny, flat % nz]
    }

    /// Atoms in the 27 bins around the bin of atom `i`.
    fn candidates(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        let home = self.unflat(self.cell_of[i]);
        let dims = self.dims;
        (0..27).flat_map(move |offset| {
            let shift = [offset / 9, (offset / 3) % 3, offset % 3];
            let idx = [0, 1, 2].map(|axis| {
                (home[axis] as isize + shift[axis] as isize - 1).rem_euclid(dims[axis] as isize)
                    as usize
            });
            self.members[Self::flat(dims, idx)].iter().copied()
        })
    }
}
