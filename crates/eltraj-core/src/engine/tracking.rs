use super::connectivity::{ConnectivityError, CutoffSpec, bond_graph};
use super::neighbors::DEFAULT_SKIN;
use crate::core::models::cell::CellError;
use crate::core::models::element::ElementError;
use crate::core::models::frame::Frame;
use ndarray::{Array2, Axis};
use thiserror::Error;
use tracing::{info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Converts Dalton per cubic Angstrom to g/cm^3 (`10 / 6.022`).
const DA_PER_A3_TO_G_PER_CM3: f64 = 10.0 / 6.022;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrackingError {
    #[error("Cannot track an empty trajectory")]
    EmptyTrajectory,
    #[error("Frame {frame} has {actual} atoms, expected {expected}")]
    AtomCountMismatch {
        frame: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Grid resolution must be at least 1")]
    ZeroGrid,
    #[error(transparent)]
    Connectivity(#[from] ConnectivityError),
    #[error(transparent)]
    Cell(#[from] CellError),
    #[error(transparent)]
    Element(#[from] ElementError),
}

/// Bonds found in the first frame and their length in every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct BondTracks {
    /// `(i, j)` with `i < j`, in lexicographic order.
    pub bonds: Vec<(usize, usize)>,
    /// Shape `(n_bonds, n_frames)`.
    pub distances: Array2<f64>,
}

#[instrument(skip_all, name = "track_initial_bonds", fields(frames = frames.len()))]
pub fn track_initial_bonds(frames: &[Frame], spec: &CutoffSpec) -> Result<BondTracks, TrackingError> {
    let first = frames.first().ok_or(TrackingError::EmptyTrajectory)?;
    let bonds: Vec<(usize, usize)> = bond_graph(first, spec, DEFAULT_SKIN)?.pairs().collect();

    if let Some((frame, f)) = frames
        .iter()
        .enumerate()
        .find(|(_, f)| f.len() != first.len())
    {
        return Err(TrackingError::AtomCountMismatch {
            frame,
            expected: first.len(),
            actual: f.len(),
        });
    }

    let distances = Array2::from_shape_fn((bonds.len(), frames.len()), |(b, t)| {
        let (i, j) = bonds[b];
        frames[t].distance(i, j)
    });
    info!(bonds = bonds.len(), "Tracked initial bonds.");
    Ok(BondTracks { bonds, distances })
}

/// Mass and particle distribution over an `n x n x n` grid of the cell, one row per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityGrid {
    /// Density of every grid cell in g/cm^3.
    pub densities: Array2<f64>,
    /// Mass per grid cell divided by the frame's mean mass per grid cell.
    pub mass_fractions: Array2<f64>,
    /// Atom count per grid cell divided by the frame's mean count per grid cell.
    pub count_fractions: Array2<f64>,
}

fn grid_index(fractional: &nalgebra::Vector3<f64>, n: usize) -> usize {
    let bin = |s: f64| {
        let wrapped = s - s.floor();
        ((wrapped * n as f64).floor() as usize).min(n - 1)
    };
    bin(fractional.x) * n * n + bin(fractional.y) * n + bin(fractional.z)
}

fn frame_distribution(frame: &Frame, n: usize) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>), TrackingError> {
    let cells = n * n * n;
    let masses = frame.masses()?;
    let mut mass = vec![0.0; cells];
    let mut count = vec![0.0; cells];
    for (p, m) in frame.positions().iter().zip(&masses) {
        let idx = grid_index(&frame.cell().fractional(p)?, n);
        mass[idx] += m;
        count[idx] += 1.0;
    }
    let volume = frame.volume();
    let density = mass
        .iter()
        .map(|m| m * cells as f64 * DA_PER_A3_TO_G_PER_CM3 / volume)
        .collect();
    Ok((density, mass, count))
}

fn normalise_rows(mut values: Array2<f64>) -> Array2<f64> {
    for mut row in values.axis_iter_mut(Axis(0)) {
        let mean = row.mean().unwrap_or(0.0);
        row.mapv_inplace(|v| v / mean);
    }
    values
}

#[instrument(skip_all, name = "density_grid", fields(frames = frames.len(), n = n))]
pub fn density_grid(frames: &[Frame], n: usize) -> Result<DensityGrid, TrackingError> {
    if n == 0 {
        return Err(TrackingError::ZeroGrid);
    }

    #[cfg(not(feature = "parallel"))]
    let iterator = frames.iter();

    #[cfg(feature = "parallel")]
    let iterator = frames.par_iter();

    let rows = iterator
        .map(|frame| frame_distribution(frame, n))
        .collect::<Result<Vec<_>, _>>()?;

    let cells = n * n * n;
    let stack = |pick: fn(&(Vec<f64>, Vec<f64>, Vec<f64>)) -> &Vec<f64>| {
        Array2::from_shape_fn((rows.len(), cells), |(t, c)| pick(&rows[t])[c])
    };
    Ok(DensityGrid {
        densities: stack(|r| &r.0),
        mass_fractions: normalise_rows(stack(|r| &r.1)),
        count_fractions: normalise_rows(stack(|r| &r.2)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::cell::Cell;
    use nalgebra::Point3;

    fn dimer(distance: f64) -> Frame {
        Frame::from_symbols(
            &["H", "H", "Li"],
            vec![
                Point3::new(1.0, 1.0, 1.0),
                Point3::new(1.0 + distance, 1.0, 1.0),
                Point3::new(6.0, 6.0, 6.0),
            ],
            Cell::cubic(10.0),
            [true; 3],
        )
        .unwrap()
    }

    #[test]
    fn bonds_of_the_first_frame_are_followed() {
        let frames = [dimer(0.74), dimer(0.80), dimer(2.0)];
        let tracks = track_initial_bonds(&frames, &CutoffSpec::default()).unwrap();
        assert_eq!(tracks.bonds, vec![(0, 1)]);
        assert_eq!(tracks.distances.shape(), &[1, 3]);
        assert!((tracks.distances[[0, 2]] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn bond_tracking_requires_a_fixed_atom_count() {
        let short = dimer(0.74).subset(&[0, 1]).unwrap();
        assert!(matches!(
            track_initial_bonds(&[dimer(0.74), short], &CutoffSpec::default()),
            Err(TrackingError::AtomCountMismatch { frame: 1, .. })
        ));
    }

    #[test]
    fn grid_index_orders_x_then_y_then_z() {
        let v = nalgebra::Vector3::new(0.75, 0.25, 0.75);
        assert_eq!(grid_index(&v, 2), 4 + 1);
        let wrapped = nalgebra::Vector3::new(-0.25, 1.25, 0.0);
        assert_eq!(grid_index(&wrapped, 2), 4);
    }

    #[test]
    fn density_grid_normalises_by_the_frame_mean() {
        let grid = density_grid(&[dimer(0.74)], 2).unwrap();
        assert_eq!(grid.densities.shape(), &[1, 8]);

        // Both H atoms sit in cell 0, Li in cell 7.
        let counts = grid.count_fractions.row(0).to_vec();
        let mean_count = 3.0 / 8.0;
        assert!((counts[0] - 2.0 / mean_count).abs() < 1e-12);
        assert!((counts[7] - 1.0 / mean_count).abs() < 1e-12);
        assert_eq!(counts[1], 0.0);

        let expected = 6.94 * 8.0 * DA_PER_A3_TO_G_PER_CM3 / 1000.0;
        assert!((grid.densities[[0, 7]] - expected).abs() < 1e-12);
        assert!((grid.mass_fractions.row(0).sum() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn zero_grid_is_rejected() {
        assert_eq!(density_grid(&[dimer(1.0)], 0), Err(TrackingError::ZeroGrid));
    }
}
