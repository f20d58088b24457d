use crate::core::models::frame::Frame;
use nalgebra::{Point3, Vector3};
use std::f64::consts::PI;
use thiserror::Error;
use tracing::{debug, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum VoidError {
    #[error("Grid spacing must be positive, got {0}")]
    InvalidSpacing(f64),
    #[error("Exclusion factor must be positive, got {0}")]
    InvalidFactor(f64),
    #[error("Cannot search voids in a frame without atoms")]
    EmptyFrame,
    #[error("Cell is degenerate")]
    DegenerateCell,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoidGrid {
    /// Grid points farther than `exclusion` from every atom.
    pub points: Vec<Point3<f64>>,
    pub grid_size: usize,
    /// Exclusion radius used for this frame.
    pub exclusion: f64,
}

impl VoidGrid {
    pub fn count(&self) -> usize {
        self.points.len()
    }

    pub fn fraction(&self) -> f64 {
        if self.grid_size == 0 {
            0.0
        } else {
            self.points.len() as f64 / self.grid_size as f64
        }
    }
}

/// Radius of the sphere each atom would occupy if the volume were shared evenly.
pub fn mean_atomic_radius(volume: f64, n_atoms: usize) -> f64 {
    (3.0 * volume / (4.0 * PI * n_atoms as f64)).cbrt()
}

fn fractional_axis(length: f64, spacing: f64) -> Vec<f64> {
    let n = (length / spacing) as usize;
    (0..n).map(|k| k as f64 / n as f64).collect()
}

/// Samples the cell on a grid of roughly `spacing` Angstrom and keeps the points
/// with no atom within `factor` times the mean atomic radius.
pub fn void_grid(frame: &Frame, spacing: f64, factor: f64) -> Result<VoidGrid, VoidError> {
    if !(spacing > 0.0) {
        return Err(VoidError::InvalidSpacing(spacing));
    }
    if !(factor > 0.0) {
        return Err(VoidError::InvalidFactor(factor));
    }
    if frame.is_empty() {
        return Err(VoidError::EmptyFrame);
    }
    let cell = frame.cell();
    if cell.is_degenerate() {
        return Err(VoidError::DegenerateCell);
    }

    let lengths = cell.lengths();
    let (xs, ys, zs) = (
        fractional_axis(lengths.x, spacing),
        fractional_axis(lengths.y, spacing),
        fractional_axis(lengths.z, spacing),
    );
    let (ys, zs) = (&ys, &zs);
    let grid: Vec<Point3<f64>> = xs
        .iter()
        .flat_map(|&x| {
            ys.iter()
                .flat_map(move |&y| zs.iter().map(move |&z| Vector3::new(x, y, z)))
        })
        .map(|f| cell.cartesian(&f))
        .collect();

    let exclusion = mean_atomic_radius(frame.volume(), frame.len()) * factor;
    let pbc = frame.pbc();
    let positions = frame.positions();
    let is_void = |p: &&Point3<f64>| {
        positions
            .iter()
            .all(|a| cell.minimum_image(&(*p - a), pbc).norm() > exclusion)
    };

    #[cfg(not(feature = "parallel"))]
    let iterator = grid.iter();

    #[cfg(feature = "parallel")]
    let iterator = grid.par_iter();

    let points: Vec<Point3<f64>> = iterator.filter(is_void).cloned().collect();
    debug!(grid = grid.len(), voids = points.len(), exclusion, "Void grid sampled.");
    Ok(VoidGrid {
        points,
        grid_size: grid.len(),
        exclusion,
    })
}

#[instrument(skip_all, name = "void_grid_traj", fields(frames = frames.len()))]
pub fn void_grid_traj(frames: &[Frame], spacing: f64, factor: f64) -> Result<Vec<VoidGrid>, VoidError> {
    frames
        .iter()
        .map(|frame| void_grid(frame, spacing, factor))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::cell::Cell;

    fn single_atom() -> Frame {
        Frame::from_symbols(&["Ar"], vec![Point3::origin()], Cell::cubic(10.0), [true; 3]).unwrap()
    }

    #[test]
    fn mean_radius_matches_the_sphere_volume() {
        let r = mean_atomic_radius(1000.0, 1);
        assert!((4.0 / 3.0 * PI * r.powi(3) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn fractional_axis_truncates_the_point_count() {
        assert_eq!(fractional_axis(10.0, 3.0), vec![0.0, 1.0 / 3.0, 2.0 / 3.0]);
    }

    #[test]
    fn points_near_atoms_are_excluded_through_the_boundary() {
        // Exclusion radius is about 8.1 Angstrom; only the cell centre survives.
        let grid = void_grid(&single_atom(), 2.5, 1.3).unwrap();
        assert_eq!(grid.grid_size, 64);
        assert_eq!(grid.points, vec![Point3::new(5.0, 5.0, 5.0)]);
        assert!((grid.fraction() - 1.0 / 64.0).abs() < 1e-12);
    }

    #[test]
    fn small_factor_keeps_everything_but_the_atom_site() {
        let grid = void_grid(&single_atom(), 2.5, 0.1).unwrap();
        assert_eq!(grid.count(), 63);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        assert_eq!(
            void_grid(&single_atom(), 0.0, 1.0),
            Err(VoidError::InvalidSpacing(0.0))
        );
        let empty = Frame::new(vec![], vec![], Cell::cubic(10.0), [true; 3]).unwrap();
        assert_eq!(void_grid(&empty, 1.0, 1.0), Err(VoidError::EmptyFrame));
    }
}
