use nalgebra::{Matrix3, Point3, Vector3};
use thiserror::Error;

const ORTHORHOMBIC_TOLERANCE: f64 = 1e-8;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CellError {
    #[error("Cell is not orthorhombic (off-diagonal elements present)")]
    NotOrthorhombic,
    #[error("Cell is singular (volume {volume})")]
    Singular { volume: f64 },
}

/// A simulation cell spanned by three lattice vectors.
///
/// The lattice vectors are the rows of the matrix, so a Cartesian position is
/// `M^T * s` for fractional coordinates `s`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    matrix: Matrix3<f64>,
    /// Inverse of `M^T`, absent for a degenerate (e.g. all-zero) cell.
    to_fractional: Option<Matrix3<f64>>,
}

impl Default for Cell {
    fn default() -> Self {
        Self::new(Matrix3::zeros())
    }
}

impl Cell {
    pub fn new(matrix: Matrix3<f64>) -> Self {
        let to_fractional = matrix.transpose().try_inverse();
        Self {
            matrix,
            to_fractional,
        }
    }

    pub fn orthorhombic(a: f64, b: f64, c: f64) -> Self {
        Self::new(Matrix3::from_diagonal(&Vector3::new(a, b, c)))
    }

    pub fn cubic(a: f64) -> Self {
        Self::orthorhombic(a, a, a)
    }

    /// The lattice vectors as rows.
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn volume(&self) -> f64 {
        self.matrix.determinant().abs()
    }

    pub fn is_degenerate(&self) -> bool {
        self.to_fractional.is_none()
    }

    pub fn is_orthorhombic(&self) -> bool {
        (0..3).all(|i| {
            (0..3).all(|j| i == j || self.matrix[(i, j)].abs() < ORTHORHOMBIC_TOLERANCE)
        })
    }

    /// Box edge lengths for an orthorhombic cell.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::NotOrthorhombic`] if any off-diagonal element is non-zero.
    pub fn orthorhombic_lengths(&self) -> Result<Vector3<f64>, CellError> {
        if !self.is_orthorhombic() {
            return Err(CellError::NotOrthorhombic);
        }
        Ok(self.matrix.diagonal())
    }

    /// Lengths of the three lattice vectors.
    pub fn lengths(&self) -> Vector3<f64> {
        Vector3::new(
            self.matrix.row(0).norm(),
            self.matrix.row(1).norm(),
            self.matrix.row(2).norm(),
        )
    }

    /// Returns the cell with every lattice vector multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.matrix * factor)
    }

    pub fn fractional(&self, position: &Point3<f64>) -> Result<Vector3<f64>, CellError> {
        let inv = self.to_fractional.ok_or(CellError::Singular {
            volume: self.volume(),
        })?;
        Ok(inv * position.coords)
    }

    pub fn cartesian(&self, fractional: &Vector3<f64>) -> Point3<f64> {
        Point3::from(self.matrix.transpose() * fractional)
    }

    /// Wraps a position back into the cell along the periodic directions.
    ///
    /// A degenerate cell leaves the position untouched.
    pub fn wrap(&self, position: &Point3<f64>, pbc: [bool; 3]) -> Point3<f64> {
        let Some(inv) = self.to_fractional else {
            return *position;
        };
        let mut frac = inv * position.coords;
        for axis in 0..3 {
            if pbc[axis] {
                frac[axis] -= frac[axis].floor();
            }
        }
        self.cartesian(&frac)
    }

    /// Maps a displacement onto its minimum image along the periodic directions.
    ///
    /// Exact for orthorhombic cells; for skewed cells this is the usual fractional
    /// rounding approximation, which is exact whenever the displacement is shorter
    /// than half the smallest perpendicular width.
    pub fn minimum_image(&self, delta: &Vector3<f64>, pbc: [bool; 3]) -> Vector3<f64> {
        let Some(inv) = self.to_fractional else {
            return *delta;
        };
        let mut frac = inv * delta;
        for axis in 0..3 {
            if pbc[axis] {
                frac[axis] -= frac[axis].round();
            }
        }
        self.matrix.transpose() * frac
    }

    /// Perpendicular widths of the cell (distance between opposite faces).
    pub fn perpendicular_widths(&self) -> Vector3<f64> {
        let volume = self.volume();
        let a = self.matrix.row(0).transpose();
        let b = self.matrix.row(1).transpose();
        let c = self.matrix.row(2).transpose();
        let width = |u: &Vector3<f64>, v: &Vector3<f64>| {
            let area = u.cross(v).norm();
            if area > 0.0 { volume / area } else { 0.0 }
        };
        Vector3::new(width(&b, &c), width(&c, &a), width(&a, &b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn orthorhombic_cell_reports_lengths_and_volume() {
        let cell = Cell::orthorhombic(10.0, 12.0, 14.0);
        assert!(cell.is_orthorhombic());
        assert_eq!(
            cell.orthorhombic_lengths().unwrap(),
            Vector3::new(10.0, 12.0, 14.0)
        );
        assert!((cell.volume() - 1680.0).abs() < TOLERANCE);
    }

    #[test]
    fn skewed_cell_is_rejected_for_orthorhombic_lengths() {
        let cell = Cell::new(Matrix3::new(10.0, 0.0, 0.0, 2.0, 10.0, 0.0, 0.0, 0.0, 10.0));
        assert_eq!(cell.orthorhombic_lengths(), Err(CellError::NotOrthorhombic));
    }

    #[test]
    fn wrap_moves_positions_into_the_cell() {
        let cell = Cell::cubic(10.0);
        let wrapped = cell.wrap(&Point3::new(-1.0, 12.5, 5.0), [true; 3]);
        assert!((wrapped - Point3::new(9.0, 2.5, 5.0)).norm() < TOLERANCE);
    }

    #[test]
    fn wrap_respects_non_periodic_axes() {
        let cell = Cell::cubic(10.0);
        let wrapped = cell.wrap(&Point3::new(-1.0, 12.5, 25.0), [true, true, false]);
        assert!((wrapped - Point3::new(9.0, 2.5, 25.0)).norm() < TOLERANCE);
    }

    #[test]
    fn minimum_image_picks_the_nearest_periodic_copy() {
        let cell = Cell::cubic(10.0);
        let d = cell.minimum_image(&Vector3::new(9.0, -6.0, 4.0), [true; 3]);
        assert!((d - Vector3::new(-1.0, 4.0, 4.0)).norm() < TOLERANCE);
    }

    #[test]
    fn degenerate_cell_leaves_geometry_untouched() {
        let cell = Cell::default();
        assert!(cell.is_degenerate());
        let delta = Vector3::new(100.0, 0.0, 0.0);
        assert_eq!(cell.minimum_image(&delta, [true; 3]), delta);
        assert!(matches!(
            cell.fractional(&Point3::origin()),
            Err(CellError::Singular { .. })
        ));
    }

    #[test]
    fn perpendicular_widths_match_edges_for_orthorhombic_cell() {
        let cell = Cell::orthorhombic(3.0, 4.0, 5.0);
        let widths = cell.perpendicular_widths();
        assert!((widths - Vector3::new(3.0, 4.0, 5.0)).norm() < TOLERANCE);
    }
}
