use nalgebra::{Point3, Vector3};

/// Mass-weighted centre of a set of points.
///
/// Returns `None` for empty input, mismatched lengths or a non-positive total mass.
pub fn center_of_mass(positions: &[Point3<f64>], masses: &[f64]) -> Option<Point3<f64>> {
    if positions.is_empty() || positions.len() != masses.len() {
        return None;
    }
    let total_mass: f64 = masses.iter().sum();
    if total_mass <= 0.0 {
        return None;
    }
    let weighted: Vector3<f64> = positions
        .iter()
        .zip(masses)
        .map(|(p, &m)| p.coords * m)
        .sum();
    Some(Point3::from(weighted / total_mass))
}

/// Squared Euclidean distance of every point from the first one.
pub fn squared_displacements_from_origin(track: &[Point3<f64>]) -> Vec<f64> {
    match track.first() {
        Some(origin) => track.iter().map(|p| (p - origin).norm_squared()).collect(),
        None => Vec::new(),
    }
}
