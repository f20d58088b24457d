use super::molecules::MoleculeCentres;
use crate::core::models::cell::Cell;
use crate::core::utils::geometry::squared_displacements_from_origin;
use nalgebra::{Point3, Vector3};
use ndarray::Array2;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum UnwrapError {
    #[error("Unknown unwrapping method '{0}'. Available: heuristic, displacement, hybrid")]
    UnknownUnwrapMethod(String),
    #[error("Position series has {positions} frames but {boxes} box sizes were given")]
    LengthMismatch { positions: usize, boxes: usize },
    #[error("Frame {frame} has a non-orthorhombic cell")]
    NotOrthorhombic { frame: usize },
    #[error("Frame {frame} has a non-positive box edge")]
    NonPositiveBox { frame: usize },
}

/// Recurrence used to remove periodic jumps from a wrapped series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum UnwrapMethod {
    Heuristic,
    Displacement,
    #[default]
    Hybrid,
}

impl UnwrapMethod {
    pub fn name(&self) -> &'static str {
        match self {
            UnwrapMethod::Heuristic => "heuristic",
            UnwrapMethod::Displacement => "displacement",
            UnwrapMethod::Hybrid => "hybrid",
        }
    }

    pub fn apply(
        &self,
        wrapped: &[Point3<f64>],
        boxes: &[Vector3<f64>],
    ) -> Result<Vec<Point3<f64>>, UnwrapError> {
        match self {
            UnwrapMethod::Heuristic => heuristic_unwrap(wrapped, boxes),
            UnwrapMethod::Displacement => displacement_unwrap(wrapped, boxes),
            UnwrapMethod::Hybrid => hybrid_unwrap(wrapped, boxes),
        }
    }
}

impl FromStr for UnwrapMethod {
    type Err = UnwrapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "heuristic" => Ok(UnwrapMethod::Heuristic),
            "displacement" => Ok(UnwrapMethod::Displacement),
            "hybrid" => Ok(UnwrapMethod::Hybrid),
            _ => Err(UnwrapError::UnknownUnwrapMethod(s.to_string())),
        }
    }
}

impl TryFrom<String> for UnwrapMethod {
    type Error = UnwrapError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for UnwrapMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Number of box lengths separating `x` from zero, rounded half up.
#[inline]
fn images(x: f64) -> f64 {
    (x + 0.5).floor()
}

fn validate(wrapped: &[Point3<f64>], boxes: &[Vector3<f64>]) -> Result<(), UnwrapError> {
    if wrapped.len() != boxes.len() {
        return Err(UnwrapError::LengthMismatch {
            positions: wrapped.len(),
            boxes: boxes.len(),
        });
    }
    if let Some(frame) = boxes.iter().position(|l| l.iter().any(|&x| x <= 0.0)) {
        return Err(UnwrapError::NonPositiveBox { frame });
    }
    Ok(())
}

/// Runs `step(i, u_i) -> u_{i+1}` along the series, starting from `u_0 = w_0`.
fn recur(
    wrapped: &[Point3<f64>],
    boxes: &[Vector3<f64>],
    step: impl Fn(usize, &Point3<f64>) -> Point3<f64>,
) -> Result<Vec<Point3<f64>>, UnwrapError> {
    validate(wrapped, boxes)?;
    let Some(&first) = wrapped.first() else {
        return Ok(Vec::new());
    };
    let mut unwrapped = Vec::with_capacity(wrapped.len());
    unwrapped.push(first);
    for i in 0..wrapped.len() - 1 {
        let next = step(i, &unwrapped[i]);
        unwrapped.push(next);
    }
    Ok(unwrapped)
}

/// `u[i+1] = w[i+1] - floor((w[i+1] - u[i]) / L[i+1] + 1/2) L[i+1]`
pub fn heuristic_unwrap(
    wrapped: &[Point3<f64>],
    boxes: &[Vector3<f64>],
) -> Result<Vec<Point3<f64>>, UnwrapError> {
    recur(wrapped, boxes, |i, u| {
        let (w1, l1) = (&wrapped[i + 1], &boxes[i + 1]);
        Point3::from(Vector3::from_fn(|a, _| {
            w1[a] - images((w1[a] - u[a]) / l1[a]) * l1[a]
        }))
    })
}

/// `u[i+1] = u[i] + (w[i+1] - w[i]) - floor((w[i+1] - w[i]) / L[i+1] + 1/2) L[i+1]`
pub fn displacement_unwrap(
    wrapped: &[Point3<f64>],
    boxes: &[Vector3<f64>],
) -> Result<Vec<Point3<f64>>, UnwrapError> {
    recur(wrapped, boxes, |i, u| {
        let (w0, w1, l1) = (&wrapped[i], &wrapped[i + 1], &boxes[i + 1]);
        Point3::from(Vector3::from_fn(|a, _| {
            let dw = w1[a] - w0[a];
            u[a] + dw - images(dw / l1[a]) * l1[a]
        }))
    })
}

/// The displacement recurrence corrected for box fluctuations:
/// `- floor((w[i] - u[i]) / L[i] + 1/2) (L[i+1] - L[i])`.
pub fn hybrid_unwrap(
    wrapped: &[Point3<f64>],
    boxes: &[Vector3<f64>],
) -> Result<Vec<Point3<f64>>, UnwrapError> {
    recur(wrapped, boxes, |i, u| {
        let (w0, w1) = (&wrapped[i], &wrapped[i + 1]);
        let (l0, l1) = (&boxes[i], &boxes[i + 1]);
        Point3::from(Vector3::from_fn(|a, _| {
            let dw = w1[a] - w0[a];
            u[a] + dw
                - images(dw / l1[a]) * l1[a]
                - images((w0[a] - u[a]) / l0[a]) * (l1[a] - l0[a])
        }))
    })
}

/// Orthorhombic box edges of a sequence of cells.
pub fn box_lengths<'a>(
    cells: impl IntoIterator<Item = &'a Cell>,
) -> Result<Vec<Vector3<f64>>, UnwrapError> {
    cells
        .into_iter()
        .enumerate()
        .map(|(frame, cell)| {
            cell.orthorhombic_lengths()
                .map_err(|_| UnwrapError::NotOrthorhombic { frame })
        })
        .collect()
}

/// Unwrapped centre tracks of every molecule of one kind, in label order.
#[instrument(skip_all, name = "unwrap_species", fields(kind = kind, method = %method))]
pub fn unwrap_species(
    centres: &[MoleculeCentres],
    kind: &str,
    method: UnwrapMethod,
) -> Result<Vec<Vec<Point3<f64>>>, UnwrapError> {
    let boxes = box_lengths(centres.iter().map(|c| c.frame().cell()))?;
    let Some(first) = centres.first() else {
        return Ok(Vec::new());
    };
    let molecules: Vec<usize> = first.indices_of(kind).collect();
    debug!(molecules = molecules.len(), "Unwrapping molecular centres.");

    #[cfg(not(feature = "parallel"))]
    let iterator = molecules.iter();

    #[cfg(feature = "parallel")]
    let iterator = molecules.par_iter();

    iterator
        .map(|&m| {
            let wrapped: Vec<Point3<f64>> = centres.iter().map(|c| c.positions()[m]).collect();
            method.apply(&wrapped, &boxes)
        })
        .collect()
}

/// Squared displacement from the first frame, shape `(n_tracks, n_frames)`.
pub fn mean_squared_displacement(tracks: &[Vec<Point3<f64>>]) -> Array2<f64> {
    let n_frames = tracks.iter().map(Vec::len).min().unwrap_or(0);
    let rows: Vec<Vec<f64>> = tracks
        .iter()
        .map(|t| squared_displacements_from_origin(&t[..n_frames]))
        .collect();
    Array2::from_shape_fn((tracks.len(), n_frames), |(i, t)| rows[i][t])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::frame::Frame;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const METHODS: [UnwrapMethod; 3] = [
        UnwrapMethod::Heuristic,
        UnwrapMethod::Displacement,
        UnwrapMethod::Hybrid,
    ];

    fn wrap_into(p: &Point3<f64>, l: &Vector3<f64>) -> Point3<f64> {
        Point3::from(Vector3::from_fn(|a, _| p[a] - (p[a] / l[a]).floor() * l[a]))
    }

    fn random_walk(rng: &mut StdRng, n: usize, max_step: f64, start: Point3<f64>) -> Vec<Point3<f64>> {
        let mut path = vec![start];
        for _ in 1..n {
            let last = path[path.len() - 1];
            let step = Vector3::from_fn(|_, _| rng.random_range(-max_step..max_step));
            path.push(last + step);
        }
        path
    }

    #[test]
    fn first_frame_is_the_reference_for_every_method() {
        let mut rng = StdRng::seed_from_u64(7);
        let wrapped: Vec<Point3<f64>> = (0..20)
            .map(|_| Point3::from(Vector3::from_fn(|_, _| rng.random_range(0.0..10.0))))
            .collect();
        let boxes: Vec<Vector3<f64>> = (0..20)
            .map(|_| Vector3::repeat(10.0 + rng.random_range(-0.2..0.2)))
            .collect();
        for method in METHODS {
            let unwrapped = method.apply(&wrapped, &boxes).unwrap();
            assert_eq!(unwrapped.len(), wrapped.len());
            assert_eq!(unwrapped[0], wrapped[0], "{method}");
        }
    }

    #[test]
    fn constant_box_random_walk_is_recovered_by_every_method() {
        let mut rng = StdRng::seed_from_u64(42);
        let l = Vector3::new(10.0, 12.0, 9.0);
        let truth = random_walk(&mut rng, 500, 1.5, Point3::new(5.0, 6.0, 4.5));
        let wrapped: Vec<Point3<f64>> = truth.iter().map(|p| wrap_into(p, &l)).collect();
        let boxes = vec![l; truth.len()];

        assert!(wrapped.iter().zip(&truth).any(|(w, t)| (w - t).norm() > 1.0));
        for method in METHODS {
            let unwrapped = method.apply(&wrapped, &boxes).unwrap();
            let worst = unwrapped
                .iter()
                .zip(&truth)
                .map(|(u, t)| (u - t).norm())
                .fold(0.0, f64::max);
            assert!(worst < 1e-9, "{method}: max deviation {worst}");
        }
    }

    #[test]
    fn single_jump_across_the_boundary() {
        let wrapped = [Point3::new(9.5, 5.0, 5.0), Point3::new(0.5, 5.0, 5.0)];
        let boxes = [Vector3::repeat(10.0); 2];
        let u = heuristic_unwrap(&wrapped, &boxes).unwrap();
        assert!((u[1].x - 10.5).abs() < 1e-12);
        let u = displacement_unwrap(&wrapped, &boxes).unwrap();
        assert!((u[1].x - 10.5).abs() < 1e-12);
    }

    #[test]
    fn hybrid_scales_image_offset_with_box_change() {
        // One boundary crossing, then the box grows by 0.5 with the particle at rest.
        let wrapped = [
            Point3::new(9.8, 1.0, 1.0),
            Point3::new(0.2, 1.0, 1.0),
            Point3::new(0.2, 1.0, 1.0),
        ];
        let boxes = [Vector3::repeat(10.0), Vector3::repeat(10.0), Vector3::repeat(10.5)];

        let hybrid = hybrid_unwrap(&wrapped, &boxes).unwrap();
        assert!((hybrid[1].x - 10.2).abs() < 1e-12);
        assert!((hybrid[2].x - 10.7).abs() < 1e-12);

        let displacement = displacement_unwrap(&wrapped, &boxes).unwrap();
        assert!((displacement[2].x - 10.2).abs() < 1e-12);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let wrapped = [Point3::origin(); 3];
        let boxes = [Vector3::repeat(10.0); 2];
        for method in METHODS {
            assert_eq!(
                method.apply(&wrapped, &boxes),
                Err(UnwrapError::LengthMismatch {
                    positions: 3,
                    boxes: 2
                })
            );
        }
    }

    #[test]
    fn method_names_parse_and_unknown_names_fail() {
        assert_eq!("hybrid".parse::<UnwrapMethod>(), Ok(UnwrapMethod::Hybrid));
        assert_eq!("Heuristic".parse::<UnwrapMethod>(), Ok(UnwrapMethod::Heuristic));
        assert_eq!(
            "spline".parse::<UnwrapMethod>(),
            Err(UnwrapError::UnknownUnwrapMethod("spline".to_string()))
        );

        #[derive(Deserialize)]
        struct Holder {
            method: UnwrapMethod,
        }
        let h: Holder = toml::from_str("method = \"displacement\"").unwrap();
        assert_eq!(h.method, UnwrapMethod::Displacement);
        assert!(toml::from_str::<Holder>("method = \"spline\"").is_err());
    }

    #[test]
    fn skewed_cells_are_rejected() {
        let skewed = Cell::new(nalgebra::Matrix3::new(
            10.0, 0.0, 0.0, 1.0, 10.0, 0.0, 0.0, 0.0, 10.0,
        ));
        let cells = [Cell::cubic(10.0), skewed];
        assert_eq!(
            box_lengths(cells.iter()),
            Err(UnwrapError::NotOrthorhombic { frame: 1 })
        );
    }

    #[test]
    fn unwrap_species_follows_one_kind() {
        let l = 10.0;
        let make = |x: f64| {
            let frame = Frame::new(
                vec![0, 0],
                vec![Point3::new(x, 1.0, 1.0), Point3::new(5.0, 5.0, 5.0)],
                Cell::cubic(l),
                [true; 3],
            )
            .unwrap();
            MoleculeCentres::new(frame, vec!["Li".to_string(), "PF6".to_string()]).unwrap()
        };
        let centres = vec![make(9.0), make(9.8), make(0.6), make(1.4)];
        let tracks = unwrap_species(&centres, "Li", UnwrapMethod::Hybrid).unwrap();

        assert_eq!(tracks.len(), 1);
        let xs: Vec<f64> = tracks[0].iter().map(|p| p.x).collect();
        for (x, expected) in xs.iter().zip([9.0, 9.8, 10.6, 11.4]) {
            assert!((x - expected).abs() < 1e-9);
        }

        let msd = mean_squared_displacement(&tracks);
        assert_eq!(msd.shape(), &[1, 4]);
        assert!((msd[[0, 3]] - 2.4 * 2.4).abs() < 1e-9);
    }
}
