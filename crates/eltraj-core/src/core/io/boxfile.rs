use crate::core::models::cell::Cell;
use crate::core::models::trajectory::{FrameRange, Trajectory};
use nalgebra::Vector3;
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum BoxFileError {
    #[error("I/O error for box file '{path}': {source}")]
    Io {
        path: String,
        source: io::Error,
    },
    #[error("Box file line {line}: expected at least 3 numbers, found '{content}'")]
    Parse { line: usize, content: String },
    #[error(
        "Box file provides {available} selected rows but the trajectory has {frames} frames"
    )]
    TooFewRows { available: usize, frames: usize },
    #[error("Box edge must be positive, got {0}")]
    NonPositiveEdge(f64),
}

/// Where the orthorhombic box of a plain-XYZ trajectory comes from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BoxSource {
    /// A single cube edge applied to every frame.
    Cube(f64),
    /// A text file with one `Lx Ly Lz` row per frame of the source trajectory.
    File(PathBuf),
}

/// Reads a plain-text box file: one row per frame, first three columns are the
/// box edges. Blank lines and lines starting with `#` are ignored.
pub fn read_box_lengths(reader: &mut impl BufRead) -> Result<Vec<Vector3<f64>>, BoxFileError> {
    let mut rows = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| BoxFileError::Io {
            path: "<stream>".to_string(),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let values: Vec<f64> = trimmed
            .split_whitespace()
            .take(3)
            .map(str::parse::<f64>)
            .collect::<Result<_, _>>()
            .map_err(|_| BoxFileError::Parse {
                line: idx + 1,
                content: trimmed.to_string(),
            })?;
        if values.len() < 3 {
            return Err(BoxFileError::Parse {
                line: idx + 1,
                content: trimmed.to_string(),
            });
        }
        rows.push(Vector3::new(values[0], values[1], values[2]));
    }
    Ok(rows)
}

pub fn read_box_file(path: &Path) -> Result<Vec<Vector3<f64>>, BoxFileError> {
    let file = File::open(path).map_err(|source| BoxFileError::Io {
        path: path.to_string_lossy().to_string(),
        source,
    })?;
    read_box_lengths(&mut BufReader::new(file))
}

/// Sets an orthorhombic cell and full periodicity on every frame of `traj`.
///
/// Rows of a box file are selected with the same frame range the trajectory was
/// read with, so row `k` of the file always belongs to frame `k` of the source.
///
/// # Errors
///
/// Fails if the file cannot be read, has fewer selected rows than frames, or a
/// cube edge is not positive.
pub fn apply_box_source(
    traj: &mut Trajectory,
    source: &BoxSource,
    range: &FrameRange,
) -> Result<(), BoxFileError> {
    match source {
        BoxSource::Cube(edge) => {
            if *edge <= 0.0 {
                return Err(BoxFileError::NonPositiveEdge(*edge));
            }
            info!(edge, "Applying a fixed cubic box to every frame.");
            for frame in traj.frames_mut() {
                frame.set_cell(Cell::cubic(*edge));
                frame.set_pbc([true; 3]);
            }
            Ok(())
        }
        BoxSource::File(path) => {
            info!(path = %path.display(), "Applying box dimensions from file.");
            let rows = read_box_file(path)?;
            let selected: Vec<Vector3<f64>> =
                range.indices(rows.len()).map(|i| rows[i]).collect();
            apply_box_lengths(traj, &selected)
        }
    }
}

pub fn apply_box_lengths(
    traj: &mut Trajectory,
    lengths: &[Vector3<f64>],
) -> Result<(), BoxFileError> {
    if lengths.len() < traj.len() {
        return Err(BoxFileError::TooFewRows {
            available: lengths.len(),
            frames: traj.len(),
        });
    }
    for (frame, l) in traj.frames_mut().iter_mut().zip(lengths) {
        frame.set_cell(Cell::orthorhombic(l.x, l.y, l.z));
        frame.set_pbc([true; 3]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::frame::Frame;
    use nalgebra::Point3;
    use std::io::{Cursor, Write};
    use tempfile::tempdir;

    fn traj_of(n: usize) -> Trajectory {
        let frames = (0..n)
            .map(|_| Frame::new(vec![3], vec![Point3::origin()], Cell::default(), [false; 3]).unwrap())
            .collect();
        Trajectory::new(frames)
    }

    #[test]
    fn read_box_lengths_skips_comments_and_extra_columns() {
        let content = "# Lx Ly Lz\n10.0 10.0 10.0 0.0\n\n10.5 10.5 10.5\n";
        let rows = read_box_lengths(&mut Cursor::new(content)).unwrap();
        assert_eq!(rows, vec![Vector3::new(10.0, 10.0, 10.0), Vector3::new(10.5, 10.5, 10.5)]);
    }

    #[test]
    fn read_box_lengths_rejects_short_rows() {
        let err = read_box_lengths(&mut Cursor::new("10.0 10.0\n")).unwrap_err();
        assert!(matches!(err, BoxFileError::Parse { line: 1, .. }));
    }

    #[test]
    fn file_rows_follow_the_frame_range() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("box.dat");
        let mut file = File::create(&path).unwrap();
        for i in 0..6 {
            writeln!(file, "{0} {0} {0}", 10.0 + i as f64).unwrap();
        }

        let range = FrameRange::new(1, Some(6), 2).unwrap();
        let mut traj = traj_of(3);
        apply_box_source(&mut traj, &BoxSource::File(path), &range).unwrap();

        let edges: Vec<f64> = traj.iter().map(|f| f.cell().matrix()[(0, 0)]).collect();
        assert_eq!(edges, vec![11.0, 13.0, 15.0]);
        assert!(traj.iter().all(|f| f.pbc() == [true; 3]));
    }

    #[test]
    fn too_few_rows_is_an_error() {
        let mut traj = traj_of(3);
        let err = apply_box_lengths(&mut traj, &[Vector3::new(1.0, 1.0, 1.0)]).unwrap_err();
        assert!(matches!(
            err,
            BoxFileError::TooFewRows {
                available: 1,
                frames: 3
            }
        ));
    }

    #[test]
    fn cube_source_applies_to_all_frames() {
        let mut traj = traj_of(2);
        apply_box_source(&mut traj, &BoxSource::Cube(12.0), &FrameRange::all()).unwrap();
        assert!(traj.iter().all(|f| f.cell() == &Cell::cubic(12.0)));
        assert!(matches!(
            apply_box_source(&mut traj, &BoxSource::Cube(0.0), &FrameRange::all()),
            Err(BoxFileError::NonPositiveEdge(_))
        ));
    }
}
