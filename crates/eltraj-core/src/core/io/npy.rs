use nalgebra::Point3;
use ndarray::{Array2, Array3};
use ndarray_npy::{ReadNpyError, ReadNpyExt, WriteNpyError, WriteNpyExt, read_npy, write_npy};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum NpyError {
    #[error("Failed to write array to '{path}': {source}")]
    Write {
        path: String,
        source: WriteNpyError,
    },
    #[error("Failed to read array from '{path}': {source}")]
    Read {
        path: String,
        source: ReadNpyError,
    },
    #[error("Ragged data cannot be stored as a dense array: {0}")]
    Ragged(String),
}

/// Appends `.npy` unless the path already carries that extension.
pub fn with_npy_extension(path: &Path) -> PathBuf {
    match path.extension() {
        Some(ext) if ext == "npy" => path.to_path_buf(),
        _ => {
            let mut name = path.as_os_str().to_owned();
            name.push(".npy");
            PathBuf::from(name)
        }
    }
}

/// Writes an array in NumPy `.npy` format and returns the final path.
pub fn save_npy<T: WriteNpyExt>(path: &Path, array: &T) -> Result<PathBuf, NpyError> {
    let path = with_npy_extension(path);
    write_npy(&path, array).map_err(|source| NpyError::Write {
        path: path.to_string_lossy().to_string(),
        source,
    })?;
    debug!(path = %path.display(), "Wrote .npy array.");
    Ok(path)
}

pub fn load_npy<T: ReadNpyExt>(path: &Path) -> Result<T, NpyError> {
    read_npy(path).map_err(|source| NpyError::Read {
        path: path.to_string_lossy().to_string(),
        source,
    })
}

/// Packs points into an `(n, 3)` array.
pub fn points_to_array(points: &[Point3<f64>]) -> Array2<f64> {
    Array2::from_shape_fn((points.len(), 3), |(i, j)| points[i][j])
}

/// Packs equally long tracks into an `(n_tracks, n_frames, 3)` array.
pub fn tracks_to_array(tracks: &[Vec<Point3<f64>>]) -> Result<Array3<f64>, NpyError> {
    let n_frames = tracks.first().map_or(0, Vec::len);
    if let Some(bad) = tracks.iter().position(|t| t.len() != n_frames) {
        return Err(NpyError::Ragged(format!(
            "track {} has {} frames, expected {}",
            bad,
            tracks[bad].len(),
            n_frames
        )));
    }
    Ok(Array3::from_shape_fn(
        (tracks.len(), n_frames, 3),
        |(i, t, j)| tracks[i][t][j],
    ))
}

/// Packs equally long rows into an `(n_rows, n_cols)` array.
pub fn rows_to_array(rows: &[Vec<f64>]) -> Result<Array2<f64>, NpyError> {
    let n_cols = rows.first().map_or(0, Vec::len);
    if let Some(bad) = rows.iter().position(|r| r.len() != n_cols) {
        return Err(NpyError::Ragged(format!(
            "row {} has {} columns, expected {}",
            bad,
            rows[bad].len(),
            n_cols
        )));
    }
    Ok(Array2::from_shape_fn((rows.len(), n_cols), |(i, j)| rows[i][j]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::tempdir;

    #[test]
    fn extension_is_appended_once() {
        assert_eq!(
            with_npy_extension(Path::new("out/soap_0-10-1")),
            PathBuf::from("out/soap_0-10-1.npy")
        );
        assert_eq!(
            with_npy_extension(Path::new("a.npy")),
            PathBuf::from("a.npy")
        );
        assert_eq!(
            with_npy_extension(Path::new("turbo_rcutH4.5")),
            PathBuf::from("turbo_rcutH4.5.npy")
        );
    }

    #[test]
    fn saved_array_is_read_back_exactly() {
        let dir = tempdir().unwrap();
        let data = array![[0.1, -2.5e-7, 3.0], [f64::MAX, 0.0, 1.0 / 3.0]];
        let path = save_npy(&dir.path().join("descriptor"), &data).unwrap();
        assert!(path.ends_with("descriptor.npy"));

        let back: Array2<f64> = load_npy(&path).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn reading_a_missing_file_reports_the_path() {
        let err = load_npy::<Array2<f64>>(Path::new("/nonexistent/x.npy")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/x.npy"));
    }

    #[test]
    fn tracks_to_array_rejects_ragged_input() {
        let tracks = vec![vec![Point3::origin(); 3], vec![Point3::origin(); 2]];
        assert!(matches!(tracks_to_array(&tracks), Err(NpyError::Ragged(_))));

        let ok = tracks_to_array(&[vec![Point3::new(1.0, 2.0, 3.0); 2]]).unwrap();
        assert_eq!(ok.shape(), &[1, 2, 3]);
        assert_eq!(ok[[0, 1, 2]], 3.0);
    }
}
