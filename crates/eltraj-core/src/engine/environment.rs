use super::molecules::MoleculeCentres;
use super::neighbors::{DEFAULT_SKIN, NeighborList};
use crate::core::models::frame::{Frame, FrameError};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EnvironmentError {
    #[error("Environment cutoff must be positive, got {0}")]
    InvalidCutoff(f64),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Neighbour counts of every molecule of one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoleculeEnvironment {
    /// Kinds present in the frame, sorted; the column order of every row.
    pub labels: Vec<String>,
    /// One row per molecule, in label order.
    pub rows: Vec<Vec<usize>>,
}

impl MoleculeEnvironment {
    /// Rows of the molecules of one kind.
    pub fn rows_of<'a>(
        &'a self,
        centres: &'a MoleculeCentres,
        kind: &'a str,
    ) -> impl Iterator<Item = &'a Vec<usize>> + 'a {
        centres.indices_of(kind).map(move |i| &self.rows[i])
    }
}

/// Environment rows accumulated over frames, per central kind, with columns in
/// a fixed label order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentTable {
    pub labels: Vec<String>,
    pub rows: BTreeMap<String, Vec<Vec<usize>>>,
    pub skipped_frames: usize,
}

fn check_cutoff(rcut: f64) -> Result<(), EnvironmentError> {
    if !(rcut > 0.0) {
        return Err(EnvironmentError::InvalidCutoff(rcut));
    }
    Ok(())
}

/// Neighbour list with a radius of `rcut / 2` per site plus the default skin.
fn half_cutoff_list(frame: &Frame, rcut: f64) -> Result<NeighborList, EnvironmentError> {
    let radii = vec![rcut / 2.0; frame.len()];
    Ok(NeighborList::from_radii(frame, &radii, DEFAULT_SKIN)?)
}

/// Counts, for each molecule, the neighbouring molecules of each kind.
pub fn molecule_environment(
    centres: &MoleculeCentres,
    rcut: f64,
) -> Result<MoleculeEnvironment, EnvironmentError> {
    check_cutoff(rcut)?;
    let labels = centres.kind_labels();
    let column: BTreeMap<&str, usize> = labels
        .iter()
        .enumerate()
        .map(|(i, l)| (l.as_str(), i))
        .collect();
    let list = half_cutoff_list(centres.frame(), rcut)?;
    let kinds = centres.kinds();

    let rows = (0..centres.len())
        .map(|i| {
            let mut row = vec![0usize; labels.len()];
            for &j in list.neighbors(i) {
                row[column[kinds[j].as_str()]] += 1;
            }
            row
        })
        .collect();
    Ok(MoleculeEnvironment { labels, rows })
}

/// Accumulates environment rows over frames with columns ordered as `labels`.
///
/// A frame containing a kind outside `labels` is skipped; kinds of `labels`
/// absent from a frame get zero columns.
#[instrument(skip_all, name = "molecule_environments", fields(frames = frames.len()))]
pub fn molecule_environments(
    frames: &[MoleculeCentres],
    labels: &[String],
    rcut: f64,
) -> Result<EnvironmentTable, EnvironmentError> {
    check_cutoff(rcut)?;

    #[cfg(not(feature = "parallel"))]
    let iterator = frames.iter();

    #[cfg(feature = "parallel")]
    let iterator = frames.par_iter();

    let environments = iterator
        .map(|centres| molecule_environment(centres, rcut))
        .collect::<Result<Vec<_>, _>>()?;

    let mut rows: BTreeMap<String, Vec<Vec<usize>>> =
        labels.iter().map(|l| (l.clone(), Vec::new())).collect();
    let mut skipped_frames = 0;

    for (centres, env) in frames.iter().zip(&environments) {
        let mask: Option<Vec<usize>> = env
            .labels
            .iter()
            .map(|l| labels.iter().position(|x| x == l))
            .collect();
        let Some(mask) = mask else {
            skipped_frames += 1;
            debug!(labels = ?env.labels, "Skipping frame with unlisted molecule kinds.");
            continue;
        };
        for (molecule, row) in env.rows.iter().enumerate() {
            let mut full = vec![0usize; labels.len()];
            for (col, &count) in mask.iter().zip(row) {
                full[*col] = count;
            }
            if let Some(table) = rows.get_mut(&centres.kinds()[molecule]) {
                table.push(full);
            }
        }
    }

    info!(skipped_frames, "Molecular environments collected.");
    Ok(EnvironmentTable {
        labels: labels.to_vec(),
        rows,
        skipped_frames,
    })
}

/// Per-atom neighbour counts within `rcut` (half per atom plus skin), frames concatenated.
pub fn neighbor_counts(frames: &[Frame], rcut: f64) -> Result<Vec<usize>, EnvironmentError> {
    check_cutoff(rcut)?;

    #[cfg(not(feature = "parallel"))]
    let iterator = frames.iter();

    #[cfg(feature = "parallel")]
    let iterator = frames.par_iter();

    let per_frame = iterator
        .map(|frame| half_cutoff_list(frame, rcut).map(|l| l.counts()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(per_frame.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::cell::Cell;
    use nalgebra::Point3;

    fn centres(points: &[(f64, f64, f64)], kinds: &[&str]) -> MoleculeCentres {
        let frame = Frame::new(
            vec![0; points.len()],
            points.iter().map(|&(x, y, z)| Point3::new(x, y, z)).collect(),
            Cell::cubic(30.0),
            [true; 3],
        )
        .unwrap();
        MoleculeCentres::new(frame, kinds.iter().map(|k| k.to_string()).collect()).unwrap()
    }

    #[test]
    fn environment_counts_neighbours_by_kind() {
        let c = centres(
            &[(5.0, 5.0, 5.0), (8.0, 5.0, 5.0), (5.0, 9.0, 5.0), (20.0, 20.0, 20.0)],
            &["Li", "EC", "PF6", "EC"],
        );
        let env = molecule_environment(&c, 4.0).unwrap();
        assert_eq!(env.labels, vec!["EC", "Li", "PF6"]);
        assert_eq!(env.rows[0], vec![1, 0, 1]);
        assert_eq!(env.rows[1], vec![0, 1, 0]);
        assert_eq!(env.rows[3], vec![0, 0, 0]);
        assert_eq!(env.rows_of(&c, "EC").count(), 2);
    }

    #[test]
    fn cutoff_includes_the_skin() {
        let c = centres(&[(5.0, 5.0, 5.0), (9.5, 5.0, 5.0)], &["Li", "Li"]);
        assert_eq!(molecule_environment(&c, 4.0).unwrap().rows[0], vec![1]);
        let c = centres(&[(5.0, 5.0, 5.0), (9.7, 5.0, 5.0)], &["Li", "Li"]);
        assert_eq!(molecule_environment(&c, 4.0).unwrap().rows[0], vec![0]);
    }

    #[test]
    fn environments_align_columns_and_skip_unknown_kinds() {
        let only_ec = centres(&[(5.0, 5.0, 5.0), (8.0, 5.0, 5.0)], &["EC", "EC"]);
        let with_li = centres(&[(5.0, 5.0, 5.0), (8.0, 5.0, 5.0)], &["EC", "Li"]);
        let labels = vec!["EC".to_string(), "EMC".to_string()];

        let table = molecule_environments(&[only_ec, with_li], &labels, 4.0).unwrap();
        assert_eq!(table.skipped_frames, 1);
        assert_eq!(table.rows["EC"], vec![vec![1, 0], vec![1, 0]]);
        assert!(table.rows["EMC"].is_empty());
    }

    #[test]
    fn neighbor_counts_concatenate_frames() {
        let frame = Frame::new(
            vec![1, 1, 1],
            vec![
                Point3::new(1.0, 1.0, 1.0),
                Point3::new(2.0, 1.0, 1.0),
                Point3::new(10.0, 10.0, 10.0),
            ],
            Cell::cubic(20.0),
            [true; 3],
        )
        .unwrap();
        let counts = neighbor_counts(&[frame.clone(), frame], 2.0).unwrap();
        assert_eq!(counts, vec![1, 1, 0, 1, 1, 0]);
        assert!(matches!(
            neighbor_counts(&[], -1.0),
            Err(EnvironmentError::InvalidCutoff(_))
        ));
    }
}
