use super::cell::Cell;
use super::element::{Element, ElementError, symbol_for};
use nalgebra::{Point3, Vector3};
use std::borrow::Cow;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Array '{name}' has {actual} entries but the frame has {expected} atoms")]
    LengthMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Atom index {index} out of range for a frame of {len} atoms")]
    IndexOutOfRange { index: usize, len: usize },
}

/// One atomic configuration of a trajectory.
///
/// Atomic numbers are stored as `u16` so that species shifted past the periodic
/// table (used to mark atoms of a particular molecule kind) remain representable.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    numbers: Vec<u16>,
    positions: Vec<Point3<f64>>,
    cell: Cell,
    pbc: [bool; 3],
    /// Per-atom molecule labels, once a connectivity analysis has run.
    mol_ids: Option<Vec<usize>>,
}

impl Frame {
    pub fn new(
        numbers: Vec<u16>,
        positions: Vec<Point3<f64>>,
        cell: Cell,
        pbc: [bool; 3],
    ) -> Result<Self, FrameError> {
        if numbers.len() != positions.len() {
            return Err(FrameError::LengthMismatch {
                name: "positions",
                expected: numbers.len(),
                actual: positions.len(),
            });
        }
        Ok(Self {
            numbers,
            positions,
            cell,
            pbc,
            mol_ids: None,
        })
    }

    /// Builds a frame from chemical symbols.
    ///
    /// # Errors
    ///
    /// Fails on unknown symbols or mismatched lengths.
    pub fn from_symbols(
        symbols: &[&str],
        positions: Vec<Point3<f64>>,
        cell: Cell,
        pbc: [bool; 3],
    ) -> Result<Self, FrameBuildError> {
        let numbers = symbols
            .iter()
            .map(|s| Element::from_symbol(s).map(|el| el.number))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(numbers, positions, cell, pbc)?)
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    pub fn numbers(&self) -> &[u16] {
        &self.numbers
    }

    pub fn numbers_mut(&mut self) -> &mut [u16] {
        &mut self.numbers
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub fn positions_mut(&mut self) -> &mut [Point3<f64>] {
        &mut self.positions
    }

    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    pub fn set_cell(&mut self, cell: Cell) {
        self.cell = cell;
    }

    pub fn pbc(&self) -> [bool; 3] {
        self.pbc
    }

    pub fn set_pbc(&mut self, pbc: [bool; 3]) {
        self.pbc = pbc;
    }

    pub fn mol_ids(&self) -> Option<&[usize]> {
        self.mol_ids.as_deref()
    }

    pub fn set_mol_ids(&mut self, mol_ids: Vec<usize>) -> Result<(), FrameError> {
        if mol_ids.len() != self.len() {
            return Err(FrameError::LengthMismatch {
                name: "molID",
                expected: self.len(),
                actual: mol_ids.len(),
            });
        }
        self.mol_ids = Some(mol_ids);
        Ok(())
    }

    pub fn symbols(&self) -> Vec<Cow<'static, str>> {
        self.numbers.iter().map(|&z| symbol_for(z)).collect()
    }

    /// Atomic masses in Daltons.
    ///
    /// # Errors
    ///
    /// Returns an [`ElementError`] if an atomic number is outside the element table.
    pub fn masses(&self) -> Result<Vec<f64>, ElementError> {
        self.numbers
            .iter()
            .map(|&z| Element::from_number(z).map(|el| el.mass))
            .collect()
    }

    pub fn volume(&self) -> f64 {
        self.cell.volume()
    }

    /// Atom counts per atomic number, in ascending atomic-number order.
    pub fn species_counts(&self) -> BTreeMap<u16, usize> {
        let mut counts = BTreeMap::new();
        for &z in &self.numbers {
            *counts.entry(z).or_insert(0) += 1;
        }
        counts
    }

    /// Minimum-image displacement from atom `i` to atom `j`.
    pub fn displacement(&self, i: usize, j: usize) -> Vector3<f64> {
        let delta = self.positions[j] - self.positions[i];
        self.cell.minimum_image(&delta, self.pbc)
    }

    /// Minimum-image distance between atoms `i` and `j`.
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.displacement(i, j).norm()
    }

    /// Copies the selected atoms (in the given order) into a new frame with the same cell.
    pub fn subset(&self, indices: &[usize]) -> Result<Frame, FrameError> {
        let len = self.len();
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(FrameError::IndexOutOfRange { index, len });
        }
        let numbers = indices.iter().map(|&i| self.numbers[i]).collect();
        let positions = indices.iter().map(|&i| self.positions[i]).collect();
        let mol_ids = self
            .mol_ids
            .as_ref()
            .map(|ids| indices.iter().map(|&i| ids[i]).collect());
        Ok(Frame {
            numbers,
            positions,
            cell: self.cell.clone(),
            pbc: self.pbc,
            mol_ids,
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrameBuildError {
    #[error(transparent)]
    Element(#[from] ElementError),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water_like() -> Frame {
        Frame::from_symbols(
            &["O", "H", "H"],
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(0.96, 0.0, 0.0),
                Point3::new(9.5, 0.5, 0.0),
            ],
            Cell::cubic(10.0),
            [true; 3],
        )
        .unwrap()
    }

    #[test]
    fn new_rejects_mismatched_lengths() {
        let result = Frame::new(vec![1, 1], vec![Point3::origin()], Cell::cubic(5.0), [true; 3]);
        assert_eq!(
            result,
            Err(FrameError::LengthMismatch {
                name: "positions",
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn distance_uses_minimum_image() {
        let frame = water_like();
        let d = frame.distance(0, 2);
        assert!((d - (0.5f64 * 0.5 + 0.5 * 0.5).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn species_counts_are_sorted_by_number() {
        let frame = water_like();
        let counts: Vec<_> = frame.species_counts().into_iter().collect();
        assert_eq!(counts, vec![(1, 2), (8, 1)]);
    }

    #[test]
    fn subset_keeps_order_and_molecule_labels() {
        let mut frame = water_like();
        frame.set_mol_ids(vec![0, 0, 1]).unwrap();
        let sub = frame.subset(&[2, 0]).unwrap();
        assert_eq!(sub.numbers(), &[1, 8]);
        assert_eq!(sub.mol_ids(), Some(&[1, 0][..]));
    }

    #[test]
    fn subset_rejects_out_of_range_indices() {
        let frame = water_like();
        assert_eq!(
            frame.subset(&[0, 3]),
            Err(FrameError::IndexOutOfRange { index: 3, len: 3 })
        );
    }

    #[test]
    fn set_mol_ids_validates_length() {
        let mut frame = water_like();
        assert!(frame.set_mol_ids(vec![0]).is_err());
        assert!(frame.mol_ids().is_none());
    }

    #[test]
    fn masses_fail_for_shifted_species() {
        let mut frame = water_like();
        frame.numbers_mut()[0] = 200;
        assert_eq!(frame.masses(), Err(ElementError::UnknownNumber(200)));
    }
}
