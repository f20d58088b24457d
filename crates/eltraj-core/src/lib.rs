//! # eltraj Core Library
//!
//! Post-processing of molecular-dynamics trajectories of liquid electrolytes: molecule
//! segmentation from connectivity graphs, unwrapping of periodic centre-of-mass tracks,
//! radial distribution functions, local environment statistics, and the bookkeeping
//! around SOAP / SOAP-turbo descriptors.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same three layers throughout:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Frame`, `Cell`, `Trajectory`),
//!   the element table, and file I/O for XYZ trajectories, box files and `.npy` arrays.
//!
//! - **[`engine`]: The Analyses.** Neighbour search, connected-component molecule
//!   assignment, unwrapping recurrences, RDF histograms, environment counts and
//!   descriptor string assembly. Every analysis is a pass over frames it borrows.
//!
//! - **[`workflows`]: The Public API.** Complete procedures that tie `core` and
//!   `engine` together, e.g. loading a trajectory, assigning molecules from the first
//!   frame and writing unwrapped tracks to disk.

pub mod core;
pub mod engine;
pub mod workflows;
