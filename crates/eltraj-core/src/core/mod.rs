//! # Core Module
//!
//! Fundamental building blocks shared by every analysis in eltraj.
//!
//! ## Architecture
//!
//! - **Atomistic Representation** ([`models`]) - Elements, periodic cells, frames and trajectories
//! - **File I/O** ([`io`]) - Extended-XYZ trajectories, box-dimension files and `.npy` arrays
//! - **Geometry** ([`utils`]) - Minimum-image distances and mass-weighted centres
//!
//! Frames own their data; analyses in [`crate::engine`] borrow them and return new
//! values rather than mutating shared state.

pub mod io;
pub mod models;
pub mod utils;
