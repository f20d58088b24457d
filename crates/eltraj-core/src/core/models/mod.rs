//! # Core Models Module
//!
//! Data structures used to represent atomistic trajectories in eltraj.
//!
//! ## Key Components
//!
//! - [`element`] - Static element table (symbols, covalent radii, masses)
//! - [`cell`] - Periodic simulation cell with wrapping and minimum-image helpers
//! - [`frame`] - One atomic configuration: numbers, positions, cell, periodicity
//! - [`trajectory`] - Ordered sequence of frames and the `begin:end:step` frame range
//!
//! ## Usage
//!
//! ```ignore
//! use eltraj::core::models::{cell::Cell, frame::Frame};
//! use nalgebra::Point3;
//!
//! let frame = Frame::new(
//!     vec![3, 9],
//!     vec![Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0)],
//!     Cell::orthorhombic(10.0, 10.0, 10.0),
//!     [true; 3],
//! )?;
//! ```

pub mod cell;
pub mod element;
pub mod frame;
pub mod trajectory;
