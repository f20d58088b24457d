//! # Engine Module
//!
//! The analyses eltraj runs over trajectories. Every function borrows the frames it
//! needs and returns new values; nothing here keeps state between calls.
//!
//! ## Architecture
//!
//! - **Neighbour Search** ([`neighbors`]) - Periodic cell lists with ASE-style skin
//! - **Molecule Assignment** ([`connectivity`]) - Cutoff graphs and connected components
//! - **Molecular Centres** ([`molecules`]) - Kind naming, whole-molecule centres, species shifts
//! - **Unwrapping** ([`unwrap`]) - Heuristic, displacement and hybrid recurrences, MSD
//! - **Structure** ([`rdf`], [`environment`], [`tracking`], [`voids`]) - Partial RDFs,
//!   neighbour environments, bond and density tracking, void grids
//! - **Descriptors** ([`descriptor`]) - SOAP / SOAP-turbo strings, chunking and backends
//! - **Configuration** ([`config`]) - Workflow parameters and their builders
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - Aggregated engine error type
//!
//! ## Parallelism
//!
//! With the default `parallel` feature, per-frame and per-molecule loops run on
//! rayon's thread pool. Results are always collected in input order.

pub mod config;
pub mod connectivity;
pub mod descriptor;
pub mod environment;
pub mod error;
pub mod molecules;
pub mod neighbors;
pub mod progress;
pub mod rdf;
pub mod tracking;
pub mod unwrap;
pub mod voids;
