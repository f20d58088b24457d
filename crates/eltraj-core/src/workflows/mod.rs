//! # Workflows Module
//!
//! End-to-end procedures built from the [`crate::engine`] analyses. Each workflow
//! reports its phases through a [`crate::engine::progress::ProgressReporter`] and
//! writes its results next to returning them.
//!
//! - **Loading** ([`loader`]) - Trajectory and box input, molecule assignment,
//!   centre extraction, unwrapping and the species shift
//! - **RDF Statistics** ([`rdf`]) - Windowed partial RDFs written as CSV
//! - **Environments** ([`environment`]) - Neighbour-kind counts per molecule as CSV
//! - **Descriptors** ([`descriptor`]) - Chunked or frame-by-frame backend evaluation

pub mod descriptor;
pub mod environment;
pub mod loader;
pub mod rdf;

use crate::engine::error::EngineError;
use std::path::Path;

pub(crate) fn ensure_dir(dir: &Path) -> Result<(), EngineError> {
    std::fs::create_dir_all(dir).map_err(|source| EngineError::Io {
        path: dir.display().to_string(),
        source,
    })
}

pub(crate) fn ensure_parent(path: &Path) -> Result<(), EngineError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}
