use thiserror::Error;

use super::config::ConfigError;
use super::connectivity::ConnectivityError;
use super::descriptor::DescriptorError;
use super::environment::EnvironmentError;
use super::molecules::MoleculeError;
use super::rdf::RdfError;
use super::tracking::TrackingError;
use super::unwrap::UnwrapError;
use super::voids::VoidError;
use crate::core::io::boxfile::BoxFileError;
use crate::core::io::npy::NpyError;
use crate::core::io::xyz::XyzError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Failed to read trajectory: {source}")]
    Trajectory {
        #[from]
        source: XyzError,
    },

    #[error("Failed to apply box dimensions: {source}")]
    BoxFile {
        #[from]
        source: BoxFileError,
    },

    #[error("Array I/O failed: {source}")]
    Npy {
        #[from]
        source: NpyError,
    },

    #[error("Molecule assignment failed: {source}")]
    Connectivity {
        #[from]
        source: ConnectivityError,
    },

    #[error("Molecule analysis failed: {source}")]
    Molecule {
        #[from]
        source: MoleculeError,
    },

    #[error("Unwrapping failed: {source}")]
    Unwrap {
        #[from]
        source: UnwrapError,
    },

    #[error("RDF computation failed: {source}")]
    Rdf {
        #[from]
        source: RdfError,
    },

    #[error("Environment analysis failed: {source}")]
    Environment {
        #[from]
        source: EnvironmentError,
    },

    #[error("Tracking failed: {source}")]
    Tracking {
        #[from]
        source: TrackingError,
    },

    #[error("Void search failed: {source}")]
    Voids {
        #[from]
        source: VoidError,
    },

    #[error("Descriptor evaluation failed: {source}")]
    Descriptor {
        #[from]
        source: DescriptorError,
    },

    #[error("Failed to write table '{path}': {source}")]
    Table { path: String, source: csv::Error },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Trajectory '{0}' contains no frames")]
    EmptyTrajectory(String),
}
