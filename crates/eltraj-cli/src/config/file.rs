use crate::error::{CliError, Result};
use eltraj::core::io::boxfile::BoxSource;
use eltraj::core::models::trajectory::FrameRange;
use eltraj::engine::config as core_config;
use eltraj::engine::connectivity::CutoffSpec;
use eltraj::engine::molecules::MoleculeRegistry;
use eltraj::engine::unwrap::UnwrapMethod;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub trajectory: Option<FileTrajectoryConfig>,
    pub molecules: Option<FileMoleculesConfig>,
    pub unwrap: Option<FileUnwrapConfig>,
    pub species_shift: Option<FileSpeciesShift>,
    pub rdf: Option<FileRdfConfig>,
    pub environment: Option<FileEnvironmentConfig>,
    pub descriptor: Option<FileDescriptorConfig>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileTrajectoryConfig {
    pub path: Option<PathBuf>,
    pub range: Option<FrameRange>,
    #[serde(rename = "box")]
    pub box_source: Option<BoxSource>,
    pub output_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileMoleculesConfig {
    pub cutoffs: Option<CutoffSpec>,
    /// Extra formula-to-kind entries on top of the built-in registry.
    pub registry: Option<MoleculeRegistry>,
    pub output: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileUnwrapConfig {
    pub method: Option<UnwrapMethod>,
    pub species: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileSpeciesShift {
    pub kind: String,
    pub numbers: Vec<u16>,
}

impl From<FileSpeciesShift> for core_config::SpeciesShift {
    fn from(p: FileSpeciesShift) -> Self {
        Self {
            kind: p.kind,
            numbers: p.numbers,
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileRdfConfig {
    pub rmax: Option<f64>,
    pub nbins: Option<usize>,
    pub window: Option<usize>,
    pub output: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileEnvironmentConfig {
    pub rcut: Option<f64>,
    pub labels: Option<Vec<String>>,
    pub output: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileDescriptorConfig {
    pub chunk: Option<usize>,
    pub every: Option<usize>,
    pub n_frames: Option<usize>,
    pub outheader: Option<String>,
    /// Descriptor parameters, keys exactly as the descriptor expects them.
    pub params: Option<toml::Table>,
    pub backend: Option<FileBackendConfig>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileBackendConfig {
    pub program: Option<String>,
    pub args: Option<Vec<String>>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => {}
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration file '{}': only .toml files are accepted.",
                    path.display()
                )));
            }
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|source| CliError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
