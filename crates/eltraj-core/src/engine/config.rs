use super::connectivity::CutoffSpec;
use super::descriptor::DescriptorParams;
use super::molecules::MoleculeRegistry;
use super::unwrap::UnwrapMethod;
use crate::core::io::boxfile::BoxSource;
use crate::core::models::trajectory::FrameRange;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Atoms of molecules of `kind` whose atomic number is in `numbers` are relabelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesShift {
    pub kind: String,
    pub numbers: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnwrapConfig {
    pub method: UnwrapMethod,
    /// Molecule kinds whose centres are unwrapped.
    pub species: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    pub trajectory_path: PathBuf,
    pub range: FrameRange,
    pub box_source: Option<BoxSource>,
    pub cutoffs: CutoffSpec,
    pub registry: MoleculeRegistry,
    pub species_shift: Option<SpeciesShift>,
    pub unwrap: Option<UnwrapConfig>,
    pub output_dir: PathBuf,
    /// Extended-XYZ file receiving the frames with their `molID` column.
    pub molecules_output: Option<PathBuf>,
}

#[derive(Default)]
pub struct LoaderConfigBuilder {
    trajectory_path: Option<PathBuf>,
    range: Option<FrameRange>,
    box_source: Option<BoxSource>,
    cutoffs: Option<CutoffSpec>,
    registry: Option<MoleculeRegistry>,
    species_shift: Option<SpeciesShift>,
    unwrap: Option<UnwrapConfig>,
    output_dir: Option<PathBuf>,
    molecules_output: Option<PathBuf>,
}

impl LoaderConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trajectory_path(mut self, path: PathBuf) -> Self {
        self.trajectory_path = Some(path);
        self
    }
    pub fn range(mut self, range: FrameRange) -> Self {
        self.range = Some(range);
        self
    }
    pub fn box_source(mut self, source: Option<BoxSource>) -> Self {
        self.box_source = source;
        self
    }
    pub fn cutoffs(mut self, spec: CutoffSpec) -> Self {
        self.cutoffs = Some(spec);
        self
    }
    pub fn registry(mut self, registry: MoleculeRegistry) -> Self {
        self.registry = Some(registry);
        self
    }
    pub fn species_shift(mut self, shift: Option<SpeciesShift>) -> Self {
        self.species_shift = shift;
        self
    }
    pub fn unwrap(mut self, unwrap: Option<UnwrapConfig>) -> Self {
        self.unwrap = unwrap;
        self
    }
    pub fn output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = Some(dir);
        self
    }
    pub fn molecules_output(mut self, path: Option<PathBuf>) -> Self {
        self.molecules_output = path;
        self
    }

    pub fn build(self) -> Result<LoaderConfig, ConfigError> {
        if let Some(unwrap) = &self.unwrap {
            if unwrap.species.is_empty() {
                return Err(ConfigError::InvalidParameter {
                    name: "unwrap.species",
                    reason: "at least one molecule kind is required".to_string(),
                });
            }
        }
        Ok(LoaderConfig {
            trajectory_path: self
                .trajectory_path
                .ok_or(ConfigError::MissingParameter("trajectory_path"))?,
            range: self.range.unwrap_or_default(),
            box_source: self.box_source,
            cutoffs: self.cutoffs.unwrap_or_default(),
            registry: self.registry.unwrap_or_default(),
            species_shift: self.species_shift,
            unwrap: self.unwrap,
            output_dir: self
                .output_dir
                .ok_or(ConfigError::MissingParameter("output_dir"))?,
            molecules_output: self.molecules_output,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RdfConfig {
    pub rmax: f64,
    pub nbins: usize,
    pub window: usize,
    pub output_path: PathBuf,
}

#[derive(Default)]
pub struct RdfConfigBuilder {
    rmax: Option<f64>,
    nbins: Option<usize>,
    window: Option<usize>,
    output_path: Option<PathBuf>,
}

impl RdfConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rmax(mut self, rmax: f64) -> Self {
        self.rmax = Some(rmax);
        self
    }
    pub fn nbins(mut self, nbins: usize) -> Self {
        self.nbins = Some(nbins);
        self
    }
    pub fn window(mut self, window: usize) -> Self {
        self.window = Some(window);
        self
    }
    pub fn output_path(mut self, path: PathBuf) -> Self {
        self.output_path = Some(path);
        self
    }

    pub fn build(self) -> Result<RdfConfig, ConfigError> {
        Ok(RdfConfig {
            rmax: self.rmax.ok_or(ConfigError::MissingParameter("rmax"))?,
            nbins: self.nbins.ok_or(ConfigError::MissingParameter("nbins"))?,
            window: self.window.unwrap_or(1),
            output_path: self
                .output_path
                .ok_or(ConfigError::MissingParameter("output_path"))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentConfig {
    pub rcut: f64,
    /// Column order; taken from the first frame's kinds when absent.
    pub labels: Option<Vec<String>>,
    pub output_path: PathBuf,
}

#[derive(Default)]
pub struct EnvironmentConfigBuilder {
    rcut: Option<f64>,
    labels: Option<Vec<String>>,
    output_path: Option<PathBuf>,
}

impl EnvironmentConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rcut(mut self, rcut: f64) -> Self {
        self.rcut = Some(rcut);
        self
    }
    pub fn labels(mut self, labels: Option<Vec<String>>) -> Self {
        self.labels = labels;
        self
    }
    pub fn output_path(mut self, path: PathBuf) -> Self {
        self.output_path = Some(path);
        self
    }

    pub fn build(self) -> Result<EnvironmentConfig, ConfigError> {
        Ok(EnvironmentConfig {
            rcut: self.rcut.ok_or(ConfigError::MissingParameter("rcut"))?,
            labels: self.labels,
            output_path: self
                .output_path
                .ok_or(ConfigError::MissingParameter("output_path"))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorMode {
    /// Consecutive chunks of loaded frames, one `.npy` per chunk.
    Chunked { chunk: usize },
    /// Frames `0, every, ...` below `n_frames`, concatenated into one `.npy`.
    FrameByFrame {
        n_frames: usize,
        every: usize,
        outheader: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorConfig {
    pub params: DescriptorParams,
    pub mode: DescriptorMode,
    pub output_dir: PathBuf,
}

#[derive(Default)]
pub struct DescriptorConfigBuilder {
    params: Option<DescriptorParams>,
    mode: Option<DescriptorMode>,
    output_dir: Option<PathBuf>,
}

impl DescriptorConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn params(mut self, params: DescriptorParams) -> Self {
        self.params = Some(params);
        self
    }
    pub fn mode(mut self, mode: DescriptorMode) -> Self {
        self.mode = Some(mode);
        self
    }
    pub fn output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = Some(dir);
        self
    }

    pub fn build(self) -> Result<DescriptorConfig, ConfigError> {
        let mode = self.mode.ok_or(ConfigError::MissingParameter("mode"))?;
        match &mode {
            DescriptorMode::Chunked { chunk: 0 } => {
                return Err(ConfigError::InvalidParameter {
                    name: "chunk",
                    reason: "must be at least 1".to_string(),
                });
            }
            DescriptorMode::FrameByFrame { every: 0, .. } => {
                return Err(ConfigError::InvalidParameter {
                    name: "every",
                    reason: "must be at least 1".to_string(),
                });
            }
            _ => {}
        }
        Ok(DescriptorConfig {
            params: self.params.ok_or(ConfigError::MissingParameter("params"))?,
            mode,
            output_dir: self
                .output_dir
                .ok_or(ConfigError::MissingParameter("output_dir"))?,
        })
    }
}
