use eltraj::engine::config as core_config;
use eltraj::engine::descriptor::DescriptorParams;
use std::path::PathBuf;

/// A loader configuration plus the settings of one analysis.
pub struct AppConfig<T> {
    pub loader: core_config::LoaderConfig,
    pub task: T,
}

/// Evaluation mode as configured, before the number of loaded frames is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeChoice {
    Chunked(usize),
    FrameByFrame {
        n_frames: Option<usize>,
        every: usize,
        outheader: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorTask {
    pub params: DescriptorParams,
    pub mode: ModeChoice,
    pub output_dir: PathBuf,
    pub program: Option<String>,
    pub args: Vec<String>,
}

impl DescriptorTask {
    /// Core descriptor configuration; frame-by-frame runs default to every loaded frame.
    pub fn resolve(
        &self,
        loaded_frames: usize,
    ) -> Result<core_config::DescriptorConfig, core_config::ConfigError> {
        let mode = match &self.mode {
            ModeChoice::Chunked(chunk) => core_config::DescriptorMode::Chunked { chunk: *chunk },
            ModeChoice::FrameByFrame {
                n_frames,
                every,
                outheader,
            } => core_config::DescriptorMode::FrameByFrame {
                n_frames: n_frames.unwrap_or(loaded_frames),
                every: *every,
                outheader: outheader.clone(),
            },
        };
        core_config::DescriptorConfigBuilder::new()
            .params(self.params.clone())
            .mode(mode)
            .output_dir(self.output_dir.clone())
            .build()
    }
}
