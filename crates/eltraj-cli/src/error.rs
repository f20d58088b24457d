use eltraj::engine::descriptor::DescriptorError;
use eltraj::engine::error::EngineError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Raised before any frame is loaded, while rendering the descriptor string.
    #[error("Descriptor parameters rejected: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file '{}': {source}", path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("{0:#}")]
    Other(#[from] anyhow::Error),
}
