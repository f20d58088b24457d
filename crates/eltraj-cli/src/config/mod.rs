mod builder;
mod defaults;
mod file;
mod models;

pub use builder::{
    build_descriptor_config, build_env_config, build_molecules_config, build_rdf_config,
    build_unwrap_config,
};
