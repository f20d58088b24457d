use super::defaults::DefaultsConfig;
use super::file::{FileConfig, FileDescriptorConfig};
use super::models::{AppConfig, DescriptorTask, ModeChoice};
use crate::cli::{DescriptorArgs, EnvArgs, MoleculesArgs, RdfArgs, TrajectoryArgs, UnwrapArgs};
use crate::error::{CliError, Result};
use eltraj::core::io::boxfile::BoxSource;
use eltraj::core::models::trajectory::FrameRange;
use eltraj::engine::config as core_config;
use eltraj::engine::connectivity::CutoffSpec;
use eltraj::engine::descriptor::DescriptorParams;
use eltraj::engine::molecules::MoleculeRegistry;
use eltraj::engine::unwrap::UnwrapMethod;
use std::path::PathBuf;
use std::str::FromStr;

/// Loader settings shared by every subcommand, merged from CLI, file and defaults.
struct LoaderDraft {
    builder: core_config::LoaderConfigBuilder,
    output_dir: PathBuf,
    molecules_output: Option<PathBuf>,
}

fn config_error(e: core_config::ConfigError) -> CliError {
    CliError::Config(e.to_string())
}

fn load_file_config(args: &TrajectoryArgs) -> Result<FileConfig> {
    let file_config = match &args.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    apply_set_values(file_config, &args.set_values)
}

/// A number is a cube edge; anything else names a box file.
fn parse_box(value: &str) -> BoxSource {
    match value.parse::<f64>() {
        Ok(edge) => BoxSource::Cube(edge),
        Err(_) => BoxSource::File(PathBuf::from(value)),
    }
}

fn parse_range(value: &str) -> Result<FrameRange> {
    value
        .parse()
        .map_err(|e: eltraj::core::models::trajectory::FrameRangeError| {
            CliError::Argument(e.to_string())
        })
}

fn parse_method(value: &str) -> Result<UnwrapMethod> {
    value
        .parse()
        .map_err(|e: eltraj::engine::unwrap::UnwrapError| CliError::Argument(e.to_string()))
}

fn loader_draft(
    args: &TrajectoryArgs,
    file_config: &mut FileConfig,
    defaults: &DefaultsConfig,
) -> Result<LoaderDraft> {
    let traj_file = file_config.trajectory.take().unwrap_or_default();
    let molecules_file = file_config.molecules.take().unwrap_or_default();

    let trajectory_path = args.input.clone().or(traj_file.path).ok_or_else(|| {
        CliError::Config(
            "A trajectory is required either via --input or `trajectory.path` in the config file."
                .to_string(),
        )
    })?;
    let range = match &args.range {
        Some(text) => parse_range(text)?,
        None => traj_file.range.unwrap_or_default(),
    };
    let box_source = args
        .box_source
        .as_deref()
        .map(parse_box)
        .or(traj_file.box_source);
    let cutoffs = args
        .cutoff
        .map(CutoffSpec::Uniform)
        .or(molecules_file.cutoffs)
        .unwrap_or(CutoffSpec::Uniform(defaults.cutoff));

    let mut registry = MoleculeRegistry::default();
    if let Some(extra) = &molecules_file.registry {
        registry.extend(extra);
    }

    let output_dir = args
        .output_dir
        .clone()
        .or(traj_file.output_dir)
        .unwrap_or_else(|| PathBuf::from(&defaults.output_dir));

    let builder = core_config::LoaderConfigBuilder::new()
        .trajectory_path(trajectory_path)
        .range(range)
        .box_source(box_source)
        .cutoffs(cutoffs)
        .registry(registry)
        .output_dir(output_dir.clone());

    Ok(LoaderDraft {
        builder,
        output_dir,
        molecules_output: molecules_file.output,
    })
}

pub fn build_molecules_config(args: &MoleculesArgs) -> Result<AppConfig<PathBuf>> {
    let defaults = DefaultsConfig::default();
    let mut file_config = load_file_config(&args.trajectory)?;
    let draft = loader_draft(&args.trajectory, &mut file_config, &defaults)?;

    let xyz = args
        .xyz
        .clone()
        .or(draft.molecules_output)
        .unwrap_or_else(|| draft.output_dir.join(&defaults.molecules_file));
    let loader = draft
        .builder
        .molecules_output(Some(xyz.clone()))
        .build()
        .map_err(config_error)?;
    Ok(AppConfig { loader, task: xyz })
}

pub fn build_unwrap_config(args: &UnwrapArgs) -> Result<AppConfig<()>> {
    let defaults = DefaultsConfig::default();
    let mut file_config = load_file_config(&args.trajectory)?;
    let draft = loader_draft(&args.trajectory, &mut file_config, &defaults)?;
    let unwrap_file = file_config.unwrap.take().unwrap_or_default();

    let method = match &args.method {
        Some(name) => parse_method(name)?,
        None => unwrap_file.method.unwrap_or(defaults.unwrap_method),
    };
    let species = if args.species.is_empty() {
        unwrap_file.species.unwrap_or_default()
    } else {
        args.species.clone()
    };

    let loader = draft
        .builder
        .unwrap(Some(core_config::UnwrapConfig { method, species }))
        .build()
        .map_err(config_error)?;
    Ok(AppConfig { loader, task: () })
}

pub fn build_rdf_config(args: &RdfArgs) -> Result<AppConfig<core_config::RdfConfig>> {
    let defaults = DefaultsConfig::default();
    let mut file_config = load_file_config(&args.trajectory)?;
    let draft = loader_draft(&args.trajectory, &mut file_config, &defaults)?;
    let rdf_file = file_config.rdf.take().unwrap_or_default();

    let output_path = args
        .table
        .clone()
        .or(rdf_file.output)
        .unwrap_or_else(|| draft.output_dir.join(&defaults.rdf_file));
    let task = core_config::RdfConfigBuilder::new()
        .rmax(args.rmax.or(rdf_file.rmax).unwrap_or(defaults.rdf_rmax))
        .nbins(args.nbins.or(rdf_file.nbins).unwrap_or(defaults.rdf_nbins))
        .window(args.window.or(rdf_file.window).unwrap_or(defaults.rdf_window))
        .output_path(output_path)
        .build()
        .map_err(config_error)?;

    let loader = draft.builder.build().map_err(config_error)?;
    Ok(AppConfig { loader, task })
}

pub fn build_env_config(args: &EnvArgs) -> Result<AppConfig<core_config::EnvironmentConfig>> {
    let defaults = DefaultsConfig::default();
    let mut file_config = load_file_config(&args.trajectory)?;
    let draft = loader_draft(&args.trajectory, &mut file_config, &defaults)?;
    let env_file = file_config.environment.take().unwrap_or_default();

    let labels = if args.labels.is_empty() {
        env_file.labels
    } else {
        Some(args.labels.clone())
    };
    let output_path = args
        .table
        .clone()
        .or(env_file.output)
        .unwrap_or_else(|| draft.output_dir.join(&defaults.env_file));
    let task = core_config::EnvironmentConfigBuilder::new()
        .rcut(args.rcut.or(env_file.rcut).unwrap_or(defaults.env_rcut))
        .labels(labels)
        .output_path(output_path)
        .build()
        .map_err(config_error)?;

    let loader = draft.builder.build().map_err(config_error)?;
    Ok(AppConfig { loader, task })
}

pub fn build_descriptor_config(args: &DescriptorArgs) -> Result<AppConfig<DescriptorTask>> {
    let defaults = DefaultsConfig::default();
    let mut file_config = load_file_config(&args.trajectory)?;
    let draft = loader_draft(&args.trajectory, &mut file_config, &defaults)?;
    let species_shift = file_config.species_shift.take().map(Into::into);
    let desc_file = file_config.descriptor.take().unwrap_or_default();

    let mode = merge_mode(args, &desc_file, &defaults)?;
    let table = desc_file.params.clone().ok_or_else(|| {
        CliError::Config("`descriptor.params` is required in the config file.".to_string())
    })?;
    let params = DescriptorParams::from_table(table).map_err(|e| CliError::Config(e.to_string()))?;

    let backend = desc_file.backend.unwrap_or_default();
    let task = DescriptorTask {
        params,
        mode,
        output_dir: draft.output_dir.clone(),
        program: args.program.clone().or(backend.program),
        args: backend.args.unwrap_or(defaults.backend_args),
    };

    let loader = draft
        .builder
        .species_shift(species_shift)
        .build()
        .map_err(config_error)?;
    Ok(AppConfig { loader, task })
}

fn merge_mode(
    args: &DescriptorArgs,
    file_val: &FileDescriptorConfig,
    defaults: &DefaultsConfig,
) -> Result<ModeChoice> {
    if let Some(chunk) = args.chunk {
        return Ok(ModeChoice::Chunked(chunk));
    }
    let every = match (args.every, file_val.every, file_val.chunk) {
        (Some(every), _, _) => Some(every),
        (None, Some(_), Some(_)) => {
            return Err(CliError::Config(
                "`descriptor.chunk` and `descriptor.every` cannot both be set.".to_string(),
            ));
        }
        (None, every, _) => every,
    };
    Ok(match every {
        Some(every) => ModeChoice::FrameByFrame {
            n_frames: args.n_frames.or(file_val.n_frames),
            every,
            outheader: args
                .outheader
                .clone()
                .or_else(|| file_val.outheader.clone())
                .unwrap_or_else(|| defaults.outheader.clone()),
        },
        None => ModeChoice::Chunked(file_val.chunk.unwrap_or(defaults.chunk)),
    })
}

fn parse_value<T: FromStr>(key: &str, value_str: &str, kind: &str) -> Result<T> {
    value_str.parse().map_err(|_| {
        CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value_str))
    })
}

fn split_list(value_str: &str) -> Vec<String> {
    value_str
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Interprets `raw` as a TOML value, falling back to a plain string.
fn parse_toml_value(raw: &str) -> toml::Value {
    format!("value = {raw}")
        .parse::<toml::Table>()
        .ok()
        .and_then(|mut table| table.remove("value"))
        .unwrap_or_else(|| toml::Value::String(raw.to_string()))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    if set_values.is_empty() {
        return Ok(config);
    }
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };

        match key {
            "trajectory.path" => {
                config.trajectory.get_or_insert_with(Default::default).path =
                    Some(PathBuf::from(value_str));
            }
            "trajectory.range" => {
                config.trajectory.get_or_insert_with(Default::default).range =
                    Some(parse_range(value_str)?);
            }
            "trajectory.box" => {
                config.trajectory.get_or_insert_with(Default::default).box_source =
                    Some(parse_box(value_str));
            }
            "trajectory.output-dir" => {
                config.trajectory.get_or_insert_with(Default::default).output_dir =
                    Some(PathBuf::from(value_str));
            }
            "molecules.cutoffs" => {
                config.molecules.get_or_insert_with(Default::default).cutoffs =
                    Some(CutoffSpec::Uniform(parse_value(key, value_str, "float")?));
            }
            "molecules.output" => {
                config.molecules.get_or_insert_with(Default::default).output =
                    Some(PathBuf::from(value_str));
            }
            "unwrap.method" => {
                config.unwrap.get_or_insert_with(Default::default).method =
                    Some(parse_method(value_str)?);
            }
            "unwrap.species" => {
                config.unwrap.get_or_insert_with(Default::default).species =
                    Some(split_list(value_str));
            }
            "rdf.rmax" => {
                config.rdf.get_or_insert_with(Default::default).rmax =
                    Some(parse_value(key, value_str, "float")?);
            }
            "rdf.nbins" => {
                config.rdf.get_or_insert_with(Default::default).nbins =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "rdf.window" => {
                config.rdf.get_or_insert_with(Default::default).window =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "rdf.output" => {
                config.rdf.get_or_insert_with(Default::default).output =
                    Some(PathBuf::from(value_str));
            }
            "environment.rcut" => {
                config.environment.get_or_insert_with(Default::default).rcut =
                    Some(parse_value(key, value_str, "float")?);
            }
            "environment.labels" => {
                config.environment.get_or_insert_with(Default::default).labels =
                    Some(split_list(value_str));
            }
            "environment.output" => {
                config.environment.get_or_insert_with(Default::default).output =
                    Some(PathBuf::from(value_str));
            }
            "descriptor.chunk" => {
                config.descriptor.get_or_insert_with(Default::default).chunk =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "descriptor.every" => {
                config.descriptor.get_or_insert_with(Default::default).every =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "descriptor.n-frames" => {
                config.descriptor.get_or_insert_with(Default::default).n_frames =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "descriptor.outheader" => {
                config.descriptor.get_or_insert_with(Default::default).outheader =
                    Some(value_str.to_string());
            }
            "descriptor.backend.program" => {
                config
                    .descriptor
                    .get_or_insert_with(Default::default)
                    .backend
                    .get_or_insert_with(Default::default)
                    .program = Some(value_str.to_string());
            }
            other => match other.strip_prefix("descriptor.params.") {
                Some(name) if !name.is_empty() => {
                    config
                        .descriptor
                        .get_or_insert_with(Default::default)
                        .params
                        .get_or_insert_with(Default::default)
                        .insert(name.to_string(), parse_toml_value(value_str));
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            },
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn trajectory_args() -> TrajectoryArgs {
        TrajectoryArgs {
            input: Some(PathBuf::from("traj.xyz")),
            ..Default::default()
        }
    }

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("eltraj.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn rdf_config_falls_back_to_defaults() {
        let args = RdfArgs {
            trajectory: trajectory_args(),
            ..Default::default()
        };
        let app = build_rdf_config(&args).expect("build ok");
        let defaults = DefaultsConfig::default();

        assert_eq!(app.task.rmax, defaults.rdf_rmax);
        assert_eq!(app.task.nbins, defaults.rdf_nbins);
        assert_eq!(app.task.window, 1);
        assert_eq!(app.task.output_path, PathBuf::from("eltraj-out/rdf.csv"));
        assert_eq!(app.loader.trajectory_path, PathBuf::from("traj.xyz"));
        assert_eq!(app.loader.range, FrameRange::all());
        assert_eq!(app.loader.cutoffs, CutoffSpec::Uniform(1.0));
        assert!(app.loader.box_source.is_none());
    }

    #[test]
    fn file_values_are_merged() {
        let dir = tempdir().unwrap();
        let config = write_config(
            dir.path(),
            r#"
            [trajectory]
            path = "md.xyz"
            range = "0:100:5"
            box = "box.txt"
            output-dir = "results"

            [molecules]
            registry = { C6H12O6 = "GLU" }

            [species-shift]
            kind = "EC"
            numbers = [8]

            [rdf]
            rmax = 8.0
            nbins = 80
            window = 4
            "#,
        );
        let args = RdfArgs {
            trajectory: TrajectoryArgs {
                config: Some(config),
                ..Default::default()
            },
            ..Default::default()
        };

        let app = build_rdf_config(&args).expect("build ok");
        assert_eq!(app.loader.trajectory_path, PathBuf::from("md.xyz"));
        assert_eq!(app.loader.range, FrameRange::new(0, Some(100), 5).unwrap());
        assert_eq!(app.loader.box_source, Some(BoxSource::File("box.txt".into())));
        assert_eq!(app.loader.registry.kind_of("C6H12O6").unwrap(), "GLU");
        assert_eq!(app.loader.registry.kind_of("C3H4O3").unwrap(), "EC");
        assert!(app.loader.species_shift.is_none());
        assert_eq!(app.task.rmax, 8.0);
        assert_eq!(app.task.nbins, 80);
        assert_eq!(app.task.window, 4);
        assert_eq!(app.task.output_path, PathBuf::from("results/rdf.csv"));
    }

    #[test]
    fn cli_overrides_file_values() {
        let dir = tempdir().unwrap();
        let config = write_config(
            dir.path(),
            "[trajectory]\npath = \"md.xyz\"\nbox = 20.0\n[rdf]\nnbins = 80\n",
        );
        let args = RdfArgs {
            trajectory: TrajectoryArgs {
                input: Some("other.xyz".into()),
                config: Some(config),
                range: Some("10:".to_string()),
                box_source: Some("30".to_string()),
                cutoff: Some(1.2),
                ..Default::default()
            },
            nbins: Some(120),
            table: Some("rdf_li.csv".into()),
            ..Default::default()
        };

        let app = build_rdf_config(&args).expect("build ok");
        assert_eq!(app.loader.trajectory_path, PathBuf::from("other.xyz"));
        assert_eq!(app.loader.range, FrameRange::new(10, None, 1).unwrap());
        assert_eq!(app.loader.box_source, Some(BoxSource::Cube(30.0)));
        assert_eq!(app.loader.cutoffs, CutoffSpec::Uniform(1.2));
        assert_eq!(app.task.nbins, 120);
        assert_eq!(app.task.output_path, PathBuf::from("rdf_li.csv"));
    }

    #[test]
    fn set_values_override_file_but_not_cli() {
        let dir = tempdir().unwrap();
        let config = write_config(dir.path(), "[rdf]\nwindow = 2\nrmax = 5.0\n");
        let args = RdfArgs {
            trajectory: TrajectoryArgs {
                config: Some(config),
                set_values: vec![
                    "trajectory.path=md.xyz".to_string(),
                    "trajectory.range=0:9:3".to_string(),
                    "molecules.cutoffs=1.1".to_string(),
                    "rdf.window=3".to_string(),
                    "rdf.rmax=7.5".to_string(),
                ],
                ..Default::default()
            },
            rmax: Some(9.0),
            ..Default::default()
        };

        let app = build_rdf_config(&args).expect("build ok");
        assert_eq!(app.loader.trajectory_path, PathBuf::from("md.xyz"));
        assert_eq!(app.loader.range, FrameRange::new(0, Some(9), 3).unwrap());
        assert_eq!(app.loader.cutoffs, CutoffSpec::Uniform(1.1));
        assert_eq!(app.task.window, 3);
        assert_eq!(app.task.rmax, 9.0);
    }

    #[test]
    fn invalid_set_values_are_rejected() {
        for set in ["rdf.nbins=many", "rdf.colour=red", "rdf.nbins", "unwrap.method=spline"] {
            let args = RdfArgs {
                trajectory: TrajectoryArgs {
                    set_values: vec![set.to_string()],
                    ..trajectory_args()
                },
                ..Default::default()
            };
            assert!(build_rdf_config(&args).is_err(), "accepted {set}");
        }
    }

    #[test]
    fn missing_trajectory_is_a_config_error() {
        let result = build_env_config(&EnvArgs::default());
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn env_labels_from_cli_replace_file_labels() {
        let dir = tempdir().unwrap();
        let config = write_config(dir.path(), "[environment]\nrcut = 4.0\nlabels = [\"EC\"]\n");
        let mut args = EnvArgs {
            trajectory: TrajectoryArgs {
                config: Some(config),
                ..trajectory_args()
            },
            ..Default::default()
        };

        let app = build_env_config(&args).unwrap();
        assert_eq!(app.task.rcut, 4.0);
        assert_eq!(app.task.labels, Some(vec!["EC".to_string()]));

        args.labels = vec!["Li".to_string(), "PF6".to_string()];
        let app = build_env_config(&args).unwrap();
        assert_eq!(app.task.labels, Some(vec!["Li".to_string(), "PF6".to_string()]));
        assert_eq!(app.task.output_path, PathBuf::from("eltraj-out/environments.csv"));
    }

    #[test]
    fn unwrap_needs_species_and_parses_method() {
        let mut args = UnwrapArgs {
            trajectory: trajectory_args(),
            ..Default::default()
        };
        assert!(matches!(build_unwrap_config(&args), Err(CliError::Config(_))));

        args.species = vec!["Li".to_string()];
        args.method = Some("Heuristic".to_string());
        let app = build_unwrap_config(&args).unwrap();
        let unwrap = app.loader.unwrap.unwrap();
        assert_eq!(unwrap.method, UnwrapMethod::Heuristic);
        assert_eq!(unwrap.species, vec!["Li"]);

        args.method = Some("spline".to_string());
        assert!(matches!(build_unwrap_config(&args), Err(CliError::Argument(_))));
    }

    #[test]
    fn unwrap_species_from_set_values() {
        let args = UnwrapArgs {
            trajectory: TrajectoryArgs {
                set_values: vec!["unwrap.species=Li, PF6".to_string()],
                ..trajectory_args()
            },
            ..Default::default()
        };
        let app = build_unwrap_config(&args).unwrap();
        let unwrap = app.loader.unwrap.unwrap();
        assert_eq!(unwrap.method, UnwrapMethod::Hybrid);
        assert_eq!(unwrap.species, vec!["Li", "PF6"]);
    }

    #[test]
    fn molecules_output_defaults_into_output_dir() {
        let args = MoleculesArgs {
            trajectory: TrajectoryArgs {
                output_dir: Some("out".into()),
                ..trajectory_args()
            },
            xyz: None,
        };
        let app = build_molecules_config(&args).unwrap();
        assert_eq!(app.task, PathBuf::from("out/molecules.xyz"));
        assert_eq!(app.loader.molecules_output, Some(PathBuf::from("out/molecules.xyz")));
    }

    #[test]
    fn descriptor_requires_params() {
        let args = DescriptorArgs {
            trajectory: trajectory_args(),
            ..Default::default()
        };
        assert!(matches!(build_descriptor_config(&args), Err(CliError::Config(_))));
    }

    #[test]
    fn descriptor_config_merges_mode_backend_and_shift() {
        let dir = tempdir().unwrap();
        let config = write_config(
            dir.path(),
            r#"
            [species-shift]
            kind = "EC"
            numbers = [8]

            [descriptor]
            every = 2
            params = { type = "soap", cutoff = 5.0 }

            [descriptor.backend]
            program = "soap-runner"
            "#,
        );
        let args = DescriptorArgs {
            trajectory: TrajectoryArgs {
                config: Some(config),
                set_values: vec!["descriptor.params.l_max=6".to_string()],
                ..trajectory_args()
            },
            ..Default::default()
        };

        let app = build_descriptor_config(&args).unwrap();
        let shift = app.loader.species_shift.unwrap();
        assert_eq!(shift.kind, "EC");
        assert_eq!(app.task.program.as_deref(), Some("soap-runner"));
        assert_eq!(app.task.args, DefaultsConfig::default().backend_args);
        assert_eq!(
            app.task.params.descriptor_string().unwrap(),
            "soap cutoff=5.0 l_max=6 "
        );

        let resolved = app.task.resolve(7).unwrap();
        assert_eq!(
            resolved.mode,
            core_config::DescriptorMode::FrameByFrame {
                n_frames: 7,
                every: 2,
                outheader: "desc".to_string(),
            }
        );
    }

    #[test]
    fn descriptor_chunk_flag_wins_over_file_stride() {
        let dir = tempdir().unwrap();
        let config = write_config(
            dir.path(),
            "[descriptor]\nevery = 2\nparams = { type = \"soap\" }\n",
        );
        let args = DescriptorArgs {
            trajectory: TrajectoryArgs {
                config: Some(config),
                ..trajectory_args()
            },
            chunk: Some(4),
            ..Default::default()
        };
        let app = build_descriptor_config(&args).unwrap();
        assert_eq!(app.task.mode, ModeChoice::Chunked(4));
    }

    #[test]
    fn toml_values_in_set_are_typed() {
        assert_eq!(parse_toml_value("4.5"), toml::Value::Float(4.5));
        assert_eq!(parse_toml_value("true"), toml::Value::Boolean(true));
        assert_eq!(parse_toml_value("{6 8}"), toml::Value::String("{6 8}".to_string()));
        assert_eq!(parse_toml_value("soap"), toml::Value::String("soap".to_string()));
    }
}
