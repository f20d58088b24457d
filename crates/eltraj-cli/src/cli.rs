use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "The eltraj developers",
    version,
    about = "eltraj - post-processing of molecular-dynamics trajectories of liquid electrolytes: molecule assignment, unwrapping, RDFs, environments and descriptors.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assign molecule IDs and write the frames as extended XYZ with a `molID` column.
    Molecules(MoleculesArgs),
    /// Unwrap molecular centres of mass and save tracks and mean squared displacements.
    Unwrap(UnwrapArgs),
    /// Windowed intra/inter-molecular RDF statistics as a CSV table.
    Rdf(RdfArgs),
    /// Neighbour-kind counts around every molecule as a CSV table.
    Env(EnvArgs),
    /// Evaluate a SOAP or SOAP-turbo descriptor through an external program.
    Descriptor(DescriptorArgs),
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Molecules(_) => "molecules",
            Commands::Unwrap(_) => "unwrap",
            Commands::Rdf(_) => "rdf",
            Commands::Env(_) => "env",
            Commands::Descriptor(_) => "descriptor",
        }
    }
}

/// Options shared by every subcommand that reads a trajectory.
#[derive(Args, Debug, Clone, Default)]
pub struct TrajectoryArgs {
    /// Path to the XYZ or extended-XYZ trajectory.
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Frames to read as `begin:end:step`; any part may be left empty.
    #[arg(short, long, value_name = "RANGE")]
    pub range: Option<String>,

    /// Cube edge in Angstrom or a box file with one `Lx Ly Lz` row per frame.
    #[arg(short = 'b', long = "box", value_name = "EDGE_OR_PATH")]
    pub box_source: Option<String>,

    /// Uniform multiplier applied to covalent radii for bonding.
    #[arg(long, value_name = "FLOAT")]
    pub cutoff: Option<f64>,

    /// Directory receiving the output files.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S rdf.nbins=120
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `molecules` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct MoleculesArgs {
    #[command(flatten)]
    pub trajectory: TrajectoryArgs,

    /// Output file for the labelled frames. Defaults to `molecules.xyz` in the output directory.
    #[arg(long, value_name = "PATH")]
    pub xyz: Option<PathBuf>,
}

/// Arguments for the `unwrap` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct UnwrapArgs {
    #[command(flatten)]
    pub trajectory: TrajectoryArgs,

    /// Unwrapping recurrence: heuristic, displacement or hybrid.
    #[arg(short, long, value_name = "METHOD")]
    pub method: Option<String>,

    /// Molecule kinds to unwrap. Can be used multiple times.
    #[arg(short, long = "species", value_name = "KIND")]
    pub species: Vec<String>,
}

/// Arguments for the `rdf` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct RdfArgs {
    #[command(flatten)]
    pub trajectory: TrajectoryArgs,

    /// Largest distance histogrammed, in Angstrom.
    #[arg(long, value_name = "FLOAT")]
    pub rmax: Option<f64>,

    /// Number of histogram bins.
    #[arg(long, value_name = "INT")]
    pub nbins: Option<usize>,

    /// Frames averaged per window before taking statistics across windows.
    #[arg(short, long, value_name = "INT")]
    pub window: Option<usize>,

    /// Output CSV table. Defaults to `rdf.csv` in the output directory.
    #[arg(long, value_name = "PATH")]
    pub table: Option<PathBuf>,
}

/// Arguments for the `env` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct EnvArgs {
    #[command(flatten)]
    pub trajectory: TrajectoryArgs,

    /// Neighbour cutoff between molecular centres, in Angstrom.
    #[arg(long, value_name = "FLOAT")]
    pub rcut: Option<f64>,

    /// Column order of neighbour kinds. Can be used multiple times.
    #[arg(short, long = "label", value_name = "KIND")]
    pub labels: Vec<String>,

    /// Output CSV table. Defaults to `environments.csv` in the output directory.
    #[arg(long, value_name = "PATH")]
    pub table: Option<PathBuf>,
}

/// Arguments for the `descriptor` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct DescriptorArgs {
    #[command(flatten)]
    pub trajectory: TrajectoryArgs,

    /// Frames per chunk; selects chunked evaluation.
    #[arg(long, value_name = "INT", conflicts_with = "every")]
    pub chunk: Option<usize>,

    /// Stride of frame-by-frame evaluation; selects frame-by-frame mode.
    #[arg(long, value_name = "INT")]
    pub every: Option<usize>,

    /// Number of loaded frames considered in frame-by-frame mode.
    #[arg(long, value_name = "INT", requires = "every")]
    pub n_frames: Option<usize>,

    /// File name prefix in frame-by-frame mode.
    #[arg(long, value_name = "NAME", requires = "every")]
    pub outheader: Option<String>,

    /// Program computing the descriptor, overriding `descriptor.backend.program`.
    #[arg(long, value_name = "PROGRAM")]
    pub program: Option<String>,

    /// Print the descriptor string (and the gap_fit form for SOAP-turbo) without evaluating.
    #[arg(long)]
    pub print_only: bool,
}
