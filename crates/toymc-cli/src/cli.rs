use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "ToyMC contributors",
    version,
    about = "ToyMC CLI - Metropolis Monte-Carlo simulations of Lennard-Jones fluids driven by plain-text parameter files.",
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
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a Monte-Carlo simulation described by a parameter file.
    Run(RunArgs),
    /// Parse and validate a parameter file, then print the resolved parameters.
    Check(CheckArgs),
    /// Parse an XYZ geometry file and print a summary of its contents.
    Xyz(XyzArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the simulation parameter file.
    #[arg(required = true, value_name = "PARAMS")]
    pub params: PathBuf,

    // --- Geometry ---
    /// Starting geometry, overriding `coordinates` from the parameter file.
    #[arg(short, long, value_name = "PATH")]
    pub coordinates: Option<PathBuf>,

    /// Ignore any coordinates and start from a cubic lattice of this many atoms.
    #[arg(long, value_name = "INT", conflicts_with = "coordinates")]
    pub lattice: Option<usize>,

    /// Atom label used for lattice starts.
    #[arg(long, value_name = "LABEL", default_value = "He")]
    pub element: String,

    // --- Output ---
    /// Trajectory file, overriding `output` from the parameter file.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Write the final configuration to this XYZ file.
    #[arg(long = "final", value_name = "PATH")]
    pub final_geometry: Option<PathBuf>,

    // --- Parameter Overrides ---
    /// Override the random seed.
    #[arg(short, long, value_name = "INT", allow_negative_numbers = true)]
    pub seed: Option<i64>,

    /// Override the number of Monte-Carlo steps.
    #[arg(short = 'n', long = "steps", value_name = "INT")]
    pub steps: Option<u64>,

    /// Set a parameter value, overriding the parameter file.
    /// Can be used multiple times. Example: -S temperature=0.9
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,

    /// Do not draw a progress bar.
    #[arg(long)]
    pub no_progress: bool,
}

/// Arguments for the `check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to the simulation parameter file.
    #[arg(required = true, value_name = "PARAMS")]
    pub params: PathBuf,

    /// Set a parameter value before validation. Example: -S VdW_cutoff=2.5
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,

    /// Format used to print the resolved parameters.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Params)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// The parameter-file language itself.
    Params,
    /// TOML, for tools that do not read parameter files.
    Toml,
}

/// Arguments for the `xyz` subcommand.
#[derive(Args, Debug)]
pub struct XyzArgs {
    /// Path to the XYZ file.
    #[arg(required = true, value_name = "PATH")]
    pub path: PathBuf,
}
