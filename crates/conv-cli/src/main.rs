//! conv: 1D linear convolution from the command line.
//!
//! Thin front end over `lib-conv`: sequences come from files or inline
//! lists, shapes and methods are given as strings.

mod config;
mod input;
mod orchestrator;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lib_conv::{Method, Shape};
use orchestrator::ConvolutionResult;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "conv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Convolve two sequences
    Run {
        /// First operand: a file path or an inline list such as "1,2,3"
        #[arg(short, long, allow_hyphen_values = true)]
        a: String,

        /// Second operand: a file path or an inline list
        #[arg(short, long, allow_hyphen_values = true)]
        b: String,

        /// Output shape: full, same or valid
        #[arg(short, long, default_value = "full")]
        shape: String,

        /// Algorithm: auto, direct, fft or overlap-save
        #[arg(short, long, default_value = "auto")]
        method: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the jobs listed in a TOML or JSON job file
    Job {
        /// Path to the job file
        config: PathBuf,
    },

    /// Compare the FFT-based methods against the direct sum
    Check {
        /// First operand: a file path or an inline list
        #[arg(short, long, allow_hyphen_values = true)]
        a: String,

        /// Second operand: a file path or an inline list
        #[arg(short, long, allow_hyphen_values = true)]
        b: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    dispatch(cli.command, cli.format, &mut std::io::stdout().lock())
}

/// Run one subcommand, writing anything bound for stdout to `out`.
fn dispatch<W: Write>(command: Commands, format: OutputFormat, out: &mut W) -> Result<()> {
    match command {
        Commands::Run { a, b, shape, method, output } => {
            run_once(out, &a, &b, &shape, &method, output, format)
        }
        Commands::Job { config } => run_jobs(out, &config, format),
        Commands::Check { a, b } => check(out, &a, &b, format),
    }
}

fn run_once<W: Write>(
    out: &mut W,
    a: &str,
    b: &str,
    shape: &str,
    method: &str,
    output_path: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    // Validate the strings before touching any input.
    let shape: Shape = shape.parse()?;
    let method: Method = method.parse()?;

    let a = input::load_sequence(a).context("Failed to load operand a")?;
    let b = input::load_sequence(b).context("Failed to load operand b")?;

    let mut result = ConvolutionResult::compute("run", &a, &b, shape, method)?;
    result.output = output_path;

    output::write_results(out, std::slice::from_ref(&result), format)
}

fn run_jobs<W: Write>(out: &mut W, config_path: &Path, format: OutputFormat) -> Result<()> {
    tracing::info!("Loading jobs from {:?}", config_path);

    let config = config::load_config(config_path)?;
    let orchestrator = orchestrator::Orchestrator::new(config);
    let results = orchestrator.run()?;

    output::write_results(out, &results, format)
}

fn check<W: Write>(out: &mut W, a: &str, b: &str, format: OutputFormat) -> Result<()> {
    let a = input::load_sequence(a).context("Failed to load operand a")?;
    let b = input::load_sequence(b).context("Failed to load operand b")?;

    let report = orchestrator::check_methods(&a, &b)?;
    output::write_check(out, &report, format)
}
