//! hdrcal - HDR display calibration CLI
//!
//! Measures a display with a colorimeter and synthesizes a correction
//! profile (3x3 matrix + per-channel PQ LUTs) against the BT.2020/PQ
//! reference.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "hdrcal")]
#[command(author, version, about = "HDR display calibration tool")]
#[command(long_about = "
Calibrates an HDR display against the BT.2020/PQ reference using an
external pattern generator and colorimeter reader.

Examples:
  hdrcal calibrate --simulate                 # dry run on the built-in panel model
  hdrcal calibrate --display-id DISPLAY1 --pq-points 256
  hdrcal calibrate --color-space srgb-p3 --bright
  hdrcal verify --simulate                    # response + accuracy sweep
  hdrcal profile show panel-profile.yaml
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full calibration (gamut, PQ curve, chromaticity matrix)
    #[command(visible_alias = "cal")]
    Calibrate(CalibrateArgs),

    /// Measure the calibrated response and report ΔE_ITP statistics
    Verify(VerifyArgs),

    /// Inspect or create correction-profile records
    Profile(ProfileArgs),
}

#[derive(Args)]
struct InstrumentArgs {
    /// Pattern-generator executable
    #[arg(long, default_value = "dogegen")]
    pattern_cmd: String,

    /// Meter-reader executable
    #[arg(long, default_value = "spotread")]
    meter_cmd: String,

    /// Extra arguments for the meter reader
    #[arg(long)]
    meter_args: Vec<String>,

    /// Use the built-in simulated panel instead of real instruments
    #[arg(long)]
    simulate: bool,
}

#[derive(Args)]
struct CalibrateArgs {
    #[command(flatten)]
    instrument: InstrumentArgs,

    /// Working profile record path
    #[arg(short, long, default_value = "panel-profile.yaml")]
    profile: PathBuf,

    /// Display identity key (as reported by the platform layer)
    #[arg(long, default_value = "DISPLAY1")]
    display_id: String,

    /// Gray-ramp sample count for the PQ curve (2-1024)
    #[arg(long, default_value = "128")]
    pq_points: usize,

    /// Target color space: srgb, srgb-p3
    #[arg(long, default_value = "srgb")]
    color_space: String,

    /// Lift the target curve by a fixed PQ offset
    #[arg(long)]
    bright: bool,

    /// Skip the interactive placement confirmation
    #[arg(short = 'y', long)]
    yes: bool,
}

#[derive(Args)]
struct VerifyArgs {
    #[command(flatten)]
    instrument: InstrumentArgs,

    /// Apply this profile to the simulated panel before measuring
    #[arg(short, long)]
    profile: Option<PathBuf>,

    /// Skip the interactive placement confirmation
    #[arg(short = 'y', long)]
    yes: bool,
}

#[derive(Args)]
struct ProfileArgs {
    #[command(subcommand)]
    action: ProfileAction,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Print a profile record summary
    Show {
        /// Profile record path
        path: PathBuf,
    },
    /// Create a fresh identity profile record
    Init {
        /// Profile record path
        path: PathBuf,

        /// Entries per LUT channel
        #[arg(long, default_value = "4096")]
        entries: usize,
    },
}

fn init_logging(verbose: bool, log_file: Option<&PathBuf>) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    match log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let name = path.file_name().context("log file needs a file name")?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            Ok(None)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.verbose, cli.log_file.as_ref())?;

    match cli.command {
        Commands::Calibrate(args) => commands::calibrate::run(args),
        Commands::Verify(args) => commands::verify::run(args),
        Commands::Profile(args) => commands::profile::run(args),
    }
}
