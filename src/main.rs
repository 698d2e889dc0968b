use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colorimetry::colorimetry::colorimeter::StandardIlluminant;
use colorimetry::{AnalysisConfig, Analyzer, ReferenceTables, Spectrum};
use serde::Serialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "colorimetry")]
#[command(version, about = "Spectral colorimetry and Wien-law pyrometry", long_about = None)]
struct Cli {
    /// Also write logs to this file
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// XYZ, chromaticity, CCT, CRI and flicker index of a spectrum
    Analyze {
        /// Spectrum JSON file
        #[arg(value_name = "SPECTRUM")]
        spectrum: PathBuf,

        /// Analysis settings (TOML)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Directory with cmf.csv, scotopic.csv, reflectances.csv
        #[arg(long, value_name = "DIR")]
        tables: Option<PathBuf>,
    },

    /// Blackbody temperature of every frame, calibrated on a known source
    Pyrometer {
        /// Calibration spectrum JSON (blackbody at the configured temperature)
        #[arg(value_name = "CALIBRATION")]
        calibration: PathBuf,

        /// Measurement spectrum JSON
        #[arg(value_name = "MEASUREMENT")]
        measurement: PathBuf,

        /// Settings with a [pyrometer] section (TOML)
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
    },

    /// Color of a sample relative to a reference spectrum
    Colorimeter {
        /// Reference spectrum JSON (white standard or blank)
        #[arg(value_name = "REFERENCE")]
        reference: PathBuf,

        /// Sample spectrum JSON
        #[arg(value_name = "SAMPLE")]
        sample: PathBuf,

        /// Analysis settings (TOML)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Standard illuminant, overrides the config
        #[arg(long, value_enum)]
        illuminant: Option<IlluminantArg>,

        /// Directory with cmf.csv, scotopic.csv, reflectances.csv
        #[arg(long, value_name = "DIR")]
        tables: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum IlluminantArg {
    E,
    D65,
}

impl From<IlluminantArg> for StandardIlluminant {
    fn from(arg: IlluminantArg) -> Self {
        match arg {
            IlluminantArg::E => StandardIlluminant::E,
            IlluminantArg::D65 => StandardIlluminant::D65,
        }
    }
}

fn init_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = fmt::layer().with_writer(std::io::stderr);

    let Some(path) = log_file else {
        tracing_subscriber::registry().with(filter).with(stderr).init();
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let name = path
        .file_name()
        .with_context(|| format!("log file {} has no file name", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    Ok(Some(guard))
}

fn read_spectrum(path: &Path) -> Result<Spectrum> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid spectrum in {}", path.display()))
}

fn read_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => AnalysisConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(AnalysisConfig::default()),
    }
}

fn load_tables(dir: Option<&Path>) -> Result<ReferenceTables> {
    match dir {
        Some(dir) => ReferenceTables::load_dir(dir)
            .with_context(|| format!("failed to load reference tables from {}", dir.display())),
        None => Ok(ReferenceTables::builtin()),
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.log_file.as_deref())?;

    match cli.command {
        Commands::Analyze {
            spectrum,
            config,
            tables,
        } => {
            let analyzer = Analyzer::new(
                load_tables(tables.as_deref())?,
                read_config(config.as_deref())?,
            )?;
            let spectrum = read_spectrum(&spectrum)?;
            let result = analyzer
                .run(&spectrum)
                .context("colorimetric analysis failed")?;
            print_json(&result)
        }
        Commands::Pyrometer {
            calibration,
            measurement,
            config,
        } => {
            let analyzer = Analyzer::builtin(read_config(Some(&config))?)?;
            let calibration = read_spectrum(&calibration)?;
            let measurement = read_spectrum(&measurement)?;
            let result = analyzer
                .pyrometer(&calibration, &measurement)
                .context("pyrometer fit failed")?;
            let last = result.last();
            tracing::info!(
                temperature_k = last.temperature_k,
                error_k = last.error_k,
                confidence = result.confidence,
                "pyrometer"
            );
            print_json(&result)
        }
        Commands::Colorimeter {
            reference,
            sample,
            config,
            illuminant,
            tables,
        } => {
            let mut config = read_config(config.as_deref())?;
            if let Some(illuminant) = illuminant {
                config.colorimeter.illuminant = illuminant.into();
            }
            let analyzer = Analyzer::new(load_tables(tables.as_deref())?, config)?;
            let reference = read_spectrum(&reference)?;
            let sample = read_spectrum(&sample)?;
            let reading = analyzer
                .colorimeter(&reference, &sample)
                .context("colorimeter failed")?;
            print_json(&reading)
        }
    }
}
