//! siren CLI

mod inputs;
mod qscan;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use inputs::{read_json, with_derived_mchirp, LimitsInput, PosteriorInput, VolumeInput};
use serde::Serialize;
use siren_bins::{BinEdges, NdBins};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "siren")]
#[command(about = "siren - gravitational-wave search rate upper limits")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Marginal rate posterior over a rate grid from an experiment list
    Posterior {
        /// Input experiment list (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Upper end of the rate grid
        #[arg(long, default_value = "20.0")]
        mu_max: f64,

        /// Number of grid points (inclusive)
        #[arg(long, default_value = "401")]
        points: usize,

        /// Confidence level for the reported upper limit
        #[arg(long, default_value = "0.9")]
        alpha: f64,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Limits and credible intervals for a sampled posterior
    Limits {
        /// Input posterior samples (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Confidence level
        #[arg(long, default_value = "0.9")]
        alpha: f64,

        /// Coverage tolerance for the HPD threshold search
        #[arg(long, default_value = "0.001")]
        hpd_tolerance: f64,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Sensitive volume per mass bin from found/missed injections
    Volume {
        /// Input injection lists and binning (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Loudest event per instrument combination from a search database
    Loudest {
        /// SQLite database path
        #[arg(short, long)]
        database: PathBuf,

        /// Coincidence table to aggregate
        #[arg(long, default_value = "coinc_inspiral")]
        coinc_table: String,

        /// Experiment-summary datatype to select
        #[arg(long, default_value = "exclude_play")]
        datatype: String,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Distribute qscan results from a remote-cluster archive
    DistributeQscan {
        /// Input .tar.gz archive of qscan results
        #[arg(short, long)]
        input: PathBuf,

        /// Cache manifest for foreground qscan types
        #[arg(long)]
        cache_foreground: PathBuf,

        /// Cache manifest for background qscan types
        #[arg(long)]
        cache_background: PathBuf,

        /// Remote interferometer the qscans were performed for (example: V1)
        #[arg(long)]
        remote_ifo: String,

        /// Comma-separated qscan types to distribute
        #[arg(long)]
        types: String,

        /// Output file for the summary (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Posterior { input, mu_max, points, alpha, output } => {
            cmd_posterior(&input, mu_max, points, alpha, output.as_ref())
        }
        Commands::Limits { input, alpha, hpd_tolerance, output } => {
            cmd_limits(&input, alpha, hpd_tolerance, output.as_ref())
        }
        Commands::Volume { input, output } => cmd_volume(&input, output.as_ref()),
        Commands::Loudest { database, coinc_table, datatype, output } => {
            cmd_loudest(&database, &coinc_table, &datatype, output.as_ref())
        }
        Commands::DistributeQscan {
            input,
            cache_foreground,
            cache_background,
            remote_ifo,
            types,
            output,
        } => cmd_distribute_qscan(
            &input,
            &cache_foreground,
            &cache_background,
            &remote_ifo,
            &types,
            output.as_ref(),
        ),
        Commands::Version => {
            println!("siren {}", siren_core::VERSION);
            Ok(())
        }
    }
}

fn write_output<T: Serialize>(value: &T, output: Option<&PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => std::fs::write(path, json + "\n")?,
        None => println!("{}", json),
    }
    Ok(())
}

#[derive(Serialize)]
struct PosteriorResult {
    alpha: f64,
    calibration_error: f64,
    mu: Vec<f64>,
    posterior: Vec<f64>,
    upper_limit: f64,
}

fn cmd_posterior(
    input: &PathBuf,
    mu_max: f64,
    points: usize,
    alpha: f64,
    output: Option<&PathBuf>,
) -> Result<()> {
    if points < 2 {
        bail!("at least two grid points required, got {}", points);
    }
    if mu_max <= 0.0 {
        bail!("the rate grid must extend above zero, got mu_max = {}", mu_max);
    }
    let spec: PosteriorInput = read_json(input)?;

    let mu: Vec<f64> =
        (0..points).map(|i| mu_max * i as f64 / (points - 1) as f64).collect();
    let mut posterior = Vec::with_capacity(points);
    for &m in &mu {
        posterior.push(siren_rate::marg_likelihood(
            &spec.experiments,
            m,
            spec.calibration_error,
        )?);
    }
    let posterior = siren_rate::normalize_pdf(&mu, &posterior)?;
    let upper_limit = siren_rate::compute_upper_limit(&mu, &posterior, alpha)?;

    write_output(
        &PosteriorResult {
            alpha,
            calibration_error: spec.calibration_error,
            mu,
            posterior,
            upper_limit,
        },
        output,
    )
}

#[derive(Serialize)]
struct LimitsResult {
    alpha: f64,
    lower_limit: f64,
    upper_limit: f64,
    min_width_interval: (f64, f64),
    hpd_interval: (f64, f64),
}

fn cmd_limits(
    input: &PathBuf,
    alpha: f64,
    hpd_tolerance: f64,
    output: Option<&PathBuf>,
) -> Result<()> {
    let spec: LimitsInput = read_json(input)?;

    let lower_limit = siren_rate::compute_lower_limit(&spec.mu, &spec.posterior, alpha)?;
    let upper_limit = siren_rate::compute_upper_limit(&spec.mu, &spec.posterior, alpha)?;
    let min_width_interval =
        siren_rate::confidence_interval_min_width(&spec.mu, &spec.posterior, alpha)?;
    let hpd_interval =
        siren_rate::hpd_credible_interval(&spec.mu, &spec.posterior, alpha, hpd_tolerance)?;

    write_output(
        &LimitsResult { alpha, lower_limit, upper_limit, min_width_interval, hpd_interval },
        output,
    )
}

#[derive(Serialize)]
struct VolumeCell {
    centre: Vec<f64>,
    volume: f64,
    volume_error: f64,
    found: f64,
    missed: f64,
    efficiency: Vec<f64>,
    efficiency_error: Vec<f64>,
}

#[derive(Serialize)]
struct VolumeResult {
    bin_type: siren_rate::BinType,
    distance_bin_centres: Vec<f64>,
    cells: Vec<VolumeCell>,
}

fn cmd_volume(input: &PathBuf, output: Option<&PathBuf>) -> Result<()> {
    let spec: VolumeInput = read_json(input)?;

    let dims = spec
        .mass_bins
        .iter()
        .map(|edges| BinEdges::new(edges.clone()))
        .collect::<siren_core::Result<Vec<_>>>()?;
    let mass_bins = NdBins::from_dims(dims)?;
    let dbins = BinEdges::new(spec.distance_bins.clone())?;

    let found = with_derived_mchirp(&spec.found);
    let missed = with_derived_mchirp(&spec.missed);

    let tables = siren_rate::compute_volume_vs_mass(
        &found,
        &missed,
        &mass_bins,
        spec.bin_type,
        &dbins,
    )?;

    // flatten the grid in the same iteration order the estimator used
    let mut index_tuples: Vec<Vec<usize>> = Vec::new();
    if mass_bins.ndim() == 2 {
        for j in 0..mass_bins.dims()[0].count() {
            for k in 0..mass_bins.dims()[1].count() {
                index_tuples.push(vec![j, k]);
            }
        }
    } else {
        for j in 0..mass_bins.dims()[0].count() {
            index_tuples.push(vec![j]);
        }
    }

    let centres: Vec<Vec<f64>> = mass_bins.dims().iter().map(|d| d.centres()).collect();
    let mut cells = Vec::with_capacity(index_tuples.len());
    for (flat, idx) in index_tuples.iter().enumerate() {
        let centre: Vec<f64> = idx.iter().zip(&centres).map(|(&i, c)| c[i]).collect();
        cells.push(VolumeCell {
            centre,
            volume: tables.volume.get(idx)?,
            volume_error: tables.volume_error.get(idx)?,
            found: tables.found.get(idx)?,
            missed: tables.missed.get(idx)?,
            efficiency: tables.eff_vs_mass[flat].clone(),
            efficiency_error: tables.err_vs_mass[flat].clone(),
        });
    }

    write_output(
        &VolumeResult {
            bin_type: spec.bin_type,
            distance_bin_centres: dbins.centres(),
            cells,
        },
        output,
    )
}

#[derive(Serialize)]
struct LoudestRow {
    instruments: Vec<String>,
    combined_far: f64,
}

fn cmd_loudest(
    database: &PathBuf,
    coinc_table: &str,
    datatype: &str,
    output: Option<&PathBuf>,
) -> Result<()> {
    let conn = rusqlite::Connection::open_with_flags(
        database,
        rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
    )?;
    let events = siren_db::get_loudest_event(&conn, coinc_table, datatype)?;
    let rows: Vec<LoudestRow> = events
        .into_iter()
        .map(|e| LoudestRow {
            instruments: e.instruments.into_iter().collect(),
            combined_far: e.combined_far,
        })
        .collect();
    write_output(&rows, output)
}

#[derive(Serialize)]
struct QscanSummary {
    archive: PathBuf,
    remote_ifo: String,
    types: Vec<String>,
    planned: usize,
    moved: usize,
}

fn cmd_distribute_qscan(
    input: &PathBuf,
    cache_foreground: &PathBuf,
    cache_background: &PathBuf,
    remote_ifo: &str,
    types: &str,
    output: Option<&PathBuf>,
) -> Result<()> {
    if !cache_foreground.is_file() {
        bail!("cache file {} could not be found", cache_foreground.display());
    }
    if !cache_background.is_file() {
        bail!("cache file {} could not be found", cache_background.display());
    }
    if !input.is_file() {
        bail!("archive {} could not be found", input.display());
    }

    let type_list: Vec<String> =
        types.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned).collect();
    if type_list.is_empty() {
        bail!("no qscan types given");
    }

    let plan = qscan::build_plan(&type_list, cache_foreground, cache_background, remote_ifo)?;
    let planned = plan.types.iter().map(|(_, entries)| entries.len()).sum();
    let moved = qscan::distribute(input, &plan, remote_ifo)?;

    write_output(
        &QscanSummary {
            archive: input.clone(),
            remote_ifo: remote_ifo.to_string(),
            types: type_list,
            planned,
            moved,
        },
        output,
    )
}
