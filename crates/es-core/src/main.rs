//! Enviro Station CLI.
//!
//! - `collect`   run the sampling loop and write aligned windows
//! - `aggregate` build the daily archive for one station-day
//! - `check`     resolve and validate the configuration

use std::path::PathBuf;
use std::process;

use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use es_common::{Error, StationId};
use es_config::{resolve_config, AggregationMode, ResolvedConfig};
use es_core::logging::{init_logging, LogFormat};
use es_core::sensors::{CapabilitySet, SimulatedPort, ThermalZone};
use es_core::{shutdown, Collector, CompensationFilter, ExitCode, Sampler, SystemClock};
use es_telemetry::{
    AggregateError, AggregationOutcome, DailyAggregator, PartitionedWriter, WriterConfig,
};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "es-core", version, about = "Enviro Station collector and archiver")]
struct Cli {
    /// Station config file (default: user config dir, then built-in defaults)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sample sensors and write aligned batch windows until stopped
    Collect(CollectArgs),
    /// Aggregate one station-day into the archive
    Aggregate(AggregateArgs),
    /// Resolve and validate the configuration, then print it
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct CollectArgs {
    /// Override the output root
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Stop after this many ticks
    #[arg(long, value_name = "N")]
    max_ticks: Option<u64>,
}

#[derive(Args, Debug)]
struct AggregateArgs {
    /// Day to aggregate, YYYY-MM-DD (default: yesterday, UTC)
    #[arg(long, value_name = "DATE")]
    date: Option<NaiveDate>,

    /// Override the configured aggregation mode
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Override the configured station id
    #[arg(long, value_name = "ID")]
    station: Option<String>,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Print the effective configuration as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Copy,
    #[value(name = "minute_average", alias = "minute-average")]
    MinuteAverage,
}

impl From<ModeArg> for AggregationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Copy => AggregationMode::Copy,
            ModeArg::MinuteAverage => AggregationMode::MinuteAverage,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.log_format, cli.verbose) {
        eprintln!("es-core: logging setup failed: {e}");
        process::exit(ExitCode::InternalError.as_i32());
    }

    let result = resolve_config(cli.config.as_deref())
        .map_err(|e| Error::Config(e.to_string()))
        .and_then(|resolved| match &cli.command {
            Command::Collect(args) => run_collect(&resolved, args),
            Command::Aggregate(args) => run_aggregate(&resolved, args),
            Command::Check(args) => run_check(&resolved, args),
        });

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            error!(code = e.code(), error = %e, "es-core failed");
            ExitCode::from(&e)
        }
    };
    process::exit(code.as_i32());
}

fn run_collect(resolved: &ResolvedConfig, args: &CollectArgs) -> Result<ExitCode, Error> {
    let config = &resolved.config;
    let station = config.station()?;
    shutdown::install_handlers()
        .map_err(|e| Error::Collection(format!("cannot install signal handlers: {e}")))?;

    let sensors = &config.sensors;
    let mut port = SimulatedPort::new(sensors.seed)
        .with_particulate_timeout_rate(sensors.particulate_timeout_rate);
    if let Some(path) = &sensors.proxy_source {
        port = port.with_proxy(ThermalZone::new(path));
    }
    let capabilities = CapabilitySet::resolve(sensors, &mut port);
    if capabilities.enabled().next().is_none() {
        warn!("no capability enabled, readings will carry location only");
    }

    let sampler = Sampler::new(
        port,
        capabilities,
        CompensationFilter::from_config(&config.compensation),
        config.latitude,
        config.longitude,
    );
    let output_dir = args.output_dir.clone().unwrap_or_else(|| config.output_dir.clone());
    let writer = PartitionedWriter::new(WriterConfig::from_settings(
        output_dir,
        &config.writer,
        config.sampling.batch_duration_secs,
    ));

    let mut collector = Collector::new(
        sampler,
        writer,
        SystemClock,
        station,
        config.sampling.read_interval(),
        config.sampling.batch_duration(),
        config.sampling.alignment(),
    )
    .map_err(|e| Error::Config(e.to_string()))?;

    let stats = collector.run(shutdown::stop_flag(), args.max_ticks);
    Ok(if stats.write_failures > 0 {
        ExitCode::WriteFailures
    } else {
        ExitCode::Clean
    })
}

fn run_aggregate(resolved: &ResolvedConfig, args: &AggregateArgs) -> Result<ExitCode, Error> {
    let config = &resolved.config;
    let station = StationId::parse(args.station.as_deref().unwrap_or(&config.station_id))?;
    let date = match args.date {
        Some(d) => d,
        None => Utc::now()
            .date_naive()
            .pred_opt()
            .ok_or_else(|| Error::Config("no previous day to aggregate".to_string()))?,
    };

    let mut aggregator = DailyAggregator::from_config(&config.archive);
    if let Some(mode) = args.mode {
        aggregator = aggregator.with_mode(mode.into());
    }

    match aggregator.run(&station, date).map_err(aggregate_error)? {
        AggregationOutcome::NoData { input_dir } => {
            println!("no data for station {station} on {date} in {}", input_dir.display());
            Ok(ExitCode::NoData)
        }
        AggregationOutcome::Completed(report) => {
            println!(
                "{} {} rows from {} files into {}",
                report.mode,
                report.output_rows,
                report.input_files,
                report.output.display()
            );
            Ok(if report.reconciled {
                ExitCode::Clean
            } else {
                ExitCode::Unreconciled
            })
        }
    }
}

fn aggregate_error(err: AggregateError) -> Error {
    match err {
        AggregateError::RowCountMismatch {
            expected, actual, ..
        } => Error::RowCountMismatch { expected, actual },
        other => Error::Storage(other.to_string()),
    }
}

fn run_check(resolved: &ResolvedConfig, args: &CheckArgs) -> Result<ExitCode, Error> {
    let config = &resolved.config;
    if args.json {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(ExitCode::Clean);
    }

    let sampling = &config.sampling;
    println!("source:      {}", resolved.source);
    println!("station:     {}", config.station_id);
    println!("location:    {}, {}", config.latitude, config.longitude);
    println!("output:      {}", config.output_dir.display());
    println!(
        "windows:     {}s aligned to {}s, read every {}ms",
        sampling.batch_duration_secs, sampling.alignment_secs, sampling.read_interval_ms
    );
    println!(
        "files:       {:?} ({:?})",
        config.writer.filename_scheme.resolve(sampling.batch_duration_secs),
        config.writer.compression
    );
    println!(
        "archive:     {} mode into {}",
        config.archive.mode,
        config.archive.bucket_root().join(&config.archive.archive_prefix).display()
    );
    info!("configuration ok");
    Ok(ExitCode::Clean)
}
