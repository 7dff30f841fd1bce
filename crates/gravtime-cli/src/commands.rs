//! Command definitions

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use bigdecimal::BigDecimal;
use clap::{Args, Parser, Subcommand};

use gravtime_analysis::{analyze, analyze_file, auto_scale, project, Statistics};
use gravtime_core::{GravtimeError, GravtimeResult, RunDiagnostics, SimulationConfig};
use gravtime_runtime::{CancelToken, RunOutcome, SimulatedDevice, SimulationDriver, TimedChannel};
use gravtime_series::read_series;

use crate::render::render_bars;

#[derive(Parser, Debug)]
#[command(name = "gravtime")]
#[command(version, about = "Gravitational time-dilation series: simulate, analyze, graph")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Simulate an altitude sweep and persist it as CSV
    Run(RunArgs),
    /// Print max and mean of a persisted series
    Analyze(AnalyzeArgs),
    /// Draw a persisted series as horizontal bars
    Graph(GraphArgs),
}

/// Where device requests go
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceSpec {
    None,
    Simulated,
    Tcp(String),
}

/// `none`, `sim` or `tcp:<host>:<port>`
pub fn parse_device(text: &str) -> Result<DeviceSpec, String> {
    match text {
        "none" => Ok(DeviceSpec::None),
        "sim" | "simulated" => Ok(DeviceSpec::Simulated),
        _ => match text.strip_prefix("tcp:") {
            Some(addr) if !addr.is_empty() => Ok(DeviceSpec::Tcp(addr.to_string())),
            _ => Err(format!("expected none, sim or tcp:<host>:<port>, got {:?}", text)),
        },
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// JSON configuration file; flags below override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Altitude step in meters
    #[arg(long, allow_hyphen_values = true)]
    pub step: Option<i64>,

    /// Highest altitude in meters, inclusive
    #[arg(long, allow_hyphen_values = true)]
    pub max_altitude: Option<i64>,

    /// Directory the series file is created in
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Device channel: none, sim or tcp:<host>:<port>
    #[arg(long, default_value = "sim", value_parser = parse_device)]
    pub device: DeviceSpec,

    /// Extra latency jitter of the simulated device
    #[arg(long, default_value_t = 0)]
    pub device_jitter_ms: u64,

    /// Seed for the simulated device
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Sync each row to disk
    #[arg(long)]
    pub durable: bool,
}

impl RunArgs {
    /// Configuration file (or defaults) with flag overrides applied
    pub fn load_config(&self) -> GravtimeResult<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_json_file(path)?,
            None => SimulationConfig::default(),
        };
        if let Some(step) = self.step {
            config.step = step;
        }
        if let Some(max_altitude) = self.max_altitude {
            config.max_altitude = max_altitude;
        }
        if self.durable {
            config.durable = true;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Series CSV file
    pub file: PathBuf,

    /// Print the statistics as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Series CSV file
    pub file: PathBuf,

    /// Difference (ns) that fills a whole bar; defaults to the series maximum
    #[arg(long, value_parser = parse_decimal)]
    pub scale_max: Option<BigDecimal>,

    /// Bar width in characters
    #[arg(long, default_value_t = 50)]
    pub width: usize,
}

fn parse_decimal(text: &str) -> Result<BigDecimal, String> {
    BigDecimal::from_str(text.trim()).map_err(|e| format!("{:?} is not a decimal: {}", text, e))
}

/// What a `run` produced
#[derive(Debug)]
pub struct RunSummary {
    pub path: PathBuf,
    pub rows: usize,
    pub outcome: RunOutcome,
    pub diagnostics: RunDiagnostics,
    pub statistics: Statistics,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "series:      {}", self.path.display())?;
        writeln!(f, "rows:        {}", self.rows)?;
        if let RunOutcome::Cancelled { completed_rows } = self.outcome {
            writeln!(f, "cancelled:   after {} rows", completed_rows)?;
        }
        writeln!(f, "max (ns):    {}", self.statistics.max_text())?;
        writeln!(f, "mean (ns):   {}", self.statistics.mean_text())?;
        write!(
            f,
            "fallbacks:   {}  clamped: {}  timeouts: {}  device errors: {}",
            self.diagnostics.evaluation_fallbacks,
            self.diagnostics.clamped_differences,
            self.diagnostics.channel_timeouts,
            self.diagnostics.channel_failures
        )
    }
}

/// Execute `run`; Ctrl-C stops the sweep after the row in progress
pub fn run(args: &RunArgs) -> GravtimeResult<RunSummary> {
    let cancel = CancelToken::new();
    let watcher = watch_interrupt(cancel.clone())?;
    let result = run_with_cancel(args, cancel);
    watcher.shutdown_background();
    result
}

/// Background runtime that cancels `cancel` on Ctrl-C
fn watch_interrupt(cancel: CancelToken) -> GravtimeResult<tokio::runtime::Runtime> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("gravtime-signal")
        .enable_all()
        .build()
        .map_err(|e| GravtimeError::Runtime(format!("cannot watch for Ctrl-C: {}", e)))?;

    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, stopping after the current row");
            cancel.cancel();
        }
    });
    Ok(runtime)
}

/// Execute `run`, stopping at the next checkpoint once `cancel` fires
pub fn run_with_cancel(args: &RunArgs, cancel: CancelToken) -> GravtimeResult<RunSummary> {
    let config = args.load_config()?;
    let timeout = config.channel_timeout();
    let mut driver = SimulationDriver::new(config)?.with_cancel_token(cancel);

    match &args.device {
        DeviceSpec::None => {}
        DeviceSpec::Simulated => {
            let device = SimulatedDevice::new(args.seed)
                .with_latency(Duration::ZERO, Duration::from_millis(args.device_jitter_ms));
            driver = driver.with_channel(TimedChannel::new(device, timeout)?);
        }
        DeviceSpec::Tcp(addr) => {
            driver = driver.with_channel(TimedChannel::connect(addr, timeout)?);
        }
    }

    let (report, path) = driver.run_to_dir(&args.out_dir)?;
    Ok(RunSummary {
        path,
        rows: report.series.len(),
        outcome: report.outcome,
        statistics: analyze(&report.series),
        diagnostics: report.diagnostics,
    })
}

/// Execute `analyze`, returning the text to print
pub fn analyze_command(args: &AnalyzeArgs) -> GravtimeResult<String> {
    let stats = analyze_file(&args.file)?;
    if args.json {
        return serde_json::to_string_pretty(&stats)
            .map_err(|e| GravtimeError::Input(format!("cannot encode statistics: {}", e)));
    }
    Ok(format!(
        "records:   {}\nmax (ns):  {}\nmean (ns): {}",
        stats.count,
        stats.max_text(),
        stats.mean_text()
    ))
}

/// Execute `graph`, returning the rendered bars
pub fn graph_command(args: &GraphArgs) -> GravtimeResult<String> {
    let series = read_series(&args.file)?;
    let scale_max = match &args.scale_max {
        Some(scale) => scale.clone(),
        None => auto_scale(&series),
    };
    let bars = project(&series, &scale_max, args.width)?;
    Ok(render_bars(&bars, args.width))
}
