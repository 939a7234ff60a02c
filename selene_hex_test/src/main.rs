//! # Selene Hex-Key Test Binary
//!
//! Runs the hex-key acceptance test over a worklist of X/Z positions and
//! writes the measured rotation range of every position to a results CSV.
//!
//! # Usage
//!
//! ```bash
//! # Full worklist on the simulated rig
//! selene_hex_test --config config/rig.toml --worklist config/worklist.csv -s
//!
//! # Top section only, confirming every position
//! selene_hex_test --worklist positions.csv --top --manual
//!
//! # Verbose JSON logs and a summary for the test report
//! selene_hex_test --worklist positions.csv -v --json --summary summary.json
//! ```

#![deny(warnings)]

use clap::Parser;
use selene_common::config::{ConfigLoader, LogLevel};
use selene_common::consts::DEFAULT_CONFIG_PATH;
use selene_hex_test::{CsvResultsSink, HexTestConfig, StdinGate, open_rig, read_worklist};
use selene_motion::sequencer::{RunSummary, Section, Sequencer};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Selene Hex-Key Test - acceptance run over a worklist of positions
#[derive(Parser, Debug)]
#[command(name = "selene_hex_test")]
#[command(author = "ESS Motion Control")]
#[command(version)]
#[command(about = "Hex-key insertion and rotation range acceptance test")]
#[command(long_about = None)]
struct Args {
    /// Rig configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Worklist CSV (x,z per line, no header)
    #[arg(short, long)]
    worklist: PathBuf,

    /// Results CSV. Defaults to <worklist>_results.csv next to the worklist
    #[arg(short, long)]
    results: Option<PathBuf>,

    /// Run the top section only
    #[arg(long, conflicts_with = "bottom")]
    top: bool,

    /// Run the bottom section only
    #[arg(long)]
    bottom: bool,

    /// Ask the operator before every position
    #[arg(short, long)]
    manual: bool,

    /// Use the simulated rig from the [simulation] table
    #[arg(short = 's', long)]
    simulate: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    /// Write the run summary as JSON to this file
    #[arg(long, value_name = "PATH")]
    summary: Option<PathBuf>,
}

impl Args {
    fn section(&self) -> Section {
        if self.top {
            Section::Top
        } else if self.bottom {
            Section::Bottom
        } else {
            Section::All
        }
    }

    fn results_path(&self) -> PathBuf {
        self.results
            .clone()
            .unwrap_or_else(|| default_results_path(&self.worklist))
    }
}

fn default_results_path(worklist: &Path) -> PathBuf {
    let stem = worklist
        .file_stem()
        .map_or_else(|| "worklist".into(), |s| s.to_string_lossy());
    worklist.with_file_name(format!("{stem}_results.csv"))
}

fn main() {
    let args = Args::parse();
    let config = match HexTestConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            setup_tracing(&args, LogLevel::Info);
            error!("Failed to load {}: {}", args.config.display(), e);
            std::process::exit(2);
        }
    };
    setup_tracing(&args, config.rig.shared.log_level);

    match run(&args, config) {
        Ok(summary) if summary.all_measured() => {}
        Ok(_) => std::process::exit(1),
        Err(e) => {
            error!("Hex-key test failed: {}", e);
            std::process::exit(2);
        }
    }
}

fn run(args: &Args, config: HexTestConfig) -> Result<RunSummary, Box<dyn std::error::Error>> {
    info!(
        service = %config.rig.shared.service_name,
        "Selene hex-key test v{} starting...",
        env!("CARGO_PKG_VERSION")
    );
    config.validate()?;

    let mut table = read_worklist(&args.worklist)?;
    let results = args.results_path();
    info!(results = %results.display(), section = %args.section(), "Results file");

    if args.simulate {
        info!("Simulation mode enabled");
    }
    let rig = open_rig(&config, args.simulate)?;

    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    ctrlc::set_handler(move || {
        warn!("Received stop signal, ending after the current position");
        flag.store(true, Ordering::SeqCst);
    })?;

    let mut sequencer = Sequencer::new(rig, config.rig.sequence)
        .with_section(args.section())
        .with_sink(CsvResultsSink::new(&results))
        .with_stop_flag(stop);
    if args.manual {
        sequencer = sequencer.with_gate(StdinGate::stdio());
    }

    let summary = sequencer.run(&mut table)?;
    if let Some(path) = &args.summary {
        fs::write(path, serde_json::to_string_pretty(&summary)?)?;
        info!(path = %path.display(), "Summary written");
    }
    info!("Selene hex-key test complete: {}", summary);
    Ok(summary)
}

/// Setup tracing subscriber based on CLI arguments and the rig file.
fn setup_tracing(args: &Args, level: LogLevel) {
    let directive = if args.verbose {
        LogLevel::Debug.as_directive()
    } else {
        level.as_directive()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
