//! nxcfgd - Declarative Configuration Reconciliation Daemon
//!
//! Entry point for the nxcfgd binary.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use nxcfg_engine::MemoryDriver;
use nxcfg_kinds::default_registry;
use nxcfgd::manifest::{DeviceState, Manifest};
use nxcfgd::{apply_manifest, render_result, render_schema, seed_device};

/// Declarative configuration reconciliation for network devices
#[derive(Parser, Debug)]
#[command(name = "nxcfgd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a desired-state manifest against a simulated device
    Apply {
        /// Path to the manifest JSON file
        #[arg(short, long)]
        manifest: PathBuf,

        /// Path to a device-state JSON file to seed before applying
        #[arg(short, long)]
        device_state: Option<PathBuf>,

        /// Batches up to this size use targeted per-identity fetches
        /// instead of a bulk scan
        #[arg(short, long, default_value = "8")]
        threshold: usize,
    },
    /// Print the schema of a resource kind
    Describe {
        /// Kind name (e.g. bgp_neighbor, trunk_port)
        kind: String,
    },
}

/// Initializes tracing/logging subsystem
fn init_logging(level: &str) {
    let level = level.parse().unwrap_or(tracing::Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

async fn run(command: Command) -> Result<bool> {
    let registry = default_registry().context("building schema registry")?;

    match command {
        Command::Apply {
            manifest,
            device_state,
            threshold,
        } => {
            let raw = std::fs::read_to_string(&manifest)
                .with_context(|| format!("reading manifest {}", manifest.display()))?;
            let manifest: Manifest = serde_json::from_str(&raw).context("parsing manifest")?;

            let driver = MemoryDriver::new();
            if let Some(path) = device_state {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading device state {}", path.display()))?;
                let state: DeviceState =
                    serde_json::from_str(&raw).context("parsing device state")?;
                seed_device(&driver, &state).await?;
            }

            let results = apply_manifest(&driver, &registry, &manifest, threshold).await?;
            let mut all_converged = true;
            for (kind, result) in &results {
                all_converged &= result.converged();
                println!("{}", render_result(kind, result));
            }
            info!(
                resources = results.len(),
                converged = all_converged,
                "apply complete"
            );
            Ok(all_converged)
        }
        Command::Describe { kind } => {
            let rendered = render_schema(&registry, &kind)?;
            println!("{}", serde_json::to_string_pretty(&rendered)?);
            Ok(true)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!("--- Starting nxcfgd ---");

    match run(args.command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            eprintln!("one or more resources failed to converge");
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("nxcfgd: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
