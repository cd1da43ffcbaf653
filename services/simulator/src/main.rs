//! Pairswap Scenario Simulator
//!
//! Replays a scenario file against a fresh in-memory engine and prints the
//! resulting pools and balances as JSON.
//!
//! Architecture:
//! scenario.toml → Simulator → Router → PairFactory/Pair → JSON report

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pairswap_config::{load_config, LogFormat, ServiceConfig};
use pairswap_sim::{Scenario, Simulator};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "pairswap-sim")]
#[command(about = "Replay constant-product AMM scenarios against an in-memory engine")]
struct Args {
    /// Configuration file path; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute every step of a scenario and emit the final report
    Run {
        scenario: PathBuf,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Quote a path after running a scenario's steps
    Quote {
        scenario: PathBuf,

        /// Token symbols, comma separated
        #[arg(short, long, value_delimiter = ',', required = true)]
        path: Vec<String>,

        /// Whole-token amount of the first (or, with --exact-out, last) token
        #[arg(short, long)]
        amount: String,

        #[arg(long)]
        exact_out: bool,
    },
    /// Print the effective configuration
    Config,
}

fn init_tracing(config: &ServiceConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.global.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match config.global.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

fn write_output(body: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, body).with_context(|| format!("Failed to write {:?}", path))?;
            info!("💾 Report written to {:?}", path);
        }
        None => println!("{}", body),
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config);

    match args.command {
        Command::Run { scenario, output } => {
            info!("🚀 Running scenario {:?}", scenario);
            let scenario = Scenario::from_file(&scenario)?;
            let mut simulator = Simulator::new(&config);
            let report = simulator.run(&scenario)?;
            let output = output.or_else(|| config.simulator.output.clone());
            write_output(&report.to_json()?, output.as_deref())?;
        }
        Command::Quote {
            scenario,
            path,
            amount,
            exact_out,
        } => {
            let scenario = Scenario::from_file(&scenario)?;
            let mut simulator = Simulator::new(&config);
            simulator.run(&scenario)?;
            let amounts = simulator.quote(&path, &amount, exact_out)?;
            let rendered = path
                .iter()
                .zip(&amounts)
                .map(|(symbol, amount)| format!("{} {}", amount, symbol))
                .collect::<Vec<_>>()
                .join(" → ");
            info!("📊 Quote: {}", rendered);
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                "path": path,
                "amounts": amounts,
                "exact_out": exact_out,
            }))?);
        }
        Command::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
