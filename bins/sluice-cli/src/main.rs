//! sluice: inspect a ledger configuration and replay operation scripts.

mod config;
mod script;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use sluice_core::types::{Height, format_units};
use sluice_ledger::LedgerConfig;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sluice", version, about = "Staking reward and vesting ledger tools")]
struct Cli {
    /// Config file (TOML or JSON); defaults to the platform config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the halving stages, or the reward emitted over a block range
    Schedule {
        #[arg(long)]
        from: Option<Height>,
        #[arg(long)]
        to: Option<Height>,
    },
    /// Print the withdrawal fee tiers, or the tier for one holding duration
    Fees {
        #[arg(long)]
        elapsed: Option<u64>,
    },
    /// Replay a JSON operation script and print the resulting ledger
    Simulate { script: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    let config = config::load(cli.config.as_deref())?;
    match cli.command {
        Command::Schedule { from, to } => schedule(&config, from, to),
        Command::Fees { elapsed } => fees(&config, elapsed),
        Command::Simulate { script } => simulate(&config, &script),
    }
}

fn schedule(config: &LedgerConfig, from: Option<Height>, to: Option<Height>) -> Result<()> {
    let schedule = config.schedule()?;
    match (from, to) {
        (Some(from), Some(to)) => {
            if from > to {
                bail!("--from {from} is above --to {to}");
            }
            let reward = schedule.total_reward(from, to)?;
            println!("{} tokens over blocks {from}..{to}", format_units(reward));
        }
        (None, None) => {
            println!("{:>6} {:>12} {:>12} {:>24}", "stage", "ends_at", "multiplier", "reward_per_block");
            let per_block = schedule.base_reward_per_block();
            for (stage, &multiplier) in schedule.multipliers().iter().enumerate() {
                let ends_at = schedule.threshold(stage).unwrap_or(Height::MAX);
                let reward = per_block.saturating_mul(u128::from(multiplier));
                println!("{stage:>6} {ends_at:>12} {multiplier:>12} {:>24}", format_units(reward));
            }
            println!("final reward height: {}", schedule.final_reward_height());
        }
        _ => bail!("--from and --to must be given together"),
    }
    Ok(())
}

fn fees(config: &LedgerConfig, elapsed: Option<u64>) -> Result<()> {
    let table = config.fee_table()?;
    let tiers = match elapsed {
        Some(elapsed) => vec![table.fee_for(elapsed)?],
        None => table.tiers().to_vec(),
    };
    println!("{:>10} {:>10} {:>8} {:>8}", "min", "max", "account", "redist");
    for tier in tiers {
        let max = tier.max_elapsed.map_or_else(|| "-".to_string(), |m| m.to_string());
        println!(
            "{:>10} {max:>10} {:>7.2}% {:>7.2}%",
            tier.min_elapsed,
            f64::from(tier.account_fee_bps) / 100.0,
            f64::from(tier.redistribution_fee_bps) / 100.0,
        );
    }
    Ok(())
}

fn simulate(config: &LedgerConfig, path: &std::path::Path) -> Result<()> {
    let body = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let script: script::Script =
        serde_json::from_str(&body).with_context(|| format!("failed to parse {}", path.display()))?;
    info!(steps = script.steps.len(), "simulate: replaying {}", path.display());
    let report = script::run(config, &script)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Initialize tracing on stderr, leaving stdout for command output.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .init();
    }
}
