//! defi-db - DeFi vault & asset database feeds
//!
//! Run with: cargo run -- <feed>
//!
//! Feeds:
//! - gauge-apy: reward APR range of every live gauge
//! - vaults / vault-tokens / price-per-share: vault registry snapshots
//! - strategies: descriptions of the strategies vaults use
//! - assets: token lists merged into the asset database

use clap::Parser;
use color_eyre::eyre::Result;
use console::style;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod dataset;
mod feeds;
mod gauges;
mod networks;
mod onchain;
mod prices;
#[cfg(test)]
mod testing;
mod vault;

use config::Config;
use dataset::Dataset;
use feeds::{run_feed, Feed, FeedContext};
use onchain::ChainClients;
use prices::PriceOracle;

/// Refresh the DeFi vault & asset database
#[derive(Parser)]
#[command(name = "defi-db")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Feed to run
    #[arg(value_enum, default_value_t = Feed::GaugeApy)]
    feed: Feed,

    /// TOML config file (defaults to environment / .env)
    #[arg(short, long, env = "DEFI_DB_CONFIG")]
    config: Option<PathBuf>,

    /// Write the resolved configuration to this file and exit
    #[arg(long)]
    write_config: Option<PathBuf>,
}

fn print_banner(feed: Feed) {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!("{}", style(" 📚 DEFI-DB - Vault & Asset Database").cyan().bold());
    println!("{}", style(format!("    Feed: {}", feed)).cyan());
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("defi_db=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    if let Some(path) = &cli.write_config {
        config.save_to_file(path)?;
        info!("Configuration written to {}", path.display());
        return Ok(());
    }

    print_banner(cli.feed);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        error!("Please check your .env file or --config");
        return Err(e);
    }

    config.print_summary();
    println!();

    let start = Instant::now();
    let clients = ChainClients::from_config(&config);
    let oracle = PriceOracle::new(&config)?;
    let dataset = Dataset::new(&config.data_dir);

    let ctx = FeedContext {
        config: &config,
        clients: &clients,
        oracle: &oracle,
        dataset: &dataset,
    };
    run_feed(cli.feed, &ctx).await?;

    // =============================================
    // SUMMARY
    // =============================================
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").green()
    );
    println!("{}", style(format!(" ✅ {} COMPLETE", cli.feed).to_uppercase()).green().bold());
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").green()
    );
    println!();
    println!("Summary:");
    println!("  • Data directory: {}", config.data_dir.display());
    println!("  • Chains: {:?}", config.feed_chains);
    println!("  • Elapsed: {:.1}s", start.elapsed().as_secs_f64());
    println!();

    Ok(())
}
