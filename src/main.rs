use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use carteira::config::ResolvedConfig;
use carteira::market_data::{
    MarketPriceSource, QuoteSource, RateService, TesouroBondSource, YahooChartSource,
};
use carteira::portfolio::Portfolio;
use carteira::snapshot::SnapshotAssembler;
use carteira::valuation::ValuationResolver;

#[derive(Parser)]
#[command(name = "carteira")]
#[command(about = "Multi-asset portfolio valuation snapshots")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "carteira.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch current prices and write a valuation snapshot
    Snapshot {
        /// Portfolio definition file (overrides config)
        #[arg(long)]
        portfolio: Option<PathBuf>,

        /// Snapshot output file (overrides config)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ResolvedConfig::load_or_default(&cli.config)?;

    match cli.command {
        Some(Command::Config) => {
            println!("Config file: {}", cli.config.display());
            println!("Portfolio:   {}", config.portfolio_path.display());
            println!("Output:      {}", config.output_path.display());
            if let Some(url) = &config.sources.quote_base_url {
                println!("Quotes:      {url}");
            }
            if let Some(url) = &config.sources.bonds_base_url {
                println!("Bonds:       {url}");
            }
            Ok(())
        }
        Some(Command::Snapshot { portfolio, output }) => {
            run_snapshot(&config, portfolio, output).await
        }
        None => run_snapshot(&config, None, None).await,
    }
}

async fn run_snapshot(
    config: &ResolvedConfig,
    portfolio_override: Option<PathBuf>,
    output_override: Option<PathBuf>,
) -> Result<()> {
    let portfolio_path = portfolio_override.unwrap_or_else(|| config.portfolio_path.clone());
    let output_path = output_override.unwrap_or_else(|| config.output_path.clone());

    let portfolio = Portfolio::load(&portfolio_path)?;
    info!(
        holdings = portfolio.holdings.len(),
        path = %portfolio_path.display(),
        "loaded portfolio"
    );

    let mut yahoo = YahooChartSource::new();
    if let Some(url) = &config.sources.quote_base_url {
        yahoo = yahoo.with_base_url(url.clone());
    }
    let quotes: Arc<dyn QuoteSource> = Arc::new(yahoo);

    // FX failure is the one fatal tier: without a conversion rate no
    // snapshot is written at all.
    let fx_rate = RateService::new(quotes.clone())
        .usd_brl_rate()
        .await
        .context("Unable to resolve the USD/BRL exchange rate")?;
    info!(rate = %format!("{fx_rate:.4}"), "resolved USD/BRL rate");

    let mut bonds = TesouroBondSource::new();
    if let Some(url) = &config.sources.bonds_base_url {
        bonds = bonds.with_base_url(url.clone());
    }
    let bond_prices = bonds.bond_prices().await;
    if bond_prices.is_empty() {
        warn!("no Tesouro prices available, bond holdings will use cost basis");
    } else {
        info!(bonds = bond_prices.len(), "retrieved Tesouro bond prices");
    }

    let assembler = SnapshotAssembler::new(ValuationResolver::new(MarketPriceSource::new(quotes)));
    let snapshot = assembler
        .assemble(&portfolio.holdings, fx_rate, &bond_prices)
        .await;

    snapshot.write(&output_path)?;

    let summary = snapshot.summary();
    println!("Snapshot saved to {}", output_path.display());
    println!("Assets priced: {}/{}", summary.priced, summary.total);
    println!("Total portfolio value: ${:.2} USD", summary.total_value_usd);
    println!("USD/BRL rate: {fx_rate:.4}");

    Ok(())
}
