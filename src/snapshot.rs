//! Snapshot assembly and persistence.
//!
//! One snapshot per run: holdings are resolved sequentially in portfolio
//! order, the timestamp is captured once at assembly start, and the result
//! is written whole, overwriting any prior file. Partial pricing coverage is
//! expected; the summary makes it visible without affecting exit status.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::market_data::BondPriceTable;
use crate::portfolio::Holding;
use crate::valuation::{ValuationEntry, ValuationResolver};

/// One complete valuation snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// ISO-8601 capture time.
    pub timestamp: String,
    pub usd_brl_rate: f64,
    /// Entries in portfolio holding order.
    pub holdings: Vec<ValuationEntry>,
}

/// Derived pricing coverage, never persisted.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SnapshotSummary {
    /// Holdings with a resolved USD value.
    pub priced: usize,
    pub total: usize,
    /// Sum of all present USD values.
    pub total_value_usd: f64,
}

impl Snapshot {
    pub fn summary(&self) -> SnapshotSummary {
        let priced = self
            .holdings
            .iter()
            .filter(|entry| entry.value_usd.is_some())
            .count();
        let total_value_usd = self
            .holdings
            .iter()
            .filter_map(|entry| entry.value_usd)
            .sum();

        SnapshotSummary {
            priced,
            total: self.holdings.len(),
            total_value_usd,
        }
    }

    /// Write the snapshot as pretty JSON, replacing any prior file.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize snapshot")?;

        std::fs::write(path, json)
            .with_context(|| format!("Failed to write snapshot to {}", path.display()))?;

        Ok(())
    }
}

/// Resolves every holding and assembles the snapshot.
pub struct SnapshotAssembler {
    resolver: ValuationResolver,
}

impl SnapshotAssembler {
    pub fn new(resolver: ValuationResolver) -> Self {
        Self { resolver }
    }

    /// Resolve all holdings in order against the run-wide FX rate and bond
    /// price table. Never fails: holdings that cannot be priced come back
    /// with absent price fields.
    pub async fn assemble(
        &self,
        holdings: &[Holding],
        fx_rate: f64,
        bond_prices: &BondPriceTable,
    ) -> Snapshot {
        let timestamp = chrono::Local::now().to_rfc3339();
        let mut entries = Vec::with_capacity(holdings.len());

        for holding in holdings {
            let entry = self.resolver.resolve(holding, fx_rate, bond_prices).await;

            match (entry.price_local, entry.price_usd) {
                (Some(local), Some(usd)) => info!(
                    asset = %entry.asset,
                    ticker = %entry.ticker,
                    price_local = %format!("{local:.2} {}", entry.local_currency),
                    price_usd = %format!("{usd:.2}"),
                    origin = ?entry.origin,
                    "priced holding"
                ),
                _ => info!(
                    asset = %entry.asset,
                    ticker = %entry.ticker,
                    origin = ?entry.origin,
                    "unable to price holding"
                ),
            }

            entries.push(entry);
        }

        Snapshot {
            timestamp,
            usd_brl_rate: fx_rate,
            holdings: entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::{MarketPriceSource, StaticQuoteSource};
    use crate::portfolio::{AssetType, Currency};
    use std::sync::Arc;

    fn assembler(quotes: StaticQuoteSource) -> SnapshotAssembler {
        SnapshotAssembler::new(ValuationResolver::new(MarketPriceSource::new(Arc::new(
            quotes,
        ))))
    }

    fn holding(ticker: &str, asset_type: AssetType, currency: Currency) -> Holding {
        Holding {
            asset: ticker.to_string(),
            ticker: ticker.to_string(),
            asset_type,
            local_currency: currency,
            quantity: 1.0,
            cost_basis: None,
        }
    }

    #[tokio::test]
    async fn preserves_portfolio_order() {
        let assembler = assembler(
            StaticQuoteSource::new()
                .with_close("VOO", 450.0)
                .with_close("PETR4.SA", 30.0),
        );
        let holdings = vec![
            holding("PETR4", AssetType::Stock, Currency::Brl),
            holding("VOO", AssetType::Etf, Currency::Usd),
        ];

        let snapshot = assembler
            .assemble(&holdings, 5.0, &BondPriceTable::new())
            .await;

        let tickers: Vec<_> = snapshot.holdings.iter().map(|e| e.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["PETR4", "VOO"]);
        assert_eq!(snapshot.usd_brl_rate, 5.0);
    }

    #[tokio::test]
    async fn summary_counts_only_priced_holdings() {
        let assembler = assembler(StaticQuoteSource::new().with_close("VOO", 450.0));
        let holdings = vec![
            holding("VOO", AssetType::Etf, Currency::Usd),
            holding("UNKNOWN", AssetType::Stock, Currency::Usd),
        ];

        let snapshot = assembler
            .assemble(&holdings, 5.0, &BondPriceTable::new())
            .await;
        let summary = snapshot.summary();

        assert_eq!(summary.priced, 1);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.total_value_usd, 450.0);
    }

    #[tokio::test]
    async fn write_overwrites_prior_snapshot() -> Result<()> {
        let assembler = assembler(StaticQuoteSource::new().with_close("VOO", 450.0));
        let holdings = vec![holding("VOO", AssetType::Etf, Currency::Usd)];

        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("current_prices.json");
        std::fs::write(&path, "{\"stale\": true}")?;

        let snapshot = assembler
            .assemble(&holdings, 5.0, &BondPriceTable::new())
            .await;
        snapshot.write(&path)?;

        let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(written["usd_brl_rate"], 5.0);
        assert_eq!(written["holdings"][0]["ticker"], "VOO");
        assert!(written.get("stale").is_none());
        Ok(())
    }
}
