//! Symbol resolution and close-price lookup for exchange-traded assets.
//!
//! The general market provider knows nothing about asset classes; this layer
//! adapts the lookup symbol per class and currency before delegating to the
//! underlying [`QuoteSource`].

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;

use super::QuoteSource;
use crate::portfolio::{AssetType, Currency};

/// Symbol conventions for the market provider.
///
/// Kept as injected configuration rather than module constants so the
/// resolver can be exercised with fixture rules in tests.
#[derive(Debug, Clone)]
pub struct SymbolRules {
    /// Suffix appended to B3-listed tickers (Brazilian exchange convention).
    pub brl_exchange_suffix: String,
    /// Suffix producing a USD-quoted trading pair for unknown crypto tickers.
    pub usd_pair_suffix: String,
    /// Known short crypto tickers mapped to their canonical USD pair.
    pub crypto_pairs: HashMap<String, String>,
    /// Substring marking a ticker as a Tesouro Direto bond series.
    pub tesouro_marker: String,
}

impl Default for SymbolRules {
    fn default() -> Self {
        let crypto_pairs = [
            ("BTC", "BTC-USD"),
            ("ETH", "ETH-USD"),
            ("AVAX", "AVAX-USD"),
        ]
        .into_iter()
        .map(|(ticker, pair)| (ticker.to_string(), pair.to_string()))
        .collect();

        Self {
            brl_exchange_suffix: ".SA".to_string(),
            usd_pair_suffix: "-USD".to_string(),
            crypto_pairs,
            tesouro_marker: "Tesouro".to_string(),
        }
    }
}

/// Close-price lookups adapted per asset class and currency.
pub struct MarketPriceSource {
    quotes: Arc<dyn QuoteSource>,
    rules: SymbolRules,
}

impl MarketPriceSource {
    pub fn new(quotes: Arc<dyn QuoteSource>) -> Self {
        Self {
            quotes,
            rules: SymbolRules::default(),
        }
    }

    pub fn with_rules(mut self, rules: SymbolRules) -> Self {
        self.rules = rules;
        self
    }

    /// Whether a ticker denotes a Tesouro Direto bond series.
    pub fn is_tesouro_ticker(&self, ticker: &str) -> bool {
        ticker.contains(&self.rules.tesouro_marker)
    }

    /// Build the provider symbol for an exchange-traded ticker.
    fn market_symbol(&self, ticker: &str, currency: Currency) -> String {
        match currency {
            Currency::Brl => format!("{}{}", ticker, self.rules.brl_exchange_suffix),
            Currency::Usd => ticker.to_string(),
        }
    }

    /// Build the USD-quoted pair symbol for a crypto ticker.
    fn crypto_symbol(&self, ticker: &str) -> String {
        match self.rules.crypto_pairs.get(ticker) {
            Some(pair) => pair.clone(),
            None => format!("{}{}", ticker, self.rules.usd_pair_suffix),
        }
    }

    /// Most recent close for an exchange-traded asset, in its local currency.
    ///
    /// Tesouro bond series are never listed on the general market; those
    /// lookups return `Ok(None)` without touching the provider and are
    /// expected to route through the bond price source instead.
    pub async fn market_close(
        &self,
        ticker: &str,
        currency: Currency,
        asset_type: &AssetType,
    ) -> Result<Option<f64>> {
        if *asset_type == AssetType::FixedIncome
            && currency == Currency::Brl
            && self.is_tesouro_ticker(ticker)
        {
            return Ok(None);
        }

        let symbol = self.market_symbol(ticker, currency);
        self.quotes.fetch_close(&symbol).await
    }

    /// Most recent close for a crypto ticker, always USD-denominated.
    pub async fn crypto_close(&self, ticker: &str) -> Result<Option<f64>> {
        let symbol = self.crypto_symbol(ticker);
        self.quotes.fetch_close(&symbol).await
    }
}
