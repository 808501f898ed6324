//! USD/BRL exchange rate resolution.
//!
//! One rate is fetched per snapshot run and shared by every holding. The
//! primary symbol is tried first; if it has no recent close the fallback
//! symbol is used as-is (both symbols quote the same direction, so no
//! inversion arithmetic is applied). Failure at this tier is fatal for the
//! run: no partial snapshot makes sense without a conversion rate.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use super::QuoteSource;

/// Primary quote symbol for the USD/BRL rate.
pub const USD_BRL_PRIMARY_SYMBOL: &str = "BRL=X";

/// Fallback quote symbol, quoting the same direction as the primary.
pub const USD_BRL_FALLBACK_SYMBOL: &str = "USDBRL=X";

#[derive(Debug, Error)]
pub enum RateError {
    #[error("no USD/BRL rate available from {primary} or {fallback}")]
    Unavailable { primary: String, fallback: String },

    #[error("USD/BRL rate lookup failed: {0}")]
    Source(#[from] anyhow::Error),
}

/// Resolves the USD/BRL conversion rate with a two-tier symbol fallback.
pub struct RateService {
    quotes: Arc<dyn QuoteSource>,
    primary: String,
    fallback: String,
}

impl RateService {
    pub fn new(quotes: Arc<dyn QuoteSource>) -> Self {
        Self {
            quotes,
            primary: USD_BRL_PRIMARY_SYMBOL.to_string(),
            fallback: USD_BRL_FALLBACK_SYMBOL.to_string(),
        }
    }

    pub fn with_symbols(
        mut self,
        primary: impl Into<String>,
        fallback: impl Into<String>,
    ) -> Self {
        self.primary = primary.into();
        self.fallback = fallback.into();
        self
    }

    /// The current USD/BRL rate from the most recent trading-day close.
    ///
    /// Non-positive closes are treated the same as missing data. No retries
    /// beyond the two symbols, no caching across runs.
    pub async fn usd_brl_rate(&self) -> Result<f64, RateError> {
        if let Some(rate) = self.fetch_positive(&self.primary).await? {
            return Ok(rate);
        }

        debug!(
            symbol = %self.primary,
            "primary FX symbol returned no data, trying fallback"
        );

        if let Some(rate) = self.fetch_positive(&self.fallback).await? {
            return Ok(rate);
        }

        Err(RateError::Unavailable {
            primary: self.primary.clone(),
            fallback: self.fallback.clone(),
        })
    }

    async fn fetch_positive(&self, symbol: &str) -> Result<Option<f64>, RateError> {
        let close = self.quotes.fetch_close(symbol).await?;
        Ok(close.filter(|rate| *rate > 0.0))
    }
}
