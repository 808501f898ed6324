//! Yahoo Finance chart API quote source.
//!
//! One endpoint covers equities, FX pairs, and crypto pairs: the v8 chart
//! API returns the most recent trading day when queried with a 1-day range.
//! No API key is required, but requests without a browser-like User-Agent
//! are rejected.

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Deserialize;

use crate::market_data::QuoteSource;

const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Quote source backed by the Yahoo Finance chart API.
#[derive(Debug, Clone)]
pub struct YahooChartSource {
    client: Client,
    base_url: String,
}

impl YahooChartSource {
    /// Creates a new source with a default HTTP client.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: YAHOO_BASE_URL.to_string(),
        }
    }

    /// Creates a new source with a custom HTTP client.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: YAHOO_BASE_URL.to_string(),
        }
    }

    /// Overrides the API base URL (used by mock-server tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Extract the most recent close from a chart response.
    ///
    /// The close series may contain nulls for halted sessions; the last
    /// non-null entry wins, with the meta regular market price as a final
    /// fallback for symbols that only report a live quote.
    fn latest_close(envelope: &ChartEnvelope) -> Option<f64> {
        if envelope.chart.error.is_some() {
            return None;
        }

        let result = envelope.chart.result.as_ref()?.first()?;

        let series_close = result
            .indicators
            .quote
            .iter()
            .flat_map(|block| block.close.iter().rev())
            .find_map(|close| *close);

        series_close.or(result.meta.regular_market_price)
    }
}

impl Default for YahooChartSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl QuoteSource for YahooChartSource {
    async fn fetch_close(&self, symbol: &str) -> Result<Option<f64>> {
        let url = format!(
            "{}/v8/finance/chart/{}?range=1d&interval=1d",
            self.base_url, symbol
        );

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            // Unknown symbols and symbols without recent data come back 404.
            if response.status().as_u16() == 404 {
                return Ok(None);
            }
            return Err(anyhow!(
                "Yahoo chart API returned status {} for {}",
                response.status(),
                symbol
            ));
        }

        let envelope: ChartEnvelope = response.json().await?;
        Ok(Self::latest_close(&envelope))
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}
