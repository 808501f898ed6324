use std::collections::HashMap;

use anyhow::Result;

/// A source of most-recent-close prices keyed by provider symbol.
///
/// `Ok(None)` means the provider responded but has no recent trading data
/// for the symbol; `Err` means the lookup itself failed (network, HTTP,
/// parse). Callers decide how loudly to report each.
#[async_trait::async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_close(&self, symbol: &str) -> Result<Option<f64>>;

    fn name(&self) -> &str;
}

/// In-memory quote source backed by a fixed symbol table.
///
/// Symbols not in the table report no data, matching a provider with no
/// recent trading history.
#[derive(Debug, Clone, Default)]
pub struct StaticQuoteSource {
    closes: HashMap<String, f64>,
}

impl StaticQuoteSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_close(mut self, symbol: impl Into<String>, close: f64) -> Self {
        self.closes.insert(symbol.into(), close);
        self
    }
}

#[async_trait::async_trait]
impl QuoteSource for StaticQuoteSource {
    async fn fetch_close(&self, symbol: &str) -> Result<Option<f64>> {
        Ok(self.closes.get(symbol).copied())
    }

    fn name(&self) -> &str {
        "static"
    }
}
