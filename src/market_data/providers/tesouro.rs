//! Tesouro Direto bond price source.
//!
//! Tesouro Direto series are not exchange-listed, so their unit redemption
//! values come from a dedicated bonds catalog API. The catalog's naming is
//! free text and its price field varies by deployment, so records are
//! matched onto canonical portfolio bond names by substring patterns and
//! prices are extracted through an ordered list of field accessors.
//!
//! This source never fails the run: any fetch or parse problem degrades to
//! an empty price table and a warning, leaving every bond holding to the
//! cost-basis fallback downstream.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

const TESOURO_BASE_URL: &str = "https://tesouro.gabrielgaspar.com.br";

/// Catalog fetch timeout. The endpoint is slow on cold starts; one bounded
/// attempt, no retry.
const CATALOG_TIMEOUT: Duration = Duration::from_secs(10);

/// Display-name marker for interest-paying ("com Juros Semestrais") series.
const SEMIANNUAL_INTEREST_MARKER: &str = "Semestrais";

/// Pattern that must be present before a canonical name may match an
/// interest-paying series.
const INTEREST_PATTERN: &str = "Juros";

/// Canonical bond name → unit redemption value in BRL.
pub type BondPriceTable = HashMap<String, f64>;

/// A canonical portfolio bond name and the substrings a catalog record's
/// display name must all contain to match it.
#[derive(Debug, Clone)]
pub struct BondPattern {
    pub canonical: String,
    pub patterns: Vec<String>,
}

impl BondPattern {
    pub fn new(canonical: impl Into<String>, patterns: &[&str]) -> Self {
        Self {
            canonical: canonical.into(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn matches_interest_series(&self) -> bool {
        self.patterns.iter().any(|p| p == INTEREST_PATTERN)
    }
}

/// Ordered set of canonical bond names. Order matters: within a single
/// catalog record, the first matching canonical name wins.
#[derive(Debug, Clone)]
pub struct BondPatternTable {
    entries: Vec<BondPattern>,
}

impl BondPatternTable {
    pub fn new(entries: Vec<BondPattern>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[BondPattern] {
        &self.entries
    }

    /// Assign catalog records to canonical names.
    ///
    /// Matching is case-sensitive substring containment of every pattern.
    /// Canonical names without the interest pattern reject interest-paying
    /// series outright, even when the remaining substrings match. Records
    /// are scanned in catalog order and a later record overwrites an earlier
    /// assignment for the same canonical name (last-match-wins across the
    /// scan; see DESIGN.md).
    fn assign_prices(&self, records: &[BondRecord]) -> BondPriceTable {
        let mut prices = BondPriceTable::new();

        for record in records {
            let display_name = record.display_name();
            let Some(price) = record.unit_price() else {
                continue;
            };

            for entry in &self.entries {
                if !entry.matches_interest_series()
                    && display_name.contains(SEMIANNUAL_INTEREST_MARKER)
                {
                    continue;
                }
                if entry
                    .patterns
                    .iter()
                    .all(|pattern| display_name.contains(pattern.as_str()))
                {
                    prices.insert(entry.canonical.clone(), price);
                    break;
                }
            }
        }

        prices
    }
}

impl Default for BondPatternTable {
    fn default() -> Self {
        Self::new(vec![
            BondPattern::new("Tesouro IPCA+ 2026", &["IPCA+", "2026"]),
            BondPattern::new("Tesouro IPCA+ 2045", &["IPCA+", "2045"]),
            BondPattern::new("Tesouro IPCA+ 2050", &["IPCA+", "2050"]),
            BondPattern::new("Tesouro IPCA+ c/ Juros 2030", &["IPCA+", "Juros", "2030"]),
            BondPattern::new("Tesouro Educa+ 2035", &["Educa+", "2035"]),
        ])
    }
}

/// One provider-defined bond record. Field names vary across catalog
/// deployments; everything is optional and resolved by priority below.
#[derive(Debug, Default, Deserialize)]
struct BondRecord {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    bond_name: Option<String>,
    #[serde(default, deserialize_with = "flexible_f64")]
    unitary_redemption_value: Option<f64>,
    #[serde(default, deserialize_with = "flexible_f64")]
    price: Option<f64>,
    #[serde(default, deserialize_with = "flexible_f64")]
    pu: Option<f64>,
    #[serde(default, deserialize_with = "flexible_f64")]
    unit_price: Option<f64>,
}

/// Price field accessors in priority order: the first non-null wins.
const PRICE_FIELDS: &[fn(&BondRecord) -> Option<f64>] = &[
    |record| record.unitary_redemption_value,
    |record| record.price,
    |record| record.pu,
    |record| record.unit_price,
];

impl BondRecord {
    fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => self.bond_name.as_deref().unwrap_or(""),
        }
    }

    fn unit_price(&self) -> Option<f64> {
        PRICE_FIELDS.iter().find_map(|accessor| accessor(self))
    }
}

/// The catalog body is either a bare array or wrapped in a `bonds` object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BondCatalog {
    Wrapped { bonds: Vec<BondRecord> },
    Bare(Vec<BondRecord>),
}

impl BondCatalog {
    fn into_records(self) -> Vec<BondRecord> {
        match self {
            BondCatalog::Wrapped { bonds } => bonds,
            BondCatalog::Bare(records) => records,
        }
    }
}

/// Accepts JSON numbers or numeric strings; anything else is treated as
/// absent rather than failing the whole catalog.
fn flexible_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Other(serde_json::Value),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(value)) => Some(value),
        Some(Raw::Text(text)) => text.trim().parse().ok(),
        Some(Raw::Other(_)) | None => None,
    })
}

/// Fetches the Tesouro Direto catalog and builds the bond price table.
pub struct TesouroBondSource {
    client: Client,
    base_url: String,
    patterns: BondPatternTable,
}

impl TesouroBondSource {
    /// Creates a new source with a default HTTP client and pattern table.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: TESOURO_BASE_URL.to_string(),
            patterns: BondPatternTable::default(),
        }
    }

    /// Creates a new source with a custom HTTP client.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            ..Self::new()
        }
    }

    /// Overrides the API base URL (used by mock-server tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the canonical name patterns.
    pub fn with_patterns(mut self, patterns: BondPatternTable) -> Self {
        self.patterns = patterns;
        self
    }

    /// Unit redemption values keyed by canonical bond name.
    ///
    /// Any fetch or parse failure is logged and reported as an empty table;
    /// callers must treat that as "use fallback for all bonds", never as a
    /// fatal condition.
    pub async fn bond_prices(&self) -> BondPriceTable {
        match self.fetch_catalog().await {
            Ok(records) => {
                let prices = self.patterns.assign_prices(&records);
                debug!(
                    records = records.len(),
                    matched = prices.len(),
                    "matched Tesouro catalog against canonical bond names"
                );
                prices
            }
            Err(err) => {
                warn!(error = %err, "could not fetch Tesouro prices, bond holdings fall back to cost basis");
                BondPriceTable::new()
            }
        }
    }

    async fn fetch_catalog(&self) -> Result<Vec<BondRecord>> {
        let url = format!("{}/bonds", self.base_url);

        let catalog: BondCatalog = self
            .client
            .get(&url)
            .timeout(CATALOG_TIMEOUT)
            .send()
            .await
            .context("Tesouro catalog request failed")?
            .error_for_status()
            .context("Tesouro catalog returned an error status")?
            .json()
            .await
            .context("Failed to parse Tesouro catalog body")?;

        Ok(catalog.into_records())
    }
}

impl Default for TesouroBondSource {
    fn default() -> Self {
        Self::new()
    }
}
