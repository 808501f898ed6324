use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Currency a holding is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "BRL")]
    Brl,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Usd => write!(f, "USD"),
            Currency::Brl => write!(f, "BRL"),
        }
    }
}

/// Asset class of a holding. The portfolio file uses display labels
/// ("Fixed Income", "ETF"); unknown labels round-trip through `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AssetType {
    Stock,
    Etf,
    Reit,
    Fii,
    Crypto,
    FixedIncome,
    Other(String),
}

impl From<String> for AssetType {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Stock" => AssetType::Stock,
            "ETF" => AssetType::Etf,
            "REIT" => AssetType::Reit,
            "FII" => AssetType::Fii,
            "Crypto" => AssetType::Crypto,
            "Fixed Income" => AssetType::FixedIncome,
            _ => AssetType::Other(label),
        }
    }
}

impl From<AssetType> for String {
    fn from(asset_type: AssetType) -> Self {
        match asset_type {
            AssetType::Stock => "Stock".to_string(),
            AssetType::Etf => "ETF".to_string(),
            AssetType::Reit => "REIT".to_string(),
            AssetType::Fii => "FII".to_string(),
            AssetType::Crypto => "Crypto".to_string(),
            AssetType::FixedIncome => "Fixed Income".to_string(),
            AssetType::Other(label) => label,
        }
    }
}

/// One position in the portfolio definition file.
///
/// For Tesouro Direto bonds the `ticker` carries the canonical bond name
/// (e.g. "Tesouro IPCA+ 2026") rather than an exchange symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub asset: String,
    #[serde(default)]
    pub ticker: String,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub local_currency: Currency,
    pub quantity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_basis: Option<f64>,
}

/// The portfolio definition: an ordered list of holdings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub holdings: Vec<Holding>,
}

impl Portfolio {
    /// Load the portfolio from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read portfolio file: {}", path.display()))?;

        let portfolio: Portfolio = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse portfolio file: {}", path.display()))?;

        Ok(portfolio)
    }
}
