//! Per-holding price resolution.
//!
//! The resolver dispatches each holding to the right source by asset class,
//! applies the fallback policy, and derives the counter-currency price. The
//! derivation direction depends on the asset class, not the currency: crypto
//! is fetched natively in USD and the local price is derived from it, while
//! everything else is fetched in its local currency and the USD price is
//! derived. Lookup failures below the FX tier never escalate; they downgrade
//! to absent-price entries.

use serde::Serialize;
use tracing::{debug, warn};

use crate::market_data::{BondPriceTable, MarketPriceSource};
use crate::portfolio::{AssetType, Currency, Holding};

/// Where a resolved price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceOrigin {
    /// A live quote from a price source.
    Live,
    /// Approximated from the holding's acquisition cost. An accepted
    /// staleness trade-off when no live bond price is available.
    CostBasisFallback,
    /// No price could be resolved.
    Unavailable,
}

/// One holding's resolved valuation. Immutable once constructed; values are
/// present exactly when the corresponding price is present.
#[derive(Debug, Clone, Serialize)]
pub struct ValuationEntry {
    pub asset: String,
    pub ticker: String,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub local_currency: Currency,
    pub price_local: Option<f64>,
    pub price_usd: Option<f64>,
    pub quantity: f64,
    pub value_local: Option<f64>,
    pub value_usd: Option<f64>,
    #[serde(skip)]
    pub origin: PriceOrigin,
}

/// Transient per-holding resolution, before rounding.
struct PriceResolution {
    local: Option<f64>,
    usd: Option<f64>,
    origin: PriceOrigin,
}

impl PriceResolution {
    fn unavailable() -> Self {
        Self {
            local: None,
            usd: None,
            origin: PriceOrigin::Unavailable,
        }
    }
}

/// Resolves holdings against the market, crypto, and bond price sources.
pub struct ValuationResolver {
    market: MarketPriceSource,
}

impl ValuationResolver {
    pub fn new(market: MarketPriceSource) -> Self {
        Self { market }
    }

    /// Resolve one holding into a valuation entry.
    ///
    /// Deterministic given fixed upstream data. `fx_rate` is the run-wide
    /// USD/BRL rate; `bond_prices` is the run-wide bond price table (possibly
    /// empty when the bond provider was unavailable).
    pub async fn resolve(
        &self,
        holding: &Holding,
        fx_rate: f64,
        bond_prices: &BondPriceTable,
    ) -> ValuationEntry {
        let resolution = match &holding.asset_type {
            AssetType::Crypto => self.resolve_crypto(holding, fx_rate).await,
            AssetType::FixedIncome if self.market.is_tesouro_ticker(&holding.ticker) => {
                resolve_bond(holding, fx_rate, bond_prices)
            }
            _ => self.resolve_market(holding, fx_rate).await,
        };

        ValuationEntry::from_resolution(holding, resolution)
    }

    /// Crypto prices are natively USD; the local price is derived.
    async fn resolve_crypto(&self, holding: &Holding, fx_rate: f64) -> PriceResolution {
        let close = match self.market.crypto_close(&holding.ticker).await {
            Ok(close) => close,
            Err(err) => {
                warn!(ticker = %holding.ticker, error = %err, "crypto price lookup failed");
                None
            }
        };

        match positive(close) {
            Some(usd) => {
                let local = match holding.local_currency {
                    Currency::Brl => usd * fx_rate,
                    Currency::Usd => usd,
                };
                PriceResolution {
                    local: Some(local),
                    usd: Some(usd),
                    origin: PriceOrigin::Live,
                }
            }
            None => {
                debug!(ticker = %holding.ticker, "no recent crypto quote");
                PriceResolution::unavailable()
            }
        }
    }

    /// Exchange-traded assets are priced in their local currency; the USD
    /// price is derived.
    async fn resolve_market(&self, holding: &Holding, fx_rate: f64) -> PriceResolution {
        if holding.ticker.is_empty() {
            return PriceResolution::unavailable();
        }

        let close = match self
            .market
            .market_close(&holding.ticker, holding.local_currency, &holding.asset_type)
            .await
        {
            Ok(close) => close,
            Err(err) => {
                warn!(ticker = %holding.ticker, error = %err, "market price lookup failed");
                None
            }
        };

        match positive(close) {
            Some(local) => {
                let usd = match holding.local_currency {
                    Currency::Brl => local / fx_rate,
                    Currency::Usd => local,
                };
                PriceResolution {
                    local: Some(local),
                    usd: Some(usd),
                    origin: PriceOrigin::Live,
                }
            }
            None => {
                debug!(ticker = %holding.ticker, "no recent market quote");
                PriceResolution::unavailable()
            }
        }
    }
}

/// Tesouro bond series: live price from the run-wide bond table, cost basis
/// as the fallback, otherwise unavailable.
fn resolve_bond(holding: &Holding, fx_rate: f64, bond_prices: &BondPriceTable) -> PriceResolution {
    if let Some(local) = positive(bond_prices.get(&holding.ticker).copied()) {
        return PriceResolution {
            local: Some(local),
            usd: Some(local / fx_rate),
            origin: PriceOrigin::Live,
        };
    }

    match positive(holding.cost_basis) {
        Some(cost_basis) if holding.quantity > 0.0 => {
            let local = cost_basis / holding.quantity;
            PriceResolution {
                local: Some(local),
                usd: Some(local / fx_rate),
                origin: PriceOrigin::CostBasisFallback,
            }
        }
        _ => PriceResolution::unavailable(),
    }
}

/// A zero or absent price is "no price"; derivations never start from it.
fn positive(price: Option<f64>) -> Option<f64> {
    price.filter(|p| *p > 0.0)
}

impl ValuationEntry {
    /// Rounding happens here and only here: prices to 4 decimal places,
    /// values to 2. Values are computed from the unrounded prices so the
    /// local/USD conversion never compounds rounding error.
    fn from_resolution(holding: &Holding, resolution: PriceResolution) -> Self {
        Self {
            asset: holding.asset.clone(),
            ticker: holding.ticker.clone(),
            asset_type: holding.asset_type.clone(),
            local_currency: holding.local_currency,
            price_local: resolution.local.map(|p| round_to(p, 4)),
            price_usd: resolution.usd.map(|p| round_to(p, 4)),
            quantity: holding.quantity,
            value_local: resolution.local.map(|p| round_to(p * holding.quantity, 2)),
            value_usd: resolution.usd.map(|p| round_to(p * holding.quantity, 2)),
            origin: resolution.origin,
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
