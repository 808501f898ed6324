//! End-to-end resolution properties over a mixed portfolio, using injected
//! fixtures instead of live providers.

use std::sync::Arc;

use carteira::market_data::{BondPriceTable, MarketPriceSource, StaticQuoteSource};
use carteira::portfolio::{AssetType, Currency, Holding, Portfolio};
use carteira::snapshot::SnapshotAssembler;
use carteira::valuation::ValuationResolver;

const FX_RATE: f64 = 5.0;

fn fixture_portfolio() -> Portfolio {
    let json = r#"{
        "holdings": [
            {"asset": "Petrobras", "ticker": "PETR4", "type": "Stock", "localCurrency": "BRL", "quantity": 100},
            {"asset": "Bitcoin", "ticker": "BTC", "type": "Crypto", "localCurrency": "USD", "quantity": 0.5},
            {"asset": "Ethereum", "ticker": "ETH", "type": "Crypto", "localCurrency": "BRL", "quantity": 2},
            {"asset": "Vanguard S&P 500", "ticker": "VOO", "type": "ETF", "localCurrency": "USD", "quantity": 10},
            {"asset": "Tesouro IPCA+ 2026", "ticker": "Tesouro IPCA+ 2026", "type": "Fixed Income", "localCurrency": "BRL", "quantity": 5, "costBasis": 14000},
            {"asset": "Tesouro IPCA+ 2045", "ticker": "Tesouro IPCA+ 2045", "type": "Fixed Income", "localCurrency": "BRL", "quantity": 10, "costBasis": 10000},
            {"asset": "Unlisted fund", "ticker": "", "type": "Stock", "localCurrency": "BRL", "quantity": 7}
        ]
    }"#;

    serde_json::from_str(json).unwrap()
}

fn fixture_assembler() -> SnapshotAssembler {
    let quotes = StaticQuoteSource::new()
        .with_close("PETR4.SA", 30.0)
        .with_close("BTC-USD", 60000.0)
        .with_close("ETH-USD", 2500.0)
        .with_close("VOO", 450.0);

    SnapshotAssembler::new(ValuationResolver::new(MarketPriceSource::new(Arc::new(
        quotes,
    ))))
}

fn fixture_bond_prices() -> BondPriceTable {
    let mut prices = BondPriceTable::new();
    prices.insert("Tesouro IPCA+ 2026".to_string(), 3200.0);
    prices
}

#[tokio::test]
async fn mixed_portfolio_resolves_every_branch() {
    let portfolio = fixture_portfolio();
    let snapshot = fixture_assembler()
        .assemble(&portfolio.holdings, FX_RATE, &fixture_bond_prices())
        .await;

    assert_eq!(snapshot.usd_brl_rate, FX_RATE);
    assert_eq!(snapshot.holdings.len(), 7);

    // BRL stock: USD derived by division.
    let petr = &snapshot.holdings[0];
    assert_eq!(petr.price_local, Some(30.0));
    assert_eq!(petr.price_usd, Some(6.0));
    assert_eq!(petr.value_local, Some(3000.0));
    assert_eq!(petr.value_usd, Some(600.0));

    // USD crypto: local and USD identical.
    let btc = &snapshot.holdings[1];
    assert_eq!(btc.price_usd, Some(60000.0));
    assert_eq!(btc.price_local, Some(60000.0));
    assert_eq!(btc.value_usd, Some(30000.0));

    // BRL crypto: local derived by multiplication.
    let eth = &snapshot.holdings[2];
    assert_eq!(eth.price_usd, Some(2500.0));
    assert_eq!(eth.price_local, Some(12500.0));

    // Bond in the table: live price, USD derived by division.
    let ipca_2026 = &snapshot.holdings[4];
    assert_eq!(ipca_2026.price_local, Some(3200.0));
    assert_eq!(ipca_2026.price_usd, Some(640.0));

    // Bond missing from the table: cost-basis fallback, 10000 / 10.
    let ipca_2045 = &snapshot.holdings[5];
    assert_eq!(ipca_2045.price_local, Some(1000.0));
    assert_eq!(ipca_2045.price_usd, Some(200.0));

    // Empty ticker: nothing to look up.
    let unlisted = &snapshot.holdings[6];
    assert_eq!(unlisted.price_local, None);
    assert_eq!(unlisted.value_local, None);
}

#[tokio::test]
async fn value_present_iff_price_present() {
    let portfolio = fixture_portfolio();
    let snapshot = fixture_assembler()
        .assemble(&portfolio.holdings, FX_RATE, &fixture_bond_prices())
        .await;

    for entry in &snapshot.holdings {
        assert_eq!(
            entry.price_local.is_some(),
            entry.value_local.is_some(),
            "{}",
            entry.ticker
        );
        assert_eq!(
            entry.price_usd.is_some(),
            entry.value_usd.is_some(),
            "{}",
            entry.ticker
        );
        if let (Some(price), Some(value)) = (entry.price_local, entry.value_local) {
            assert_eq!(value, (price * entry.quantity * 100.0).round() / 100.0);
        }
    }
}

#[tokio::test]
async fn fx_derivation_directions_hold_per_asset_class() {
    let portfolio = fixture_portfolio();
    let snapshot = fixture_assembler()
        .assemble(&portfolio.holdings, FX_RATE, &fixture_bond_prices())
        .await;

    for entry in &snapshot.holdings {
        let (Some(local), Some(usd)) = (entry.price_local, entry.price_usd) else {
            continue;
        };
        match (&entry.asset_type, entry.local_currency) {
            (AssetType::Crypto, Currency::Brl) => {
                assert_eq!(local, (usd * FX_RATE * 10_000.0).round() / 10_000.0)
            }
            (AssetType::Crypto, Currency::Usd) => assert_eq!(local, usd),
            (_, Currency::Brl) => {
                assert_eq!(usd, (local / FX_RATE * 10_000.0).round() / 10_000.0)
            }
            (_, Currency::Usd) => assert_eq!(usd, local),
        }
    }
}

#[tokio::test]
async fn empty_bond_catalog_degrades_without_aborting() {
    let portfolio = fixture_portfolio();
    let snapshot = fixture_assembler()
        .assemble(&portfolio.holdings, FX_RATE, &BondPriceTable::new())
        .await;

    // Both bonds fall through to the cost-basis fallback.
    let ipca_2026 = &snapshot.holdings[4];
    assert_eq!(ipca_2026.price_local, Some(2800.0)); // 14000 / 5
    let ipca_2045 = &snapshot.holdings[5];
    assert_eq!(ipca_2045.price_local, Some(1000.0));

    // Non-bond holdings are unaffected.
    assert_eq!(snapshot.holdings[0].price_local, Some(30.0));
    assert_eq!(snapshot.holdings[1].price_usd, Some(60000.0));

    let summary = snapshot.summary();
    assert_eq!(summary.total, 7);
    assert_eq!(summary.priced, 6);
}

#[tokio::test]
async fn zero_quantity_bond_with_cost_basis_stays_unpriced() {
    let holding = Holding {
        asset: "Tesouro IPCA+ 2050".to_string(),
        ticker: "Tesouro IPCA+ 2050".to_string(),
        asset_type: AssetType::FixedIncome,
        local_currency: Currency::Brl,
        quantity: 0.0,
        cost_basis: Some(10000.0),
    };

    let snapshot = fixture_assembler()
        .assemble(&[holding], FX_RATE, &BondPriceTable::new())
        .await;

    let entry = &snapshot.holdings[0];
    assert_eq!(entry.price_local, None);
    assert_eq!(entry.price_usd, None);
    assert_eq!(entry.value_local, None);
    assert_eq!(entry.value_usd, None);
}

#[tokio::test]
async fn snapshot_json_uses_persisted_field_names() {
    let portfolio = fixture_portfolio();
    let snapshot = fixture_assembler()
        .assemble(&portfolio.holdings, FX_RATE, &fixture_bond_prices())
        .await;

    let json = serde_json::to_value(&snapshot).unwrap();
    assert!(json["timestamp"].is_string());
    assert_eq!(json["usd_brl_rate"], FX_RATE);

    let first = &json["holdings"][0];
    assert_eq!(first["ticker"], "PETR4");
    assert_eq!(first["type"], "Stock");
    assert_eq!(first["local_currency"], "BRL");
    assert_eq!(first["price_local"], 30.0);
    assert_eq!(first["price_usd"], 6.0);
    assert_eq!(first["quantity"], 100.0);
    assert_eq!(first["value_local"], 3000.0);
    assert_eq!(first["value_usd"], 600.0);

    // Fixed Income serializes with its display label.
    assert_eq!(json["holdings"][4]["type"], "Fixed Income");
}
