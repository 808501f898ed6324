mod fx;
mod market;
pub mod providers;
mod quotes;

pub use fx::{RateError, RateService, USD_BRL_FALLBACK_SYMBOL, USD_BRL_PRIMARY_SYMBOL};
pub use market::{MarketPriceSource, SymbolRules};
pub use providers::tesouro::{BondPattern, BondPatternTable, BondPriceTable, TesouroBondSource};
pub use providers::yahoo::YahooChartSource;
pub use quotes::{QuoteSource, StaticQuoteSource};
