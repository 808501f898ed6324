pub mod config;
pub mod market_data;
pub mod portfolio;
pub mod snapshot;
pub mod valuation;
