//! Price oracle adapters.
//!
//! `coingecko` fetches the daily BTC series over HTTP, `cache` holds
//! the last good fetch behind the `PriceFeed` contract, and `replay`
//! drives a canned series for demos and tests.

pub mod cache;
pub mod coingecko;
pub mod replay;

pub use cache::FeedCache;
pub use coingecko::{CoinGeckoClient, MarketData};
pub use replay::ReplayFeed;
