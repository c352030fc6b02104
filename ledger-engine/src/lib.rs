//! Ledger and order-matching core of the trading simulator.
//!
//! `store` owns the durable SQLite state (accounts, orders, trade
//! log); `engine` implements the market executor, the limit order
//! book with price-tick settlement, the read-side query service, and
//! the exhaustive command dispatch.

pub mod engine;
pub mod store;

pub use engine::{EngineConfig, SettleSummary, SimEngine};
pub use store::{LedgerDelta, LedgerStore};
