use super::money::{Cents, Sats};
use super::order::Order;
use super::price::{PriceSnapshot, SeriesStats};
use super::trade::{TradeKind, TradeRecord};
use serde::{Deserialize, Serialize};

/// Leaderboard sort key. Both rankings are real surfaces: the stats
/// digest ranks by net worth, the plain rich list by spendable cash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankBy {
    NetWorth,
    Cash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub account_id: i64,
    pub name: String,
    pub cash: Cents,
    pub asset: Sats,
    pub net_worth: Cents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceReport {
    pub cash_available: Cents,
    pub cash_reserved: Cents,
    pub asset_available: Sats,
    pub asset_reserved: Sats,
    /// Holdings valued at the report price.
    pub asset_value: Cents,
    pub net_worth: Cents,
    pub pnl: Cents,
}

/// Structured command outcome for the transport layer to render.
/// The core knows nothing about message formatting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Reply {
    Trade {
        kind: TradeKind,
        asset_qty: Sats,
        cash_value: Cents,
        price: Cents,
    },
    Balance(BalanceReport),
    Stats {
        price: Cents,
        stats: Option<SeriesStats>,
        leaderboard: Vec<LeaderboardRow>,
    },
    History(Vec<TradeRecord>),
    OrderPlaced(Order),
    OrderCancelled(Order),
    OpenOrders(Vec<Order>),
    AccountReset {
        account_id: i64,
    },
    Granted {
        account_id: i64,
        cash: Cents,
        asset: Sats,
    },
    PricePinned(PriceSnapshot),
    PriceReverted(Option<PriceSnapshot>),
    Help(&'static str),
}
