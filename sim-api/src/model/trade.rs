use super::money::{Cents, Sats};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeKind {
    Buy,
    Sell,
}

impl TradeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TradeKind::Buy => "buy",
            TradeKind::Sell => "sell",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "buy" => Some(TradeKind::Buy),
            "sell" => Some(TradeKind::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for TradeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable audit record of one executed trade (market or limit
/// fill). Append-only; purged only by an admin account reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub tx_id: i64,
    pub account_id: i64,
    pub kind: TradeKind,
    pub asset_qty: Sats,
    pub cash_value: Cents,
    /// Executing price in cents per whole unit.
    pub price: Cents,
    /// Unix seconds.
    pub created_at: i64,
}
