use super::money::{Cents, Sats};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "buy" => Some(OrderSide::Buy),
            "sell" => Some(OrderSide::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resting order lifecycle. Terminal states never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Open,
    Filled,
    Cancelled,
    /// Auto-cancelled by settlement when the fill would round to
    /// zero asset units; the reservation is refunded in full.
    CancelledError,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::Filled => "filled",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::CancelledError => "cancelled_error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(OrderStatus::Open),
            "filled" => Some(OrderStatus::Filled),
            "cancelled" => Some(OrderStatus::Cancelled),
            "cancelled_error" => Some(OrderStatus::CancelledError),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resting limit instruction.
///
/// For buy orders `reserved_value` is cash in cents and is the
/// authoritative committed resource; `requested_qty` is only the
/// estimate shown at placement. For sell orders `reserved_value`
/// equals `requested_qty` in satoshis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: i64,
    pub account_id: i64,
    pub side: OrderSide,
    pub requested_qty: Sats,
    pub filled_qty: Sats,
    /// Cents per whole asset unit.
    pub limit_price: Cents,
    pub reserved_value: i64,
    pub status: OrderStatus,
    /// Unix seconds.
    pub created_at: i64,
}
