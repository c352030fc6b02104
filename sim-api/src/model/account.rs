use super::money::{asset_to_cash, Cents, Sats};
use serde::{Deserialize, Serialize};

/// One participant's ledger row.
///
/// All four balance fields are non-negative at every observable
/// instant; the reserved columns hold resources committed to open
/// limit orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub account_id: i64,
    pub name: String,
    pub cash_available: Cents,
    pub cash_reserved: Cents,
    pub asset_available: Sats,
    pub asset_reserved: Sats,
    /// Unix seconds.
    pub created_at: i64,
}

impl Account {
    pub fn total_cash(&self) -> Cents {
        self.cash_available + self.cash_reserved
    }

    pub fn total_asset(&self) -> Sats {
        self.asset_available + self.asset_reserved
    }

    /// Total cash plus holdings valued at `price`.
    pub fn net_worth(&self, price: Cents) -> Cents {
        self.total_cash() + asset_to_cash(self.total_asset(), price)
    }

    pub fn pnl(&self, price: Cents, seed_cash: Cents) -> Cents {
        self.net_worth(price) - seed_cash
    }
}
