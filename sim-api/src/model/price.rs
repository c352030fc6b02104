use super::money::Cents;
use serde::{Deserialize, Serialize};

/// The reference price the core trades against. Always passed into
/// handlers explicitly; never read from ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    /// Cents per whole asset unit.
    pub price: Cents,
    /// Unix seconds at observation.
    pub timestamp: i64,
}

/// Statistics derived from the daily price series, for the stats
/// digest. Read-only input; the core never owns or mutates these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub sma30: Cents,
    pub sma90: Cents,
    pub high90: Cents,
    pub low90: Cents,
    /// Close of the previous day / the day a week back, for change
    /// percentages.
    pub prev_day: Cents,
    pub prev_week: Cents,
    /// 24h traded volume, in cents of notional.
    pub volume24h: i64,
    /// Market capitalization in cents.
    pub market_cap: i64,
}
