use crate::model::money::Cents;
use crate::model::price::{PriceSnapshot, SeriesStats};

/// Contract the price oracle adapter exposes to the core.
///
/// `None` from either getter means "no data this cycle". Callers
/// skip price-dependent work instead of failing hard, and command
/// handlers reject with `PriceUnavailable` rather than block on a
/// fetch.
pub trait PriceFeed: Send + Sync {
    fn current(&self) -> Option<PriceSnapshot>;

    fn stats(&self) -> Option<SeriesStats>;

    /// Pin the reference price to a fixed value (admin/test mode).
    /// Returns the snapshot that should drive one immediate
    /// settlement pass.
    fn pin(&self, price: Cents) -> PriceSnapshot;

    /// Drop a pin, restoring the last fetched price if one exists.
    /// The caller is expected to schedule a fresh fetch afterwards.
    fn revert(&self) -> Option<PriceSnapshot>;
}
