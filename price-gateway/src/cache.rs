//! Last-good-fetch cache behind the `PriceFeed` contract.
//!
//! The fetch loop publishes into the cache; command handling and
//! settlement only ever read it, so a flaky upstream degrades to
//! stale data instead of blocking the core.

use chrono::Utc;
use log::warn;
use sim_api::model::money::Cents;
use sim_api::{PriceFeed, PriceSnapshot, SeriesStats};
use std::sync::Mutex;

use crate::coingecko::MarketData;

#[derive(Default)]
struct Inner {
    real: Option<PriceSnapshot>,
    stats: Option<SeriesStats>,
    pinned: Option<PriceSnapshot>,
}

#[derive(Default)]
pub struct FeedCache {
    inner: Mutex<Inner>,
}

impl FeedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a completed fetch. The pin, if any, keeps masking the
    /// real price until reverted.
    pub fn publish(&self, data: &MarketData) {
        let mut inner = self.lock();
        inner.real = Some(data.snapshot);
        inner.stats = Some(data.stats.clone());
    }

    pub fn is_pinned(&self) -> bool {
        self.lock().pinned.is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!("price cache mutex poisoned; continuing with last state");
            poisoned.into_inner()
        })
    }
}

impl PriceFeed for FeedCache {
    fn current(&self) -> Option<PriceSnapshot> {
        let inner = self.lock();
        inner.pinned.or(inner.real)
    }

    /// Series stats track the real fetch even while a pin is active;
    /// only the headline price is overridden.
    fn stats(&self) -> Option<SeriesStats> {
        self.lock().stats.clone()
    }

    fn pin(&self, price: Cents) -> PriceSnapshot {
        let snapshot = PriceSnapshot {
            price,
            timestamp: Utc::now().timestamp(),
        };
        self.lock().pinned = Some(snapshot);
        snapshot
    }

    fn revert(&self) -> Option<PriceSnapshot> {
        let mut inner = self.lock();
        inner.pinned = None;
        inner.real
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(price: Cents) -> MarketData {
        MarketData {
            snapshot: PriceSnapshot {
                price,
                timestamp: 1,
            },
            stats: SeriesStats {
                sma30: price,
                sma90: price,
                high90: price,
                low90: price,
                prev_day: price,
                prev_week: price,
                volume24h: 0,
                market_cap: 0,
            },
            series: vec![price],
        }
    }

    #[test]
    fn empty_cache_reports_nothing() {
        let cache = FeedCache::new();
        assert!(cache.current().is_none());
        assert!(cache.stats().is_none());
        assert!(cache.revert().is_none());
    }

    #[test]
    fn pin_masks_real_price_until_revert() {
        let cache = FeedCache::new();
        cache.publish(&data(5_000_000));
        assert_eq!(cache.current().unwrap().price, 5_000_000);

        let pinned = cache.pin(9_000_000);
        assert_eq!(pinned.price, 9_000_000);
        assert!(cache.is_pinned());
        assert_eq!(cache.current().unwrap().price, 9_000_000);

        // A fetch landing mid-pin refreshes the real price quietly.
        cache.publish(&data(5_500_000));
        assert_eq!(cache.current().unwrap().price, 9_000_000);

        let real = cache.revert().unwrap();
        assert_eq!(real.price, 5_500_000);
        assert!(!cache.is_pinned());
        assert_eq!(cache.current().unwrap().price, 5_500_000);
    }

    #[test]
    fn stats_follow_the_real_fetch_while_pinned() {
        let cache = FeedCache::new();
        cache.publish(&data(5_000_000));
        cache.pin(1);
        assert_eq!(cache.stats().unwrap().sma30, 5_000_000);
    }
}
