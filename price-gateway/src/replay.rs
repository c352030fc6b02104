//! Deterministic feed that steps through a canned series. Used by the
//! offline demo mode and anywhere a real fetch is unwanted.

use sim_api::model::money::Cents;
use sim_api::{PriceFeed, PriceSnapshot, SeriesStats};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct ReplayFeed {
    series: Vec<Cents>,
    cursor: AtomicUsize,
    pinned: Mutex<Option<Cents>>,
}

impl ReplayFeed {
    /// `series` must be non-empty; the first tick is active
    /// immediately.
    pub fn new(series: Vec<Cents>) -> Self {
        assert!(!series.is_empty(), "replay series must not be empty");
        Self {
            series,
            cursor: AtomicUsize::new(0),
            pinned: Mutex::new(None),
        }
    }

    /// Step to the next tick, clamping at the end of the series, and
    /// return it.
    pub fn advance(&self) -> PriceSnapshot {
        let last = self.series.len() - 1;
        let prev = self
            .cursor
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |i| {
                Some((i + 1).min(last))
            })
            .unwrap_or(last);
        self.snapshot_at((prev + 1).min(last))
    }

    fn snapshot_at(&self, idx: usize) -> PriceSnapshot {
        PriceSnapshot {
            price: self.series[idx],
            timestamp: idx as i64,
        }
    }
}

impl PriceFeed for ReplayFeed {
    fn current(&self) -> Option<PriceSnapshot> {
        if let Some(price) = *self.pinned.lock().unwrap() {
            return Some(PriceSnapshot {
                price,
                timestamp: 0,
            });
        }
        let idx = self.cursor.load(Ordering::SeqCst).min(self.series.len() - 1);
        Some(self.snapshot_at(idx))
    }

    fn stats(&self) -> Option<SeriesStats> {
        None
    }

    fn pin(&self, price: Cents) -> PriceSnapshot {
        *self.pinned.lock().unwrap() = Some(price);
        PriceSnapshot {
            price,
            timestamp: 0,
        }
    }

    fn revert(&self) -> Option<PriceSnapshot> {
        *self.pinned.lock().unwrap() = None;
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_walks_the_series_and_clamps() {
        let feed = ReplayFeed::new(vec![10, 20, 30]);
        assert_eq!(feed.current().unwrap().price, 10);
        assert_eq!(feed.advance().price, 20);
        assert_eq!(feed.advance().price, 30);
        // Past the end the last tick repeats.
        assert_eq!(feed.advance().price, 30);
        assert_eq!(feed.current().unwrap().price, 30);
    }

    #[test]
    fn pin_overrides_and_revert_returns_to_the_cursor() {
        let feed = ReplayFeed::new(vec![10, 20]);
        feed.advance();
        assert_eq!(feed.pin(99).price, 99);
        assert_eq!(feed.current().unwrap().price, 99);
        assert_eq!(feed.revert().unwrap().price, 20);
    }
}
