//! CoinGecko market-chart client.
//!
//! One endpoint serves everything: 90 days of daily closes plus
//! volume and market cap. Floats only exist at this ingestion edge;
//! everything downstream is integer cents.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use log::debug;
use serde::Deserialize;
use sim_api::model::money::Cents;
use sim_api::{PriceSnapshot, SeriesStats};

pub const DEFAULT_URL: &str = "https://api.coingecko.com/api/v3/coins/bitcoin/market_chart\
                               ?vs_currency=usd&days=90&interval=daily";

/// Wire shape of the market-chart response. Each entry is a
/// `[timestamp_ms, value]` pair.
#[derive(Debug, Deserialize)]
struct MarketChart {
    prices: Vec<[f64; 2]>,
    market_caps: Vec<[f64; 2]>,
    total_volumes: Vec<[f64; 2]>,
}

/// One complete fetch: the live snapshot plus series-derived stats.
#[derive(Debug, Clone)]
pub struct MarketData {
    pub snapshot: PriceSnapshot,
    pub stats: SeriesStats,
    /// Daily closes in cents, oldest first.
    pub series: Vec<Cents>,
}

pub struct CoinGeckoClient {
    client: reqwest::Client,
    url: String,
}

impl CoinGeckoClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub async fn fetch(&self) -> Result<MarketData> {
        let chart = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("market chart request failed")?
            .error_for_status()
            .context("market chart request rejected")?
            .json::<MarketChart>()
            .await
            .context("market chart body is not the expected shape")?;

        let data = derive(&chart)?;
        debug!(
            "fetched {} daily closes, live price {} cents",
            data.series.len(),
            data.snapshot.price
        );
        Ok(data)
    }
}

fn usd_to_cents(usd: f64) -> Cents {
    (usd * 100.0).round() as Cents
}

fn derive(chart: &MarketChart) -> Result<MarketData> {
    let series: Vec<Cents> = chart.prices.iter().map(|p| usd_to_cents(p[1])).collect();
    // The digest reaches 8 days back for the weekly change.
    if series.len() < 8 {
        return Err(anyhow!("series too short: {} closes", series.len()));
    }
    let price = *series.last().ok_or_else(|| anyhow!("empty price series"))?;
    if price <= 0 {
        return Err(anyhow!("non-positive live price: {price}"));
    }

    let sma = |n: usize| -> Cents {
        let window = &series[series.len().saturating_sub(n)..];
        window.iter().sum::<Cents>() / window.len() as i64
    };

    let stats = SeriesStats {
        sma30: sma(30),
        sma90: sma(90),
        high90: *series.iter().max().unwrap_or(&price),
        low90: *series.iter().min().unwrap_or(&price),
        prev_day: series[series.len() - 2],
        prev_week: series[series.len() - 8],
        volume24h: chart
            .total_volumes
            .last()
            .map(|v| usd_to_cents(v[1]))
            .unwrap_or(0),
        market_cap: chart
            .market_caps
            .last()
            .map(|v| usd_to_cents(v[1]))
            .unwrap_or(0),
    };

    Ok(MarketData {
        snapshot: PriceSnapshot {
            price,
            timestamp: Utc::now().timestamp(),
        },
        stats,
        series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(closes: &[f64]) -> MarketChart {
        MarketChart {
            prices: closes
                .iter()
                .enumerate()
                .map(|(i, p)| [i as f64 * 86_400_000.0, *p])
                .collect(),
            market_caps: vec![[0.0, 1_000_000.0]],
            total_volumes: vec![[0.0, 50_000.0]],
        }
    }

    #[test]
    fn derive_converts_to_cents_and_reads_series_offsets() {
        let closes: Vec<f64> = (1..=10).map(|d| d as f64 * 100.0).collect();
        let data = derive(&chart(&closes)).unwrap();

        assert_eq!(data.snapshot.price, 100_000);
        assert_eq!(data.stats.prev_day, 90_000);
        assert_eq!(data.stats.prev_week, 30_000);
        assert_eq!(data.stats.high90, 100_000);
        assert_eq!(data.stats.low90, 10_000);
        assert_eq!(data.stats.volume24h, 5_000_000);
        assert_eq!(data.stats.market_cap, 100_000_000);
    }

    #[test]
    fn derive_rejects_short_or_bad_series() {
        assert!(derive(&chart(&[1.0, 2.0, 3.0])).is_err());

        let closes = vec![100.0; 7];
        assert!(derive(&chart(&closes)).is_err());

        let mut closes = vec![100.0; 8];
        *closes.last_mut().unwrap() = 0.0;
        assert!(derive(&chart(&closes)).is_err());
    }

    #[test]
    fn sma_windows_clamp_to_available_history() {
        let closes = vec![200.0; 10];
        let data = derive(&chart(&closes)).unwrap();
        assert_eq!(data.stats.sma30, 20_000);
        assert_eq!(data.stats.sma90, 20_000);
    }

    #[test]
    fn wire_shape_parses() {
        let body = r#"{
            "prices": [[1700000000000, 50000.5], [1700086400000, 51000.0]],
            "market_caps": [[1700086400000, 1000000000000.0]],
            "total_volumes": [[1700086400000, 30000000000.0]]
        }"#;
        let chart: MarketChart = serde_json::from_str(body).unwrap();
        assert_eq!(chart.prices.len(), 2);
        assert_eq!(usd_to_cents(chart.prices[0][1]), 5_000_050);
    }
}
