//! Console rendering of engine replies. The core hands back typed
//! values; all formatting lives here.

use sim_api::model::money::{fmt_btc, fmt_usd, Cents};
use sim_api::{Order, Reply, SeriesStats, TradeKind};

/// Percentage change for display only; ledger math never touches
/// floats.
fn pct(current: Cents, reference: Cents) -> f64 {
    if reference == 0 {
        return 0.0;
    }
    (current as f64 / reference as f64 - 1.0) * 100.0
}

fn order_line(o: &Order) -> String {
    format!(
        "#{} {} {} {} limit {} ({})",
        o.order_id,
        o.side.as_str(),
        fmt_btc(o.requested_qty),
        if o.filled_qty > 0 {
            format!("filled {}", fmt_btc(o.filled_qty))
        } else {
            String::new()
        },
        fmt_usd(o.limit_price),
        o.status
    )
}

fn stats_block(price: Cents, stats: &SeriesStats) -> String {
    format!(
        "price {} ({:+.2}% 24h, {:+.2}% 7d)\n\
         sma30 {}  sma90 {}\n\
         90d range {} - {}\n\
         24h volume {}  market cap {}",
        fmt_usd(price),
        pct(price, stats.prev_day),
        pct(price, stats.prev_week),
        fmt_usd(stats.sma30),
        fmt_usd(stats.sma90),
        fmt_usd(stats.low90),
        fmt_usd(stats.high90),
        fmt_usd(stats.volume24h),
        fmt_usd(stats.market_cap),
    )
}

pub fn render(name: &str, reply: &Reply) -> String {
    match reply {
        Reply::Trade {
            kind,
            asset_qty,
            cash_value,
            price,
        } => {
            let verb = match kind {
                TradeKind::Buy => "bought",
                TradeKind::Sell => "sold",
            };
            format!(
                "{name} {verb} {} for {} at {}",
                fmt_btc(*asset_qty),
                fmt_usd(*cash_value),
                fmt_usd(*price)
            )
        }
        Reply::Balance(b) => format!(
            "{name}: cash {} (+{} reserved), {} (+{} reserved)\n\
             holdings value {}  net worth {}  pnl {}",
            fmt_usd(b.cash_available),
            fmt_usd(b.cash_reserved),
            fmt_btc(b.asset_available),
            fmt_btc(b.asset_reserved),
            fmt_usd(b.asset_value),
            fmt_usd(b.net_worth),
            fmt_usd(b.pnl),
        ),
        Reply::Stats {
            price,
            stats,
            leaderboard,
        } => {
            let mut out = match stats {
                Some(s) => stats_block(*price, s),
                None => format!("price {}", fmt_usd(*price)),
            };
            out.push_str("\nleaderboard:");
            if leaderboard.is_empty() {
                out.push_str(" no players yet");
            }
            for (i, row) in leaderboard.iter().enumerate() {
                out.push_str(&format!(
                    "\n  {}. {}  {}",
                    i + 1,
                    row.name,
                    fmt_usd(row.net_worth)
                ));
            }
            out
        }
        Reply::History(trades) => {
            if trades.is_empty() {
                return format!("{name}: no trades yet");
            }
            trades
                .iter()
                .map(|t| {
                    let verb = match t.kind {
                        TradeKind::Buy => "buy",
                        TradeKind::Sell => "sell",
                    };
                    format!(
                        "#{} {verb} {} for {} at {}",
                        t.tx_id,
                        fmt_btc(t.asset_qty),
                        fmt_usd(t.cash_value),
                        fmt_usd(t.price)
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        Reply::OrderPlaced(o) => format!("{name} placed order {}", order_line(o)),
        Reply::OrderCancelled(o) => format!("{name} cancelled order {}", order_line(o)),
        Reply::OpenOrders(orders) => {
            if orders.is_empty() {
                return format!("{name}: no open orders");
            }
            orders.iter().map(order_line).collect::<Vec<_>>().join("\n")
        }
        Reply::AccountReset { account_id } => format!("account {account_id} reset"),
        Reply::Granted {
            account_id,
            cash,
            asset,
        } => format!(
            "granted account {account_id}: {} and {}",
            fmt_usd(*cash),
            fmt_btc(*asset)
        ),
        Reply::PricePinned(snap) => format!("price pinned at {}", fmt_usd(snap.price)),
        Reply::PriceReverted(Some(snap)) => {
            format!("price reverted to {}", fmt_usd(snap.price))
        }
        Reply::PriceReverted(None) => "price pin cleared; waiting for next fetch".to_string(),
        Reply::Help(text) => (*text).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_api::BalanceReport;

    #[test]
    fn trade_line_uses_minor_unit_formatting() {
        let line = render(
            "alice",
            &Reply::Trade {
                kind: TradeKind::Buy,
                asset_qty: 200_000_000,
                cash_value: 100_000,
                price: 50_000,
            },
        );
        assert_eq!(line, "alice bought 2.00000000 BTC for $1000.00 at $500.00");
    }

    #[test]
    fn balance_lists_reserved_columns() {
        let line = render(
            "alice",
            &Reply::Balance(BalanceReport {
                cash_available: 60_000,
                cash_reserved: 40_000,
                asset_available: 0,
                asset_reserved: 0,
                asset_value: 0,
                net_worth: 100_000,
                pnl: 0,
            }),
        );
        assert!(line.contains("$600.00 (+$400.00 reserved)"));
        assert!(line.contains("net worth $1000.00"));
    }

    #[test]
    fn pct_handles_zero_reference() {
        assert_eq!(pct(100, 0), 0.0);
        assert!((pct(110, 100) - 10.0).abs() < 1e-9);
    }
}
