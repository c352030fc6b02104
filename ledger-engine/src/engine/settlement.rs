//! Price-tick settlement of resting limit orders.
//!
//! Each order settles inside its own transaction: one inconsistent
//! account is logged and skipped without aborting the pass, and a
//! repeat pass at the same price is a no-op because fills leave the
//! `open` state in the same atomic unit.

use super::SimEngine;
use crate::store::{self, LedgerDelta};
use log::{info, warn};
use sim_api::model::money::{asset_to_cash, cash_to_asset};
use sim_api::{OrderStatus, PriceSnapshot, SimResult, TradeKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettleSummary {
    pub filled: usize,
    /// Buy orders auto-cancelled because the fill rounded to zero.
    pub cancelled: usize,
    pub skipped: usize,
}

enum Outcome {
    Filled,
    Cancelled,
    Skipped,
}

pub fn settle(engine: &SimEngine, price: &PriceSnapshot) -> SimResult<SettleSummary> {
    let mut summary = SettleSummary::default();
    if price.price <= 0 {
        warn!("settlement skipped: non-positive price {}", price.price);
        return Ok(summary);
    }

    // Snapshot the eligible ids first; each order is then re-checked
    // inside its own transaction.
    let sell_ids = engine
        .store()
        .read(|conn| store::eligible_sell_ids(conn, price.price))?;
    let buy_ids = engine
        .store()
        .read(|conn| store::eligible_buy_ids(conn, price.price))?;

    for order_id in sell_ids {
        match settle_sell(engine, order_id, price) {
            Ok(Outcome::Filled) => summary.filled += 1,
            Ok(_) => summary.skipped += 1,
            Err(e) => {
                warn!("sell order {order_id} settlement failed: {e}");
                summary.skipped += 1;
            }
        }
    }

    for order_id in buy_ids {
        match settle_buy(engine, order_id, price) {
            Ok(Outcome::Filled) => summary.filled += 1,
            Ok(Outcome::Cancelled) => summary.cancelled += 1,
            Ok(Outcome::Skipped) => summary.skipped += 1,
            Err(e) => {
                warn!("buy order {order_id} settlement failed: {e}");
                summary.skipped += 1;
            }
        }
    }

    if summary.filled > 0 || summary.cancelled > 0 {
        info!(
            "settlement at {}: {} filled, {} auto-cancelled, {} skipped",
            price.price, summary.filled, summary.cancelled, summary.skipped
        );
    }
    Ok(summary)
}

fn settle_sell(engine: &SimEngine, order_id: i64, price: &PriceSnapshot) -> SimResult<Outcome> {
    let now = engine.now();
    engine.store().with_tx(|tx| {
        let order = match store::fetch_order(tx, order_id)? {
            Some(o) if o.status == OrderStatus::Open && o.limit_price <= price.price => o,
            _ => return Ok(Outcome::Skipped),
        };

        let qty = order.reserved_value;
        // The limit is a floor; execution happens at the live price.
        let proceeds = asset_to_cash(qty, price.price);

        store::apply_delta(
            tx,
            order.account_id,
            &LedgerDelta {
                cash_available: proceeds,
                asset_reserved: -qty,
                ..Default::default()
            },
        )?;
        store::finish_order(tx, order_id, OrderStatus::Filled, qty)?;
        store::record_trade(
            tx,
            order.account_id,
            TradeKind::Sell,
            qty,
            proceeds,
            price.price,
            now,
        )?;
        Ok(Outcome::Filled)
    })
}

fn settle_buy(engine: &SimEngine, order_id: i64, price: &PriceSnapshot) -> SimResult<Outcome> {
    let now = engine.now();
    engine.store().with_tx(|tx| {
        let order = match store::fetch_order(tx, order_id)? {
            Some(o) if o.status == OrderStatus::Open && o.limit_price >= price.price => o,
            _ => return Ok(Outcome::Skipped),
        };

        let spend = order.reserved_value;
        let sats = cash_to_asset(spend, price.price);

        if sats == 0 {
            // Never leave funds stuck: refund the reservation and
            // retire the order without a trade record.
            store::apply_delta(
                tx,
                order.account_id,
                &LedgerDelta {
                    cash_available: spend,
                    cash_reserved: -spend,
                    ..Default::default()
                },
            )?;
            store::finish_order(tx, order_id, OrderStatus::CancelledError, 0)?;
            warn!(
                "buy order {order_id} cancelled: {spend} cents buys 0 sats at {}",
                price.price
            );
            return Ok(Outcome::Cancelled);
        }

        // The whole reserved value is consumed even when the live
        // price beats the limit; no refund for price improvement.
        store::apply_delta(
            tx,
            order.account_id,
            &LedgerDelta {
                cash_reserved: -spend,
                asset_available: sats,
                ..Default::default()
            },
        )?;
        store::finish_order(tx, order_id, OrderStatus::Filled, sats)?;
        store::record_trade(
            tx,
            order.account_id,
            TradeKind::Buy,
            sats,
            spend,
            price.price,
            now,
        )?;
        Ok(Outcome::Filled)
    })
}
