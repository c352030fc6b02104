//! Limit order placement and cancellation.
//!
//! Placement reserves the committed resource in the same transaction
//! that creates the order row; cancellation releases it in the same
//! transaction that flips the status, so neither can race a
//! concurrent settlement fill.

use super::SimEngine;
use crate::store::{self, LedgerDelta};
use log::info;
use sim_api::model::money::{cash_to_asset, Cents, Sats};
use sim_api::{Caller, OrderSide, OrderStatus, Reply, SimError, SimResult};

pub fn place_buy_order(
    engine: &SimEngine,
    caller: &dyn Caller,
    spend: Cents,
    limit_price: Cents,
) -> SimResult<Reply> {
    if spend <= 0 || limit_price <= 0 {
        return Err(SimError::InvalidAmount(
            "spend and limit price must be positive".into(),
        ));
    }
    let now = engine.now();
    let reply = engine.store().with_tx(|tx| {
        let acct = store::ensure_account(
            tx,
            caller.account_id(),
            caller.display_name(),
            engine.config().seed_cash,
            now,
        )?;
        if acct.cash_available < spend {
            return Err(SimError::InsufficientFunds {
                required: spend,
                available: acct.cash_available,
            });
        }

        store::apply_delta(
            tx,
            acct.account_id,
            &LedgerDelta {
                cash_available: -spend,
                cash_reserved: spend,
                ..Default::default()
            },
        )?;

        // Advisory estimate at the limit; the authoritative committed
        // resource is the reserved cash.
        let estimated_qty = cash_to_asset(spend, limit_price);
        let order_id = store::insert_order(
            tx,
            acct.account_id,
            OrderSide::Buy,
            estimated_qty,
            limit_price,
            spend,
            now,
        )?;
        let order = store::fetch_order(tx, order_id)?
            .ok_or_else(|| SimError::Store("order vanished after insert".into()))?;
        Ok(Reply::OrderPlaced(order))
    })?;

    info!(
        "buy order placed: account={} spend={} limit={}",
        caller.account_id(),
        spend,
        limit_price
    );
    Ok(reply)
}

pub fn place_sell_order(
    engine: &SimEngine,
    caller: &dyn Caller,
    qty: Sats,
    limit_price: Cents,
) -> SimResult<Reply> {
    if qty <= 0 || limit_price <= 0 {
        return Err(SimError::InvalidAmount(
            "quantity and limit price must be positive".into(),
        ));
    }
    let now = engine.now();
    let reply = engine.store().with_tx(|tx| {
        let acct = store::ensure_account(
            tx,
            caller.account_id(),
            caller.display_name(),
            engine.config().seed_cash,
            now,
        )?;
        if acct.asset_available < qty {
            return Err(SimError::InsufficientAsset {
                required: qty,
                available: acct.asset_available,
            });
        }

        store::apply_delta(
            tx,
            acct.account_id,
            &LedgerDelta {
                asset_available: -qty,
                asset_reserved: qty,
                ..Default::default()
            },
        )?;

        let order_id = store::insert_order(
            tx,
            acct.account_id,
            OrderSide::Sell,
            qty,
            limit_price,
            qty,
            now,
        )?;
        let order = store::fetch_order(tx, order_id)?
            .ok_or_else(|| SimError::Store("order vanished after insert".into()))?;
        Ok(Reply::OrderPlaced(order))
    })?;

    info!(
        "sell order placed: account={} qty={} limit={}",
        caller.account_id(),
        qty,
        limit_price
    );
    Ok(reply)
}

pub fn cancel_order(engine: &SimEngine, caller: &dyn Caller, order_id: i64) -> SimResult<Reply> {
    let reply = engine.store().with_tx(|tx| {
        let order = store::fetch_order(tx, order_id)?
            .filter(|o| o.account_id == caller.account_id())
            .ok_or(SimError::NotFound(order_id))?;
        if order.status != OrderStatus::Open {
            return Err(SimError::NotCancellable(order_id));
        }

        let release = match order.side {
            OrderSide::Buy => LedgerDelta {
                cash_available: order.reserved_value,
                cash_reserved: -order.reserved_value,
                ..Default::default()
            },
            OrderSide::Sell => LedgerDelta {
                asset_available: order.reserved_value,
                asset_reserved: -order.reserved_value,
                ..Default::default()
            },
        };
        store::apply_delta(tx, order.account_id, &release)?;
        store::finish_order(tx, order_id, OrderStatus::Cancelled, 0)?;

        let order = store::fetch_order(tx, order_id)?
            .ok_or_else(|| SimError::Store("order vanished during cancel".into()))?;
        Ok(Reply::OrderCancelled(order))
    })?;

    info!(
        "order cancelled: account={} order={}",
        caller.account_id(),
        order_id
    );
    Ok(reply)
}

pub fn my_orders(engine: &SimEngine, caller: &dyn Caller) -> SimResult<Reply> {
    let orders = engine
        .store()
        .read(|conn| store::open_orders_for(conn, caller.account_id()))?;
    Ok(Reply::OpenOrders(orders))
}
