//! Market order executor: immediate settlement at the live price.

use super::SimEngine;
use crate::store::{self, LedgerDelta};
use log::info;
use sim_api::model::money::{asset_to_cash, cash_to_asset};
use sim_api::{BuyAmount, Caller, PriceSnapshot, Reply, SellAmount, SimError, SimResult, TradeKind};

pub fn market_buy(
    engine: &SimEngine,
    caller: &dyn Caller,
    amount: BuyAmount,
    price: &PriceSnapshot,
) -> SimResult<Reply> {
    let now = engine.now();
    let reply = engine.store().with_tx(|tx| {
        let acct = store::ensure_account(
            tx,
            caller.account_id(),
            caller.display_name(),
            engine.config().seed_cash,
            now,
        )?;

        let cents = match amount {
            BuyAmount::All => acct.cash_available,
            BuyAmount::Cash(c) => c,
        };
        if cents <= 0 || cents > acct.cash_available {
            return Err(SimError::InvalidAmount(format!(
                "buy amount {cents} outside (0, {}]",
                acct.cash_available
            )));
        }

        let sats = cash_to_asset(cents, price.price);
        if sats == 0 {
            return Err(SimError::AmountTooSmall);
        }

        store::apply_delta(
            tx,
            acct.account_id,
            &LedgerDelta {
                cash_available: -cents,
                asset_available: sats,
                ..Default::default()
            },
        )?;
        store::record_trade(tx, acct.account_id, TradeKind::Buy, sats, cents, price.price, now)?;

        Ok(Reply::Trade {
            kind: TradeKind::Buy,
            asset_qty: sats,
            cash_value: cents,
            price: price.price,
        })
    })?;

    info!(
        "market buy: account={} spent={:?}",
        caller.account_id(),
        amount
    );
    Ok(reply)
}

pub fn market_sell(
    engine: &SimEngine,
    caller: &dyn Caller,
    amount: SellAmount,
    price: &PriceSnapshot,
) -> SimResult<Reply> {
    let now = engine.now();
    let reply = engine.store().with_tx(|tx| {
        let acct = store::ensure_account(
            tx,
            caller.account_id(),
            caller.display_name(),
            engine.config().seed_cash,
            now,
        )?;

        let sats = match amount {
            SellAmount::All => acct.asset_available,
            SellAmount::Asset(q) => q,
            // USD value liquidated at the live price.
            SellAmount::Cash(c) => cash_to_asset(c, price.price),
        };
        if sats <= 0 || sats > acct.asset_available {
            return Err(SimError::InvalidAmount(format!(
                "sell quantity {sats} outside (0, {}]",
                acct.asset_available
            )));
        }

        let proceeds = asset_to_cash(sats, price.price);

        store::apply_delta(
            tx,
            acct.account_id,
            &LedgerDelta {
                cash_available: proceeds,
                asset_available: -sats,
                ..Default::default()
            },
        )?;
        store::record_trade(
            tx,
            acct.account_id,
            TradeKind::Sell,
            sats,
            proceeds,
            price.price,
            now,
        )?;

        Ok(Reply::Trade {
            kind: TradeKind::Sell,
            asset_qty: sats,
            cash_value: proceeds,
            price: price.price,
        })
    })?;

    info!(
        "market sell: account={} amount={:?}",
        caller.account_id(),
        amount
    );
    Ok(reply)
}
