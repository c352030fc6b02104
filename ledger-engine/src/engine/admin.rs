//! Operator commands. Authorization is enforced at the dispatch
//! boundary before control reaches this module.

use super::SimEngine;
use crate::store::{self, LedgerDelta};
use log::info;
use sim_api::{AdminCommand, Reply, SimResult};

pub fn handle(engine: &SimEngine, cmd: AdminCommand) -> SimResult<Reply> {
    match cmd {
        AdminCommand::ResetUser { account_id } => {
            engine
                .store()
                .reset_account(account_id, engine.config().seed_cash, engine.now())?;
            info!("account {account_id} reset");
            Ok(Reply::AccountReset { account_id })
        }
        AdminCommand::GiveCash { account_id, amount } => {
            grant(engine, account_id, amount, 0)
        }
        AdminCommand::GiveBtc { account_id, amount } => {
            grant(engine, account_id, 0, amount)
        }
        AdminCommand::SetPrice { price } => {
            let snapshot = engine.feed().pin(price);
            // The pinned price is live immediately, so resting orders
            // settle against it right away.
            engine.settle(&snapshot)?;
            info!("price pinned at {}", snapshot.price);
            Ok(Reply::PricePinned(snapshot))
        }
        AdminCommand::RevertPrice => {
            let snapshot = engine.feed().revert();
            if let Some(snap) = &snapshot {
                engine.settle(snap)?;
                info!("price reverted to {}", snap.price);
            }
            Ok(Reply::PriceReverted(snapshot))
        }
    }
}

fn grant(engine: &SimEngine, account_id: i64, cash: i64, asset: i64) -> SimResult<Reply> {
    let now = engine.now();
    engine.store().with_tx(|tx| {
        store::ensure_account_by_id(tx, account_id, engine.config().seed_cash, now)?;
        store::apply_delta(
            tx,
            account_id,
            &LedgerDelta {
                cash_available: cash,
                asset_available: asset,
                ..Default::default()
            },
        )?;
        Ok(())
    })?;
    info!("granted account {account_id}: cash={cash} asset={asset}");
    Ok(Reply::Granted {
        account_id,
        cash,
        asset,
    })
}
