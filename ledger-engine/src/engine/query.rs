//! Read-only account views: balance report, trade history,
//! leaderboard.

use super::SimEngine;
use crate::store;
use sim_api::{Account, BalanceReport, Caller, LeaderboardRow, PriceSnapshot, Reply, SimResult};
use sim_api::model::money::{asset_to_cash, Cents};

pub use sim_api::RankBy;

pub const HISTORY_LIMIT: usize = 10;

pub fn balance(engine: &SimEngine, caller: &dyn Caller, price: &PriceSnapshot) -> SimResult<Reply> {
    let acct = engine.store().get_or_create(
        caller.account_id(),
        caller.display_name(),
        engine.config().seed_cash,
        engine.now(),
    )?;
    Ok(Reply::Balance(BalanceReport {
        cash_available: acct.cash_available,
        cash_reserved: acct.cash_reserved,
        asset_available: acct.asset_available,
        asset_reserved: acct.asset_reserved,
        asset_value: asset_to_cash(acct.total_asset(), price.price),
        net_worth: acct.net_worth(price.price),
        pnl: acct.pnl(price.price, engine.config().seed_cash),
    }))
}

pub fn history(engine: &SimEngine, caller: &dyn Caller, limit: usize) -> SimResult<Reply> {
    let trades = engine
        .store()
        .read(|conn| store::trades_for(conn, caller.account_id(), limit))?;
    Ok(Reply::History(trades))
}

/// Top accounts by the chosen key. Valuation runs in Rust rather than
/// SQL so holdings are priced with the same overflow-checked integer
/// conversion as everything else.
///
/// The cash ranking orders by spendable cash only; funds reserved for
/// open orders do not count toward the key.
pub fn leaderboard(
    engine: &SimEngine,
    price: Cents,
    top_n: usize,
    rank: RankBy,
) -> SimResult<Vec<LeaderboardRow>> {
    let mut accounts = engine.store().all_accounts()?;
    accounts.sort_by(|a, b| {
        let key = |acct: &Account| match rank {
            RankBy::NetWorth => acct.net_worth(price),
            RankBy::Cash => acct.cash_available,
        };
        key(b).cmp(&key(a)).then(a.account_id.cmp(&b.account_id))
    });
    accounts.truncate(top_n);

    Ok(accounts
        .into_iter()
        .map(|a| LeaderboardRow {
            account_id: a.account_id,
            name: a.name.clone(),
            cash: a.total_cash(),
            asset: a.total_asset(),
            net_worth: a.net_worth(price),
        })
        .collect())
}
