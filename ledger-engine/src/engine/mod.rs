//! Command dispatch and the trading core.

use crate::store::LedgerStore;
use chrono::Utc;
use sim_api::model::money::Cents;
use sim_api::{
    Caller, Command, PriceFeed, PriceSnapshot, Reply, SeriesStats, SimError, SimResult,
};
use std::collections::HashSet;
use std::sync::Arc;

mod admin;
mod market;
mod orders;
mod query;
mod settlement;

#[cfg(test)]
mod tests;

pub use query::RankBy;
pub use settlement::SettleSummary;

pub const HELP_TEXT: &str = "\
!buy <usd|all>                 market buy
!sell <amount|all>             market sell (<1 = BTC, >=1 = USD)
!buyorder <usd> <limit>        resting buy order
!sellorder <btc> <limit>       resting sell order
!cancelorder <id>              cancel an open order
!myorders                      list open orders
!balance | !stats | !history   account views
!admin resetuser|givecash|givebtc|setprice|revertprice";

/// How many rows the stats leaderboard shows.
const LEADERBOARD_TOP: usize = 5;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Starting cash granted to a newly created account, in cents.
    pub seed_cash: Cents,
    /// Account ids allowed to run admin commands.
    pub admin_ids: HashSet<i64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed_cash: 100_000,
            admin_ids: HashSet::new(),
        }
    }
}

pub struct SimEngine {
    store: LedgerStore,
    cfg: EngineConfig,
    feed: Arc<dyn PriceFeed>,
}

impl SimEngine {
    pub fn new(store: LedgerStore, cfg: EngineConfig, feed: Arc<dyn PriceFeed>) -> Self {
        Self { store, cfg, feed }
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub(crate) fn now(&self) -> i64 {
        Utc::now().timestamp()
    }

    /// Handle one inbound command. The price snapshot is injected by
    /// the caller; handlers that need one reject with
    /// `PriceUnavailable` instead of waiting on a fetch.
    pub fn handle(
        &self,
        caller: &dyn Caller,
        cmd: Command,
        price: Option<&PriceSnapshot>,
        stats: Option<&SeriesStats>,
    ) -> SimResult<Reply> {
        let need_price = || price.ok_or(SimError::PriceUnavailable);

        match cmd {
            Command::Buy(amount) => market::market_buy(self, caller, amount, need_price()?),
            Command::Sell(amount) => market::market_sell(self, caller, amount, need_price()?),
            Command::Balance => query::balance(self, caller, need_price()?),
            Command::Stats => {
                let price = need_price()?;
                let leaderboard =
                    query::leaderboard(self, price.price, LEADERBOARD_TOP, RankBy::NetWorth)?;
                Ok(Reply::Stats {
                    price: price.price,
                    stats: stats.cloned(),
                    leaderboard,
                })
            }
            Command::History => query::history(self, caller, query::HISTORY_LIMIT),
            Command::BuyOrder { spend, limit_price } => {
                orders::place_buy_order(self, caller, spend, limit_price)
            }
            Command::SellOrder { qty, limit_price } => {
                orders::place_sell_order(self, caller, qty, limit_price)
            }
            Command::CancelOrder { order_id } => orders::cancel_order(self, caller, order_id),
            Command::MyOrders => orders::my_orders(self, caller),
            Command::Admin(cmd) => {
                if !self.cfg.admin_ids.contains(&caller.account_id()) {
                    return Err(SimError::Unauthorized);
                }
                admin::handle(self, cmd)
            }
            Command::Help => Ok(Reply::Help(HELP_TEXT)),
        }
    }

    /// Re-evaluate every open limit order against a fresh price tick.
    pub fn settle(&self, price: &PriceSnapshot) -> SimResult<SettleSummary> {
        settlement::settle(self, price)
    }

    pub(crate) fn feed(&self) -> &dyn PriceFeed {
        self.feed.as_ref()
    }
}
