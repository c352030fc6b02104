use super::*;
use crate::store::LedgerStore;
use sim_api::model::money::{asset_to_cash, SATOSHI};
use sim_api::{
    AdminCommand, BuyAmount, Identity, Order, OrderStatus, Reply, SellAmount, TradeKind,
};
use std::sync::Mutex;

/// Deterministic feed for tests: a fixed base price plus an optional
/// pin, mirroring the runtime adapter's pin/revert contract.
struct StaticFeed {
    base: Mutex<Option<Cents>>,
    pinned: Mutex<Option<Cents>>,
}

impl StaticFeed {
    fn new(base: Cents) -> Self {
        Self {
            base: Mutex::new(Some(base)),
            pinned: Mutex::new(None),
        }
    }
}

fn snap(price: Cents) -> PriceSnapshot {
    PriceSnapshot {
        price,
        timestamp: 0,
    }
}

impl PriceFeed for StaticFeed {
    fn current(&self) -> Option<PriceSnapshot> {
        let pinned = *self.pinned.lock().unwrap();
        pinned.or(*self.base.lock().unwrap()).map(snap)
    }

    fn stats(&self) -> Option<SeriesStats> {
        None
    }

    fn pin(&self, price: Cents) -> PriceSnapshot {
        *self.pinned.lock().unwrap() = Some(price);
        snap(price)
    }

    fn revert(&self) -> Option<PriceSnapshot> {
        *self.pinned.lock().unwrap() = None;
        self.base.lock().unwrap().map(snap)
    }
}

fn engine() -> SimEngine {
    engine_at(50_000)
}

fn engine_at(base_price: Cents) -> SimEngine {
    let store = LedgerStore::open_in_memory().unwrap();
    let cfg = EngineConfig {
        seed_cash: 100_000,
        admin_ids: [99].into_iter().collect(),
    };
    SimEngine::new(store, cfg, Arc::new(StaticFeed::new(base_price)))
}

fn alice() -> Identity {
    Identity::new(1, "alice")
}

fn account(engine: &SimEngine, id: i64) -> sim_api::Account {
    engine.store().get_or_create(id, "x", 100_000, 0).unwrap()
}

fn placed_order(reply: Reply) -> Order {
    match reply {
        Reply::OrderPlaced(o) => o,
        other => panic!("expected OrderPlaced, got {other:?}"),
    }
}

#[test]
fn market_buy_all_converts_whole_balance() {
    let engine = engine();
    let reply = engine
        .handle(&alice(), Command::Buy(BuyAmount::All), Some(&snap(50_000)), None)
        .unwrap();

    match reply {
        Reply::Trade {
            kind,
            asset_qty,
            cash_value,
            price,
        } => {
            assert_eq!(kind, TradeKind::Buy);
            // 100_000 cents at 50_000 cents/BTC buys exactly 2 BTC.
            assert_eq!(asset_qty, 2 * SATOSHI);
            assert_eq!(cash_value, 100_000);
            assert_eq!(price, 50_000);
        }
        other => panic!("expected Trade, got {other:?}"),
    }

    let a = account(&engine, 1);
    assert_eq!(a.cash_available, 0);
    assert_eq!(a.asset_available, 2 * SATOSHI);
}

#[test]
fn market_buy_rejects_overspend_and_dust() {
    let engine = engine();
    let err = engine
        .handle(
            &alice(),
            Command::Buy(BuyAmount::Cash(100_001)),
            Some(&snap(50_000)),
            None,
        )
        .unwrap_err();
    assert!(matches!(err, SimError::InvalidAmount(_)));

    // 1 cent at a price above $1M/BTC rounds to zero sats.
    let engine = engine_at(200_000_000);
    let err = engine
        .handle(
            &alice(),
            Command::Buy(BuyAmount::Cash(1)),
            Some(&snap(200_000_000)),
            None,
        )
        .unwrap_err();
    assert_eq!(err, SimError::AmountTooSmall);

    let a = account(&engine, 1);
    assert_eq!(a.cash_available, 100_000);
}

#[test]
fn market_sell_round_trip_conserves_value() {
    let engine = engine();
    let price = snap(50_000);
    engine
        .handle(&alice(), Command::Buy(BuyAmount::All), Some(&price), None)
        .unwrap();
    let reply = engine
        .handle(&alice(), Command::Sell(SellAmount::All), Some(&price), None)
        .unwrap();

    match reply {
        Reply::Trade {
            kind, cash_value, ..
        } => {
            assert_eq!(kind, TradeKind::Sell);
            assert_eq!(cash_value, 100_000);
        }
        other => panic!("expected Trade, got {other:?}"),
    }
    let a = account(&engine, 1);
    assert_eq!(a.cash_available, 100_000);
    assert_eq!(a.asset_available, 0);
}

#[test]
fn commands_without_price_are_rejected() {
    let engine = engine();
    for cmd in [
        Command::Buy(BuyAmount::All),
        Command::Sell(SellAmount::All),
        Command::Balance,
        Command::Stats,
    ] {
        let err = engine.handle(&alice(), cmd, None, None).unwrap_err();
        assert_eq!(err, SimError::PriceUnavailable);
    }
}

#[test]
fn buy_order_reserves_and_cancel_restores_exactly() {
    let engine = engine();
    let reply = engine
        .handle(
            &alice(),
            Command::BuyOrder {
                spend: 40_000,
                limit_price: 45_000,
            },
            None,
            None,
        )
        .unwrap();
    let order = placed_order(reply);
    assert_eq!(order.status, OrderStatus::Open);
    assert_eq!(order.reserved_value, 40_000);

    let a = account(&engine, 1);
    assert_eq!(a.cash_available, 60_000);
    assert_eq!(a.cash_reserved, 40_000);

    engine
        .handle(
            &alice(),
            Command::CancelOrder {
                order_id: order.order_id,
            },
            None,
            None,
        )
        .unwrap();
    let a = account(&engine, 1);
    assert_eq!(a.cash_available, 100_000);
    assert_eq!(a.cash_reserved, 0);
}

#[test]
fn second_full_balance_buy_order_fails() {
    let engine = engine();
    engine
        .handle(
            &alice(),
            Command::BuyOrder {
                spend: 100_000,
                limit_price: 45_000,
            },
            None,
            None,
        )
        .unwrap();
    let err = engine
        .handle(
            &alice(),
            Command::BuyOrder {
                spend: 100_000,
                limit_price: 45_000,
            },
            None,
            None,
        )
        .unwrap_err();
    assert!(matches!(err, SimError::InsufficientFunds { .. }));

    // The reservation from the first order is intact.
    let a = account(&engine, 1);
    assert_eq!(a.cash_available, 0);
    assert_eq!(a.cash_reserved, 100_000);
}

#[test]
fn sell_order_waits_below_limit_and_fills_at_it() {
    let engine = engine();
    let price = snap(50_000);
    engine
        .handle(&alice(), Command::Buy(BuyAmount::All), Some(&price), None)
        .unwrap();
    let reply = engine
        .handle(
            &alice(),
            Command::SellOrder {
                qty: 100_000,
                limit_price: 60_000,
            },
            None,
            None,
        )
        .unwrap();
    let order = placed_order(reply);

    // Below the limit nothing happens.
    let summary = engine.settle(&snap(55_000)).unwrap();
    assert_eq!(summary.filled, 0);
    let open = engine
        .store()
        .read(|conn| crate::store::fetch_order(conn, order.order_id))
        .unwrap()
        .unwrap();
    assert_eq!(open.status, OrderStatus::Open);

    // At the limit the order fills at the live price.
    let summary = engine.settle(&snap(60_000)).unwrap();
    assert_eq!(summary.filled, 1);
    let filled = engine
        .store()
        .read(|conn| crate::store::fetch_order(conn, order.order_id))
        .unwrap()
        .unwrap();
    assert_eq!(filled.status, OrderStatus::Filled);
    assert_eq!(filled.filled_qty, 100_000);

    let a = account(&engine, 1);
    assert_eq!(a.asset_reserved, 0);
    // 100_000 sats at 60_000 cents/BTC is 60 cents of proceeds.
    assert_eq!(a.cash_available, 60);

    // A second pass at the same price is a no-op.
    let summary = engine.settle(&snap(60_000)).unwrap();
    assert_eq!(summary, SettleSummary::default());
}

#[test]
fn buy_order_fills_at_live_price_consuming_full_reservation() {
    let engine = engine();
    engine
        .handle(
            &alice(),
            Command::BuyOrder {
                spend: 90_000,
                limit_price: 45_000,
            },
            None,
            None,
        )
        .unwrap();

    // The tick beats the limit; the whole reservation converts at the
    // live price with no cash refund.
    let summary = engine.settle(&snap(40_000)).unwrap();
    assert_eq!(summary.filled, 1);

    let a = account(&engine, 1);
    assert_eq!(a.cash_reserved, 0);
    assert_eq!(a.cash_available, 10_000);
    // 90_000 cents at 40_000 cents/BTC.
    assert_eq!(a.asset_available, 225 * SATOSHI / 100);
}

#[test]
fn zero_quantity_buy_fill_auto_cancels_with_refund() {
    let engine = engine_at(150_000_000);
    engine
        .handle(
            &alice(),
            Command::BuyOrder {
                spend: 1,
                limit_price: 200_000_000,
            },
            None,
            None,
        )
        .unwrap();

    // 1 cent at $1.5M/BTC rounds to zero sats.
    let summary = engine.settle(&snap(150_000_000)).unwrap();
    assert_eq!(summary.filled, 0);
    assert_eq!(summary.cancelled, 1);

    let a = account(&engine, 1);
    assert_eq!(a.cash_available, 100_000);
    assert_eq!(a.cash_reserved, 0);

    // Auto-cancellation is not a trade.
    match engine.handle(&alice(), Command::History, None, None).unwrap() {
        Reply::History(trades) => assert!(trades.is_empty()),
        other => panic!("expected History, got {other:?}"),
    }

    let orders = engine
        .store()
        .read(|conn| crate::store::open_orders_for(conn, 1))
        .unwrap();
    assert!(orders.is_empty());
}

#[test]
fn cancel_is_rejected_on_filled_and_foreign_orders() {
    let engine = engine();
    let price = snap(50_000);
    engine
        .handle(&alice(), Command::Buy(BuyAmount::All), Some(&price), None)
        .unwrap();
    let order = placed_order(
        engine
            .handle(
                &alice(),
                Command::SellOrder {
                    qty: 100_000,
                    limit_price: 50_000,
                },
                None,
                None,
            )
            .unwrap(),
    );
    engine.settle(&price).unwrap();

    let err = engine
        .handle(
            &alice(),
            Command::CancelOrder {
                order_id: order.order_id,
            },
            None,
            None,
        )
        .unwrap_err();
    assert_eq!(err, SimError::NotCancellable(order.order_id));

    // Another caller never sees the order at all.
    let err = engine
        .handle(
            &Identity::new(2, "bob"),
            Command::CancelOrder {
                order_id: order.order_id,
            },
            None,
            None,
        )
        .unwrap_err();
    assert_eq!(err, SimError::NotFound(order.order_id));

    let a = account(&engine, 1);
    assert_eq!(a.asset_reserved, 0);
}

#[test]
fn balance_report_values_holdings_and_pnl() {
    let engine = engine();
    let price = snap(50_000);
    engine
        .handle(
            &alice(),
            Command::Buy(BuyAmount::Cash(50_000)),
            Some(&price),
            None,
        )
        .unwrap();

    match engine
        .handle(&alice(), Command::Balance, Some(&snap(100_000)), None)
        .unwrap()
    {
        Reply::Balance(report) => {
            assert_eq!(report.cash_available, 50_000);
            assert_eq!(report.asset_available, SATOSHI);
            // 1 BTC revalued at 100_000 cents.
            assert_eq!(report.asset_value, 100_000);
            assert_eq!(report.net_worth, 150_000);
            assert_eq!(report.pnl, 50_000);
        }
        other => panic!("expected Balance, got {other:?}"),
    }
}

#[test]
fn leaderboard_ranks_by_either_key() {
    let engine = engine();
    let price = snap(50_000);
    // alice converts all cash to BTC, bob stays in cash.
    engine
        .handle(&alice(), Command::Buy(BuyAmount::All), Some(&price), None)
        .unwrap();
    engine
        .handle(&Identity::new(2, "bob"), Command::Balance, Some(&price), None)
        .unwrap();

    // After a price doubling alice leads on net worth, bob on cash.
    let by_worth = query::leaderboard(&engine, 100_000, 5, RankBy::NetWorth).unwrap();
    assert_eq!(by_worth[0].account_id, 1);
    assert_eq!(by_worth[0].net_worth, 200_000);

    let by_cash = query::leaderboard(&engine, 100_000, 5, RankBy::Cash).unwrap();
    assert_eq!(by_cash[0].account_id, 2);
    assert_eq!(by_cash[0].cash, 100_000);
}

#[test]
fn cash_rank_counts_spendable_cash_only() {
    let engine = engine();
    let price = snap(50_000);
    // alice has more cash in total, but most of it is reserved.
    engine
        .handle(
            &alice(),
            Command::BuyOrder {
                spend: 90_000,
                limit_price: 40_000,
            },
            None,
            None,
        )
        .unwrap();
    engine
        .handle(
            &Identity::new(2, "bob"),
            Command::Buy(BuyAmount::Cash(30_000)),
            Some(&price),
            None,
        )
        .unwrap();

    // bob's 70_000 spendable beats alice's 10_000.
    let by_cash = query::leaderboard(&engine, 50_000, 5, RankBy::Cash).unwrap();
    assert_eq!(by_cash[0].account_id, 2);
    assert_eq!(by_cash[1].account_id, 1);
    // The row still shows the full cash position.
    assert_eq!(by_cash[1].cash, 100_000);
}

#[test]
fn ledger_stays_closed_across_accounts() {
    let engine = engine();
    let price = snap(50_000);
    let bob = Identity::new(2, "bob");
    let admin = Identity::new(99, "admin");

    // alice converts everything to BTC, then sells half back through
    // a limit fill.
    engine
        .handle(&alice(), Command::Buy(BuyAmount::All), Some(&price), None)
        .unwrap();
    engine
        .handle(
            &alice(),
            Command::SellOrder {
                qty: SATOSHI,
                limit_price: 50_000,
            },
            None,
            None,
        )
        .unwrap();
    engine.settle(&price).unwrap();

    // bob is funded by admin injections, trades, and parks a
    // reservation.
    engine
        .handle(
            &admin,
            Command::Admin(AdminCommand::GiveCash {
                account_id: 2,
                amount: 5_000,
            }),
            None,
            None,
        )
        .unwrap();
    engine
        .handle(
            &admin,
            Command::Admin(AdminCommand::GiveBtc {
                account_id: 2,
                amount: SATOSHI,
            }),
            None,
            None,
        )
        .unwrap();
    engine
        .handle(
            &bob,
            Command::Sell(SellAmount::Asset(50_000_000)),
            Some(&price),
            None,
        )
        .unwrap();
    engine
        .handle(
            &bob,
            Command::BuyOrder {
                spend: 10_000,
                limit_price: 40_000,
            },
            None,
            None,
        )
        .unwrap();

    // Everything traded at one price, so total value equals the two
    // seeds plus the two injections: 100_000 + 100_000 + 5_000 cash
    // + 1 BTC at 50_000.
    let accounts = engine.store().all_accounts().unwrap();
    let total: i64 = accounts
        .iter()
        .map(|a| a.total_cash() + asset_to_cash(a.total_asset(), price.price))
        .sum();
    assert_eq!(total, 255_000);
}

#[test]
fn admin_gate_and_grants() {
    let engine = engine();
    let cmd = Command::Admin(AdminCommand::GiveCash {
        account_id: 1,
        amount: 5_000,
    });

    let err = engine.handle(&alice(), cmd.clone(), None, None).unwrap_err();
    assert_eq!(err, SimError::Unauthorized);

    let admin = Identity::new(99, "admin");
    engine.handle(&admin, cmd, None, None).unwrap();
    engine
        .handle(
            &admin,
            Command::Admin(AdminCommand::GiveBtc {
                account_id: 1,
                amount: SATOSHI,
            }),
            None,
            None,
        )
        .unwrap();

    let a = account(&engine, 1);
    assert_eq!(a.cash_available, 105_000);
    assert_eq!(a.asset_available, SATOSHI);
}

#[test]
fn admin_reset_restores_seed_state() {
    let engine = engine();
    let price = snap(50_000);
    engine
        .handle(&alice(), Command::Buy(BuyAmount::All), Some(&price), None)
        .unwrap();

    engine
        .handle(
            &Identity::new(99, "admin"),
            Command::Admin(AdminCommand::ResetUser { account_id: 1 }),
            None,
            None,
        )
        .unwrap();

    let a = account(&engine, 1);
    assert_eq!(a.cash_available, 100_000);
    assert_eq!(a.asset_available, 0);
    match engine.handle(&alice(), Command::History, None, None).unwrap() {
        Reply::History(trades) => assert!(trades.is_empty()),
        other => panic!("expected History, got {other:?}"),
    }
}

#[test]
fn set_price_settles_immediately_and_revert_restores() {
    let engine = engine();
    let price = snap(50_000);
    engine
        .handle(&alice(), Command::Buy(BuyAmount::All), Some(&price), None)
        .unwrap();
    let order = placed_order(
        engine
            .handle(
                &alice(),
                Command::SellOrder {
                    qty: SATOSHI,
                    limit_price: 80_000,
                },
                None,
                None,
            )
            .unwrap(),
    );

    let admin = Identity::new(99, "admin");
    match engine
        .handle(
            &admin,
            Command::Admin(AdminCommand::SetPrice { price: 80_000 }),
            None,
            None,
        )
        .unwrap()
    {
        Reply::PricePinned(pinned) => assert_eq!(pinned.price, 80_000),
        other => panic!("expected PricePinned, got {other:?}"),
    }

    // The pin drove a settlement pass.
    let filled = engine
        .store()
        .read(|conn| crate::store::fetch_order(conn, order.order_id))
        .unwrap()
        .unwrap();
    assert_eq!(filled.status, OrderStatus::Filled);
    let a = account(&engine, 1);
    assert_eq!(a.cash_available, 80_000);

    match engine
        .handle(&admin, Command::Admin(AdminCommand::RevertPrice), None, None)
        .unwrap()
    {
        Reply::PriceReverted(Some(reverted)) => assert_eq!(reverted.price, 50_000),
        other => panic!("expected PriceReverted, got {other:?}"),
    }
    assert_eq!(engine.feed().current().unwrap().price, 50_000);
}

#[test]
fn balances_never_go_negative_across_mixed_activity() {
    let engine = engine();
    let price = snap(50_000);
    engine
        .handle(&alice(), Command::Buy(BuyAmount::Cash(60_000)), Some(&price), None)
        .unwrap();
    engine
        .handle(
            &alice(),
            Command::BuyOrder {
                spend: 40_000,
                limit_price: 40_000,
            },
            None,
            None,
        )
        .unwrap();
    engine
        .handle(
            &alice(),
            Command::SellOrder {
                qty: 50_000_000,
                limit_price: 70_000,
            },
            None,
            None,
        )
        .unwrap();
    engine.settle(&snap(40_000)).unwrap();
    engine.settle(&snap(70_000)).unwrap();

    let a = account(&engine, 1);
    assert!(a.cash_available >= 0);
    assert!(a.cash_reserved >= 0);
    assert!(a.asset_available >= 0);
    assert!(a.asset_reserved >= 0);
    // Both resting orders have settled; nothing is still reserved.
    assert_eq!(a.cash_reserved, 0);
    assert_eq!(a.asset_reserved, 0);
}
