//! Durable ledger store.
//!
//! Sole writer of balance fields. Every mutating composite operation
//! runs inside one SQL transaction while holding the connection
//! mutex, so the insufficient-balance check and the write can never
//! interleave with another mutation on the same account.

use rusqlite::{params, Connection, OptionalExtension};
use sim_api::model::money::{Cents, Sats};
use sim_api::{Account, Order, OrderSide, OrderStatus, SimError, SimResult, TradeKind, TradeRecord};
use std::path::Path;
use std::sync::Mutex;

mod schema;


/// Maps a SQLite failure into the user-facing taxonomy.
pub(crate) fn db_err(e: rusqlite::Error) -> SimError {
    SimError::Store(e.to_string())
}

pub struct LedgerStore {
    conn: Mutex<Connection>,
}

impl LedgerStore {
    pub fn open<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        Self::from_connection(Connection::open(path).map_err(db_err)?)
    }

    pub fn open_in_memory() -> SimResult<Self> {
        Self::from_connection(Connection::open_in_memory().map_err(db_err)?)
    }

    fn from_connection(conn: Connection) -> SimResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON").map_err(db_err)?;
        schema::init_schema(&conn).map_err(db_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` inside one SQL transaction. Commits on `Ok`, rolls
    /// back every partial effect on `Err`; nothing is ever applied
    /// halfway.
    pub fn with_tx<T>(
        &self,
        f: impl FnOnce(&rusqlite::Transaction<'_>) -> SimResult<T>,
    ) -> SimResult<T> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| SimError::Store("ledger lock poisoned".into()))?;
        let tx = conn.transaction().map_err(db_err)?;
        match f(&tx) {
            Ok(value) => {
                tx.commit().map_err(db_err)?;
                Ok(value)
            }
            Err(e) => {
                let _ = tx.rollback();
                Err(e)
            }
        }
    }

    /// Read-only access outside a transaction.
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> SimResult<T>) -> SimResult<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| SimError::Store("ledger lock poisoned".into()))?;
        f(&conn)
    }

    pub fn get_or_create(
        &self,
        account_id: i64,
        name: &str,
        seed_cash: Cents,
        now: i64,
    ) -> SimResult<Account> {
        self.with_tx(|tx| ensure_account(tx, account_id, name, seed_cash, now))
    }

    /// Seed the balances and purge the account's orders and trade
    /// history, as one atomic unit.
    pub fn reset_account(
        &self,
        account_id: i64,
        seed_cash: Cents,
        now: i64,
    ) -> SimResult<Account> {
        self.with_tx(|tx| {
            ensure_account_by_id(tx, account_id, seed_cash, now)?;
            tx.execute(
                "UPDATE accounts
                 SET cash_available = ?1, cash_reserved = 0,
                     asset_available = 0, asset_reserved = 0
                 WHERE account_id = ?2",
                params![seed_cash, account_id],
            )
            .map_err(db_err)?;
            tx.execute("DELETE FROM orders WHERE account_id = ?1", params![account_id])
                .map_err(db_err)?;
            tx.execute(
                "DELETE FROM transactions WHERE account_id = ?1",
                params![account_id],
            )
            .map_err(db_err)?;
            require_account(tx, account_id)
        })
    }

    pub fn all_accounts(&self) -> SimResult<Vec<Account>> {
        self.read(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT account_id, name, cash_available, cash_reserved,
                            asset_available, asset_reserved, created_at
                     FROM accounts",
                )
                .map_err(db_err)?;
            let rows = stmt
                .query_map([], account_from_row)
                .map_err(db_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(db_err)?;
            Ok(rows)
        })
    }
}

/// Four balance deltas applied as one atomic unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerDelta {
    pub cash_available: Cents,
    pub cash_reserved: Cents,
    pub asset_available: Sats,
    pub asset_reserved: Sats,
}

fn account_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        account_id: row.get(0)?,
        name: row.get(1)?,
        cash_available: row.get(2)?,
        cash_reserved: row.get(3)?,
        asset_available: row.get(4)?,
        asset_reserved: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn order_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Order> {
    let side: String = row.get(2)?;
    let status: String = row.get(7)?;
    Ok(Order {
        order_id: row.get(0)?,
        account_id: row.get(1)?,
        side: OrderSide::from_str(&side).unwrap_or(OrderSide::Buy),
        requested_qty: row.get(3)?,
        filled_qty: row.get(4)?,
        limit_price: row.get(5)?,
        reserved_value: row.get(6)?,
        status: OrderStatus::from_str(&status).unwrap_or(OrderStatus::Cancelled),
        created_at: row.get(8)?,
    })
}

const ORDER_COLUMNS: &str = "order_id, account_id, side, requested_qty, filled_qty,
                             limit_price, reserved_value, status, created_at";

pub fn fetch_account(conn: &Connection, account_id: i64) -> SimResult<Option<Account>> {
    conn.query_row(
        "SELECT account_id, name, cash_available, cash_reserved,
                asset_available, asset_reserved, created_at
         FROM accounts WHERE account_id = ?1",
        params![account_id],
        account_from_row,
    )
    .optional()
    .map_err(db_err)
}

pub fn require_account(conn: &Connection, account_id: i64) -> SimResult<Account> {
    fetch_account(conn, account_id)?
        .ok_or_else(|| SimError::Store(format!("account {account_id} missing")))
}

/// Upsert keyed on the caller's id: creates the row with seed cash on
/// first touch, and refreshes the stored display name on every later
/// one so renames propagate.
pub fn ensure_account(
    conn: &Connection,
    account_id: i64,
    name: &str,
    seed_cash: Cents,
    now: i64,
) -> SimResult<Account> {
    conn.execute(
        "INSERT INTO accounts (account_id, name, cash_available, cash_reserved,
                               asset_available, asset_reserved, created_at)
         VALUES (?1, ?2, ?3, 0, 0, 0, ?4)
         ON CONFLICT(account_id) DO UPDATE SET name = excluded.name",
        params![account_id, name, seed_cash, now],
    )
    .map_err(db_err)?;
    require_account(conn, account_id)
}

/// Creation for paths that only know the account id (admin grants and
/// resets). Inserts a placeholder name for a new row and never touches
/// an existing one; the placeholder heals on the account's next own
/// command.
pub fn ensure_account_by_id(
    conn: &Connection,
    account_id: i64,
    seed_cash: Cents,
    now: i64,
) -> SimResult<Account> {
    conn.execute(
        "INSERT INTO accounts (account_id, name, cash_available, cash_reserved,
                               asset_available, asset_reserved, created_at)
         VALUES (?1, 'unknown', ?2, 0, 0, 0, ?3)
         ON CONFLICT(account_id) DO NOTHING",
        params![account_id, seed_cash, now],
    )
    .map_err(db_err)?;
    require_account(conn, account_id)
}

/// Apply all four deltas atomically, failing the whole unit if any
/// resulting field would go negative.
pub fn apply_delta(conn: &Connection, account_id: i64, delta: &LedgerDelta) -> SimResult<Account> {
    let acct = require_account(conn, account_id)?;
    let overflow = || SimError::Store("balance overflow".into());

    let cash_available = acct
        .cash_available
        .checked_add(delta.cash_available)
        .ok_or_else(overflow)?;
    let cash_reserved = acct
        .cash_reserved
        .checked_add(delta.cash_reserved)
        .ok_or_else(overflow)?;
    let asset_available = acct
        .asset_available
        .checked_add(delta.asset_available)
        .ok_or_else(overflow)?;
    let asset_reserved = acct
        .asset_reserved
        .checked_add(delta.asset_reserved)
        .ok_or_else(overflow)?;

    if cash_available < 0 {
        return Err(SimError::InsufficientFunds {
            required: -delta.cash_available,
            available: acct.cash_available,
        });
    }
    if cash_reserved < 0 {
        return Err(SimError::InsufficientFunds {
            required: -delta.cash_reserved,
            available: acct.cash_reserved,
        });
    }
    if asset_available < 0 {
        return Err(SimError::InsufficientAsset {
            required: -delta.asset_available,
            available: acct.asset_available,
        });
    }
    if asset_reserved < 0 {
        return Err(SimError::InsufficientAsset {
            required: -delta.asset_reserved,
            available: acct.asset_reserved,
        });
    }

    conn.execute(
        "UPDATE accounts
         SET cash_available = ?1, cash_reserved = ?2,
             asset_available = ?3, asset_reserved = ?4
         WHERE account_id = ?5",
        params![cash_available, cash_reserved, asset_available, asset_reserved, account_id],
    )
    .map_err(db_err)?;

    Ok(Account {
        cash_available,
        cash_reserved,
        asset_available,
        asset_reserved,
        ..acct
    })
}

/// Append one immutable trade row. Always called inside the same
/// transaction as the balance mutation it documents.
pub fn record_trade(
    conn: &Connection,
    account_id: i64,
    kind: TradeKind,
    asset_qty: Sats,
    cash_value: Cents,
    price: Cents,
    now: i64,
) -> SimResult<i64> {
    conn.execute(
        "INSERT INTO transactions (account_id, kind, asset_qty, cash_value, price, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![account_id, kind.as_str(), asset_qty, cash_value, price, now],
    )
    .map_err(db_err)?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_order(
    conn: &Connection,
    account_id: i64,
    side: OrderSide,
    requested_qty: Sats,
    limit_price: Cents,
    reserved_value: i64,
    now: i64,
) -> SimResult<i64> {
    conn.execute(
        "INSERT INTO orders (account_id, side, requested_qty, filled_qty,
                             limit_price, reserved_value, status, created_at)
         VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6, ?7)",
        params![
            account_id,
            side.as_str(),
            requested_qty,
            limit_price,
            reserved_value,
            OrderStatus::Open.as_str(),
            now
        ],
    )
    .map_err(db_err)?;
    Ok(conn.last_insert_rowid())
}

pub fn fetch_order(conn: &Connection, order_id: i64) -> SimResult<Option<Order>> {
    conn.query_row(
        &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = ?1"),
        params![order_id],
        order_from_row,
    )
    .optional()
    .map_err(db_err)
}

/// Move an order out of `open`. The state machine is terminal: a row
/// already out of `open` is never written again.
pub fn finish_order(
    conn: &Connection,
    order_id: i64,
    status: OrderStatus,
    filled_qty: Sats,
) -> SimResult<()> {
    debug_assert!(status != OrderStatus::Open);
    conn.execute(
        "UPDATE orders SET status = ?1, filled_qty = ?2
         WHERE order_id = ?3 AND status = 'open'",
        params![status.as_str(), filled_qty, order_id],
    )
    .map_err(db_err)?;
    Ok(())
}

pub fn open_orders_for(conn: &Connection, account_id: i64) -> SimResult<Vec<Order>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE account_id = ?1 AND status = 'open'
             ORDER BY created_at DESC, order_id DESC"
        ))
        .map_err(db_err)?;
    let rows = stmt
        .query_map(params![account_id], order_from_row)
        .map_err(db_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(db_err)?;
    Ok(rows)
}

/// Open sell orders eligible at `price`, best-priced first (lowest
/// limit), oldest first within a tier.
pub fn eligible_sell_ids(conn: &Connection, price: Cents) -> SimResult<Vec<i64>> {
    order_ids(
        conn,
        "SELECT order_id FROM orders
         WHERE status = 'open' AND side = 'sell' AND limit_price <= ?1
         ORDER BY limit_price ASC, created_at ASC, order_id ASC",
        price,
    )
}

/// Open buy orders eligible at `price`, highest willingness-to-pay
/// first, oldest first within a tier.
pub fn eligible_buy_ids(conn: &Connection, price: Cents) -> SimResult<Vec<i64>> {
    order_ids(
        conn,
        "SELECT order_id FROM orders
         WHERE status = 'open' AND side = 'buy' AND limit_price >= ?1
         ORDER BY limit_price DESC, created_at ASC, order_id ASC",
        price,
    )
}

fn order_ids(conn: &Connection, sql: &str, price: Cents) -> SimResult<Vec<i64>> {
    let mut stmt = conn.prepare(sql).map_err(db_err)?;
    let rows = stmt
        .query_map(params![price], |row| row.get(0))
        .map_err(db_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(db_err)?;
    Ok(rows)
}

pub fn trades_for(conn: &Connection, account_id: i64, limit: usize) -> SimResult<Vec<TradeRecord>> {
    let mut stmt = conn
        .prepare(
            "SELECT tx_id, account_id, kind, asset_qty, cash_value, price, created_at
             FROM transactions WHERE account_id = ?1
             ORDER BY created_at DESC, tx_id DESC
             LIMIT ?2",
        )
        .map_err(db_err)?;
    let rows = stmt
        .query_map(params![account_id, limit as i64], |row| {
            let kind: String = row.get(2)?;
            Ok(TradeRecord {
                tx_id: row.get(0)?,
                account_id: row.get(1)?,
                kind: TradeKind::from_str(&kind).unwrap_or(TradeKind::Buy),
                asset_qty: row.get(3)?,
                cash_value: row.get(4)?,
                price: row.get(5)?,
                created_at: row.get(6)?,
            })
        })
        .map_err(db_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(db_err)?;
    Ok(rows)
}
