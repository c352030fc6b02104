//! Table definitions for the ledger database.

use rusqlite::Connection;

pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS accounts (
            account_id      INTEGER PRIMARY KEY,
            name            TEXT NOT NULL,
            cash_available  INTEGER NOT NULL,
            cash_reserved   INTEGER NOT NULL DEFAULT 0,
            asset_available INTEGER NOT NULL DEFAULT 0,
            asset_reserved  INTEGER NOT NULL DEFAULT 0,
            created_at      INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS orders (
            order_id       INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id     INTEGER NOT NULL REFERENCES accounts(account_id),
            side           TEXT NOT NULL,
            requested_qty  INTEGER NOT NULL,
            filled_qty     INTEGER NOT NULL DEFAULT 0,
            limit_price    INTEGER NOT NULL,
            reserved_value INTEGER NOT NULL,
            status         TEXT NOT NULL,
            created_at     INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_orders_open
            ON orders(status, side, limit_price);
        CREATE INDEX IF NOT EXISTS idx_orders_account
            ON orders(account_id, status);

        CREATE TABLE IF NOT EXISTS transactions (
            tx_id      INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER NOT NULL REFERENCES accounts(account_id),
            kind       TEXT NOT NULL,
            asset_qty  INTEGER NOT NULL,
            cash_value INTEGER NOT NULL,
            price      INTEGER NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_transactions_account
            ON transactions(account_id, created_at DESC);",
    )
}
