use crate::errors::{Error, Result};
use rusqlite::Connection;
use tracing::{debug, info, instrument};

#[instrument(skip(conn))]
pub(crate) fn create_tables(conn: &Connection) -> Result<()> {
    debug!("Executing CREATE TABLE statements if tables do not exist.");
    conn.execute_batch(
        "BEGIN;

        CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            closing_day INTEGER,      -- 1..28, NULL when no billing cycle
            payment_due_day INTEGER   -- 1..28, NULL when no billing cycle
        );

        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS purchases (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            account_id INTEGER NOT NULL,
            category_id INTEGER NOT NULL,
            description TEXT NOT NULL,
            total_amount INTEGER NOT NULL,      -- minor units (cents)
            installment_count INTEGER NOT NULL,
            first_purchase_date DATE NOT NULL,
            FOREIGN KEY (account_id) REFERENCES accounts (id),
            FOREIGN KEY (category_id) REFERENCES categories (id)
        );

        CREATE TABLE IF NOT EXISTS charges (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            purchase_id INTEGER NOT NULL,
            account_id INTEGER NOT NULL,
            amount INTEGER NOT NULL,            -- minor units (cents)
            purchase_date DATE NOT NULL,
            statement_period TEXT NOT NULL,     -- 'YYYY-MM'
            due_date DATE NOT NULL,
            installment_number INTEGER NOT NULL,
            paid_at DATETIME,                   -- NULL while pending
            FOREIGN KEY (purchase_id) REFERENCES purchases (id) ON DELETE CASCADE,
            FOREIGN KEY (account_id) REFERENCES accounts (id)
        );

        -- Aggregate recomputation sums over this pair constantly.
        CREATE INDEX IF NOT EXISTS idx_charges_account_period
            ON charges(account_id, statement_period);

        CREATE TABLE IF NOT EXISTS statements (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER NOT NULL,
            statement_period TEXT NOT NULL,     -- 'YYYY-MM'
            total_amount INTEGER NOT NULL DEFAULT 0,
            due_date DATE NOT NULL,
            paid_at DATETIME,                   -- NULL while pending
            paid_from_account_id INTEGER,       -- set together with paid_at
            FOREIGN KEY (account_id) REFERENCES accounts (id),
            FOREIGN KEY (paid_from_account_id) REFERENCES accounts (id)
        );

        -- Exactly one aggregate row per (account, period); the ensure
        -- operation upserts against this key.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_unique_statement_account_period
            ON statements(account_id, statement_period);

        COMMIT;",
    )
    .map_err(|e| Error::Database(format!("Failed to create tables: {}", e)))?;
    info!("Database tables ensured (statement uniqueness keyed on account + period).");
    Ok(())
}
