#![allow(dead_code)]
use crate::db::{schema, DbPool};
use crate::errors::{Error, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

pub(crate) fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trace")),
        )
        .with_test_writer()
        .try_init();
}

// In-memory database with the full schema, fresh per test.
pub(crate) async fn setup_test_db() -> Result<DbPool> {
    let conn = Connection::open_in_memory()
        .map_err(|e| Error::Database(format!("Test DB: Failed to open in-memory: {}", e)))?;
    conn.execute("PRAGMA foreign_keys = ON;", [])?;
    schema::create_tables(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

pub(crate) struct DirectAccountArgs<'a> {
    pub(crate) conn: &'a Connection,
    pub(crate) user_id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) kind: &'a str,
    pub(crate) closing_day: Option<u32>,
    pub(crate) payment_due_day: Option<u32>,
}

// Bypasses create_account's validation so tests control the row exactly.
pub(crate) fn direct_insert_account(args: &DirectAccountArgs<'_>) -> Result<i64> {
    let mut stmt = args.conn.prepare_cached(
        "INSERT INTO accounts (user_id, name, kind, closing_day, payment_due_day)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    let id = stmt.insert(params![
        args.user_id,
        args.name,
        args.kind,
        args.closing_day,
        args.payment_due_day,
    ])?;
    Ok(id)
}

pub(crate) fn direct_insert_category(
    conn: &Connection,
    user_id: &str,
    name: &str,
) -> Result<i64> {
    let mut stmt =
        conn.prepare_cached("INSERT INTO categories (user_id, name) VALUES (?1, ?2)")?;
    let id = stmt.insert(params![user_id, name])?;
    Ok(id)
}

pub(crate) struct DirectChargeArgs<'a> {
    pub(crate) conn: &'a Connection,
    /// When `None`, a stub purchase row is created so the FK holds.
    pub(crate) purchase_id: Option<i64>,
    pub(crate) account_id: i64,
    pub(crate) amount: i64,
    pub(crate) purchase_date: NaiveDate,
    pub(crate) statement_period: &'a str,
    pub(crate) due_date: NaiveDate,
    pub(crate) installment_number: u32,
}

pub(crate) fn direct_insert_charge(args: &DirectChargeArgs<'_>) -> Result<i64> {
    let purchase_id = match args.purchase_id {
        Some(id) => id,
        None => {
            let category_id = direct_insert_category(args.conn, "test_user", "stub")?;
            let mut stmt = args.conn.prepare_cached(
                "INSERT INTO purchases (user_id, account_id, category_id, description,
                                        total_amount, installment_count, first_purchase_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
            )?;
            stmt.insert(params![
                "test_user",
                args.account_id,
                category_id,
                "stub purchase",
                args.amount,
                args.purchase_date,
            ])?
        }
    };
    let mut stmt = args.conn.prepare_cached(
        "INSERT INTO charges (purchase_id, account_id, amount, purchase_date,
                              statement_period, due_date, installment_number)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    let id = stmt.insert(params![
        purchase_id,
        args.account_id,
        args.amount,
        args.purchase_date,
        args.statement_period,
        args.due_date,
        args.installment_number,
    ])?;
    Ok(id)
}
