use crate::db::DbPool;
use crate::errors::{Error, Result};
use crate::models::Purchase;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, instrument};

/// Column values for a purchase row; charges are generated separately.
#[derive(Debug)]
pub(crate) struct PurchaseRow<'a> {
    pub(crate) user_id: &'a str,
    pub(crate) account_id: i64,
    pub(crate) category_id: i64,
    pub(crate) description: &'a str,
    pub(crate) total_amount: i64,
    pub(crate) installment_count: u32,
    pub(crate) first_purchase_date: NaiveDate,
}

fn purchase_from_row(row: &Row<'_>) -> rusqlite::Result<Purchase> {
    Ok(Purchase {
        id: row.get(0)?,
        user_id: row.get(1)?,
        account_id: row.get(2)?,
        category_id: row.get(3)?,
        description: row.get(4)?,
        total_amount: row.get(5)?,
        installment_count: row.get(6)?,
        first_purchase_date: row.get(7)?,
    })
}

const PURCHASE_COLUMNS: &str = "id, user_id, account_id, category_id, description, \
     total_amount, installment_count, first_purchase_date";

pub(crate) fn insert_purchase_tx(conn: &Connection, row: &PurchaseRow<'_>) -> Result<i64> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO purchases (user_id, account_id, category_id, description,
                                total_amount, installment_count, first_purchase_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    let id = stmt.insert(params![
        row.user_id,
        row.account_id,
        row.category_id,
        row.description,
        row.total_amount,
        row.installment_count,
        row.first_purchase_date,
    ])?;
    Ok(id)
}

pub(crate) fn update_purchase_row_tx(
    conn: &Connection,
    purchase_id: i64,
    row: &PurchaseRow<'_>,
) -> Result<()> {
    conn.execute(
        "UPDATE purchases SET account_id = ?1, category_id = ?2, description = ?3,
                              total_amount = ?4, installment_count = ?5,
                              first_purchase_date = ?6
         WHERE id = ?7",
        params![
            row.account_id,
            row.category_id,
            row.description,
            row.total_amount,
            row.installment_count,
            row.first_purchase_date,
            purchase_id,
        ],
    )?;
    Ok(())
}

/// Charges cascade via their FOREIGN KEY.
pub(crate) fn delete_purchase_tx(conn: &Connection, purchase_id: i64) -> Result<usize> {
    let deleted = conn.execute("DELETE FROM purchases WHERE id = ?1", params![purchase_id])?;
    Ok(deleted)
}

pub(crate) fn set_purchase_category_tx(
    conn: &Connection,
    purchase_id: i64,
    category_id: i64,
) -> Result<()> {
    conn.execute(
        "UPDATE purchases SET category_id = ?1 WHERE id = ?2",
        params![category_id, purchase_id],
    )?;
    Ok(())
}

pub(crate) fn get_purchase_tx(conn: &Connection, purchase_id: i64) -> Result<Option<Purchase>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {} FROM purchases WHERE id = ?1",
        PURCHASE_COLUMNS
    ))?;
    let purchase = stmt
        .query_row(params![purchase_id], purchase_from_row)
        .optional()?;
    Ok(purchase)
}

/// Fetches a purchase by id, returning `Ok(None)` if it does not exist.
#[instrument(skip(pool))]
pub async fn get_purchase(pool: &DbPool, purchase_id: i64) -> Result<Option<Purchase>> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    get_purchase_tx(&conn, purchase_id)
}

/// All purchases recorded by a user, newest first.
#[instrument(skip(pool))]
pub async fn list_purchases_for_user(pool: &DbPool, user_id: &str) -> Result<Vec<Purchase>> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {} FROM purchases WHERE user_id = ?1
         ORDER BY first_purchase_date DESC, id DESC",
        PURCHASE_COLUMNS
    ))?;
    let rows = stmt.query_map(params![user_id], purchase_from_row)?;

    let mut purchases = Vec::new();
    for row in rows {
        purchases.push(row.map_err(|e| {
            Error::Database(format!("Failed to map purchase row: {}", e))
        })?);
    }
    debug!("Fetched {} purchases for user {}", purchases.len(), user_id);
    Ok(purchases)
}
