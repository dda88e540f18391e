use crate::billing::StatementPeriod;
use crate::db::DbPool;
use crate::errors::{Error, Result};
use crate::installments::PlannedCharge;
use crate::models::Charge;
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, instrument};

fn charge_from_row(row: &Row<'_>) -> rusqlite::Result<Charge> {
    let period_str: String = row.get(5)?;
    let statement_period: StatementPeriod = period_str
        .parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, e.into()))?;
    Ok(Charge {
        id: row.get(0)?,
        purchase_id: row.get(1)?,
        account_id: row.get(2)?,
        amount: row.get(3)?,
        purchase_date: row.get(4)?,
        statement_period,
        due_date: row.get(6)?,
        installment_number: row.get(7)?,
        paid_at: row.get(8)?,
    })
}

const CHARGE_COLUMNS: &str = "id, purchase_id, account_id, amount, purchase_date, \
     statement_period, due_date, installment_number, paid_at";

pub(crate) fn insert_charge_tx(
    conn: &Connection,
    purchase_id: i64,
    account_id: i64,
    plan: &PlannedCharge,
) -> Result<i64> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO charges (purchase_id, account_id, amount, purchase_date,
                              statement_period, due_date, installment_number)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    let id = stmt.insert(params![
        purchase_id,
        account_id,
        plan.amount,
        plan.purchase_date,
        plan.statement_period.to_string(),
        plan.due_date,
        plan.installment_number,
    ])?;
    Ok(id)
}

pub(crate) fn delete_charges_for_purchase_tx(conn: &Connection, purchase_id: i64) -> Result<usize> {
    let deleted = conn.execute(
        "DELETE FROM charges WHERE purchase_id = ?1",
        params![purchase_id],
    )?;
    Ok(deleted)
}

/// The distinct (account, statement period) pairs a purchase's charges touch.
/// Update/delete capture this set before mutating so vacated pairs still get
/// their aggregates recomputed.
pub(crate) fn distinct_statement_pairs_tx(
    conn: &Connection,
    purchase_id: i64,
) -> Result<Vec<(i64, StatementPeriod)>> {
    let mut stmt = conn.prepare_cached(
        "SELECT DISTINCT account_id, statement_period FROM charges
         WHERE purchase_id = ?1
         ORDER BY account_id, statement_period",
    )?;
    let rows = stmt.query_map(params![purchase_id], |row| {
        let account_id: i64 = row.get(0)?;
        let period_str: String = row.get(1)?;
        Ok((account_id, period_str))
    })?;

    let mut pairs = Vec::new();
    for row in rows {
        let (account_id, period_str) =
            row.map_err(|e| Error::Database(format!("Failed to map charge pair: {}", e)))?;
        let period = period_str
            .parse()
            .map_err(|e| Error::Database(format!("Bad statement period in charges: {}", e)))?;
        pairs.push((account_id, period));
    }
    Ok(pairs)
}

/// Live sum of charge amounts for one (account, period) pair; zero when no
/// charges remain.
pub(crate) fn sum_charges_for_statement_tx(
    conn: &Connection,
    account_id: i64,
    period: StatementPeriod,
) -> Result<i64> {
    let mut stmt = conn.prepare_cached(
        "SELECT COALESCE(SUM(amount), 0) FROM charges
         WHERE account_id = ?1 AND statement_period = ?2",
    )?;
    let total: i64 =
        stmt.query_row(params![account_id, period.to_string()], |row| row.get(0))?;
    Ok(total)
}

/// A purchase's charges ordered by installment number.
#[instrument(skip(pool))]
pub async fn get_charges_for_purchase(pool: &DbPool, purchase_id: i64) -> Result<Vec<Charge>> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {} FROM charges WHERE purchase_id = ?1 ORDER BY installment_number",
        CHARGE_COLUMNS
    ))?;
    let rows = stmt.query_map(params![purchase_id], charge_from_row)?;

    let mut charges = Vec::new();
    for row in rows {
        charges
            .push(row.map_err(|e| Error::Database(format!("Failed to map charge row: {}", e)))?);
    }
    debug!(
        "Fetched {} charges for purchase_id {}",
        charges.len(),
        purchase_id
    );
    Ok(charges)
}

/// All charges on one statement, ordered by purchase date.
#[instrument(skip(pool))]
pub async fn get_charges_for_statement(
    pool: &DbPool,
    account_id: i64,
    period: StatementPeriod,
) -> Result<Vec<Charge>> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {} FROM charges
         WHERE account_id = ?1 AND statement_period = ?2
         ORDER BY purchase_date, id",
        CHARGE_COLUMNS
    ))?;
    let rows = stmt.query_map(params![account_id, period.to_string()], charge_from_row)?;

    let mut charges = Vec::new();
    for row in rows {
        charges
            .push(row.map_err(|e| Error::Database(format!("Failed to map charge row: {}", e)))?);
    }
    debug!(
        "Fetched {} charges for account {} period {}",
        charges.len(),
        account_id,
        period
    );
    Ok(charges)
}

/// Marks a single installment as paid. Only valid while it is pending.
#[instrument(skip(pool))]
pub async fn mark_charge_paid(pool: &DbPool, charge_id: i64) -> Result<()> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let paid_at: Option<Option<chrono::DateTime<Utc>>> = conn
        .query_row(
            "SELECT paid_at FROM charges WHERE id = ?1",
            params![charge_id],
            |row| row.get(0),
        )
        .optional()?;
    match paid_at {
        None => return Err(Error::NotFound(format!("charge {}", charge_id))),
        Some(Some(_)) => {
            return Err(Error::InvalidTransition(format!(
                "charge {} is already paid",
                charge_id
            )))
        }
        Some(None) => {}
    }
    conn.execute(
        "UPDATE charges SET paid_at = ?1 WHERE id = ?2",
        params![Utc::now(), charge_id],
    )?;
    info!("Marked charge_id {} paid", charge_id);
    Ok(())
}

/// Explicitly reverts a paid installment back to pending.
#[instrument(skip(pool))]
pub async fn clear_charge_paid(pool: &DbPool, charge_id: i64) -> Result<()> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let paid_at: Option<Option<chrono::DateTime<Utc>>> = conn
        .query_row(
            "SELECT paid_at FROM charges WHERE id = ?1",
            params![charge_id],
            |row| row.get(0),
        )
        .optional()?;
    match paid_at {
        None => return Err(Error::NotFound(format!("charge {}", charge_id))),
        Some(None) => {
            return Err(Error::InvalidTransition(format!(
                "charge {} is not paid",
                charge_id
            )))
        }
        Some(Some(_)) => {}
    }
    conn.execute(
        "UPDATE charges SET paid_at = NULL WHERE id = ?1",
        params![charge_id],
    )?;
    info!("Cleared paid marker on charge_id {}", charge_id);
    Ok(())
}
