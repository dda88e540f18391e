use crate::billing::StatementPeriod;
use crate::db::charges::sum_charges_for_statement_tx;
use crate::db::DbPool;
use crate::errors::{Error, Result};
use crate::models::Statement;
use chrono::{NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, instrument};

fn statement_from_row(row: &Row<'_>) -> rusqlite::Result<Statement> {
    let period_str: String = row.get(2)?;
    let statement_period: StatementPeriod = period_str
        .parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into()))?;
    Ok(Statement {
        id: row.get(0)?,
        account_id: row.get(1)?,
        statement_period,
        total_amount: row.get(3)?,
        due_date: row.get(4)?,
        paid_at: row.get(5)?,
        paid_from_account_id: row.get(6)?,
    })
}

const STATEMENT_COLUMNS: &str = "id, account_id, statement_period, total_amount, \
     due_date, paid_at, paid_from_account_id";

/// Guarantees an aggregate row exists for (account, period).
///
/// Inserts with a zero total and the supplied due date; an existing row is
/// left completely untouched. The upsert is keyed on the unique
/// (account_id, statement_period) index, so repeated or racing calls cannot
/// error or duplicate.
pub(crate) fn ensure_statement_tx(
    conn: &Connection,
    account_id: i64,
    period: StatementPeriod,
    due_date: NaiveDate,
) -> Result<()> {
    conn.execute(
        "INSERT INTO statements (account_id, statement_period, total_amount, due_date)
         VALUES (?1, ?2, 0, ?3)
         ON CONFLICT(account_id, statement_period) DO NOTHING",
        params![account_id, period.to_string(), due_date],
    )?;
    Ok(())
}

/// Recomputes the cached total from the live charge set (zero when no
/// charges remain). Payment status is deliberately left untouched: a paid
/// statement whose total moves stays paid.
pub(crate) fn recompute_statement_total_tx(
    conn: &Connection,
    account_id: i64,
    period: StatementPeriod,
) -> Result<i64> {
    let total = sum_charges_for_statement_tx(conn, account_id, period)?;
    let updated = conn.execute(
        "UPDATE statements SET total_amount = ?1
         WHERE account_id = ?2 AND statement_period = ?3",
        params![total, account_id, period.to_string()],
    )?;
    if updated == 0 {
        return Err(Error::NotFound(format!(
            "statement for account {} period {}",
            account_id, period
        )));
    }
    debug!(
        "Recomputed statement total for account {} period {}: {}",
        account_id, period, total
    );
    Ok(total)
}

pub(crate) fn get_statement_tx(
    conn: &Connection,
    account_id: i64,
    period: StatementPeriod,
) -> Result<Option<Statement>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {} FROM statements WHERE account_id = ?1 AND statement_period = ?2",
        STATEMENT_COLUMNS
    ))?;
    let statement = stmt
        .query_row(params![account_id, period.to_string()], statement_from_row)
        .optional()?;
    Ok(statement)
}

/// Fetches one statement aggregate, `Ok(None)` if the pair has never had a
/// charge.
#[instrument(skip(pool))]
pub async fn get_statement(
    pool: &DbPool,
    account_id: i64,
    period: StatementPeriod,
) -> Result<Option<Statement>> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    get_statement_tx(&conn, account_id, period)
}

/// All statements of an account in period order.
#[instrument(skip(pool))]
pub async fn list_statements_for_account(
    pool: &DbPool,
    account_id: i64,
) -> Result<Vec<Statement>> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {} FROM statements WHERE account_id = ?1 ORDER BY statement_period",
        STATEMENT_COLUMNS
    ))?;
    let rows = stmt.query_map(params![account_id], statement_from_row)?;

    let mut statements = Vec::new();
    for row in rows {
        statements.push(
            row.map_err(|e| Error::Database(format!("Failed to map statement row: {}", e)))?,
        );
    }
    debug!(
        "Fetched {} statements for account {}",
        statements.len(),
        account_id
    );
    Ok(statements)
}

/// Recomputes one pair's total in its own transaction: the idempotent repair
/// entry point for a single statement.
#[instrument(skip(pool))]
pub async fn recompute_statement(
    pool: &DbPool,
    account_id: i64,
    period: StatementPeriod,
) -> Result<i64> {
    let mut conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let tx = conn
        .transaction()
        .map_err(|e| Error::Database(format!("Failed to start transaction: {}", e)))?;
    let total = recompute_statement_total_tx(&tx, account_id, period)?;
    tx.commit()
        .map_err(|e| Error::Database(format!("Failed to commit recompute: {}", e)))?;
    Ok(total)
}

/// Marks a statement paid, recording when and from which account.
///
/// Valid only from pending; paying an already-paid statement is an
/// `InvalidTransition`, never a silent overwrite.
#[instrument(skip(pool))]
pub async fn mark_statement_paid(
    pool: &DbPool,
    account_id: i64,
    period: StatementPeriod,
    paid_from_account_id: Option<i64>,
) -> Result<()> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let statement = get_statement_tx(&conn, account_id, period)?.ok_or_else(|| {
        Error::NotFound(format!("statement for account {} period {}", account_id, period))
    })?;
    if statement.paid_at.is_some() {
        return Err(Error::InvalidTransition(format!(
            "statement for account {} period {} is already paid",
            account_id, period
        )));
    }
    conn.execute(
        "UPDATE statements SET paid_at = ?1, paid_from_account_id = ?2 WHERE id = ?3",
        params![Utc::now(), paid_from_account_id, statement.id],
    )?;
    info!(
        "Marked statement paid: account {} period {} (funded by {:?})",
        account_id, period, paid_from_account_id
    );
    Ok(())
}

/// Explicit reversal: a paid statement goes back to pending, clearing both
/// the timestamp and the funding account.
#[instrument(skip(pool))]
pub async fn reopen_statement(
    pool: &DbPool,
    account_id: i64,
    period: StatementPeriod,
) -> Result<()> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let statement = get_statement_tx(&conn, account_id, period)?.ok_or_else(|| {
        Error::NotFound(format!("statement for account {} period {}", account_id, period))
    })?;
    if statement.paid_at.is_none() {
        return Err(Error::InvalidTransition(format!(
            "statement for account {} period {} is not paid",
            account_id, period
        )));
    }
    conn.execute(
        "UPDATE statements SET paid_at = NULL, paid_from_account_id = NULL WHERE id = ?1",
        params![statement.id],
    )?;
    info!(
        "Reopened statement: account {} period {}",
        account_id, period
    );
    Ok(())
}
