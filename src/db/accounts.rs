use crate::db::DbPool;
use crate::errors::{Error, Result};
use crate::models::{Account, AccountKind, BillingConfig};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, instrument};

/// Arguments for creating an account.
#[derive(Debug)]
pub struct NewAccount<'a> {
    pub user_id: &'a str,
    pub name: &'a str,
    pub kind: AccountKind,
    pub billing: Option<BillingConfig>,
}

/// Cycle days must exist in every month of the year, so both are capped at 28.
pub(crate) fn validate_billing_config(cfg: &BillingConfig) -> Result<()> {
    if !(1..=28).contains(&cfg.closing_day) {
        return Err(Error::Validation(format!(
            "closing day must be between 1 and 28, got {}",
            cfg.closing_day
        )));
    }
    if !(1..=28).contains(&cfg.payment_due_day) {
        return Err(Error::Validation(format!(
            "payment due day must be between 1 and 28, got {}",
            cfg.payment_due_day
        )));
    }
    Ok(())
}

fn account_from_parts(
    id: i64,
    user_id: String,
    name: String,
    kind_str: String,
    closing_day: Option<u32>,
    payment_due_day: Option<u32>,
) -> Result<Account> {
    let kind = AccountKind::from_str(&kind_str)
        .ok_or_else(|| Error::Database(format!("Unknown account kind '{}'", kind_str)))?;
    // An account only has a billing cycle when both days are present.
    let billing = match (closing_day, payment_due_day) {
        (Some(closing_day), Some(payment_due_day)) => Some(BillingConfig {
            closing_day,
            payment_due_day,
        }),
        _ => None,
    };
    Ok(Account {
        id,
        user_id,
        name,
        kind,
        billing,
    })
}

/// Creates a new account, validating any billing configuration first.
///
/// # Errors
///
/// Returns `Error::Validation` if a billing day is outside 1..=28, or
/// `Error::Database` on lock/SQL failures.
#[instrument(skip(pool))]
pub async fn create_account(pool: &DbPool, args: &NewAccount<'_>) -> Result<Account> {
    if let Some(cfg) = &args.billing {
        validate_billing_config(cfg)?;
    }
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt = conn.prepare_cached(
        "INSERT INTO accounts (user_id, name, kind, closing_day, payment_due_day)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    let id = stmt.insert(params![
        args.user_id,
        args.name,
        args.kind.as_str(),
        args.billing.map(|b| b.closing_day),
        args.billing.map(|b| b.payment_due_day),
    ])?;
    info!(
        "Created account_id {} ('{}', kind={}) for user {}",
        id,
        args.name,
        args.kind.as_str(),
        args.user_id
    );
    Ok(Account {
        id,
        user_id: args.user_id.to_string(),
        name: args.name.to_string(),
        kind: args.kind,
        billing: args.billing,
    })
}

pub(crate) fn get_account_tx(conn: &Connection, account_id: i64) -> Result<Option<Account>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, user_id, name, kind, closing_day, payment_due_day
         FROM accounts WHERE id = ?1",
    )?;
    let parts: Option<(i64, String, String, String, Option<u32>, Option<u32>)> = stmt
        .query_row(params![account_id], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            ))
        })
        .optional()?;
    parts
        .map(|(id, user_id, name, kind, closing, due)| {
            account_from_parts(id, user_id, name, kind, closing, due)
        })
        .transpose()
}

/// Fetches an account by id, returning `Ok(None)` if it does not exist.
#[instrument(skip(pool))]
pub async fn get_account(pool: &DbPool, account_id: i64) -> Result<Option<Account>> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let account = get_account_tx(&conn, account_id)?;
    debug!("Fetched account {}: {:?}", account_id, account.is_some());
    Ok(account)
}

/// Replaces an account's billing configuration (identity stays immutable).
///
/// Charges already generated keep the periods and due dates they were given;
/// the new configuration only affects future charge generation.
#[instrument(skip(pool))]
pub async fn update_billing_config(
    pool: &DbPool,
    account_id: i64,
    billing: Option<BillingConfig>,
) -> Result<()> {
    if let Some(cfg) = &billing {
        validate_billing_config(cfg)?;
    }
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let updated = conn.execute(
        "UPDATE accounts SET closing_day = ?1, payment_due_day = ?2 WHERE id = ?3",
        params![
            billing.map(|b| b.closing_day),
            billing.map(|b| b.payment_due_day),
            account_id
        ],
    )?;
    if updated == 0 {
        return Err(Error::NotFound(format!("account {}", account_id)));
    }
    info!(
        "Updated billing config for account_id {}: {:?}",
        account_id, billing
    );
    Ok(())
}
