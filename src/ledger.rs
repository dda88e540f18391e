//! Ledger mutation orchestration.
//!
//! Create/update/delete/reclassify for purchases, composing the installment
//! splitter with the statement aggregate maintainer. Every mutation validates
//! first, then runs its whole delete-old / insert-new / ensure / recompute
//! sequence inside one database transaction: if any step fails, nothing is
//! observable. The per-user view-invalidation signal fires only after the
//! commit.

use crate::billing::StatementPeriod;
use crate::cache::{self, ViewVersions};
use crate::db::accounts::get_account_tx;
use crate::db::categories::get_category_tx;
use crate::db::charges::{
    delete_charges_for_purchase_tx, distinct_statement_pairs_tx, insert_charge_tx,
};
use crate::db::purchases::{
    delete_purchase_tx, get_purchase_tx, insert_purchase_tx, set_purchase_category_tx,
    update_purchase_row_tx, PurchaseRow,
};
use crate::db::statements::{ensure_statement_tx, recompute_statement_total_tx};
use crate::db::DbPool;
use crate::errors::{Error, Result};
use crate::installments::split_purchase;
use crate::models::{Account, Category, Purchase};
use chrono::NaiveDate;
use rusqlite::Connection;
use std::collections::BTreeSet;
use tracing::{info, instrument};

/// A purchase as submitted by the caller. The date arrives in the boundary
/// form ("YYYY-MM-DD") and is parsed during validation.
#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub user_id: String,
    pub account_id: i64,
    pub category_id: i64,
    /// Free-text description; when absent the category's display name is
    /// used instead.
    pub description: Option<String>,
    /// Total in integer minor units (cents); must be >= 1.
    pub total_amount: i64,
    /// Number of installments; must be >= 1.
    pub installment_count: u32,
    pub first_purchase_date: String,
}

/// Replacement parameters for an existing purchase. An update regenerates all
/// of the purchase's charges from these values.
#[derive(Debug, Clone)]
pub struct UpdatePurchase {
    pub account_id: i64,
    pub category_id: i64,
    pub description: Option<String>,
    pub total_amount: i64,
    pub installment_count: u32,
    pub first_purchase_date: String,
}

/// Input checks that must all pass before any write happens.
fn validate_purchase_input(
    total_amount: i64,
    installment_count: u32,
    first_purchase_date: &str,
) -> Result<NaiveDate> {
    if total_amount < 1 {
        return Err(Error::Validation(format!(
            "total amount must be a positive number of minor units, got {}",
            total_amount
        )));
    }
    if installment_count < 1 {
        return Err(Error::Validation(
            "installment count must be at least 1".to_string(),
        ));
    }
    NaiveDate::parse_from_str(first_purchase_date, "%Y-%m-%d").map_err(|e| {
        Error::Validation(format!(
            "malformed purchase date '{}': {}",
            first_purchase_date, e
        ))
    })
}

fn load_owned_account_tx(conn: &Connection, account_id: i64, user_id: &str) -> Result<Account> {
    get_account_tx(conn, account_id)?
        .filter(|a| a.user_id == user_id)
        .ok_or_else(|| Error::NotFound(format!("account {}", account_id)))
}

fn load_owned_category_tx(conn: &Connection, category_id: i64, user_id: &str) -> Result<Category> {
    get_category_tx(conn, category_id)?
        .filter(|c| c.user_id == user_id)
        .ok_or_else(|| Error::NotFound(format!("category {}", category_id)))
}

fn load_owned_purchase_tx(conn: &Connection, purchase_id: i64, user_id: &str) -> Result<Purchase> {
    get_purchase_tx(conn, purchase_id)?
        .filter(|p| p.user_id == user_id)
        .ok_or_else(|| Error::NotFound(format!("purchase {}", purchase_id)))
}

/// Due date for a statement aggregate row, from the owning account's current
/// billing configuration. Accounts without one group charges by calendar
/// month, so their statement falls due when the month ends.
fn statement_due_date_for(account: &Account, period: StatementPeriod) -> NaiveDate {
    match account.billing {
        Some(cfg) => crate::billing::statement_due_date(period, cfg.payment_due_day, cfg.closing_day),
        None => period.last_day(),
    }
}

/// Ensure-then-recompute for every touched (account, period) pair. Invoked as
/// the last step of each mutating transaction so the cached totals are never
/// observable out of sync with the charges.
fn refresh_statements_tx(
    conn: &Connection,
    pairs: &BTreeSet<(i64, StatementPeriod)>,
) -> Result<()> {
    for &(account_id, period) in pairs {
        let account = get_account_tx(conn, account_id)?
            .ok_or_else(|| Error::NotFound(format!("account {}", account_id)))?;
        ensure_statement_tx(conn, account_id, period, statement_due_date_for(&account, period))?;
        recompute_statement_total_tx(conn, account_id, period)?;
    }
    Ok(())
}

fn description_or_category_name(description: Option<&str>, category: &Category) -> String {
    match description {
        Some(d) if !d.trim().is_empty() => d.to_string(),
        _ => category.name.clone(),
    }
}

/// Records a purchase: validates, splits it into installment charges, and
/// brings every touched statement aggregate up to date, all in one
/// transaction.
#[instrument(skip(pool, versions, input), fields(user_id = %input.user_id))]
pub async fn create_purchase(
    pool: &DbPool,
    versions: &ViewVersions,
    input: &NewPurchase,
) -> Result<Purchase> {
    let first_date = validate_purchase_input(
        input.total_amount,
        input.installment_count,
        &input.first_purchase_date,
    )?;

    let purchase;
    {
        let mut conn = pool.lock().map_err(|_| {
            Error::Database("Failed to acquire DB lock for purchase create".to_string())
        })?;
        let tx = conn
            .transaction()
            .map_err(|e| Error::Database(format!("Failed to start transaction: {}", e)))?;

        let account = load_owned_account_tx(&tx, input.account_id, &input.user_id)?;
        let category = load_owned_category_tx(&tx, input.category_id, &input.user_id)?;
        let description = description_or_category_name(input.description.as_deref(), &category);

        let plans = split_purchase(
            input.total_amount,
            input.installment_count,
            first_date,
            account.billing.as_ref(),
        );

        let purchase_id = insert_purchase_tx(
            &tx,
            &PurchaseRow {
                user_id: &input.user_id,
                account_id: account.id,
                category_id: category.id,
                description: &description,
                total_amount: input.total_amount,
                installment_count: input.installment_count,
                first_purchase_date: first_date,
            },
        )?;
        for plan in &plans {
            insert_charge_tx(&tx, purchase_id, account.id, plan)?;
        }

        let pairs: BTreeSet<(i64, StatementPeriod)> = plans
            .iter()
            .map(|p| (account.id, p.statement_period))
            .collect();
        refresh_statements_tx(&tx, &pairs)?;

        tx.commit()
            .map_err(|e| Error::Database(format!("Failed to commit purchase create: {}", e)))?;

        info!(
            "Created purchase_id {} ({} x {} installments) touching {} statement(s)",
            purchase_id,
            input.total_amount,
            input.installment_count,
            pairs.len()
        );
        purchase = Purchase {
            id: purchase_id,
            user_id: input.user_id.clone(),
            account_id: account.id,
            category_id: category.id,
            description,
            total_amount: input.total_amount,
            installment_count: input.installment_count,
            first_purchase_date: first_date,
        };
    }

    // Post-commit, fire-and-forget from the mutation's point of view.
    cache::invalidate_user_views(versions, &input.user_id).await;
    Ok(purchase)
}

/// Replaces a purchase's parameters and all of its charges.
///
/// Statement pairs used by the old charges are captured first so that pairs
/// vacated by the edit are still recomputed, down to zero if nothing else
/// remains on them.
#[instrument(skip(pool, versions, input))]
pub async fn update_purchase(
    pool: &DbPool,
    versions: &ViewVersions,
    purchase_id: i64,
    user_id: &str,
    input: &UpdatePurchase,
) -> Result<Purchase> {
    let first_date = validate_purchase_input(
        input.total_amount,
        input.installment_count,
        &input.first_purchase_date,
    )?;

    let purchase;
    {
        let mut conn = pool.lock().map_err(|_| {
            Error::Database("Failed to acquire DB lock for purchase update".to_string())
        })?;
        let tx = conn
            .transaction()
            .map_err(|e| Error::Database(format!("Failed to start transaction: {}", e)))?;

        load_owned_purchase_tx(&tx, purchase_id, user_id)?;
        // Pairs the existing charges occupy, before they are deleted.
        let old_pairs = distinct_statement_pairs_tx(&tx, purchase_id)?;

        let account = load_owned_account_tx(&tx, input.account_id, user_id)?;
        let category = load_owned_category_tx(&tx, input.category_id, user_id)?;
        let description = description_or_category_name(input.description.as_deref(), &category);

        delete_charges_for_purchase_tx(&tx, purchase_id)?;
        let plans = split_purchase(
            input.total_amount,
            input.installment_count,
            first_date,
            account.billing.as_ref(),
        );
        for plan in &plans {
            insert_charge_tx(&tx, purchase_id, account.id, plan)?;
        }
        update_purchase_row_tx(
            &tx,
            purchase_id,
            &PurchaseRow {
                user_id,
                account_id: account.id,
                category_id: category.id,
                description: &description,
                total_amount: input.total_amount,
                installment_count: input.installment_count,
                first_purchase_date: first_date,
            },
        )?;

        // Union of vacated and newly-touched pairs.
        let mut pairs: BTreeSet<(i64, StatementPeriod)> = old_pairs.into_iter().collect();
        pairs.extend(plans.iter().map(|p| (account.id, p.statement_period)));
        refresh_statements_tx(&tx, &pairs)?;

        tx.commit()
            .map_err(|e| Error::Database(format!("Failed to commit purchase update: {}", e)))?;

        info!(
            "Updated purchase_id {} ({} statement pair(s) refreshed)",
            purchase_id,
            pairs.len()
        );
        purchase = Purchase {
            id: purchase_id,
            user_id: user_id.to_string(),
            account_id: account.id,
            category_id: category.id,
            description,
            total_amount: input.total_amount,
            installment_count: input.installment_count,
            first_purchase_date: first_date,
        };
    }

    cache::invalidate_user_views(versions, user_id).await;
    Ok(purchase)
}

/// Deletes a purchase and its charges, recomputing every statement the
/// charges sat on. The aggregate rows themselves persist (possibly at zero).
#[instrument(skip(pool, versions))]
pub async fn delete_purchase(
    pool: &DbPool,
    versions: &ViewVersions,
    purchase_id: i64,
    user_id: &str,
) -> Result<()> {
    {
        let mut conn = pool.lock().map_err(|_| {
            Error::Database("Failed to acquire DB lock for purchase delete".to_string())
        })?;
        let tx = conn
            .transaction()
            .map_err(|e| Error::Database(format!("Failed to start transaction: {}", e)))?;

        load_owned_purchase_tx(&tx, purchase_id, user_id)?;
        let pairs: BTreeSet<(i64, StatementPeriod)> =
            distinct_statement_pairs_tx(&tx, purchase_id)?
                .into_iter()
                .collect();

        delete_purchase_tx(&tx, purchase_id)?;
        refresh_statements_tx(&tx, &pairs)?;

        tx.commit()
            .map_err(|e| Error::Database(format!("Failed to commit purchase delete: {}", e)))?;
        info!(
            "Deleted purchase_id {} ({} statement pair(s) recomputed)",
            purchase_id,
            pairs.len()
        );
    }

    cache::invalidate_user_views(versions, user_id).await;
    Ok(())
}

/// Moves a purchase to another category. Charges and statement aggregates are
/// untouched: reclassification must not trigger any recomputation.
#[instrument(skip(pool, versions))]
pub async fn reclassify_purchase(
    pool: &DbPool,
    versions: &ViewVersions,
    purchase_id: i64,
    user_id: &str,
    category_id: i64,
) -> Result<()> {
    {
        let mut conn = pool.lock().map_err(|_| {
            Error::Database("Failed to acquire DB lock for reclassify".to_string())
        })?;
        let tx = conn
            .transaction()
            .map_err(|e| Error::Database(format!("Failed to start transaction: {}", e)))?;

        load_owned_purchase_tx(&tx, purchase_id, user_id)?;
        load_owned_category_tx(&tx, category_id, user_id)?;
        set_purchase_category_tx(&tx, purchase_id, category_id)?;

        tx.commit()
            .map_err(|e| Error::Database(format!("Failed to commit reclassify: {}", e)))?;
        info!(
            "Reclassified purchase_id {} to category {}",
            purchase_id, category_id
        );
    }

    cache::invalidate_user_views(versions, user_id).await;
    Ok(())
}

/// Idempotent repair: re-derives every statement aggregate from the live
/// charge set. Covers pairs known to either table, so statements whose
/// charges are all gone recompute to zero and charges whose aggregate row
/// somehow went missing get one again. Safe to run at any time.
#[instrument(skip(pool))]
pub async fn reconcile_statements(pool: &DbPool) -> Result<usize> {
    let mut conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock for reconcile".to_string()))?;
    let tx = conn
        .transaction()
        .map_err(|e| Error::Database(format!("Failed to start transaction: {}", e)))?;

    let mut pairs: BTreeSet<(i64, StatementPeriod)> = BTreeSet::new();
    {
        let mut stmt = tx.prepare(
            "SELECT DISTINCT account_id, statement_period FROM charges
             UNION
             SELECT account_id, statement_period FROM statements",
        )?;
        let rows = stmt.query_map([], |row| {
            let account_id: i64 = row.get(0)?;
            let period_str: String = row.get(1)?;
            Ok((account_id, period_str))
        })?;
        for row in rows {
            let (account_id, period_str) =
                row.map_err(|e| Error::Database(format!("Failed to map pair row: {}", e)))?;
            let period = period_str.parse().map_err(|e| {
                Error::Database(format!("Bad statement period during reconcile: {}", e))
            })?;
            pairs.insert((account_id, period));
        }
    }

    refresh_statements_tx(&tx, &pairs)?;
    tx.commit()
        .map_err(|e| Error::Database(format!("Failed to commit reconcile: {}", e)))?;

    info!("Reconciled {} statement aggregate(s)", pairs.len());
    Ok(pairs.len())
}
