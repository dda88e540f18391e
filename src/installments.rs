//! Installment splitting.
//!
//! Turns a purchase total into per-installment charge plans, each assigned to
//! its statement period and due date via the billing-cycle calculator.

use crate::billing::{
    self, statement_due_date, statement_window_start, StatementPeriod,
};
use crate::models::BillingConfig;
use chrono::NaiveDate;

/// One planned installment of a purchase, fully dated and priced but not yet
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCharge {
    pub installment_number: u32, // 1-based
    pub amount: i64,
    pub purchase_date: NaiveDate,
    pub statement_period: StatementPeriod,
    pub due_date: NaiveDate,
}

/// `round(total / count)` in integer minor units, rounding half up. The last
/// installment absorbs the remainder so the amounts always sum to `total`.
fn per_installment_amount(total: i64, count: u32) -> i64 {
    let count = i64::from(count);
    (2 * total + count) / (2 * count)
}

/// Splits a purchase of `total_amount` minor units into `installment_count`
/// charges starting from `first_purchase_date`.
///
/// With a billing configuration, the base statement period is computed once
/// from the first purchase date; installment *i* lands in that period
/// advanced by *i* months with the configured due date. Without one, each
/// installment is simply the first date shifted *i* calendar months, due on
/// its own purchase date.
///
/// Note the deliberate asymmetry in charge purchase dates on billing-cycle
/// accounts: installment 1 keeps the real purchase date (so budget-by-month
/// reporting sees the actual spend), while later installments get a synthetic
/// placeholder at their own statement window's first day. Per-installment
/// purchase dates are therefore not semantically uniform, and existing
/// statement totals depend on this; do not "fix" it.
///
/// Callers validate `total_amount >= 1` and `installment_count >= 1` before
/// calling.
pub fn split_purchase(
    total_amount: i64,
    installment_count: u32,
    first_purchase_date: NaiveDate,
    billing: Option<&BillingConfig>,
) -> Vec<PlannedCharge> {
    let per = per_installment_amount(total_amount, installment_count);
    let last = total_amount - per * i64::from(installment_count - 1);

    let base_period = billing
        .map(|cfg| billing::statement_period(first_purchase_date, cfg.closing_day));

    (0..installment_count)
        .map(|i| {
            let amount = if i + 1 == installment_count { last } else { per };
            match (billing, base_period) {
                (Some(cfg), Some(base)) => {
                    let period = base.plus_months(i);
                    PlannedCharge {
                        installment_number: i + 1,
                        amount,
                        purchase_date: if i == 0 {
                            first_purchase_date
                        } else {
                            statement_window_start(period, cfg.closing_day)
                        },
                        statement_period: period,
                        due_date: statement_due_date(
                            period,
                            cfg.payment_due_day,
                            cfg.closing_day,
                        ),
                    }
                }
                _ => {
                    // No billing cycle: calendar months, due on purchase.
                    let purchase_date =
                        billing::shift_months(first_purchase_date, i);
                    PlannedCharge {
                        installment_number: i + 1,
                        amount,
                        purchase_date,
                        statement_period: StatementPeriod::from_date(purchase_date),
                        due_date: purchase_date,
                    }
                }
            }
        })
        .collect()
}
