use crate::billing::StatementPeriod;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// What kind of payment source an account is. Only the billing configuration
/// (not the kind) drives statement-cycle behavior; the kind is reported to
/// callers so they can distinguish card accounts in views.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    CreditCard,
    Other,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountKind::CreditCard => "credit_card",
            AccountKind::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "credit_card" => Some(AccountKind::CreditCard),
            "other" => Some(AccountKind::Other),
            _ => None,
        }
    }
}

/// Credit-card billing cycle settings. Both days are day-of-month values in
/// 1..=28 so every month of the year contains them.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct BillingConfig {
    pub closing_day: u32,
    pub payment_due_day: u32,
}

// Based on the "accounts" table
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Account {
    pub id: i64, // Primary Key, INTEGER
    pub user_id: String,
    pub name: String,
    pub kind: AccountKind,
    // closing_day / payment_due_day are separate nullable columns; an account
    // only has a billing cycle when BOTH are present.
    pub billing: Option<BillingConfig>,
}

// Based on the "categories" table
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Category {
    pub id: i64,
    pub user_id: String,
    pub name: String, // display name, also used to synthesize descriptions
}

// Based on the "purchases" table. A purchase is the logical transaction; its
// money lives in the charge rows generated from it.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Purchase {
    pub id: i64,
    pub user_id: String,
    pub account_id: i64,
    pub category_id: i64,
    pub description: String,
    pub total_amount: i64, // integer minor units (cents)
    pub installment_count: u32,
    pub first_purchase_date: NaiveDate,
}

// Based on the "charges" table: one row per installment of a purchase.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Charge {
    pub id: i64,
    pub purchase_id: i64,
    pub account_id: i64,
    pub amount: i64, // integer minor units (cents)
    pub purchase_date: NaiveDate,
    pub statement_period: StatementPeriod,
    pub due_date: NaiveDate,
    pub installment_number: u32,       // 1-based
    pub paid_at: Option<DateTime<Utc>>, // NULL while pending
}

// Based on the "statements" table: the cached per-(account, period) total.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Statement {
    pub id: i64,
    pub account_id: i64,
    pub statement_period: StatementPeriod,
    pub total_amount: i64, // cached sum of matching charge amounts
    pub due_date: NaiveDate,
    pub paid_at: Option<DateTime<Utc>>,
    pub paid_from_account_id: Option<i64>, // which account funded the payment
}

impl Statement {
    /// A statement is only settled when it has been explicitly marked paid;
    /// the cached total and the payment flag are independent fields.
    pub fn is_paid(&self) -> bool {
        self.paid_at.is_some()
    }
}
