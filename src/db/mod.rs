pub mod accounts;
pub mod categories;
pub mod charges;
pub mod connection;
pub mod purchases;
pub(crate) mod schema;
pub mod statements;
#[cfg(test)]
pub(crate) mod test_utils;

pub use accounts::{create_account, get_account, update_billing_config, NewAccount};
pub use categories::{create_category, get_category};
pub use charges::{
    clear_charge_paid, get_charges_for_purchase, get_charges_for_statement, mark_charge_paid,
};
pub use connection::{init_db, DbPool};
pub use purchases::{get_purchase, list_purchases_for_user};
pub use statements::{
    get_statement, list_statements_for_account, mark_statement_paid, recompute_statement,
    reopen_statement,
};
