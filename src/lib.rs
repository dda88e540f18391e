//! `FaturaLedger` - a household finance ledger engine
//!
//! This crate implements the billing-cycle and installment core of a personal
//! finance ledger: it maps purchases onto credit-card statement periods and
//! due dates, splits purchases into cent-accurate installment charges, and
//! keeps cached per-statement totals consistent with the live charge set
//! across every create/update/delete.

// Deny the most critical lints that could lead to bugs or security issues
#![deny(
    // Security and correctness
    unsafe_code,
    unsafe_op_in_unsafe_fn,

    // Code quality - things that are almost always bugs
    unreachable_code,
    unreachable_patterns,
    unused_must_use,

    // Documentation - broken links are bugs
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
)]
// Warn on things that should be fixed but aren't necessarily bugs
#![warn(
    // Documentation - missing docs should be added gradually
    missing_docs,

    // Clippy categories for overall code quality
    clippy::all,
    clippy::pedantic,
    clippy::nursery,

    // Performance
    clippy::inefficient_to_string,
    clippy::large_types_passed_by_value,
    clippy::needless_pass_by_value,
    clippy::unnecessary_wraps,

    // Correctness
    clippy::clone_on_ref_ptr,
    clippy::dbg_macro,
    clippy::exit,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,

    // Complexity and readability
    clippy::cognitive_complexity,
    clippy::large_enum_variant,
    clippy::match_same_arms,
    clippy::too_many_lines,

    // Style consistency
    clippy::enum_glob_use,
    clippy::inconsistent_struct_constructor,
    clippy::must_use_candidate,
    clippy::redundant_closure_for_method_calls,
    clippy::semicolon_if_nothing_returned,
    clippy::wildcard_imports,

    // Future compatibility
    future_incompatible,
    rust_2018_idioms,
)]
// Allow some pedantic lints that are too noisy or not applicable
#![allow(
    clippy::module_name_repetitions,  // Common pattern in Rust
    clippy::missing_errors_doc,        // Will add gradually
    clippy::missing_panics_doc,        // Will add gradually
)]

/// Billing-cycle date math: statement periods, closing and due dates
pub mod billing;
/// Per-user view-invalidation versions for budget/statement views
pub mod cache;
/// Configuration loading (environment + TOML)
pub mod config;
/// SQLite persistence layer - accounts, categories, purchases, charges, statements
pub mod db;
/// Unified error types and result handling
pub mod errors;
/// Installment splitting of purchase totals
pub mod installments;
/// Purchase mutation orchestration and statement reconciliation
pub mod ledger;
/// Plain data models mirroring the database tables
pub mod models;
