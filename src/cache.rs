//! Downstream view invalidation.
//!
//! Budget and statement views cache their rollups keyed on a per-user
//! version. Every successful ledger mutation bumps the owning user's version
//! exactly once, after the database transaction commits; failed mutations
//! never bump. Readers compare versions to decide whether to refresh.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, trace};

/// Monotonically increasing view version per user id.
pub type ViewVersions = Arc<RwLock<HashMap<String, u64>>>;

/// Fresh version map; every user implicitly starts at version 0.
pub fn new_view_versions() -> ViewVersions {
    Arc::new(RwLock::new(HashMap::new()))
}

/// Signals that a user's budget/statement views are stale.
///
/// This runs outside any database transaction and cannot fail; callers fire
/// it once per successful mutation and must not let it gate the mutation
/// result.
pub async fn invalidate_user_views(versions: &ViewVersions, user_id: &str) {
    let mut writer = versions.write().await;
    let version = writer.entry(user_id.to_string()).or_insert(0);
    *version += 1;
    info!(
        "Invalidated views for user {} (version now {})",
        user_id, version
    );
    trace!("View versions now: {:?}", writer);
}

/// Current view version for a user; 0 if never invalidated.
pub async fn view_version(versions: &ViewVersions, user_id: &str) -> u64 {
    let reader = versions.read().await;
    reader.get(user_id).copied().unwrap_or(0)
}
