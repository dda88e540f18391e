//! Reconcile entry point: re-derives every cached statement total from the
//! live charge set. Idempotent, safe to run on demand after a suspected
//! partial failure or a schema migration.

use dotenvy::dotenv;
use fatura_ledger::errors::Result;
use fatura_ledger::{config, db, ledger};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file (non-fatal, env vars can be set externally)
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the application configuration
    let app_config = config::load_app_configuration()?;
    info!("Using database at {}", app_config.database_path);

    // 4. Initialize database
    let db_pool = db::init_db(&app_config.database_path)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Recompute every statement aggregate
    let reconciled = ledger::reconcile_statements(&db_pool)
        .await
        .inspect_err(|e| error!("Reconciliation failed: {}", e))?;
    info!("Reconciled {} statement aggregate(s). Done.", reconciled);

    Ok(())
}
