use crate::db::DbPool;
use crate::errors::{Error, Result};
use crate::models::Category;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, instrument};

/// Creates a new spending category for a user.
#[instrument(skip(pool))]
pub async fn create_category(pool: &DbPool, user_id: &str, name: &str) -> Result<Category> {
    if name.trim().is_empty() {
        return Err(Error::Validation(
            "category name must not be empty".to_string(),
        ));
    }
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let mut stmt =
        conn.prepare_cached("INSERT INTO categories (user_id, name) VALUES (?1, ?2)")?;
    let id = stmt.insert(params![user_id, name])?;
    info!("Created category_id {} ('{}') for user {}", id, name, user_id);
    Ok(Category {
        id,
        user_id: user_id.to_string(),
        name: name.to_string(),
    })
}

pub(crate) fn get_category_tx(conn: &Connection, category_id: i64) -> Result<Option<Category>> {
    let mut stmt =
        conn.prepare_cached("SELECT id, user_id, name FROM categories WHERE id = ?1")?;
    let category = stmt
        .query_row(params![category_id], |row| {
            Ok(Category {
                id: row.get(0)?,
                user_id: row.get(1)?,
                name: row.get(2)?,
            })
        })
        .optional()?;
    Ok(category)
}

/// Fetches a category by id, returning `Ok(None)` if it does not exist.
#[instrument(skip(pool))]
pub async fn get_category(pool: &DbPool, category_id: i64) -> Result<Option<Category>> {
    let conn = pool
        .lock()
        .map_err(|_| Error::Database("Failed to acquire DB lock".to_string()))?;
    let category = get_category_tx(&conn, category_id)?;
    debug!("Fetched category {}: {:?}", category_id, category.is_some());
    Ok(category)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{init_test_tracing, setup_test_db};
    use crate::errors::Result;

    #[tokio::test]
    async fn test_create_and_fetch_category() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        let created = create_category(&pool, "user1", "Mercado").await?;
        let fetched = get_category(&pool, created.id).await?.expect("category");
        assert_eq!(fetched.name, "Mercado");
        assert_eq!(fetched.user_id, "user1");

        assert!(get_category(&pool, 9999).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_category_name_is_rejected() -> Result<()> {
        init_test_tracing();
        let pool = setup_test_db().await?;

        let result = create_category(&pool, "user1", "   ").await;
        assert!(matches!(result, Err(Error::Validation(_))));
        Ok(())
    }
}
