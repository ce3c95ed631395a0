//! Repository for the `weblogs` table.

use sqlx::{PgExecutor, PgPool};
use weblog_core::types::DbId;

use crate::models::weblog::{CreateWeblog, Weblog};
use crate::repositories::WeblogTemplateRepo;

/// Column list for the `weblogs` table.
const COLUMNS: &str = "id, handle, name, theme, last_modified, created_at, updated_at";

/// Provides data access for weblogs.
pub struct WeblogRepo;

impl WeblogRepo {
    /// Insert a new weblog, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateWeblog) -> Result<Weblog, sqlx::Error> {
        let query = format!(
            "INSERT INTO weblogs (handle, name, theme) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Weblog>(&query)
            .bind(&input.handle)
            .bind(&input.name)
            .bind(&input.theme)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Weblog>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM weblogs WHERE id = $1");
        sqlx::query_as::<_, Weblog>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Point a weblog at another shared theme and bump its last-modified
    /// marker. Returns `true` if the weblog exists.
    pub async fn set_theme<'e, E>(executor: E, id: DbId, theme: &str) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE weblogs \
             SET theme = $2, last_modified = NOW(), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(theme)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a weblog and its template overrides in one transaction.
    ///
    /// Returns `true` if the weblog existed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let templates = WeblogTemplateRepo::delete_all_for_weblog(&mut *tx, id).await?;
        let result = sqlx::query("DELETE FROM weblogs WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::debug!(weblog_id = id, templates, "Weblog deleted");
        Ok(result.rows_affected() > 0)
    }
}
