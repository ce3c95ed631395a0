//! Repository for the `weblog_templates` table.

use sqlx::{PgExecutor, PgPool};
use weblog_core::themes::store::OverrideDraft;
use weblog_core::themes::Derivation;
use weblog_core::types::DbId;

use crate::models::weblog_template::WeblogTemplate;

/// Column list for the `weblog_templates` table.
const COLUMNS: &str = "id, weblog_id, name, role, derivation, description, template, \
    template_language, link, hidden, navbar, last_modified, created_at, updated_at";

/// Provides data access for per-weblog template overrides.
pub struct WeblogTemplateRepo;

impl WeblogTemplateRepo {
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<WeblogTemplate>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM weblog_templates WHERE id = $1");
        sqlx::query_as::<_, WeblogTemplate>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a weblog's overrides ordered by name.
    pub async fn list_by_weblog(
        pool: &PgPool,
        weblog_id: DbId,
    ) -> Result<Vec<WeblogTemplate>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM weblog_templates WHERE weblog_id = $1 ORDER BY name");
        sqlx::query_as::<_, WeblogTemplate>(&query)
            .bind(weblog_id)
            .fetch_all(pool)
            .await
    }

    /// Insert an override, or replace the weblog's override with the same
    /// name.
    pub async fn upsert(
        pool: &PgPool,
        weblog_id: DbId,
        draft: &OverrideDraft,
        derivation: Derivation,
    ) -> Result<WeblogTemplate, sqlx::Error> {
        let query = format!(
            "INSERT INTO weblog_templates \
                (weblog_id, name, role, derivation, description, template, \
                 template_language, link, hidden, navbar) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT ON CONSTRAINT uq_weblog_templates_weblog_name \
             DO UPDATE SET \
                role = EXCLUDED.role, \
                derivation = EXCLUDED.derivation, \
                description = EXCLUDED.description, \
                template = EXCLUDED.template, \
                template_language = EXCLUDED.template_language, \
                link = EXCLUDED.link, \
                hidden = EXCLUDED.hidden, \
                navbar = EXCLUDED.navbar, \
                last_modified = NOW(), \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WeblogTemplate>(&query)
            .bind(weblog_id)
            .bind(&draft.name)
            .bind(draft.role.as_str())
            .bind(derivation.as_str())
            .bind(&draft.description)
            .bind(&draft.content)
            .bind(&draft.language)
            .bind(&draft.link)
            .bind(draft.hidden)
            .bind(draft.navbar)
            .fetch_one(pool)
            .await
    }

    /// Delete one of a weblog's overrides. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, weblog_id: DbId, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM weblog_templates WHERE id = $1 AND weblog_id = $2")
            .bind(id)
            .bind(weblog_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete the listed overrides of a weblog. Ids owned by another weblog
    /// are ignored.
    ///
    /// Returns the number of rows removed.
    pub async fn delete_by_ids<'e, E>(
        executor: E,
        weblog_id: DbId,
        ids: &[DbId],
    ) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result =
            sqlx::query("DELETE FROM weblog_templates WHERE weblog_id = $1 AND id = ANY($2)")
                .bind(weblog_id)
                .bind(ids)
                .execute(executor)
                .await?;
        Ok(result.rows_affected())
    }

    /// Delete every override of a weblog. Returns the number of rows removed.
    pub async fn delete_all_for_weblog<'e, E>(
        executor: E,
        weblog_id: DbId,
    ) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM weblog_templates WHERE weblog_id = $1")
            .bind(weblog_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
