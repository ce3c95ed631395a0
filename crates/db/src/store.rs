//! PostgreSQL implementation of the engine's override store.

use async_trait::async_trait;
use weblog_core::error::ThemeError;
use weblog_core::themes::store::{
    OverrideDraft, OverrideLookup, OverrideStore, OverrideTemplate, SwitchCommit,
    WeblogThemeState,
};
use weblog_core::themes::Derivation;
use weblog_core::types::DbId;

use crate::models::weblog_template::WeblogTemplate;
use crate::repositories::{WeblogRepo, WeblogTemplateRepo};
use crate::DbPool;

/// Override store backed by the `weblogs` and `weblog_templates` tables.
#[derive(Debug, Clone)]
pub struct PgThemeStore {
    pool: DbPool,
}

impl PgThemeStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn to_override(row: WeblogTemplate) -> Result<OverrideTemplate, ThemeError> {
    OverrideTemplate::try_from(row).map_err(ThemeError::store)
}

#[async_trait]
impl OverrideLookup for PgThemeStore {
    async fn find_override(&self, id: DbId) -> Result<Option<OverrideTemplate>, ThemeError> {
        WeblogTemplateRepo::find_by_id(&self.pool, id)
            .await
            .map_err(ThemeError::store)?
            .map(to_override)
            .transpose()
    }
}

#[async_trait]
impl OverrideStore for PgThemeStore {
    async fn find_weblog(&self, weblog_id: DbId) -> Result<Option<WeblogThemeState>, ThemeError> {
        let weblog = WeblogRepo::find_by_id(&self.pool, weblog_id)
            .await
            .map_err(ThemeError::store)?;
        Ok(weblog.map(WeblogThemeState::from))
    }

    async fn list_overrides(&self, weblog_id: DbId) -> Result<Vec<OverrideTemplate>, ThemeError> {
        WeblogTemplateRepo::list_by_weblog(&self.pool, weblog_id)
            .await
            .map_err(ThemeError::store)?
            .into_iter()
            .map(to_override)
            .collect()
    }

    async fn upsert_override(
        &self,
        weblog_id: DbId,
        draft: &OverrideDraft,
        derivation: Derivation,
    ) -> Result<OverrideTemplate, ThemeError> {
        let row = WeblogTemplateRepo::upsert(&self.pool, weblog_id, draft, derivation)
            .await
            .map_err(ThemeError::store)?;
        to_override(row)
    }

    async fn delete_override(&self, weblog_id: DbId, id: DbId) -> Result<bool, ThemeError> {
        WeblogTemplateRepo::delete(&self.pool, weblog_id, id)
            .await
            .map_err(ThemeError::store)
    }

    async fn commit_theme_switch(
        &self,
        weblog_id: DbId,
        theme_id: &str,
        discard: &[DbId],
    ) -> Result<SwitchCommit, ThemeError> {
        let mut tx = self.pool.begin().await.map_err(ThemeError::store)?;

        let deleted = WeblogTemplateRepo::delete_by_ids(&mut *tx, weblog_id, discard)
            .await
            .map_err(ThemeError::store)?;

        let found = WeblogRepo::set_theme(&mut *tx, weblog_id, theme_id)
            .await
            .map_err(ThemeError::store)?;
        if !found {
            // Dropping the transaction rolls back the delete.
            return Err(ThemeError::WeblogNotFound(weblog_id));
        }

        tx.commit().await.map_err(ThemeError::store)?;
        tracing::debug!(weblog_id, theme_id, deleted, "Theme switch committed");
        Ok(SwitchCommit { deleted })
    }
}
