//! Collaborator seams: the persisted override store and the render-output
//! cache evictor.
//!
//! The engine only sees these traits. `weblog-db` implements the store over
//! PostgreSQL; the application supplies the evictor.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ThemeError;
use crate::themes::role::{Derivation, TemplateRole};
use crate::types::{DbId, Timestamp};

/// A weblog-owned template persisted in the override store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverrideTemplate {
    pub id: DbId,
    pub weblog_id: DbId,
    pub name: String,
    pub role: TemplateRole,
    /// Either `Overridden` or `SpecificBlog`; `Shared` is never persisted.
    pub derivation: Derivation,
    pub description: String,
    pub content: String,
    pub language: String,
    pub link: Option<String>,
    pub hidden: bool,
    pub navbar: bool,
    pub last_modified: Timestamp,
}

/// Payload for creating or replacing a weblog's override template.
#[derive(Debug, Clone, Deserialize)]
pub struct OverrideDraft {
    pub name: String,
    pub role: TemplateRole,
    #[serde(default)]
    pub description: String,
    pub content: String,
    pub language: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub navbar: bool,
}

/// The theme-related state of a weblog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeblogThemeState {
    pub weblog_id: DbId,
    pub handle: String,
    pub theme_id: String,
    pub last_modified: Timestamp,
}

/// Rows removed by a committed theme switch.
#[derive(Debug, Clone, Default)]
pub struct SwitchCommit {
    pub deleted: u64,
}

/// Read access to persisted overrides by primary key, used at render time.
#[async_trait]
pub trait OverrideLookup: Send + Sync {
    async fn find_override(&self, id: DbId) -> Result<Option<OverrideTemplate>, ThemeError>;
}

/// Full override store used by the switch coordinator.
#[async_trait]
pub trait OverrideStore: OverrideLookup {
    async fn find_weblog(&self, weblog_id: DbId) -> Result<Option<WeblogThemeState>, ThemeError>;

    /// All persisted overrides of a weblog, ordered by name.
    async fn list_overrides(&self, weblog_id: DbId) -> Result<Vec<OverrideTemplate>, ThemeError>;

    /// Insert a new override, or replace the content of the weblog's
    /// existing override with the same name.
    async fn upsert_override(
        &self,
        weblog_id: DbId,
        draft: &OverrideDraft,
        derivation: Derivation,
    ) -> Result<OverrideTemplate, ThemeError>;

    /// Delete one override of a weblog. Returns `true` if a row was removed.
    async fn delete_override(&self, weblog_id: DbId, id: DbId) -> Result<bool, ThemeError>;

    /// Atomically delete the weblog's overrides listed in `discard`, set its
    /// theme id and bump its last-modified marker. Either every step commits
    /// or none does. Ids that belong to another weblog are left alone.
    async fn commit_theme_switch(
        &self,
        weblog_id: DbId,
        theme_id: &str,
        discard: &[DbId],
    ) -> Result<SwitchCommit, ThemeError>;
}

/// Evicts rendered output held by an external render cache.
pub trait RenderCacheEvictor: Send + Sync {
    /// Drop every cached rendering of `weblog_id` produced by the template
    /// with this name or role.
    fn evict(&self, weblog_id: DbId, template_name: &str, role: TemplateRole);
}

impl<T: RenderCacheEvictor + ?Sized> RenderCacheEvictor for Arc<T> {
    fn evict(&self, weblog_id: DbId, template_name: &str, role: TemplateRole) {
        (**self).evict(weblog_id, template_name, role)
    }
}
