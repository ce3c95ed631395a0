//! In-memory collaborators and on-disk theme fixtures for engine tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use weblog_core::error::ThemeError;
use weblog_core::themes::registry::ThemeRegistry;
use weblog_core::themes::store::{
    OverrideDraft, OverrideLookup, OverrideStore, OverrideTemplate, RenderCacheEvictor,
    SwitchCommit, WeblogThemeState,
};
use weblog_core::themes::{Derivation, TemplateRole, DESCRIPTOR_FILE};
use weblog_core::types::DbId;

#[derive(Default)]
struct Tables {
    weblogs: BTreeMap<DbId, WeblogThemeState>,
    templates: BTreeMap<DbId, OverrideTemplate>,
    next_id: DbId,
}

/// Override store backed by two in-memory tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    fail_commit: Arc<Mutex<bool>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_weblog(&self, weblog_id: DbId, handle: &str, theme_id: &str) {
        self.tables.lock().unwrap().weblogs.insert(
            weblog_id,
            WeblogThemeState {
                weblog_id,
                handle: handle.to_string(),
                theme_id: theme_id.to_string(),
                last_modified: Utc::now(),
            },
        );
    }

    /// Insert a row directly, bypassing classification.
    pub fn insert(
        &self,
        weblog_id: DbId,
        name: &str,
        role: TemplateRole,
        derivation: Derivation,
    ) -> DbId {
        let mut tables = self.tables.lock().unwrap();
        tables.next_id += 1;
        let id = tables.next_id;
        tables.templates.insert(
            id,
            OverrideTemplate {
                id,
                weblog_id,
                name: name.to_string(),
                role,
                derivation,
                description: String::new(),
                content: format!("<!-- {name} -->"),
                language: "thymeleaf".to_string(),
                link: None,
                hidden: false,
                navbar: false,
                last_modified: Utc::now(),
            },
        );
        id
    }

    pub fn weblog(&self, weblog_id: DbId) -> WeblogThemeState {
        self.tables.lock().unwrap().weblogs[&weblog_id].clone()
    }

    pub fn rows(&self, weblog_id: DbId) -> Vec<OverrideTemplate> {
        self.tables
            .lock()
            .unwrap()
            .templates
            .values()
            .filter(|t| t.weblog_id == weblog_id)
            .cloned()
            .collect()
    }

    /// Make the next `commit_theme_switch` fail without changing anything.
    pub fn fail_next_commit(&self) {
        *self.fail_commit.lock().unwrap() = true;
    }
}

#[derive(Debug, thiserror::Error)]
#[error("simulated store failure")]
pub struct SimulatedFailure;

#[async_trait]
impl OverrideLookup for MemoryStore {
    async fn find_override(&self, id: DbId) -> Result<Option<OverrideTemplate>, ThemeError> {
        Ok(self.tables.lock().unwrap().templates.get(&id).cloned())
    }
}

#[async_trait]
impl OverrideStore for MemoryStore {
    async fn find_weblog(&self, weblog_id: DbId) -> Result<Option<WeblogThemeState>, ThemeError> {
        Ok(self.tables.lock().unwrap().weblogs.get(&weblog_id).cloned())
    }

    async fn list_overrides(&self, weblog_id: DbId) -> Result<Vec<OverrideTemplate>, ThemeError> {
        let mut rows = self.rows(weblog_id);
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn upsert_override(
        &self,
        weblog_id: DbId,
        draft: &OverrideDraft,
        derivation: Derivation,
    ) -> Result<OverrideTemplate, ThemeError> {
        let mut tables = self.tables.lock().unwrap();
        let existing = tables
            .templates
            .values()
            .find(|t| t.weblog_id == weblog_id && t.name == draft.name)
            .map(|t| t.id);
        let id = match existing {
            Some(id) => id,
            None => {
                tables.next_id += 1;
                tables.next_id
            }
        };
        let row = OverrideTemplate {
            id,
            weblog_id,
            name: draft.name.clone(),
            role: draft.role,
            derivation,
            description: draft.description.clone(),
            content: draft.content.clone(),
            language: draft.language.clone(),
            link: draft.link.clone(),
            hidden: draft.hidden,
            navbar: draft.navbar,
            last_modified: Utc::now(),
        };
        tables.templates.insert(id, row.clone());
        Ok(row)
    }

    async fn delete_override(&self, weblog_id: DbId, id: DbId) -> Result<bool, ThemeError> {
        let mut tables = self.tables.lock().unwrap();
        match tables.templates.get(&id) {
            Some(t) if t.weblog_id == weblog_id => {
                tables.templates.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit_theme_switch(
        &self,
        weblog_id: DbId,
        theme_id: &str,
        discard: &[DbId],
    ) -> Result<SwitchCommit, ThemeError> {
        if std::mem::take(&mut *self.fail_commit.lock().unwrap()) {
            return Err(ThemeError::store(SimulatedFailure));
        }
        let mut tables = self.tables.lock().unwrap();
        if !tables.weblogs.contains_key(&weblog_id) {
            return Err(ThemeError::WeblogNotFound(weblog_id));
        }
        let before = tables.templates.len();
        tables
            .templates
            .retain(|id, t| !(t.weblog_id == weblog_id && discard.contains(id)));
        let deleted = (before - tables.templates.len()) as u64;
        if let Some(weblog) = tables.weblogs.get_mut(&weblog_id) {
            weblog.theme_id = theme_id.to_string();
            weblog.last_modified = Utc::now();
        }
        Ok(SwitchCommit { deleted })
    }
}

/// Evictor that records every call.
#[derive(Clone, Default)]
pub struct RecordingEvictor {
    calls: Arc<Mutex<Vec<(DbId, String, TemplateRole)>>>,
}

impl RecordingEvictor {
    pub fn calls(&self) -> Vec<(DbId, String, TemplateRole)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn evicted_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.calls().into_iter().map(|(_, name, _)| name).collect();
        names.sort();
        names
    }
}

impl RenderCacheEvictor for RecordingEvictor {
    fn evict(&self, weblog_id: DbId, template_name: &str, role: TemplateRole) {
        self.calls
            .lock()
            .unwrap()
            .push((weblog_id, template_name.to_string(), role));
    }
}

/// Write a theme directory with one HTML file per `(role, name, file)` entry.
pub fn write_theme(root: &Path, id: &str, name: &str, templates: &[(&str, &str, &str)]) {
    let dir = root.join(id);
    std::fs::create_dir_all(&dir).unwrap();
    let blocks: Vec<String> = templates
        .iter()
        .map(|(role, name, file)| {
            format!(
                r#"{{ "role": "{role}", "name": "{name}", "renditions": [
                    {{ "kind": "standard", "contents_file": "{file}", "language": "thymeleaf" }}
                ] }}"#
            )
        })
        .collect();
    let descriptor = format!(
        r#"{{ "id": "{id}", "name": "{name}", "dual_rendition": true, "templates": [{}] }}"#,
        blocks.join(",")
    );
    std::fs::write(dir.join(DESCRIPTOR_FILE), descriptor).unwrap();
    for (_, template, file) in templates {
        std::fs::write(dir.join(file), format!("<p>{id}/{template}</p>")).unwrap();
    }
}

/// A registry holding themes `basic` (weblog, permalink, about) and `bold`
/// (home, permalink, archive), loaded from a temporary directory.
pub fn registry() -> (tempfile::TempDir, Arc<ThemeRegistry>) {
    let root = tempfile::tempdir().unwrap();
    write_theme(
        root.path(),
        "basic",
        "Basic",
        &[
            ("weblog", "weblog", "weblog.html"),
            ("permalink", "permalink", "permalink.html"),
            ("custom_external", "about", "about.html"),
        ],
    );
    write_theme(
        root.path(),
        "bold",
        "Bold",
        &[
            ("weblog", "home", "home.html"),
            ("permalink", "permalink", "entry.html"),
            ("custom_external", "archive", "archive.html"),
        ],
    );
    let registry = Arc::new(ThemeRegistry::new());
    let report = registry.reload_from_dir(root.path()).unwrap();
    assert_eq!(report.loaded, vec!["basic", "bold"]);
    (root, registry)
}
