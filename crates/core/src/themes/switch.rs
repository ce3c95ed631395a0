//! Theme switch validation and execution, plus override editing.
//!
//! Every mutation of a weblog's theme state runs under that weblog's lock, so
//! a switch never interleaves with another switch or with an override edit of
//! the same weblog. Renders never take these locks.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::OwnedMutexGuard;

use crate::error::ThemeError;
use crate::themes::effective::EffectiveThemeView;
use crate::themes::registry::ThemeRegistry;
use crate::themes::role::{Derivation, TemplateRole};
use crate::themes::shared::SharedTheme;
use crate::themes::store::{
    OverrideDraft, OverrideStore, OverrideTemplate, RenderCacheEvictor, WeblogThemeState,
};
use crate::types::DbId;

/* --------------------------------------------------------------------------
Validation
-------------------------------------------------------------------------- */

/// A blog-only template that would clash with the candidate theme.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// The template holds a singleton role the candidate theme already fills.
    SingletonRole { template: String, role: TemplateRole },
    /// The candidate theme already has a template with this name.
    Name { template: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingletonRole { template, role } => write!(
                f,
                "Template '{template}' holds the {} role, which the new theme already provides",
                role.readable_name()
            ),
            Self::Name { template } => write!(
                f,
                "Template name '{template}' is already used by the new theme"
            ),
        }
    }
}

/// Collect every conflict between a weblog's blog-only templates and a
/// candidate theme.
///
/// Only `SpecificBlog` entries are checked. Each produces at most one
/// violation; the singleton-role check wins over the name check. The result
/// depends only on its inputs.
pub fn validate_switch(current: &EffectiveThemeView, candidate: &SharedTheme) -> Vec<Violation> {
    current
        .templates()
        .iter()
        .filter(|t| t.derivation == Derivation::SpecificBlog)
        .filter_map(|t| {
            if t.role.is_singleton() && candidate.template_by_role(t.role).is_some() {
                Some(Violation::SingletonRole {
                    template: t.name.clone(),
                    role: t.role,
                })
            } else if candidate.template_by_name(&t.name).is_some() {
                Some(Violation::Name {
                    template: t.name.clone(),
                })
            } else {
                None
            }
        })
        .collect()
}

/* --------------------------------------------------------------------------
Per-weblog locks
-------------------------------------------------------------------------- */

/// One async mutex per weblog, created on first use and dropped once no
/// caller holds or waits for it.
#[derive(Default)]
pub struct WeblogLocks {
    locks: Mutex<HashMap<DbId, Arc<tokio::sync::Mutex<()>>>>,
}

impl WeblogLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a weblog's theme state.
    pub async fn acquire(&self, weblog_id: DbId) -> WeblogGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(weblog_id).or_default())
        };
        WeblogGuard {
            guard: Some(lock.lock_owned().await),
            locks: self,
            weblog_id,
        }
    }

    /// Number of weblogs with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, weblog_id: DbId) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // The map's own reference is the last one: nobody holds or awaits it.
        if locks
            .get(&weblog_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&weblog_id);
        }
    }
}

/// Exclusive access to one weblog's theme state.
pub struct WeblogGuard<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    locks: &'a WeblogLocks,
    weblog_id: DbId,
}

impl Drop for WeblogGuard<'_> {
    fn drop(&mut self) {
        // Unlock first so the map entry's count drops to one.
        drop(self.guard.take());
        self.locks.release(self.weblog_id);
    }
}

/* --------------------------------------------------------------------------
Coordinator
-------------------------------------------------------------------------- */

/// Names of the overrides affected by a committed switch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SwitchReport {
    pub weblog_id: DbId,
    pub previous_theme: String,
    pub theme_id: String,
    /// `Overridden` rows deleted by the switch.
    pub discarded: Vec<String>,
    /// Blog-only rows carried over to the new theme.
    pub retained: Vec<String>,
}

/// Validates and commits theme switches and override edits.
pub struct ThemeSwitchCoordinator<S, E> {
    registry: Arc<ThemeRegistry>,
    store: S,
    evictor: E,
    locks: WeblogLocks,
}

impl<S, E> ThemeSwitchCoordinator<S, E>
where
    S: OverrideStore,
    E: RenderCacheEvictor,
{
    pub fn new(registry: Arc<ThemeRegistry>, store: S, evictor: E) -> Self {
        Self {
            registry,
            store,
            evictor,
            locks: WeblogLocks::new(),
        }
    }

    /// Build a weblog's effective theme from the registry and the store.
    pub async fn effective_view(&self, weblog_id: DbId) -> Result<EffectiveThemeView, ThemeError> {
        let weblog = self.weblog(weblog_id).await?;
        self.view_for(&weblog).await
    }

    /// Validate a switch without changing anything.
    pub async fn check_switch(
        &self,
        weblog_id: DbId,
        candidate_id: &str,
    ) -> Result<Vec<Violation>, ThemeError> {
        let view = self.effective_view(weblog_id).await?;
        let candidate = self.shared_theme(candidate_id)?;
        Ok(validate_switch(&view, &candidate))
    }

    /// Validate and, when conflict-free, commit a switch to `candidate_id`.
    ///
    /// Fails with [`ThemeError::ThemeSwitchConflict`] carrying every
    /// violation; nothing is changed in that case.
    pub async fn switch_theme(
        &self,
        weblog_id: DbId,
        candidate_id: &str,
    ) -> Result<SwitchReport, ThemeError> {
        let _guard = self.locks.acquire(weblog_id).await;

        let weblog = self.weblog(weblog_id).await?;
        let candidate = self.shared_theme(candidate_id)?;

        if weblog.theme_id == candidate_id {
            return Ok(unchanged(weblog));
        }

        let view = self.view_for(&weblog).await?;
        let violations = validate_switch(&view, &candidate);
        if !violations.is_empty() {
            tracing::info!(
                weblog_id,
                theme_id = %candidate_id,
                conflicts = violations.len(),
                "Theme switch refused",
            );
            return Err(ThemeError::ThemeSwitchConflict(violations));
        }

        self.apply_locked(&weblog, &candidate).await
    }

    /// Commit a switch that has already been validated.
    ///
    /// Deletes the overrides that replace templates of the current theme,
    /// moves the weblog to `candidate_id` and bumps its last-modified marker
    /// in one store transaction, then evicts cached renderings of every
    /// override that existed before the switch. Applying the weblog's current
    /// theme changes nothing.
    pub async fn apply_switch(
        &self,
        weblog_id: DbId,
        candidate_id: &str,
    ) -> Result<SwitchReport, ThemeError> {
        let _guard = self.locks.acquire(weblog_id).await;
        let weblog = self.weblog(weblog_id).await?;
        let candidate = self.shared_theme(candidate_id)?;
        self.apply_locked(&weblog, &candidate).await
    }

    /// Create or replace one of a weblog's override templates.
    pub async fn save_override(
        &self,
        weblog_id: DbId,
        draft: &OverrideDraft,
    ) -> Result<OverrideTemplate, ThemeError> {
        let _guard = self.locks.acquire(weblog_id).await;

        let draft = OverrideDraft {
            name: draft.name.trim().to_string(),
            ..draft.clone()
        };
        let weblog = self.weblog(weblog_id).await?;
        let view = self.view_for(&weblog).await?;
        let derivation = view.classify_draft(&draft)?;

        let saved = self.store.upsert_override(weblog_id, &draft, derivation).await?;
        self.evictor.evict(weblog_id, &saved.name, saved.role);

        tracing::info!(
            weblog_id,
            template = %saved.name,
            derivation = %derivation,
            "Template override saved",
        );
        Ok(saved)
    }

    /// Delete one of a weblog's override templates.
    ///
    /// Deleting an `Overridden` row exposes the shared template again.
    pub async fn delete_override(&self, weblog_id: DbId, id: DbId) -> Result<(), ThemeError> {
        let _guard = self.locks.acquire(weblog_id).await;

        let existing = self
            .store
            .find_override(id)
            .await?
            .filter(|t| t.weblog_id == weblog_id)
            .ok_or_else(|| ThemeError::TemplateNotFound(id.to_string()))?;

        if !self.store.delete_override(weblog_id, id).await? {
            return Err(ThemeError::TemplateNotFound(id.to_string()));
        }
        self.evictor.evict(weblog_id, &existing.name, existing.role);

        tracing::info!(weblog_id, template = %existing.name, "Template override deleted");
        Ok(())
    }

    async fn apply_locked(
        &self,
        weblog: &WeblogThemeState,
        candidate: &SharedTheme,
    ) -> Result<SwitchReport, ThemeError> {
        if weblog.theme_id == candidate.id() {
            return Ok(unchanged(weblog.clone()));
        }

        let weblog_id = weblog.weblog_id;
        let overrides = self.store.list_overrides(weblog_id).await?;

        // Discard what the current theme sees as overridden, not what the
        // stored derivation column claims.
        let theme = self.shared_theme(&weblog.theme_id)?;
        let current = EffectiveThemeView::build(theme, overrides.clone());
        let discard_ids: Vec<DbId> = current
            .overrides()
            .filter(|t| t.derivation == Derivation::Overridden)
            .filter_map(|t| t.as_override().map(|o| o.id))
            .collect();
        let discard: HashSet<DbId> = discard_ids.iter().copied().collect();

        let commit = self
            .store
            .commit_theme_switch(weblog_id, candidate.id(), &discard_ids)
            .await?;

        let mut report = SwitchReport {
            weblog_id,
            previous_theme: weblog.theme_id.clone(),
            theme_id: candidate.id().to_string(),
            ..Default::default()
        };
        for template in &overrides {
            self.evictor.evict(weblog_id, &template.name, template.role);
            if discard.contains(&template.id) {
                report.discarded.push(template.name.clone());
            } else {
                report.retained.push(template.name.clone());
            }
        }

        tracing::info!(
            weblog_id,
            handle = %weblog.handle,
            from = %weblog.theme_id,
            to = %candidate.id(),
            deleted = commit.deleted,
            retained = report.retained.len(),
            "Weblog theme switched",
        );
        Ok(report)
    }

    async fn weblog(&self, weblog_id: DbId) -> Result<WeblogThemeState, ThemeError> {
        self.store
            .find_weblog(weblog_id)
            .await?
            .ok_or(ThemeError::WeblogNotFound(weblog_id))
    }

    async fn view_for(&self, weblog: &WeblogThemeState) -> Result<EffectiveThemeView, ThemeError> {
        let theme = self.shared_theme(&weblog.theme_id)?;
        let overrides = self.store.list_overrides(weblog.weblog_id).await?;
        Ok(EffectiveThemeView::build(theme, overrides))
    }

    fn shared_theme(&self, theme_id: &str) -> Result<Arc<SharedTheme>, ThemeError> {
        self.registry
            .get(theme_id)
            .ok_or_else(|| ThemeError::UnknownTheme(theme_id.to_string()))
    }
}

/// Report for a switch to the theme the weblog already uses.
fn unchanged(weblog: WeblogThemeState) -> SwitchReport {
    tracing::debug!(
        weblog_id = weblog.weblog_id,
        theme_id = %weblog.theme_id,
        "Weblog already uses theme",
    );
    SwitchReport {
        weblog_id: weblog.weblog_id,
        previous_theme: weblog.theme_id.clone(),
        theme_id: weblog.theme_id,
        ..Default::default()
    }
}
