use std::sync::Arc;

use weblog_core::themes::registry::{ReloadReport, ThemeRegistry};
use weblog_core::themes::resolver::{ResolvedContent, TemplateResolver};
use weblog_core::themes::switch::ThemeSwitchCoordinator;
use weblog_core::themes::RenditionKind;
use weblog_db::PgThemeStore;

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::render_cache::RenderOutputCache;

pub type Coordinator = ThemeSwitchCoordinator<PgThemeStore, Arc<RenderOutputCache>>;

/// Shared application state.
///
/// Cheaply cloneable; every component is behind an `Arc` or is already
/// `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: weblog_db::DbPool,
    pub config: Arc<AppConfig>,
    /// Shared themes loaded from `THEMES_DIR`.
    pub registry: Arc<ThemeRegistry>,
    pub resolver: Arc<TemplateResolver<PgThemeStore>>,
    /// Theme switches and override edits.
    pub themes: Arc<Coordinator>,
    pub render_cache: Arc<RenderOutputCache>,
}

impl AppState {
    /// Wire the engine to the database pool. The registry starts empty; call
    /// [`AppState::reload_themes`] to populate it.
    pub fn new(pool: weblog_db::DbPool, config: AppConfig) -> Self {
        let registry = Arc::new(ThemeRegistry::new());
        let store = PgThemeStore::new(pool.clone());
        let render_cache = Arc::new(RenderOutputCache::new(config.render_cache_capacity));

        let resolver = Arc::new(TemplateResolver::new(Arc::clone(&registry), store.clone()));
        let themes = Arc::new(ThemeSwitchCoordinator::new(
            Arc::clone(&registry),
            store,
            Arc::clone(&render_cache),
        ));

        Self {
            pool,
            config: Arc::new(config),
            registry,
            resolver,
            themes,
            render_cache,
        }
    }

    /// Re-read every theme under the configured themes directory.
    pub fn reload_themes(&self) -> AppResult<ReloadReport> {
        let report = self.registry.reload_from_dir(&self.config.themes_dir)?;
        for (dir, err) in &report.failed {
            tracing::warn!(theme_dir = %dir, error = %err, "Theme kept previous version");
        }
        Ok(report)
    }

    /// Resolve a template reference for rendering.
    pub async fn resolve_template(
        &self,
        reference: &str,
        kind: RenditionKind,
    ) -> AppResult<ResolvedContent> {
        Ok(self.resolver.resolve(reference, kind).await?)
    }
}
