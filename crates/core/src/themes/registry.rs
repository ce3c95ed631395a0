//! Process-wide registry of assembled shared themes.
//!
//! Readers load the current snapshot without locking; writers build a new map
//! and publish it in one swap, serialised by a writer mutex. A published
//! [`SharedTheme`] is never mutated, so renderers holding an `Arc` to an old
//! snapshot keep a consistent view while a reload runs.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;

use crate::error::ThemeError;
use crate::themes::loader::DirectoryLoader;
use crate::themes::shared::{self, SharedTheme};
use crate::themes::DESCRIPTOR_FILE;

type Snapshot = HashMap<String, Arc<SharedTheme>>;

/// Outcome of a directory reload.
#[derive(Debug, Default)]
pub struct ReloadReport {
    /// Ids of themes published by this reload.
    pub loaded: Vec<String>,
    /// Theme directories that failed, with the error that stopped them.
    pub failed: Vec<(String, ThemeError)>,
}

/// Shared-theme lookup by theme id.
pub struct ThemeRegistry {
    snapshot: ArcSwap<Snapshot>,
    writer: Mutex<()>,
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(HashMap::new()),
            writer: Mutex::new(()),
        }
    }

    pub fn get(&self, theme_id: &str) -> Option<Arc<SharedTheme>> {
        self.snapshot.load().get(theme_id).cloned()
    }

    pub fn contains(&self, theme_id: &str) -> bool {
        self.snapshot.load().contains_key(theme_id)
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }

    /// All registered themes, sorted by display name.
    pub fn list(&self) -> Vec<Arc<SharedTheme>> {
        let mut themes: Vec<_> = self.snapshot.load().values().cloned().collect();
        themes.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.id().cmp(b.id())));
        themes
    }

    /// Publish a theme, replacing any previous theme with the same id.
    pub fn put(&self, theme: SharedTheme) -> Arc<SharedTheme> {
        let theme = Arc::new(theme);
        self.publish(|next| {
            next.insert(theme.id().to_string(), Arc::clone(&theme));
        });
        tracing::info!(theme_id = %theme.id(), "Shared theme registered");
        theme
    }

    /// Remove a theme. Returns the removed theme, if any.
    pub fn remove(&self, theme_id: &str) -> Option<Arc<SharedTheme>> {
        let mut removed = None;
        self.publish(|next| removed = next.remove(theme_id));
        removed
    }

    /// Load the theme in `dir` and publish it.
    pub fn load_dir(&self, dir: &Path) -> Result<Arc<SharedTheme>, ThemeError> {
        let theme = load_theme_dir(dir)?;
        Ok(self.put(theme))
    }

    /// Assemble every theme directory below `root` and publish the results
    /// in a single swap.
    ///
    /// A directory qualifies if it contains a descriptor file. Themes that
    /// fail to load are reported and keep their previously published entry.
    pub fn reload_from_dir(&self, root: &Path) -> std::io::Result<ReloadReport> {
        let mut report = ReloadReport::default();
        let mut assembled = Vec::new();

        let mut dirs: Vec<_> = std::fs::read_dir(root)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir() && path.join(DESCRIPTOR_FILE).is_file())
            .collect();
        dirs.sort();

        for dir in dirs {
            let label = dir_label(&dir);
            match load_theme_dir(&dir) {
                Ok(theme) => {
                    report.loaded.push(theme.id().to_string());
                    assembled.push(Arc::new(theme));
                }
                Err(err) => {
                    tracing::error!(
                        theme_dir = %label,
                        error = %err,
                        "Failed to load shared theme",
                    );
                    report.failed.push((label, err));
                }
            }
        }

        self.publish(|next| {
            for theme in assembled {
                next.insert(theme.id().to_string(), theme);
            }
        });

        tracing::info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            root = %root.display(),
            "Shared theme registry reloaded",
        );
        Ok(report)
    }

    /// Clone the current snapshot, apply `change`, and publish the result.
    fn publish(&self, change: impl FnOnce(&mut Snapshot)) {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = (**self.snapshot.load()).clone();
        change(&mut next);
        self.snapshot.store(Arc::new(next));
    }
}

/// Load and assemble one theme directory.
pub fn load_theme_dir(dir: &Path) -> Result<SharedTheme, ThemeError> {
    let loader = DirectoryLoader::new(dir);
    shared::load(&loader, &dir_label(dir))
}

fn dir_label(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}
