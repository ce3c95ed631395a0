//! Render-output cache.
//!
//! Holds pages rendered by the external template engine, keyed by weblog,
//! template reference and device kind. The theme engine never reads it; it
//! only evicts entries through [`RenderCacheEvictor`] when a template or a
//! weblog's theme changes.

use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use lru::LruCache;
use weblog_core::themes::store::RenderCacheEvictor;
use weblog_core::themes::{RenditionKind, TemplateRole};
use weblog_core::types::{DbId, Timestamp};

/// Cache key: weblog, template reference token, device kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub weblog_id: DbId,
    pub reference: String,
    pub kind: RenditionKind,
}

impl PageKey {
    pub fn new(weblog_id: DbId, reference: impl Into<String>, kind: RenditionKind) -> Self {
        Self {
            weblog_id,
            reference: reference.into(),
            kind,
        }
    }
}

/// A rendered page and the template that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPage {
    pub body: String,
    pub content_type: &'static str,
    pub template_name: String,
    pub role: TemplateRole,
    /// The weblog's stored `last_modified` at render time.
    pub weblog_version: Timestamp,
}

/// Least-recently-used map of rendered pages. A capacity of zero disables
/// caching.
pub struct RenderOutputCache {
    entries: Option<Mutex<LruCache<PageKey, CachedPage>>>,
}

impl RenderOutputCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |entries| {
            entries.lock().unwrap_or_else(PoisonError::into_inner).len()
        })
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a page. Pages rendered against any other `weblog_version`
    /// than the weblog's current one are treated as absent.
    pub fn get(&self, key: &PageKey, weblog_version: Timestamp) -> Option<CachedPage> {
        let mut entries = self
            .entries
            .as_ref()?
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|page| page.weblog_version == weblog_version)
            .cloned()
    }

    /// Store a rendered page, dropping the least recently used one when full.
    pub fn put(&self, key: PageKey, page: CachedPage) {
        if let Some(entries) = &self.entries {
            entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .put(key, page);
        }
    }

    /// Drop every cached page of a weblog.
    pub fn clear_weblog(&self, weblog_id: DbId) {
        self.remove_where(|key, _| key.weblog_id == weblog_id);
    }

    fn remove_where(&self, predicate: impl Fn(&PageKey, &CachedPage) -> bool) -> usize {
        let Some(entries) = &self.entries else {
            return 0;
        };
        let mut entries = entries.lock().unwrap_or_else(PoisonError::into_inner);
        let doomed: Vec<PageKey> = entries
            .iter()
            .filter(|(key, page)| predicate(key, page))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        doomed.len()
    }
}

impl RenderCacheEvictor for RenderOutputCache {
    /// Drops pages rendered from the named template. For singleton roles,
    /// pages rendered by whichever template held that role go too.
    fn evict(&self, weblog_id: DbId, template_name: &str, role: TemplateRole) {
        let evicted = self.remove_where(|key, page| {
            key.weblog_id == weblog_id
                && (page.template_name == template_name
                    || (role.is_singleton() && page.role == role))
        });
        tracing::debug!(
            weblog_id,
            template = %template_name,
            evicted,
            "Render cache evicted",
        );
    }
}
