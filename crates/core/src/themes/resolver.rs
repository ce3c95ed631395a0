//! Render-time template resolution.
//!
//! Renderers hold opaque reference tokens. `{theme_id}:{name}` points into a
//! shared theme; a bare numeric id points at a persisted override. The
//! resolver performs no caching and takes no locks beyond the registry's
//! snapshot load and whatever the override store does for a single read.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use crate::error::ThemeError;
use crate::themes::registry::ThemeRegistry;
use crate::themes::role::{RenditionKind, TemplateRole};
use crate::themes::shared::ResolvedTemplate;
use crate::themes::store::{OverrideLookup, OverrideTemplate};
use crate::types::{DbId, Timestamp};

/// A parsed template reference token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplateReference {
    Shared { theme_id: String, name: String },
    Override(DbId),
}

impl FromStr for TemplateReference {
    type Err = ThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let not_found = || ThemeError::TemplateNotFound(s.to_string());
        match s.split_once(':') {
            Some((theme_id, name)) if !theme_id.is_empty() && !name.is_empty() => {
                Ok(Self::Shared {
                    theme_id: theme_id.to_string(),
                    name: name.to_string(),
                })
            }
            Some(_) => Err(not_found()),
            None => s.parse::<DbId>().map(Self::Override).map_err(|_| not_found()),
        }
    }
}

impl fmt::Display for TemplateReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared { theme_id, name } => write!(f, "{theme_id}:{name}"),
            Self::Override(id) => write!(f, "{id}"),
        }
    }
}

/// A template found by the resolver, before rendition selection.
#[derive(Debug, Clone)]
pub enum RenderableTemplate {
    Shared(Arc<ResolvedTemplate>),
    Override(OverrideTemplate),
}

impl RenderableTemplate {
    pub fn name(&self) -> &str {
        match self {
            Self::Shared(t) => &t.name,
            Self::Override(t) => &t.name,
        }
    }

    pub fn role(&self) -> TemplateRole {
        match self {
            Self::Shared(t) => t.role,
            Self::Override(t) => t.role,
        }
    }

    /// Select the content to render for a device kind.
    ///
    /// Shared templates return MOBILE when it exists and was requested, and
    /// STANDARD otherwise. An override has a single body, used for every kind.
    pub fn select(&self, kind: RenditionKind) -> Result<ResolvedContent, ThemeError> {
        match self {
            Self::Shared(t) => {
                let rendition = t
                    .rendition(kind)
                    .ok_or_else(|| ThemeError::TemplateNotFound(t.id.clone()))?;
                let selected = if t.renditions.contains_key(&kind) {
                    kind
                } else {
                    RenditionKind::Standard
                };
                Ok(ResolvedContent {
                    content: rendition.content.clone(),
                    language: rendition.language.clone(),
                    last_modified: rendition.last_modified,
                    role: t.role,
                    rendition: selected,
                })
            }
            Self::Override(t) => Ok(ResolvedContent {
                content: t.content.clone(),
                language: t.language.clone(),
                last_modified: t.last_modified,
                role: t.role,
                rendition: RenditionKind::Standard,
            }),
        }
    }
}

/// Renderable content handed to the external template engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedContent {
    pub content: String,
    pub language: String,
    pub last_modified: Timestamp,
    pub role: TemplateRole,
    /// The rendition actually served after fallback.
    pub rendition: RenditionKind,
}

impl ResolvedContent {
    pub fn content_type(&self) -> &'static str {
        self.role.content_type()
    }
}

/// Resolves reference tokens against the registry and the override store.
pub struct TemplateResolver<L> {
    registry: Arc<ThemeRegistry>,
    overrides: L,
}

impl<L: OverrideLookup> TemplateResolver<L> {
    pub fn new(registry: Arc<ThemeRegistry>, overrides: L) -> Self {
        Self {
            registry,
            overrides,
        }
    }

    /// Find the template a reference points at.
    ///
    /// Fails with [`ThemeError::TemplateNotFound`] for an unknown theme id, a
    /// name missing from its theme, or an unknown override id.
    pub async fn lookup(
        &self,
        reference: &TemplateReference,
    ) -> Result<RenderableTemplate, ThemeError> {
        let not_found = || ThemeError::TemplateNotFound(reference.to_string());
        match reference {
            TemplateReference::Shared { theme_id, name } => {
                let theme = self.registry.get(theme_id).ok_or_else(not_found)?;
                let template = theme.template_by_name(name).ok_or_else(not_found)?;
                Ok(RenderableTemplate::Shared(Arc::clone(template)))
            }
            TemplateReference::Override(id) => self
                .overrides
                .find_override(*id)
                .await?
                .map(RenderableTemplate::Override)
                .ok_or_else(not_found),
        }
    }

    /// Resolve a raw reference token to the content for `kind`.
    pub async fn resolve(
        &self,
        reference: &str,
        kind: RenditionKind,
    ) -> Result<ResolvedContent, ThemeError> {
        let parsed: TemplateReference = reference.parse()?;
        let template = self.lookup(&parsed).await?;
        let content = template.select(kind)?;
        tracing::trace!(
            reference = %parsed,
            rendition = %content.rendition,
            "Template resolved",
        );
        Ok(content)
    }
}
