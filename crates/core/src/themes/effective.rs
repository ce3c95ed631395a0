//! Per-weblog effective theme: a shared theme merged with the weblog's
//! persisted overrides.
//!
//! The name is the join key. An override whose name matches a shared template
//! replaces it (`Overridden`); any other override is appended
//! (`SpecificBlog`). A blog-only override holding a singleton role also masks
//! the shared template holding that role, so the merged view never exposes
//! two holders of a singleton role.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::ThemeError;
use crate::themes::resolver::TemplateReference;
use crate::themes::role::{Derivation, TemplateRole};
use crate::themes::shared::{ResolvedTemplate, SharedTheme};
use crate::themes::store::{OverrideDraft, OverrideTemplate};
use crate::types::Timestamp;

/// Where an effective template's content comes from.
#[derive(Debug, Clone)]
pub enum TemplateSource {
    Shared(Arc<ResolvedTemplate>),
    Override(OverrideTemplate),
}

/// One template of a weblog's effective theme.
#[derive(Debug, Clone)]
pub struct EffectiveTemplate {
    pub name: String,
    pub role: TemplateRole,
    pub derivation: Derivation,
    pub source: TemplateSource,
}

impl EffectiveTemplate {
    fn shared(template: &Arc<ResolvedTemplate>) -> Self {
        Self {
            name: template.name.clone(),
            role: template.role,
            derivation: Derivation::Shared,
            source: TemplateSource::Shared(Arc::clone(template)),
        }
    }

    fn from_override(template: OverrideTemplate, derivation: Derivation) -> Self {
        Self {
            name: template.name.clone(),
            role: template.role,
            derivation,
            source: TemplateSource::Override(template),
        }
    }

    pub fn link(&self) -> Option<&str> {
        match &self.source {
            TemplateSource::Shared(t) => t.link.as_deref(),
            TemplateSource::Override(t) => t.link.as_deref(),
        }
    }

    pub fn last_modified(&self) -> Timestamp {
        match &self.source {
            TemplateSource::Shared(t) => t.last_modified,
            TemplateSource::Override(t) => t.last_modified,
        }
    }

    /// Persisted override backing this entry, if any.
    pub fn as_override(&self) -> Option<&OverrideTemplate> {
        match &self.source {
            TemplateSource::Override(t) => Some(t),
            TemplateSource::Shared(_) => None,
        }
    }

    /// Render-time reference for this template.
    pub fn reference(&self, theme_id: &str) -> TemplateReference {
        match &self.source {
            TemplateSource::Shared(t) => TemplateReference::Shared {
                theme_id: theme_id.to_string(),
                name: t.name.clone(),
            },
            TemplateSource::Override(t) => TemplateReference::Override(t.id),
        }
    }
}

/// A weblog's merged template set.
#[derive(Debug, Clone)]
pub struct EffectiveThemeView {
    theme: Arc<SharedTheme>,
    entries: Vec<EffectiveTemplate>,
    by_name: HashMap<String, usize>,
}

impl EffectiveThemeView {
    /// Merge `theme` with a weblog's persisted overrides.
    ///
    /// Shared templates keep their load order; blog-only templates follow in
    /// the order given.
    pub fn build(theme: Arc<SharedTheme>, overrides: Vec<OverrideTemplate>) -> Self {
        let mut entries: Vec<Option<EffectiveTemplate>> = theme
            .templates()
            .iter()
            .map(|t| Some(EffectiveTemplate::shared(t)))
            .collect();
        let mut by_name: HashMap<String, usize> = entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (e.name.clone(), i)))
            .collect();
        let mut persisted_names = HashSet::new();

        // Overrides of shared templates take their slots before blog-only
        // templates compete for singleton roles.
        let (matching, blog_only): (Vec<_>, Vec<_>) = overrides
            .into_iter()
            .partition(|t| by_name.contains_key(&t.name));

        for template in matching.into_iter().chain(blog_only) {
            if !persisted_names.insert(template.name.clone()) {
                tracing::warn!(
                    weblog_id = template.weblog_id,
                    template = %template.name,
                    "Ignoring duplicate persisted override",
                );
                continue;
            }

            match by_name.get(&template.name).copied() {
                Some(index) => {
                    let claimed_elsewhere = template.role.is_singleton()
                        && entries.iter().enumerate().any(|(i, e)| {
                            i != index && e.as_ref().is_some_and(|e| e.role == template.role)
                        });
                    if claimed_elsewhere {
                        tracing::warn!(
                            weblog_id = template.weblog_id,
                            template = %template.name,
                            role = %template.role,
                            "Ignoring override holding an already-claimed singleton role",
                        );
                        continue;
                    }
                    entries[index] = Some(EffectiveTemplate::from_override(
                        template,
                        Derivation::Overridden,
                    ));
                }
                None => {
                    if template.role.is_singleton() {
                        let holder = entries.iter().position(|e| {
                            e.as_ref().is_some_and(|e| {
                                e.role == template.role && e.derivation == Derivation::Shared
                            })
                        });
                        if let Some(index) = holder {
                            if let Some(masked) = entries[index].take() {
                                by_name.remove(&masked.name);
                            }
                        } else if entries
                            .iter()
                            .flatten()
                            .any(|e| e.role == template.role)
                        {
                            tracing::warn!(
                                weblog_id = template.weblog_id,
                                template = %template.name,
                                role = %template.role,
                                "Ignoring override holding an already-claimed singleton role",
                            );
                            continue;
                        }
                    }
                    by_name.insert(template.name.clone(), entries.len());
                    entries.push(Some(EffectiveTemplate::from_override(
                        template,
                        Derivation::SpecificBlog,
                    )));
                }
            }
        }

        let entries: Vec<EffectiveTemplate> = entries.into_iter().flatten().collect();
        let by_name = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();

        Self {
            theme,
            entries,
            by_name,
        }
    }

    pub fn shared_theme(&self) -> &Arc<SharedTheme> {
        &self.theme
    }

    pub fn theme_id(&self) -> &str {
        self.theme.id()
    }

    pub fn templates(&self) -> &[EffectiveTemplate] {
        &self.entries
    }

    pub fn by_name(&self, name: &str) -> Option<&EffectiveTemplate> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    /// First template holding `role`. Custom roles are not indexed.
    pub fn by_role(&self, role: TemplateRole) -> Option<&EffectiveTemplate> {
        if !role.is_indexed() {
            return None;
        }
        self.entries.iter().find(|e| e.role == role)
    }

    pub fn by_link(&self, link: &str) -> Option<&EffectiveTemplate> {
        self.entries.iter().find(|e| e.link() == Some(link))
    }

    pub fn stylesheet(&self) -> Option<&EffectiveTemplate> {
        self.by_role(TemplateRole::Stylesheet)
    }

    pub fn default_template(&self) -> Option<&EffectiveTemplate> {
        self.by_role(TemplateRole::Weblog)
    }

    /// Entries backed by persisted overrides.
    pub fn overrides(&self) -> impl Iterator<Item = &EffectiveTemplate> {
        self.entries
            .iter()
            .filter(|e| e.derivation != Derivation::Shared)
    }

    /// Latest modification across the shared theme and every override.
    pub fn last_modified(&self) -> Option<Timestamp> {
        self.entries
            .iter()
            .map(EffectiveTemplate::last_modified)
            .chain(self.theme.last_modified())
            .max()
    }

    /// Decide how a draft would be stored against this view.
    ///
    /// A draft named after a shared template overrides it and must keep its
    /// role. A draft replacing an existing persisted template keeps that
    /// template's derivation and role. Any other draft is blog-only and must
    /// not claim a singleton role already held in the view.
    pub fn classify_draft(&self, draft: &OverrideDraft) -> Result<Derivation, ThemeError> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(ThemeError::InvalidOverride(
                "Template name must not be empty".to_string(),
            ));
        }
        if name.contains(':') {
            return Err(ThemeError::InvalidOverride(format!(
                "Template name '{name}' must not contain ':'"
            )));
        }

        if let Some(existing) = self.by_name(name) {
            if existing.role != draft.role {
                return Err(ThemeError::InvalidOverride(format!(
                    "Template '{name}' has role {} and cannot change to {}",
                    existing.role.readable_name(),
                    draft.role.readable_name()
                )));
            }
            return Ok(match existing.derivation {
                Derivation::Shared => Derivation::Overridden,
                other => other,
            });
        }

        if draft.role.is_singleton() {
            if let Some(holder) = self.by_role(draft.role) {
                return Err(ThemeError::InvalidOverride(format!(
                    "Role {} is already held by template '{}'",
                    draft.role.readable_name(),
                    holder.name
                )));
            }
        }

        Ok(Derivation::SpecificBlog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::themes::testing::{at, basic_theme, override_template};
    use assert_matches::assert_matches;

    fn draft(name: &str, role: TemplateRole) -> OverrideDraft {
        OverrideDraft {
            name: name.to_string(),
            role,
            description: String::new(),
            content: "x".to_string(),
            language: "thymeleaf".to_string(),
            link: None,
            hidden: false,
            navbar: false,
        }
    }

    fn assert_invariants(view: &EffectiveThemeView) {
        let mut names = HashSet::new();
        let mut singleton_roles = HashSet::new();
        for entry in view.templates() {
            assert!(names.insert(entry.name.clone()), "duplicate name {}", entry.name);
            if entry.role.is_singleton() {
                assert!(singleton_roles.insert(entry.role), "duplicate role {}", entry.role);
            }
        }
    }

    #[test]
    fn without_overrides_everything_is_shared() {
        let view = EffectiveThemeView::build(basic_theme(), vec![]);
        assert_eq!(view.templates().len(), 4);
        assert!(view
            .templates()
            .iter()
            .all(|e| e.derivation == Derivation::Shared));
        assert_invariants(&view);
    }

    #[test]
    fn matching_name_is_overridden_in_place() {
        let ovr = override_template(1, 7, "weblog", TemplateRole::Weblog, Derivation::Overridden);
        let view = EffectiveThemeView::build(basic_theme(), vec![ovr]);

        let names: Vec<_> = view.templates().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["basic-css", "weblog", "permalink", "about"]);

        let weblog = view.by_name("weblog").unwrap();
        assert_eq!(weblog.derivation, Derivation::Overridden);
        assert_eq!(weblog.as_override().unwrap().id, 1);
        assert_eq!(view.default_template().unwrap().derivation, Derivation::Overridden);
        assert_invariants(&view);
    }

    #[test]
    fn new_name_is_specific_blog_and_appended() {
        let ovr = override_template(
            2,
            7,
            "custom1",
            TemplateRole::CustomExternal,
            Derivation::SpecificBlog,
        );
        let view = EffectiveThemeView::build(basic_theme(), vec![ovr]);
        let last = view.templates().last().unwrap();
        assert_eq!(last.name, "custom1");
        assert_eq!(last.derivation, Derivation::SpecificBlog);
        assert_eq!(view.overrides().count(), 1);
        assert_invariants(&view);
    }

    #[test]
    fn derivation_is_recomputed_from_the_current_theme() {
        // Persisted as overridden under a previous theme, but nothing to override now.
        let ovr = override_template(
            3,
            7,
            "sidebar",
            TemplateRole::CustomInternal,
            Derivation::Overridden,
        );
        let view = EffectiveThemeView::build(basic_theme(), vec![ovr]);
        assert_eq!(view.by_name("sidebar").unwrap().derivation, Derivation::SpecificBlog);
    }

    #[test]
    fn blog_only_singleton_masks_shared_holder() {
        let ovr = override_template(4, 7, "front", TemplateRole::Weblog, Derivation::SpecificBlog);
        let view = EffectiveThemeView::build(basic_theme(), vec![ovr]);
        assert!(view.by_name("weblog").is_none());
        assert_eq!(view.default_template().unwrap().name, "front");
        assert_invariants(&view);
    }

    #[test]
    fn override_of_shared_holder_wins_regardless_of_order() {
        let front = || {
            override_template(4, 7, "front", TemplateRole::Weblog, Derivation::SpecificBlog)
        };
        let weblog = || {
            override_template(5, 7, "weblog", TemplateRole::Weblog, Derivation::Overridden)
        };

        for overrides in [vec![front(), weblog()], vec![weblog(), front()]] {
            let view = EffectiveThemeView::build(basic_theme(), overrides);
            let holder = view.default_template().unwrap();
            assert_eq!(holder.name, "weblog");
            assert_eq!(holder.derivation, Derivation::Overridden);
            assert!(view.by_name("front").is_none());
            assert_invariants(&view);
        }
    }

    #[test]
    fn duplicate_persisted_names_keep_the_first() {
        let a = override_template(
            5,
            7,
            "notes",
            TemplateRole::CustomExternal,
            Derivation::SpecificBlog,
        );
        let b = override_template(
            6,
            7,
            "notes",
            TemplateRole::CustomInternal,
            Derivation::SpecificBlog,
        );
        let view = EffectiveThemeView::build(basic_theme(), vec![a, b]);
        assert_eq!(view.by_name("notes").unwrap().as_override().unwrap().id, 5);
        assert_invariants(&view);
    }

    #[test]
    fn second_blog_only_singleton_is_ignored() {
        let a = override_template(5, 7, "front", TemplateRole::Search, Derivation::SpecificBlog);
        let b = override_template(6, 7, "finder", TemplateRole::Search, Derivation::SpecificBlog);
        let view = EffectiveThemeView::build(basic_theme(), vec![a, b]);
        assert_eq!(view.by_role(TemplateRole::Search).unwrap().name, "front");
        assert!(view.by_name("finder").is_none());
        assert_invariants(&view);
    }

    #[test]
    fn lookups_by_link_and_role() {
        let mut ovr = override_template(
            7,
            7,
            "contact",
            TemplateRole::CustomExternal,
            Derivation::SpecificBlog,
        );
        ovr.link = Some("contact".to_string());
        let view = EffectiveThemeView::build(basic_theme(), vec![ovr]);
        assert_eq!(view.by_link("about").unwrap().name, "about");
        assert_eq!(view.by_link("contact").unwrap().name, "contact");
        assert_eq!(view.stylesheet().unwrap().name, "basic-css");
        assert!(view.by_role(TemplateRole::CustomExternal).is_none());
    }

    #[test]
    fn references_point_at_the_right_space() {
        let ovr = override_template(8, 7, "weblog", TemplateRole::Weblog, Derivation::Overridden);
        let view = EffectiveThemeView::build(basic_theme(), vec![ovr]);
        assert_eq!(
            view.by_name("weblog").unwrap().reference(view.theme_id()),
            TemplateReference::Override(8)
        );
        assert_eq!(
            view.by_name("about").unwrap().reference(view.theme_id()).to_string(),
            "basic:about"
        );
    }

    #[test]
    fn last_modified_includes_overrides() {
        let ovr = override_template(
            9,
            7,
            "custom1",
            TemplateRole::CustomExternal,
            Derivation::SpecificBlog,
        );
        let view = EffectiveThemeView::build(basic_theme(), vec![ovr]);
        assert_eq!(view.last_modified(), Some(at(10)));
    }

    #[test]
    fn classify_shared_name_as_overridden() {
        let view = EffectiveThemeView::build(basic_theme(), vec![]);
        assert_eq!(
            view.classify_draft(&draft("permalink", TemplateRole::Permalink)).unwrap(),
            Derivation::Overridden
        );
    }

    #[test]
    fn classify_rejects_role_change() {
        let view = EffectiveThemeView::build(basic_theme(), vec![]);
        assert_matches!(
            view.classify_draft(&draft("permalink", TemplateRole::CustomExternal)),
            Err(ThemeError::InvalidOverride(msg)) if msg.contains("cannot change")
        );
    }

    #[test]
    fn classify_rejects_claimed_singleton() {
        let view = EffectiveThemeView::build(basic_theme(), vec![]);
        assert_matches!(
            view.classify_draft(&draft("front", TemplateRole::Weblog)),
            Err(ThemeError::InvalidOverride(msg)) if msg.contains("already held")
        );
    }

    #[test]
    fn classify_new_custom_as_specific_blog() {
        let view = EffectiveThemeView::build(basic_theme(), vec![]);
        assert_eq!(
            view.classify_draft(&draft("links", TemplateRole::CustomExternal)).unwrap(),
            Derivation::SpecificBlog
        );
    }

    #[test]
    fn classify_keeps_existing_blog_only_derivation() {
        let ovr = override_template(
            1,
            7,
            "links",
            TemplateRole::CustomExternal,
            Derivation::SpecificBlog,
        );
        let view = EffectiveThemeView::build(basic_theme(), vec![ovr]);
        assert_eq!(
            view.classify_draft(&draft("links", TemplateRole::CustomExternal)).unwrap(),
            Derivation::SpecificBlog
        );
    }

    #[test]
    fn classify_rejects_reserved_characters() {
        let view = EffectiveThemeView::build(basic_theme(), vec![]);
        assert!(view.classify_draft(&draft("a:b", TemplateRole::CustomExternal)).is_err());
        assert!(view.classify_draft(&draft("  ", TemplateRole::CustomExternal)).is_err());
    }
}
