//! Shared theme assembly.
//!
//! A [`SharedTheme`] is built once from a parsed descriptor and the files it
//! references, then treated as immutable: it is shared through `Arc` and read
//! concurrently by every renderer without locking.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::Arc;

use serde::Serialize;

use crate::error::ThemeError;
use crate::themes::descriptor::{self, TemplateDescriptor, ThemeDescriptor};
use crate::themes::loader::FileLoader;
use crate::themes::role::{RenditionKind, TemplateRole};
use crate::themes::DESCRIPTOR_FILE;
use crate::types::Timestamp;

/* --------------------------------------------------------------------------
Types
-------------------------------------------------------------------------- */

/// Loaded content of one rendition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rendition {
    pub content: String,
    pub language: String,
    pub last_modified: Timestamp,
}

/// A shared-theme template with its rendition contents loaded.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedTemplate {
    /// `{theme_id}:{name}`, the reference renderers use to find this template.
    pub id: String,
    pub role: TemplateRole,
    pub name: String,
    pub description: String,
    pub link: Option<String>,
    /// Latest modification time across this template's renditions.
    pub last_modified: Timestamp,
    pub hidden: bool,
    pub navbar: bool,
    pub renditions: BTreeMap<RenditionKind, Rendition>,
}

impl ResolvedTemplate {
    /// Select the rendition for a device kind.
    ///
    /// MOBILE is returned only when present; every other request falls back
    /// to STANDARD. `None` means the template has no usable rendition.
    pub fn rendition(&self, kind: RenditionKind) -> Option<&Rendition> {
        self.renditions
            .get(&kind)
            .or_else(|| self.renditions.get(&RenditionKind::Standard))
    }
}

/// An assembled shared theme with name, link and role indices.
#[derive(Debug, Clone)]
pub struct SharedTheme {
    id: String,
    name: String,
    description: String,
    author: Option<String>,
    preview_image_path: Option<String>,
    enabled: bool,
    dual_rendition: bool,
    last_modified: Option<Timestamp>,
    templates: Vec<Arc<ResolvedTemplate>>,
    by_name: HashMap<String, usize>,
    by_link: HashMap<String, usize>,
    by_role: [Option<usize>; TemplateRole::COUNT],
    stylesheet: Option<usize>,
}

impl SharedTheme {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn preview_image_path(&self) -> Option<&str> {
        self.preview_image_path.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_dual_rendition(&self) -> bool {
        self.dual_rendition
    }

    /// Latest modification time across every loaded file.
    pub fn last_modified(&self) -> Option<Timestamp> {
        self.last_modified
    }

    /// All templates in load order: stylesheet first, then descriptor order.
    pub fn templates(&self) -> &[Arc<ResolvedTemplate>] {
        &self.templates
    }

    pub fn template_by_name(&self, name: &str) -> Option<&Arc<ResolvedTemplate>> {
        self.by_name.get(name).map(|&i| &self.templates[i])
    }

    pub fn template_by_link(&self, link: &str) -> Option<&Arc<ResolvedTemplate>> {
        self.by_link.get(link).map(|&i| &self.templates[i])
    }

    /// Look up the template holding a role. Custom roles are never indexed.
    pub fn template_by_role(&self, role: TemplateRole) -> Option<&Arc<ResolvedTemplate>> {
        self.by_role[role.index()].map(|i| &self.templates[i])
    }

    pub fn stylesheet(&self) -> Option<&Arc<ResolvedTemplate>> {
        self.stylesheet.map(|i| &self.templates[i])
    }

    /// The WEBLOG-role template, used when a page names no template.
    pub fn default_template(&self) -> Option<&Arc<ResolvedTemplate>> {
        self.template_by_role(TemplateRole::Weblog)
    }

    fn empty(descriptor: &ThemeDescriptor, preview_image_path: Option<String>) -> Self {
        Self {
            id: descriptor.id.clone(),
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            author: descriptor.author.clone(),
            preview_image_path,
            enabled: false,
            dual_rendition: descriptor.dual_rendition,
            last_modified: None,
            templates: Vec::new(),
            by_name: HashMap::new(),
            by_link: HashMap::new(),
            by_role: [None; TemplateRole::COUNT],
            stylesheet: None,
        }
    }

    fn insert(&mut self, template: ResolvedTemplate) -> usize {
        let index = self.templates.len();

        self.by_name.insert(template.name.clone(), index);
        if let Some(link) = &template.link {
            self.by_link.insert(link.clone(), index);
        }
        if template.role.is_indexed() {
            self.by_role[template.role.index()].get_or_insert(index);
        }
        self.last_modified = Some(match self.last_modified {
            Some(current) => current.max(template.last_modified),
            None => template.last_modified,
        });

        self.templates.push(Arc::new(template));
        index
    }
}

/* --------------------------------------------------------------------------
Assembly
-------------------------------------------------------------------------- */

/// Read and parse the descriptor through `loader`, then assemble the theme.
///
/// `label` identifies the theme in errors raised before its id is known
/// (normally the directory name).
pub fn load(loader: &dyn FileLoader, label: &str) -> Result<SharedTheme, ThemeError> {
    let file = loader
        .load(DESCRIPTOR_FILE)
        .map_err(|e| unreadable(label, DESCRIPTOR_FILE, &e))?;
    let descriptor = descriptor::parse(&file.bytes)?;
    assemble(&descriptor, loader)
}

/// Build a [`SharedTheme`] from a parsed descriptor.
///
/// Templates are loaded stylesheet first, then in descriptor order. A
/// template without a STANDARD rendition fails with
/// [`ThemeError::MissingRendition`]; an unreadable template body fails with
/// [`ThemeError::AssetUnreadable`]. An unreadable stylesheet is logged and
/// left out, and the rest of the theme still loads.
pub fn assemble(
    descriptor: &ThemeDescriptor,
    loader: &dyn FileLoader,
) -> Result<SharedTheme, ThemeError> {
    tracing::debug!(theme_id = %descriptor.id, "Assembling shared theme");

    let preview_image_path = descriptor.preview_image.as_ref().and_then(|path| {
        if loader.exists(path) {
            Some(path.clone())
        } else {
            tracing::warn!(
                theme_id = %descriptor.id,
                path = %path,
                "Theme preview image is not readable",
            );
            None
        }
    });

    let mut theme = SharedTheme::empty(descriptor, preview_image_path);
    let kinds = RenditionKind::available(descriptor.dual_rendition);

    if let Some(stylesheet) = &descriptor.stylesheet {
        match load_template(&descriptor.id, stylesheet, kinds, loader) {
            Ok(template) => {
                let index = theme.insert(template);
                theme.stylesheet = Some(index);
            }
            Err(err @ ThemeError::AssetUnreadable { .. }) => {
                tracing::error!(
                    theme_id = %descriptor.id,
                    template = %stylesheet.name,
                    error = %err,
                    "Skipping unreadable theme stylesheet",
                );
            }
            Err(err) => return Err(err),
        }
    }

    for template in &descriptor.templates {
        let resolved = load_template(&descriptor.id, template, kinds, loader)?;
        theme.insert(resolved);
    }

    theme.enabled = true;

    tracing::debug!(
        theme_id = %theme.id,
        templates = theme.templates.len(),
        "Shared theme assembled",
    );
    Ok(theme)
}

fn load_template(
    theme_id: &str,
    template: &TemplateDescriptor,
    kinds: &[RenditionKind],
    loader: &dyn FileLoader,
) -> Result<ResolvedTemplate, ThemeError> {
    let standard_desc = template.rendition(RenditionKind::Standard).ok_or_else(|| {
        ThemeError::MissingRendition {
            theme_id: theme_id.to_string(),
            template: template.name.clone(),
        }
    })?;

    let standard = load_rendition(
        theme_id,
        &standard_desc.contents_file,
        &standard_desc.language,
        loader,
    )?;

    let mut renditions = BTreeMap::new();
    for &kind in kinds {
        let rendition = match (kind, template.rendition(kind)) {
            (RenditionKind::Standard, _) | (_, None) => standard.clone(),
            (_, Some(desc)) if desc.contents_file == standard_desc.contents_file => Rendition {
                language: desc.language.clone(),
                ..standard.clone()
            },
            (_, Some(desc)) => {
                match load_rendition(theme_id, &desc.contents_file, &desc.language, loader) {
                    Ok(r) => r,
                    Err(err) => {
                        tracing::error!(
                            theme_id = %theme_id,
                            template = %template.name,
                            rendition = %kind,
                            error = %err,
                            "Falling back to standard content for unreadable rendition",
                        );
                        standard.clone()
                    }
                }
            }
        };
        renditions.insert(kind, rendition);
    }

    let last_modified = renditions
        .values()
        .map(|r| r.last_modified)
        .max()
        .unwrap_or(standard.last_modified);

    Ok(ResolvedTemplate {
        id: format!("{theme_id}:{}", template.name),
        role: template.role,
        name: template.name.clone(),
        description: template.description.clone(),
        link: template.link.clone(),
        last_modified,
        hidden: template.hidden,
        navbar: template.navbar,
        renditions,
    })
}

fn load_rendition(
    theme_id: &str,
    path: &str,
    language: &str,
    loader: &dyn FileLoader,
) -> Result<Rendition, ThemeError> {
    let file = loader
        .load(path)
        .map_err(|e| unreadable(theme_id, path, &e))?;
    let content = String::from_utf8(file.bytes).map_err(|e| ThemeError::AssetUnreadable {
        theme_id: theme_id.to_string(),
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    Ok(Rendition {
        content,
        language: language.to_string(),
        last_modified: file.last_modified,
    })
}

fn unreadable(theme_id: &str, path: &str, err: &io::Error) -> ThemeError {
    ThemeError::AssetUnreadable {
        theme_id: theme_id.to_string(),
        path: path.to_string(),
        reason: err.to_string(),
    }
}
