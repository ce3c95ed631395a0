//! Theme descriptor (`theme.json`) parsing.
//!
//! [`parse`] is a pure function over the descriptor bytes: it deserializes the
//! raw document, checks the structural rules a theme must satisfy, and then
//! applies [`ThemeDescriptor::complete_renditions`] so every template of a
//! dual-rendition theme carries a MOBILE entry.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ThemeError;
use crate::themes::role::{RenditionKind, TemplateRole};

/* --------------------------------------------------------------------------
Parsed tree
-------------------------------------------------------------------------- */

/// A parsed, validated theme descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub author: Option<String>,
    /// Preview image path relative to the theme directory.
    pub preview_image: Option<String>,
    /// Whether the theme ships MOBILE renditions.
    pub dual_rendition: bool,
    pub stylesheet: Option<TemplateDescriptor>,
    /// Declared templates in descriptor order (stylesheet excluded).
    pub templates: Vec<TemplateDescriptor>,
}

/// One template block of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateDescriptor {
    pub role: TemplateRole,
    pub name: String,
    pub description: String,
    /// Relative browser link; absent for hidden or internal templates.
    pub link: Option<String>,
    pub hidden: bool,
    pub navbar: bool,
    pub renditions: BTreeMap<RenditionKind, RenditionDescriptor>,
}

/// Where a rendition's content lives and which language it is written in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenditionDescriptor {
    pub contents_file: String,
    pub language: String,
}

impl TemplateDescriptor {
    pub fn rendition(&self, kind: RenditionKind) -> Option<&RenditionDescriptor> {
        self.renditions.get(&kind)
    }

    /// Clone the STANDARD rendition into MOBILE when MOBILE is absent.
    fn complete_mobile(&mut self) {
        if self.renditions.contains_key(&RenditionKind::Mobile) {
            return;
        }
        if let Some(standard) = self.renditions.get(&RenditionKind::Standard).cloned() {
            self.renditions.insert(RenditionKind::Mobile, standard);
        }
    }
}

impl ThemeDescriptor {
    /// All template blocks, stylesheet first, then descriptor order.
    pub fn all_templates(&self) -> impl Iterator<Item = &TemplateDescriptor> {
        self.stylesheet.iter().chain(self.templates.iter())
    }

    /// Synthesize MOBILE renditions for a dual-rendition theme.
    ///
    /// Every template (stylesheet included) that declares STANDARD but not
    /// MOBILE gets a MOBILE entry pointing at the same file and language.
    /// A theme without `dual_rendition` is returned unchanged.
    pub fn complete_renditions(mut self) -> Self {
        if !self.dual_rendition {
            return self;
        }
        if let Some(stylesheet) = self.stylesheet.as_mut() {
            stylesheet.complete_mobile();
        }
        for template in &mut self.templates {
            template.complete_mobile();
        }
        self
    }
}

/* --------------------------------------------------------------------------
Raw document
-------------------------------------------------------------------------- */

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDescriptor {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    preview_image: Option<String>,
    #[serde(default)]
    dual_rendition: bool,
    #[serde(default)]
    stylesheet: Option<RawTemplate>,
    #[serde(default)]
    templates: Vec<RawTemplate>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTemplate {
    #[serde(default)]
    role: Option<TemplateRole>,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    hidden: bool,
    #[serde(default)]
    navbar: bool,
    #[serde(default)]
    renditions: Vec<RawRendition>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRendition {
    kind: RenditionKind,
    contents_file: String,
    language: String,
}

/* --------------------------------------------------------------------------
Parsing
-------------------------------------------------------------------------- */

/// Parse descriptor bytes into a validated [`ThemeDescriptor`].
///
/// Fails with [`ThemeError::MalformedDescriptor`] when the bytes are not a
/// well-formed descriptor document, when the theme id or name is missing,
/// when the stylesheet lacks a STANDARD rendition, or when template names or
/// singleton roles are duplicated.
pub fn parse(bytes: &[u8]) -> Result<ThemeDescriptor, ThemeError> {
    let raw: RawDescriptor = serde_json::from_slice(bytes)
        .map_err(|e| ThemeError::MalformedDescriptor(e.to_string()))?;

    let id = required(raw.id, "theme id")?;
    let name = required(raw.name, "theme name")?;

    tracing::debug!(theme_id = %id, "Parsing theme descriptor");

    let stylesheet = raw
        .stylesheet
        .map(|t| convert_template(t, Some(TemplateRole::Stylesheet)))
        .transpose()?;

    if let Some(stylesheet) = &stylesheet {
        if stylesheet.rendition(RenditionKind::Standard).is_none() {
            return Err(ThemeError::MalformedDescriptor(format!(
                "Stylesheet '{}' has no standard rendition",
                stylesheet.name
            )));
        }
    }

    let templates = raw
        .templates
        .into_iter()
        .map(|t| convert_template(t, None))
        .collect::<Result<Vec<_>, _>>()?;

    let descriptor = ThemeDescriptor {
        id,
        name,
        description: raw.description.unwrap_or_default(),
        author: raw.author.filter(|a| !a.trim().is_empty()),
        preview_image: raw.preview_image.filter(|p| !p.trim().is_empty()),
        dual_rendition: raw.dual_rendition,
        stylesheet,
        templates,
    };

    check_uniqueness(&descriptor)?;

    Ok(descriptor.complete_renditions())
}

fn required(value: Option<String>, field: &str) -> Result<String, ThemeError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ThemeError::MalformedDescriptor(format!(
            "Missing required {field}"
        ))),
    }
}

fn convert_template(
    raw: RawTemplate,
    default_role: Option<TemplateRole>,
) -> Result<TemplateDescriptor, ThemeError> {
    let name = raw.name.trim().to_string();
    if name.is_empty() {
        return Err(ThemeError::MalformedDescriptor(
            "Template name must not be empty".to_string(),
        ));
    }

    let role = raw.role.or(default_role).ok_or_else(|| {
        ThemeError::MalformedDescriptor(format!("Template '{name}' has no role"))
    })?;

    let mut renditions = BTreeMap::new();
    for r in raw.renditions {
        let previous = renditions.insert(
            r.kind,
            RenditionDescriptor {
                contents_file: r.contents_file,
                language: r.language,
            },
        );
        if previous.is_some() {
            return Err(ThemeError::MalformedDescriptor(format!(
                "Template '{name}' declares the {} rendition twice",
                r.kind
            )));
        }
    }

    Ok(TemplateDescriptor {
        role,
        name,
        description: raw.description.unwrap_or_default(),
        link: raw.link.filter(|l| !l.trim().is_empty()),
        hidden: raw.hidden,
        navbar: raw.navbar,
        renditions,
    })
}

fn check_uniqueness(descriptor: &ThemeDescriptor) -> Result<(), ThemeError> {
    let mut names = HashSet::new();
    let mut links = HashSet::new();
    let mut singleton_roles = HashSet::new();

    for template in descriptor.all_templates() {
        if !names.insert(template.name.as_str()) {
            return Err(ThemeError::MalformedDescriptor(format!(
                "Duplicate template name '{}'",
                template.name
            )));
        }
        if let Some(link) = &template.link {
            if !links.insert(link.as_str()) {
                return Err(ThemeError::MalformedDescriptor(format!(
                    "Duplicate template link '{link}' on template '{}'",
                    template.name
                )));
            }
        }
        if template.role.is_singleton() && !singleton_roles.insert(template.role) {
            return Err(ThemeError::MalformedDescriptor(format!(
                "More than one template with singleton role {}",
                template.role.readable_name()
            )));
        }
    }

    Ok(())
}
