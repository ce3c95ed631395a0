//! Closed enumerations shared by every layer of the theme engine.
//!
//! Roles, rendition kinds and derivations are persisted as lowercase
//! snake_case text (the same spelling serde uses), so each enum carries an
//! `as_str` / [`FromStr`] pair for the database layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when persisted text does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind}: '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/* --------------------------------------------------------------------------
Template roles
-------------------------------------------------------------------------- */

/// The job a template performs when a weblog is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateRole {
    Weblog,
    Permalink,
    Search,
    TagsIndex,
    Stylesheet,
    Script,
    CustomInternal,
    CustomExternal,
}

impl TemplateRole {
    /// Every role, in declaration order.
    pub const ALL: [TemplateRole; 8] = [
        TemplateRole::Weblog,
        TemplateRole::Permalink,
        TemplateRole::Search,
        TemplateRole::TagsIndex,
        TemplateRole::Stylesheet,
        TemplateRole::Script,
        TemplateRole::CustomInternal,
        TemplateRole::CustomExternal,
    ];

    /// Number of roles; sizes role-keyed lookup arrays.
    pub const COUNT: usize = Self::ALL.len();

    /// Dense index into a `[_; TemplateRole::COUNT]` array.
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Weblog => "weblog",
            Self::Permalink => "permalink",
            Self::Search => "search",
            Self::TagsIndex => "tags_index",
            Self::Stylesheet => "stylesheet",
            Self::Script => "script",
            Self::CustomInternal => "custom_internal",
            Self::CustomExternal => "custom_external",
        }
    }

    pub const fn readable_name(self) -> &'static str {
        match self {
            Self::Weblog => "Weblog",
            Self::Permalink => "Permalink",
            Self::Search => "Search",
            Self::TagsIndex => "Tag Index",
            Self::Stylesheet => "Stylesheet",
            Self::Script => "JavaScript file",
            Self::CustomInternal => "Custom internal",
            Self::CustomExternal => "Custom external",
        }
    }

    /// MIME type of rendered output for this role.
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Stylesheet => "text/css",
            Self::Script => "application/javascript",
            _ => "text/html",
        }
    }

    /// A theme (or effective view) holds at most one template per singleton role.
    pub const fn is_singleton(self) -> bool {
        matches!(
            self,
            Self::Weblog | Self::Permalink | Self::Search | Self::TagsIndex
        )
    }

    /// Whether a template of this role may be requested directly by its link.
    pub const fn is_url_accessible(self) -> bool {
        !self.is_singleton() && !matches!(self, Self::CustomInternal)
    }

    /// Custom roles are not unique within a theme, so they are left out of
    /// role indices.
    pub const fn is_indexed(self) -> bool {
        !matches!(self, Self::CustomInternal | Self::CustomExternal)
    }
}

impl fmt::Display for TemplateRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateRole {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "template role",
                value: s.to_string(),
            })
    }
}

/* --------------------------------------------------------------------------
Rendition kinds
-------------------------------------------------------------------------- */

/// Device-specific variant of a template's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenditionKind {
    Standard,
    Mobile,
}

impl RenditionKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Mobile => "mobile",
        }
    }

    /// Kinds a theme loads: STANDARD always, MOBILE only for dual-rendition themes.
    pub fn available(dual_rendition: bool) -> &'static [RenditionKind] {
        if dual_rendition {
            &[RenditionKind::Standard, RenditionKind::Mobile]
        } else {
            &[RenditionKind::Standard]
        }
    }
}

impl fmt::Display for RenditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenditionKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Self::Standard),
            "mobile" => Ok(Self::Mobile),
            other => Err(UnknownVariant {
                kind: "rendition kind",
                value: other.to_string(),
            }),
        }
    }
}

/* --------------------------------------------------------------------------
Derivation
-------------------------------------------------------------------------- */

/// Where a weblog's effective template comes from.
///
/// - `Shared`: the shared theme's template, unmodified. Never persisted.
/// - `Overridden`: a persisted template masking a shared template of the same name.
/// - `SpecificBlog`: a persisted template with no shared counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Derivation {
    Shared,
    Overridden,
    SpecificBlog,
}

impl Derivation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shared => "shared",
            Self::Overridden => "overridden",
            Self::SpecificBlog => "specific_blog",
        }
    }

    pub const fn readable_name(self) -> &'static str {
        match self {
            Self::Shared => "Default",
            Self::Overridden => "Override",
            Self::SpecificBlog => "Blog-Only",
        }
    }
}

impl fmt::Display for Derivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Derivation {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shared" => Ok(Self::Shared),
            "overridden" => Ok(Self::Overridden),
            "specific_blog" => Ok(Self::SpecificBlog),
            other => Err(UnknownVariant {
                kind: "derivation",
                value: other.to_string(),
            }),
        }
    }
}
