use crate::themes::switch::Violation;
use crate::types::DbId;

/// Boxed error raised by a persistence collaborator.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    #[error("Malformed theme descriptor: {0}")]
    MalformedDescriptor(String),

    #[error("Theme {theme_id} template {template} has no standard rendition")]
    MissingRendition { theme_id: String, template: String },

    #[error("Theme {theme_id} asset {path} is unreadable: {reason}")]
    AssetUnreadable {
        theme_id: String,
        path: String,
        reason: String,
    },

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Theme switch refused with {} conflict(s)", .0.len())]
    ThemeSwitchConflict(Vec<Violation>),

    #[error("Unknown shared theme: {0}")]
    UnknownTheme(String),

    #[error("Weblog not found: {0}")]
    WeblogNotFound(DbId),

    #[error("Invalid template override: {0}")]
    InvalidOverride(String),

    #[error("Override store error: {0}")]
    Store(#[source] StoreError),
}

impl ThemeError {
    /// Wrap a persistence-layer error.
    pub fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Store(Box::new(err))
    }
}
