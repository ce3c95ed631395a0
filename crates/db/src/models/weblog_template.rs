use serde::Serialize;
use sqlx::FromRow;
use weblog_core::themes::role::UnknownVariant;
use weblog_core::themes::store::OverrideTemplate;
use weblog_core::themes::{Derivation, TemplateRole};
use weblog_core::types::{DbId, Timestamp};

/// A row from the `weblog_templates` table.
///
/// `role` and `derivation` are stored as snake_case text.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WeblogTemplate {
    pub id: DbId,
    pub weblog_id: DbId,
    pub name: String,
    pub role: String,
    pub derivation: String,
    pub description: String,
    pub template: String,
    pub template_language: String,
    pub link: Option<String>,
    pub hidden: bool,
    pub navbar: bool,
    pub last_modified: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<WeblogTemplate> for OverrideTemplate {
    type Error = UnknownVariant;

    fn try_from(row: WeblogTemplate) -> Result<Self, Self::Error> {
        let role: TemplateRole = row.role.parse()?;
        let derivation: Derivation = row.derivation.parse()?;
        Ok(Self {
            id: row.id,
            weblog_id: row.weblog_id,
            name: row.name,
            role,
            derivation,
            description: row.description,
            content: row.template,
            language: row.template_language,
            link: row.link,
            hidden: row.hidden,
            navbar: row.navbar,
            last_modified: row.last_modified,
        })
    }
}
