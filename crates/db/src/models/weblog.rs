use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use weblog_core::themes::store::WeblogThemeState;
use weblog_core::types::{DbId, Timestamp};

/// A row from the `weblogs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Weblog {
    pub id: DbId,
    pub handle: String,
    pub name: String,
    /// Id of the shared theme the weblog renders with.
    pub theme: String,
    pub last_modified: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a weblog.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWeblog {
    pub handle: String,
    pub name: String,
    pub theme: String,
}

impl From<Weblog> for WeblogThemeState {
    fn from(row: Weblog) -> Self {
        Self {
            weblog_id: row.id,
            handle: row.handle,
            theme_id: row.theme,
            last_modified: row.last_modified,
        }
    }
}
