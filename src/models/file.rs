use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

/// Types a non-folder item may carry. Folders always get "folder".
pub const ALLOWED_TYPES: [&str; 6] = ["doc", "sheet", "text", "zip", "pdf", "video"];

pub fn is_allowed_type(t: &str) -> bool {
    ALLOWED_TYPES.contains(&t)
}

pub const DEFAULT_LOCATION: &str = "My Drive";
pub const TRASH_LOCATION: &str = "Trash";

/// A file or folder row plus its share set, in the wire shape the
/// frontend expects (camelCase, `owner` is the owner's user id).
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub owner: String,
    pub owner_name: String,
    pub owner_email: String,
    pub size: i64,
    pub location: String,
    pub is_folder: bool,
    pub is_starred: bool,
    pub shared_with: Vec<String>,
    pub description: String,
    pub content_preview: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileMeta {
    pub fn from_row(row: &SqliteRow, shared_with: Vec<String>) -> Self {
        Self {
            id: row.get("id"),
            name: row.get("name"),
            file_type: row.get("type"),
            owner: row.get("owner_id"),
            owner_name: row.get("owner_name"),
            owner_email: row.get("owner_email"),
            size: row.get("size"),
            location: row.get("location"),
            is_folder: row.get("is_folder"),
            is_starred: row.get("is_starred"),
            shared_with,
            description: row.get("description"),
            content_preview: row.get("content_preview"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }

    pub fn is_visible_to(&self, user_id: &str, user_email: &str) -> bool {
        self.owner == user_id || self.shared_with.iter().any(|e| e == user_email)
    }
}
