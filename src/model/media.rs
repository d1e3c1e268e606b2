use derive_more::Display;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "lowercase")]
pub enum MediaKind {
    #[display("image")]
    Image,
    #[display("file")]
    File,
}

#[derive(Debug, FromRow, Clone)]
pub struct Media {
    pub id: i64,
    pub post_id: i64,
    pub kind: MediaKind,
    pub mime_type: String,
    pub display_name: String,
}

/// Attachment metadata shown with a post. Bytes live with the media store.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MediaInfo {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
}

impl From<&Media> for MediaInfo {
    fn from(row: &Media) -> Self {
        Self {
            id: row.id,
            name: row.display_name.clone(),
            mime_type: row.mime_type.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MediaCreate {
    pub author_id: i64,
    pub kind: MediaKind,
    #[validate(length(min = 1, message = "can not be empty"))]
    pub binary_ref: String,
    #[validate(length(min = 1, message = "can not be empty"))]
    pub mime_type: String,
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    pub display_name: String,
    #[validate(range(min = 0, message = "can not be negative"))]
    pub size_bytes: i64,
}

#[derive(Debug, Serialize)]
pub struct MediaCreated {
    pub id: i64,
}
