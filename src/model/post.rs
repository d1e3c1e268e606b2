use crate::model::media::MediaInfo;
use crate::util::maybe::MaybeAbsent;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

// which Rust types correspond to which sqlite column types:
// https://docs.rs/sqlx/latest/sqlx/sqlite/types/index.html
#[derive(Debug, Serialize, FromRow, Clone)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub body: String,
    pub like_count: i64,
    pub comment_count: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub author_name: Option<String>,
    pub author_avatar: Option<String>,
}

/// A post as served to a reader: the row plus tags, media and viewer-relative flags.
#[derive(Debug, Serialize, Clone)]
pub struct PostSummary {
    #[serde(flatten)]
    pub row: Post,

    pub parent_tags: Vec<String>,
    pub child_tags: Vec<String>,

    pub images: Vec<MediaInfo>,
    pub files: Vec<MediaInfo>,

    pub is_liked: bool,
    pub is_saved: bool,
}

impl From<Post> for PostSummary {
    fn from(row: Post) -> Self {
        Self {
            row,
            parent_tags: vec![],
            child_tags: vec![],
            images: vec![],
            files: vec![],
            is_liked: false,
            is_saved: false,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostCreate {
    pub author_id: i64,
    #[validate(length(min = 1, max = 300, message = "must be 1-300 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "can not be empty"))]
    #[serde(alias = "content")]
    pub body: String,
    pub parent_tag: Option<String>,
    #[validate(length(min = 1, message = "at least one child tag is required"))]
    pub child_tags: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PostUpdate {
    pub author_id: i64,

    #[serde(default)]
    pub title: MaybeAbsent<String>,

    #[serde(default, alias = "content")]
    pub body: MaybeAbsent<String>,

    #[serde(default)]
    pub parent_tag: MaybeAbsent<Option<String>>,

    #[serde(default)]
    pub child_tags: MaybeAbsent<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct CreateResponse {
    pub id: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Serialize)]
pub struct CommentCount {
    pub post_id: i64,
    pub comment_count: i64,
}
