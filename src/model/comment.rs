use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Serialize, FromRow, Clone)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub parent_comment_id: Option<i64>,
    pub content: String,
    pub like_count: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub author_name: Option<String>,
    pub author_avatar: Option<String>,
}

/// A comment with its depth and its direct replies, oldest first.
#[derive(Debug, Serialize, Clone)]
pub struct CommentNode {
    #[serde(flatten)]
    pub row: Comment,
    pub level: u32,
    pub is_liked: bool,
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    /// Depth-first walk over a forest, parents before their replies.
    pub fn flatten(nodes: &[CommentNode]) -> Vec<&CommentNode> {
        let mut out = Vec::new();
        let mut stack: Vec<&CommentNode> = nodes.iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.replies.iter().rev());
        }
        out
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentCreate {
    pub post_id: i64,
    pub author_id: i64,
    #[serde(alias = "parentId")]
    pub parent_comment_id: Option<i64>,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentUpdate {
    pub author_id: i64,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct CommentCreated {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct CommentDeleted {
    pub removed: i64,
}
