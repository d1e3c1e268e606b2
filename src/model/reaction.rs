use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A (entity, user) membership relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Membership {
    #[display("post like")]
    PostLike,
    #[display("post save")]
    PostSave,
    #[display("comment like")]
    CommentLike,
}

impl Membership {
    pub(crate) fn table(self) -> &'static str {
        match self {
            Membership::PostLike => "post_likes",
            Membership::PostSave => "post_saves",
            Membership::CommentLike => "comment_likes",
        }
    }

    pub(crate) fn entity_column(self) -> &'static str {
        match self {
            Membership::PostLike | Membership::PostSave => "post_id",
            Membership::CommentLike => "comment_id",
        }
    }

    /// The cached counter kept equal to this relation's cardinality, if any.
    pub fn counter(self) -> Option<Counter> {
        match self {
            Membership::PostLike => Some(Counter::PostLikes),
            Membership::PostSave => None,
            Membership::CommentLike => Some(Counter::CommentLikes),
        }
    }
}

/// A denormalized counter column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    PostLikes,
    PostComments,
    CommentLikes,
}

impl Counter {
    pub(crate) fn table(self) -> &'static str {
        match self {
            Counter::PostLikes | Counter::PostComments => "posts",
            Counter::CommentLikes => "comments",
        }
    }

    pub(crate) fn column(self) -> &'static str {
        match self {
            Counter::PostLikes | Counter::CommentLikes => "like_count",
            Counter::PostComments => "comment_count",
        }
    }
}

/// What a toggle actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Toggle {
    Inserted,
    Removed,
    Unchanged,
}

impl Toggle {
    pub fn changed(self) -> bool {
        self != Toggle::Unchanged
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub result: Toggle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub like_count: Option<i64>,
}
