use crate::model::post::PostSummary;
use serde::{Deserialize, Serialize};

/// Entry point for feed assembly; see `service::feed_service`.
pub struct Feed;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedMode {
    /// Newest first.
    Home,
    /// Likes, then comments, then recency.
    Popular,
    /// The viewer's saved posts, most recently saved first.
    Saved,
    /// A category address, resolved against the tag taxonomy.
    Category(String),
    /// Case-insensitive match on title, body or tag names.
    Search(String),
    /// Posts picked from the viewer's search history, never more than five.
    Recommended,
    /// Posts written by one user, newest first.
    Author(i64),
}

#[derive(Debug, Clone)]
pub struct FeedRequest {
    pub mode: FeedMode,
    pub limit: u32,
    pub offset: u32,
    pub viewer_id: Option<i64>,
}

impl FeedRequest {
    pub fn new(mode: FeedMode) -> Self {
        Self {
            mode,
            limit: 10,
            offset: 0,
            viewer_id: None,
        }
    }

    pub fn page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    pub fn viewer(mut self, viewer_id: Option<i64>) -> Self {
        self.viewer_id = viewer_id;
        self
    }
}

#[derive(Debug, Serialize)]
pub struct FeedPage {
    pub posts: Vec<PostSummary>,
    pub size: usize,
    pub offset: u32,
}

#[derive(Debug, Serialize)]
pub struct FeedCount {
    pub total: i64,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct CategoryQuery {
    pub category_path: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchQuery {
    pub keyword: String,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct CountQuery {
    pub category_path: Option<String>,
    pub keyword: Option<String>,
    pub user_id: Option<i64>,
}
