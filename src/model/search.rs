use serde::Serialize;
use sqlx::FromRow;

/// How often a user searched for a keyword, and when last.
#[derive(Debug, Serialize, FromRow, Clone)]
pub struct SearchHistory {
    pub user_id: i64,
    pub keyword: String,
    pub search_count: i64,
    pub last_searched_at: i64,
}
