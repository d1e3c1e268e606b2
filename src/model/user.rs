use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The slice of an account the forum needs: who wrote something and how to show them.
#[derive(Debug, Serialize, FromRow, Clone)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub avatar: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerQuery {
    pub user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorQuery {
    pub author_id: i64,
}
