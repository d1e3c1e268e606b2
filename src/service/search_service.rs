use crate::errors::ApiResult;
use crate::model::search::SearchHistory;
use crate::util::common::{fold_case, now_millis};
use sqlx::{query, query_as, query_scalar, SqliteConnection, SqlitePool};

impl SearchHistory {
    /// Records one search. Keywords are stored trimmed and lowercased.
    pub async fn track(pool: &SqlitePool, user_id: i64, keyword: &str) -> ApiResult<()> {
        let keyword = fold_case(keyword.trim());
        if keyword.is_empty() {
            return Ok(());
        }

        query(
            r#"
            INSERT INTO search_history (user_id, keyword, search_count, last_searched_at)
            VALUES (?, ?, 1, ?)
            ON CONFLICT (user_id, keyword) DO UPDATE
            SET search_count = search_count + 1, last_searched_at = excluded.last_searched_at
            "#,
        )
        .bind(user_id)
        .bind(keyword)
        .bind(now_millis())
        .execute(pool)
        .await?;

        Ok(())
    }

    /// The user's most frequent keywords, most recent first on ties.
    pub async fn top_keywords(
        conn: &mut SqliteConnection,
        user_id: i64,
        n: u32,
    ) -> ApiResult<Vec<String>> {
        let keywords = query_scalar::<_, String>(
            r#"
            SELECT keyword FROM search_history
            WHERE user_id = ?
            ORDER BY search_count DESC, last_searched_at DESC, keyword
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(n)
        .fetch_all(&mut *conn)
        .await?;
        Ok(keywords)
    }

    pub async fn list(pool: &SqlitePool, user_id: i64) -> ApiResult<Vec<SearchHistory>> {
        let rows = query_as::<_, SearchHistory>(
            r#"
            SELECT user_id, keyword, search_count, last_searched_at
            FROM search_history
            WHERE user_id = ?
            ORDER BY last_searched_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Removes entries not searched since `before` (unix millis).
    pub async fn prune(pool: &SqlitePool, before: i64) -> ApiResult<u64> {
        let rv = query("DELETE FROM search_history WHERE last_searched_at < ?")
            .bind(before)
            .execute(pool)
            .await?;
        Ok(rv.rows_affected())
    }
}
