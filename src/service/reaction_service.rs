use crate::errors::{ApiError, ApiResult};
use crate::model::comment::Comment;
use crate::model::post::Post;
use crate::model::reaction::{Counter, Membership, Toggle, ToggleResponse};
use crate::model::user::User;
use crate::util::common::{json_ids, now_millis};
use sqlx::{query, query_scalar, SqliteConnection, SqlitePool};
use std::collections::HashSet;
use tracing::debug;

impl Membership {
    /// Adds the pair. Returns `false` when it was already present.
    pub(crate) async fn insert(
        self,
        conn: &mut SqliteConnection,
        entity_id: i64,
        user_id: i64,
    ) -> ApiResult<bool> {
        let sql = format!(
            "INSERT OR IGNORE INTO {} ({}, user_id, created_at) VALUES (?, ?, ?)",
            self.table(),
            self.entity_column()
        );
        let rv = query(&sql)
            .bind(entity_id)
            .bind(user_id)
            .bind(now_millis())
            .execute(&mut *conn)
            .await?;
        Ok(rv.rows_affected() == 1)
    }

    /// Removes the pair. Returns `false` when it was not present.
    pub(crate) async fn remove(
        self,
        conn: &mut SqliteConnection,
        entity_id: i64,
        user_id: i64,
    ) -> ApiResult<bool> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ? AND user_id = ?",
            self.table(),
            self.entity_column()
        );
        let rv = query(&sql)
            .bind(entity_id)
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
        Ok(rv.rows_affected() == 1)
    }

    /// Which of `entity_ids` the user is a member of.
    pub async fn members_among(
        self,
        conn: &mut SqliteConnection,
        entity_ids: &[i64],
        user_id: i64,
    ) -> ApiResult<HashSet<i64>> {
        if entity_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let sql = format!(
            "SELECT {col} FROM {table} WHERE user_id = ? AND {col} IN (SELECT value FROM json_each(?))",
            col = self.entity_column(),
            table = self.table()
        );
        let ids = query_scalar::<_, i64>(&sql)
            .bind(user_id)
            .bind(json_ids(entity_ids))
            .fetch_all(&mut *conn)
            .await?;
        Ok(ids.into_iter().collect())
    }

    pub async fn count_for_user(self, conn: &mut SqliteConnection, user_id: i64) -> ApiResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE user_id = ?", self.table());
        Ok(query_scalar::<_, i64>(&sql)
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await?)
    }
}

impl Counter {
    /// Adds `delta` to the counter, flooring at zero.
    pub(crate) async fn apply(self, conn: &mut SqliteConnection, id: i64, delta: i64) -> ApiResult<()> {
        let sql = format!(
            "UPDATE {table} SET {col} = MAX({col} + ?, 0) WHERE id = ?",
            table = self.table(),
            col = self.column()
        );
        query(&sql).bind(delta).bind(id).execute(&mut *conn).await?;
        Ok(())
    }

    pub async fn read(self, conn: &mut SqliteConnection, id: i64) -> ApiResult<i64> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?",
            self.column(),
            self.table()
        );
        Ok(query_scalar::<_, i64>(&sql)
            .bind(id)
            .fetch_one(&mut *conn)
            .await?)
    }
}

/// Idempotent like/save toggles that keep cached counters equal to membership.
pub struct Reactions;

impl Reactions {
    pub async fn like_post(pool: &SqlitePool, post_id: i64, user_id: i64) -> ApiResult<ToggleResponse> {
        Self::set(pool, Membership::PostLike, post_id, user_id, true).await
    }

    pub async fn unlike_post(pool: &SqlitePool, post_id: i64, user_id: i64) -> ApiResult<ToggleResponse> {
        Self::set(pool, Membership::PostLike, post_id, user_id, false).await
    }

    pub async fn save_post(pool: &SqlitePool, post_id: i64, user_id: i64) -> ApiResult<ToggleResponse> {
        Self::set(pool, Membership::PostSave, post_id, user_id, true).await
    }

    pub async fn unsave_post(pool: &SqlitePool, post_id: i64, user_id: i64) -> ApiResult<ToggleResponse> {
        Self::set(pool, Membership::PostSave, post_id, user_id, false).await
    }

    pub async fn like_comment(pool: &SqlitePool, comment_id: i64, user_id: i64) -> ApiResult<ToggleResponse> {
        Self::set(pool, Membership::CommentLike, comment_id, user_id, true).await
    }

    pub async fn unlike_comment(pool: &SqlitePool, comment_id: i64, user_id: i64) -> ApiResult<ToggleResponse> {
        Self::set(pool, Membership::CommentLike, comment_id, user_id, false).await
    }

    /// `|saved posts of user|`, derived on demand.
    pub async fn count_saved(pool: &SqlitePool, user_id: i64) -> ApiResult<i64> {
        let mut conn = pool.acquire().await?;
        Membership::PostSave.count_for_user(&mut conn, user_id).await
    }

    /// Brings the pair to the wanted state.
    ///
    /// The membership write is the first statement of the transaction, so SQLite
    /// takes the write lock before anything is read and two concurrent likes of
    /// the same pair serialize: only one of them inserts, only one increments.
    async fn set(
        pool: &SqlitePool,
        membership: Membership,
        entity_id: i64,
        user_id: i64,
        present: bool,
    ) -> ApiResult<ToggleResponse> {
        Self::ensure_entity(pool, membership, entity_id).await?;
        if !User::exists(pool, user_id).await? {
            return Err(ApiError::UserNotFound);
        }

        let mut tx = pool.begin().await?;

        let result = if present {
            match membership.insert(&mut tx, entity_id, user_id).await? {
                true => Toggle::Inserted,
                false => Toggle::Unchanged,
            }
        } else {
            match membership.remove(&mut tx, entity_id, user_id).await? {
                true => Toggle::Removed,
                false => Toggle::Unchanged,
            }
        };

        let like_count = match membership.counter() {
            Some(counter) => {
                if result.changed() {
                    let delta = if result == Toggle::Inserted { 1 } else { -1 };
                    counter.apply(&mut tx, entity_id, delta).await?;
                }
                Some(counter.read(&mut tx, entity_id).await?)
            }
            None => None,
        };

        tx.commit().await?;

        debug!(
            "{} {}: entity={} user={} -> {:?}",
            membership,
            if present { "set" } else { "unset" },
            entity_id,
            user_id,
            result
        );

        Ok(ToggleResponse { result, like_count })
    }

    async fn ensure_entity(pool: &SqlitePool, membership: Membership, entity_id: i64) -> ApiResult<()> {
        match membership {
            Membership::PostLike | Membership::PostSave => {
                if !Post::exists(pool, entity_id).await? {
                    return Err(ApiError::PostNotFound);
                }
            }
            Membership::CommentLike => {
                if Comment::find(pool, entity_id).await?.is_none() {
                    return Err(ApiError::CommentNotFound);
                }
            }
        }
        Ok(())
    }
}
