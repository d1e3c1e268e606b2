use crate::errors::ApiResult;
use crate::model::user::User;
use crate::util::common::now_millis;
use sqlx::{query_as, query_scalar, SqlitePool};

// Accounts are owned by the identity service; the forum only reads them,
// plus `create` for provisioning and tests.
impl User {
    pub async fn exists(pool: &SqlitePool, id: i64) -> ApiResult<bool> {
        let exists = query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE id = ?)")
            .bind(id)
            .fetch_one(pool)
            .await?;
        Ok(exists)
    }

    pub async fn create(pool: &SqlitePool, name: &str, avatar: Option<&str>) -> ApiResult<User> {
        let now = now_millis();

        let user = query_as::<_, User>(
            r#"
            INSERT INTO users (name, avatar, created_at)
            VALUES (?, ?, ?)
            RETURNING id, name, avatar, created_at
            "#,
        )
        .bind(name)
        .bind(avatar)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }
}
