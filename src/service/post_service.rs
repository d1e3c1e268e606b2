use crate::errors::{ApiError, ApiResult};
use crate::model::post::{CreateResponse, Post, PostCreate, PostUpdate};
use crate::model::tag::Taxonomy;
use crate::model::user::User;
use crate::util::common::{fold_case, is_blank, now_millis};
use crate::util::maybe::MaybeAbsent;
use sqlx::{query, query_as, query_scalar, QueryBuilder, Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::collections::BTreeSet;
use tracing::info;

pub(crate) const POST_COLUMNS: &str = r#"
    p.id, p.author_id, p.title, p.body, p.like_count, p.comment_count,
    p.created_at, p.updated_at, u.name AS author_name, u.avatar AS author_avatar
"#;

pub(crate) const POST_FROM: &str = " FROM posts p LEFT JOIN users u ON u.id = p.author_id ";

/// Tag ids a post is associated with.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct PostTags {
    pub parent_ids: BTreeSet<i64>,
    pub child_ids: BTreeSet<i64>,
}

impl PostTags {
    /// Children resolve by display name or code; parents are the children's
    /// parents plus the explicitly named one.
    pub(crate) fn resolve(
        taxonomy: &Taxonomy,
        parent_tag: Option<&str>,
        child_tags: &[String],
    ) -> ApiResult<PostTags> {
        let mut tags = PostTags::default();

        for name in child_tags {
            let child = taxonomy
                .find_child(name.trim())
                .ok_or_else(|| ApiError::UnknownTag(name.clone()))?;
            tags.child_ids.insert(child.id);
            tags.parent_ids.insert(child.parent_tag_id);
        }

        if let Some(name) = parent_tag.filter(|name| !is_blank(name)) {
            let parent = taxonomy
                .find_parent(name.trim())
                .ok_or_else(|| ApiError::UnknownTag(name.to_string()))?;
            tags.parent_ids.insert(parent.id);
        }

        if tags.child_ids.is_empty() {
            return Err(ApiError::BadRequest("at least one child tag is required".to_string()));
        }

        Ok(tags)
    }
}

impl Post {
    pub async fn exists(pool: &SqlitePool, id: i64) -> ApiResult<bool> {
        let exists = query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM posts WHERE id = ?)")
            .bind(id)
            .fetch_one(pool)
            .await?;
        Ok(exists)
    }

    pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> ApiResult<Option<Post>> {
        let sql = format!("SELECT {POST_COLUMNS} {POST_FROM} WHERE p.id = ?");
        let post = query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(post)
    }

    pub async fn get_comment_count(pool: &SqlitePool, id: i64) -> ApiResult<i64> {
        query_scalar::<_, i64>("SELECT comment_count FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(ApiError::PostNotFound)
    }

    /// Fails unless the post exists and was written by `author_id`.
    pub async fn ensure_owner(pool: &SqlitePool, id: i64, author_id: i64) -> ApiResult<()> {
        let owner = query_scalar::<_, i64>("SELECT author_id FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(ApiError::PostNotFound)?;

        if owner != author_id {
            return Err(ApiError::NotOwner);
        }
        Ok(())
    }

    pub async fn create(pool: &SqlitePool, post: &PostCreate) -> ApiResult<CreateResponse> {
        if is_blank(&post.title) || is_blank(&post.body) {
            return Err(ApiError::EmptyContent);
        }
        if !User::exists(pool, post.author_id).await? {
            return Err(ApiError::AuthorNotFound);
        }

        let taxonomy = Taxonomy::load(&mut *pool.acquire().await?).await?;
        let tags = PostTags::resolve(&taxonomy, post.parent_tag.as_deref(), &post.child_tags)?;

        let now = now_millis();
        let mut tx = pool.begin().await?;

        let post_id = query_scalar::<_, i64>(
            r#"
            INSERT INTO posts (author_id, title, body, title_folded, body_folded, like_count, comment_count, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 0, 0, ?, ?)
            RETURNING id
            "#,
        )
        .bind(post.author_id)
        .bind(post.title.trim())
        .bind(&post.body)
        .bind(fold_case(post.title.trim()))
        .bind(fold_case(&post.body))
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        Post::replace_tags(&mut tx, post_id, &tags, true).await?;

        tx.commit().await?;

        info!("post {} created by user {}", post_id, post.author_id);

        Ok(CreateResponse {
            id: post_id,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn update(pool: &SqlitePool, id: i64, post: &PostUpdate) -> ApiResult<()> {
        Post::ensure_owner(pool, id, post.author_id).await?;

        if post.title.as_option().is_some_and(|t| is_blank(t))
            || post.body.as_option().is_some_and(|b| is_blank(b))
        {
            return Err(ApiError::EmptyContent);
        }

        let tags = if post.child_tags.is_present() || post.parent_tag.is_present() {
            let mut conn = pool.acquire().await?;
            let taxonomy = Taxonomy::load(&mut conn).await?;

            let child_tags = match &post.child_tags {
                MaybeAbsent::Present(names) => names.clone(),
                MaybeAbsent::Absent => Post::child_tag_names(&mut conn, id).await?,
            };
            let parent_tag = post.parent_tag.as_option().and_then(|p| p.as_deref());

            Some(PostTags::resolve(&taxonomy, parent_tag, &child_tags)?)
        } else {
            None
        };

        let now = now_millis();
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE posts SET ");
        builder.push("updated_at = ").push_bind(now);

        post.title.if_present(|title| {
            builder
                .push(", title = ")
                .push_bind(title.trim().to_string())
                .push(", title_folded = ")
                .push_bind(fold_case(title.trim()));
        });

        post.body.if_present(|body| {
            builder
                .push(", body = ")
                .push_bind(body.clone())
                .push(", body_folded = ")
                .push_bind(fold_case(body));
        });

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND author_id = ")
            .push_bind(post.author_id);

        let mut tx = pool.begin().await?;

        let rv = builder.build().execute(&mut *tx).await?;
        if rv.rows_affected() == 0 {
            return Err(ApiError::PostNotFound);
        }

        if let Some(tags) = tags {
            Post::replace_tags(&mut tx, id, &tags, false).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Deletes the post; media, tag links, likes, saves and comments go with it.
    pub async fn delete(pool: &SqlitePool, id: i64, author_id: i64) -> ApiResult<()> {
        Post::ensure_owner(pool, id, author_id).await?;

        let rv = query("DELETE FROM posts WHERE id = ? AND author_id = ?")
            .bind(id)
            .bind(author_id)
            .execute(pool)
            .await?;

        if rv.rows_affected() == 0 {
            return Err(ApiError::PostNotFound);
        }

        info!("post {} deleted by user {}", id, author_id);
        Ok(())
    }

    async fn child_tag_names(conn: &mut SqliteConnection, id: i64) -> ApiResult<Vec<String>> {
        let names = query_scalar::<_, String>(
            r#"
            SELECT ct.name
            FROM post_child_tags pct
            JOIN child_tags ct ON ct.id = pct.child_tag_id
            WHERE pct.post_id = ?
            "#,
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(names)
    }

    async fn replace_tags(
        tx: &mut Transaction<'_, Sqlite>,
        post_id: i64,
        tags: &PostTags,
        is_new_post: bool,
    ) -> ApiResult<()> {
        if !is_new_post {
            query("DELETE FROM post_child_tags WHERE post_id = ?")
                .bind(post_id)
                .execute(&mut **tx)
                .await?;
            query("DELETE FROM post_parent_tags WHERE post_id = ?")
                .bind(post_id)
                .execute(&mut **tx)
                .await?;
        }

        for child_id in &tags.child_ids {
            query("INSERT INTO post_child_tags (post_id, child_tag_id) VALUES (?, ?)")
                .bind(post_id)
                .bind(child_id)
                .execute(&mut **tx)
                .await?;
        }

        for parent_id in &tags.parent_ids {
            query("INSERT INTO post_parent_tags (post_id, parent_tag_id) VALUES (?, ?)")
                .bind(post_id)
                .bind(parent_id)
                .execute(&mut **tx)
                .await?;
        }

        Ok(())
    }
}
