use crate::errors::{ApiError, ApiResult};
use crate::model::media::{Media, MediaCreate, MediaInfo, MediaKind};
use crate::model::post::Post;
use crate::util::common::{json_ids, now_millis};
use sqlx::{query, query_as, query_scalar, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::info;

/// Images and files of one post, each in attachment order.
#[derive(Debug, Default)]
pub(crate) struct PostMedia {
    pub images: Vec<MediaInfo>,
    pub files: Vec<MediaInfo>,
}

impl Media {
    /// Records attachment metadata for a post. Only the post's author may attach.
    pub async fn attach(pool: &SqlitePool, post_id: i64, media: &MediaCreate) -> ApiResult<i64> {
        Post::ensure_owner(pool, post_id, media.author_id).await?;

        let id = query_scalar::<_, i64>(
            r#"
            INSERT INTO post_media (post_id, kind, binary_ref, mime_type, display_name, size_bytes, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(post_id)
        .bind(media.kind)
        .bind(&media.binary_ref)
        .bind(&media.mime_type)
        .bind(&media.display_name)
        .bind(media.size_bytes)
        .bind(now_millis())
        .fetch_one(pool)
        .await?;

        info!("media {} ({}) attached to post {}", id, media.kind, post_id);
        Ok(id)
    }

    pub async fn detach(pool: &SqlitePool, media_id: i64, author_id: i64) -> ApiResult<()> {
        let post_id = query_scalar::<_, i64>("SELECT post_id FROM post_media WHERE id = ?")
            .bind(media_id)
            .fetch_optional(pool)
            .await?
            .ok_or(ApiError::MediaNotFound)?;

        Post::ensure_owner(pool, post_id, author_id).await?;

        let rv = query("DELETE FROM post_media WHERE id = ?")
            .bind(media_id)
            .execute(pool)
            .await?;
        if rv.rows_affected() == 0 {
            return Err(ApiError::MediaNotFound);
        }
        Ok(())
    }

    /// Media of many posts at once, grouped by post and split by kind.
    pub(crate) async fn for_posts(
        conn: &mut SqliteConnection,
        post_ids: &[i64],
    ) -> ApiResult<HashMap<i64, PostMedia>> {
        let mut grouped: HashMap<i64, PostMedia> = HashMap::new();
        if post_ids.is_empty() {
            return Ok(grouped);
        }

        let rows = query_as::<_, Media>(
            r#"
            SELECT id, post_id, kind, mime_type, display_name
            FROM post_media
            WHERE post_id IN (SELECT value FROM json_each(?))
            ORDER BY id
            "#,
        )
        .bind(json_ids(post_ids))
        .fetch_all(&mut *conn)
        .await?;

        for row in &rows {
            let entry = grouped.entry(row.post_id).or_default();
            match row.kind {
                MediaKind::Image => entry.images.push(MediaInfo::from(row)),
                MediaKind::File => entry.files.push(MediaInfo::from(row)),
            }
        }

        Ok(grouped)
    }
}
