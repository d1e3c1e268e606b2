use crate::errors::{ApiError, ApiResult};
use crate::model::comment::{Comment, CommentCreate, CommentCreated, CommentNode, CommentUpdate};
use crate::model::post::Post;
use crate::model::reaction::{Counter, Membership};
use crate::model::user::User;
use crate::util::common::{is_blank, now_millis};
use sqlx::{query, query_as, query_scalar, SqlitePool};
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.post_id, c.author_id, c.parent_comment_id, c.content, c.like_count,
           c.created_at, c.updated_at, u.name AS author_name, u.avatar AS author_avatar
    FROM comments c LEFT JOIN users u ON u.id = c.author_id
"#;

// Ids of a comment and all of its descendants.
const SUBTREE_CTE: &str = r#"
    WITH RECURSIVE subtree(id) AS (
        SELECT id FROM comments WHERE id = ?
        UNION ALL
        SELECT c.id FROM comments c JOIN subtree s ON c.parent_comment_id = s.id
    )
"#;

impl Comment {
    pub async fn find(pool: &SqlitePool, id: i64) -> ApiResult<Option<Comment>> {
        let sql = format!("{COMMENT_SELECT} WHERE c.id = ?");
        let comment = query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(comment)
    }

    pub async fn add(pool: &SqlitePool, comment: &CommentCreate) -> ApiResult<CommentCreated> {
        if !Post::exists(pool, comment.post_id).await? {
            return Err(ApiError::PostNotFound);
        }
        if !User::exists(pool, comment.author_id).await? {
            return Err(ApiError::AuthorNotFound);
        }
        if let Some(parent_id) = comment.parent_comment_id {
            match Comment::find(pool, parent_id).await? {
                Some(parent) if parent.post_id == comment.post_id => {}
                _ => return Err(ApiError::InvalidParent),
            }
        }
        if is_blank(&comment.content) {
            return Err(ApiError::EmptyContent);
        }

        let now = now_millis();
        let mut tx = pool.begin().await?;

        // the parent must still belong to this post when the row lands
        let id = query_scalar::<_, i64>(
            r#"
            INSERT INTO comments (post_id, author_id, parent_comment_id, content, like_count, created_at, updated_at)
            SELECT ?1, ?2, ?3, ?4, 0, ?5, ?5
            WHERE ?3 IS NULL
               OR EXISTS (SELECT 1 FROM comments WHERE id = ?3 AND post_id = ?1)
            RETURNING id
            "#,
        )
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(comment.parent_comment_id)
        .bind(comment.content.trim())
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ApiError::InvalidParent)?;

        Counter::PostComments.apply(&mut tx, comment.post_id, 1).await?;

        tx.commit().await?;

        info!(
            "comment {} added to post {} by user {}",
            id, comment.post_id, comment.author_id
        );
        Ok(CommentCreated { id })
    }

    pub async fn edit(pool: &SqlitePool, id: i64, update: &CommentUpdate) -> ApiResult<()> {
        let comment = Comment::find(pool, id).await?.ok_or(ApiError::CommentNotFound)?;
        if comment.author_id != update.author_id {
            return Err(ApiError::NotOwner);
        }
        if is_blank(&update.content) {
            return Err(ApiError::EmptyContent);
        }

        let rv = query("UPDATE comments SET content = ?, updated_at = ? WHERE id = ? AND author_id = ?")
            .bind(update.content.trim())
            .bind(now_millis())
            .bind(id)
            .bind(update.author_id)
            .execute(pool)
            .await?;

        if rv.rows_affected() == 0 {
            return Err(ApiError::CommentNotFound);
        }
        Ok(())
    }

    /// Deletes a comment with all of its replies and returns how many were removed.
    pub async fn delete(pool: &SqlitePool, id: i64, author_id: i64) -> ApiResult<i64> {
        let comment = Comment::find(pool, id).await?.ok_or(ApiError::CommentNotFound)?;
        if comment.author_id != author_id {
            return Err(ApiError::NotOwner);
        }

        let mut tx = pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE posts
            SET comment_count = MAX(comment_count - ({SUBTREE_CTE} SELECT COUNT(*) FROM subtree), 0)
            WHERE id = ?
            "#
        );
        query(&sql)
            .bind(id)
            .bind(comment.post_id)
            .execute(&mut *tx)
            .await?;

        let sql = format!("{SUBTREE_CTE} SELECT COUNT(*) FROM subtree");
        let removed = query_scalar::<_, i64>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        // replies and their likes go with the root via ON DELETE CASCADE
        let rv = query("DELETE FROM comments WHERE id = ? AND author_id = ?")
            .bind(id)
            .bind(author_id)
            .execute(&mut *tx)
            .await?;
        if rv.rows_affected() == 0 {
            return Err(ApiError::CommentNotFound);
        }

        tx.commit().await?;

        info!("comment {} deleted with {} replies", id, removed - 1);
        Ok(removed)
    }

    /// The leveled reply tree of a post, `is_liked` relative to `viewer_id`.
    pub async fn tree(
        pool: &SqlitePool,
        post_id: i64,
        viewer_id: Option<i64>,
    ) -> ApiResult<Vec<CommentNode>> {
        let mut tx = pool.begin().await?;

        if !query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM posts WHERE id = ?)")
            .bind(post_id)
            .fetch_one(&mut *tx)
            .await?
        {
            return Err(ApiError::PostNotFound);
        }

        let sql = format!("{COMMENT_SELECT} WHERE c.post_id = ?");
        let rows = query_as::<_, Comment>(&sql)
            .bind(post_id)
            .fetch_all(&mut *tx)
            .await?;

        let liked = match viewer_id {
            Some(viewer_id) => {
                let ids: Vec<i64> = rows.iter().map(|c| c.id).collect();
                Membership::CommentLike
                    .members_among(&mut tx, &ids, viewer_id)
                    .await?
            }
            None => HashSet::new(),
        };

        tx.commit().await?;

        Ok(build_tree(rows, &liked))
    }
}

/// Builds a forest from flat rows in any order.
///
/// Siblings are ordered by `(created_at, id)` ascending. Rows whose parent is
/// not among `rows` can not be placed and are dropped.
pub fn build_tree(mut rows: Vec<Comment>, liked: &HashSet<i64>) -> Vec<CommentNode> {
    rows.sort_by_key(|c| (c.created_at, c.id));

    let mut children: HashMap<Option<i64>, Vec<usize>> = HashMap::new();
    for (idx, row) in rows.iter().enumerate() {
        children.entry(row.parent_comment_id).or_default().push(idx);
    }
    let roots = children.remove(&None).unwrap_or_default();

    // Pre-order walk: every node is listed before its replies.
    let mut order: Vec<(usize, u32)> = Vec::with_capacity(rows.len());
    let mut visited = vec![false; rows.len()];
    let mut stack: Vec<(usize, u32)> = roots.iter().rev().map(|&idx| (idx, 0)).collect();
    while let Some((idx, level)) = stack.pop() {
        if visited[idx] {
            continue;
        }
        visited[idx] = true;
        order.push((idx, level));

        if let Some(replies) = children.get(&Some(rows[idx].id)) {
            stack.extend(replies.iter().rev().map(|&child| (child, level + 1)));
        }
    }

    if order.len() < rows.len() {
        let dropped: Vec<i64> = rows
            .iter()
            .zip(&visited)
            .filter(|(_, seen)| !**seen)
            .map(|(c, _)| c.id)
            .collect();
        warn!("dropping comments with unreachable parents: {:?}", dropped);
    }

    // Assemble bottom-up so each node owns finished replies.
    let mut slots: Vec<Option<Comment>> = rows.into_iter().map(Some).collect();
    let mut built: Vec<Option<CommentNode>> = (0..slots.len()).map(|_| None).collect();

    for &(idx, level) in order.iter().rev() {
        let Some(row) = slots[idx].take() else { continue };

        let replies: Vec<CommentNode> = children
            .get(&Some(row.id))
            .map(|ids| ids.iter().filter_map(|&child| built[child].take()).collect())
            .unwrap_or_default();

        built[idx] = Some(CommentNode {
            is_liked: liked.contains(&row.id),
            row,
            level,
            replies,
        });
    }

    roots.iter().filter_map(|&idx| built[idx].take()).collect()
}
