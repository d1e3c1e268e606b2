use crate::errors::{ApiError, ApiResult};
use crate::model::feed::{Feed, FeedMode, FeedRequest};
use crate::model::media::Media;
use crate::model::post::{Post, PostSummary};
use crate::model::reaction::Membership;
use crate::model::search::SearchHistory;
use crate::model::tag::{FilterSpec, Keyword, Taxonomy};
use crate::service::post_service::{POST_COLUMNS, POST_FROM};
use crate::util::common::{contains_pattern, fold_case, is_blank, json_ids};
use sqlx::{query_as, FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, error};

const RECOMMENDED_KEYWORDS: u32 = 3;
const RECOMMENDED_CAP: u32 = 5;

/// Which posts a page is drawn from and in which order.
#[derive(Debug, Clone, PartialEq)]
enum Selection {
    Newest,
    Popular,
    SavedBy(i64),
    Tagged(BTreeSet<i64>),
    /// Posts whose folded title or body contains any pattern, or that carry
    /// one of the matched tags. Optionally skips one author's posts.
    Matching {
        patterns: Vec<String>,
        child_tag_ids: BTreeSet<i64>,
        parent_tag_ids: BTreeSet<i64>,
        exclude_author: Option<i64>,
    },
    ByAuthor(i64),
    Nothing,
}

impl Selection {
    fn matching(taxonomy: &Taxonomy, keywords: &[String], exclude_author: Option<i64>) -> Selection {
        let keywords: Vec<String> = keywords.iter().map(|k| fold_case(k.trim())).collect();
        let (child_tag_ids, parent_tag_ids) = taxonomy.matching_names(&keywords);

        Selection::Matching {
            patterns: keywords.iter().map(|k| contains_pattern(k)).collect(),
            child_tag_ids,
            parent_tag_ids,
            exclude_author,
        }
    }

    fn push_filter(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        if let Selection::SavedBy(user_id) = self {
            builder
                .push(" JOIN post_saves s ON s.post_id = p.id AND s.user_id = ")
                .push_bind(*user_id);
        }

        builder.push(" WHERE 1 = 1");

        match self {
            Selection::Newest | Selection::Popular | Selection::SavedBy(_) => {}
            Selection::Tagged(tag_ids) => {
                builder.push(" AND ");
                push_has_tag(builder, "post_child_tags", "child_tag_id", tag_ids);
            }
            Selection::Matching {
                patterns,
                child_tag_ids,
                parent_tag_ids,
                exclude_author,
            } => {
                builder.push(" AND (0 = 1");
                for pattern in patterns {
                    builder
                        .push(" OR p.title_folded LIKE ")
                        .push_bind(pattern.clone())
                        .push(r" ESCAPE '\' OR p.body_folded LIKE ")
                        .push_bind(pattern.clone())
                        .push(r" ESCAPE '\'");
                }
                if !child_tag_ids.is_empty() {
                    builder.push(" OR ");
                    push_has_tag(builder, "post_child_tags", "child_tag_id", child_tag_ids);
                }
                if !parent_tag_ids.is_empty() {
                    builder.push(" OR ");
                    push_has_tag(builder, "post_parent_tags", "parent_tag_id", parent_tag_ids);
                }
                builder.push(")");

                if let Some(author_id) = exclude_author {
                    builder.push(" AND p.author_id <> ").push_bind(*author_id);
                }
            }
            Selection::ByAuthor(author_id) => {
                builder.push(" AND p.author_id = ").push_bind(*author_id);
            }
            Selection::Nothing => {
                builder.push(" AND 0 = 1");
            }
        }
    }

    fn push_order(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        let order = match self {
            Selection::Popular | Selection::Matching { exclude_author: Some(_), .. } => {
                "p.like_count DESC, p.comment_count DESC, p.created_at DESC, p.id DESC"
            }
            Selection::SavedBy(_) => "s.created_at DESC, s.rowid DESC",
            _ => "p.created_at DESC, p.id DESC",
        };
        builder.push(" ORDER BY ").push(order);
    }
}

fn push_has_tag(
    builder: &mut QueryBuilder<'_, Sqlite>,
    join_table: &str,
    tag_column: &str,
    tag_ids: &BTreeSet<i64>,
) {
    let ids: Vec<i64> = tag_ids.iter().copied().collect();
    builder
        .push(format!(
            "EXISTS (SELECT 1 FROM {join_table} j WHERE j.post_id = p.id \
             AND j.{tag_column} IN (SELECT value FROM json_each("
        ))
        .push_bind(json_ids(&ids))
        .push(")))");
}

#[derive(Debug, FromRow)]
struct TagName {
    post_id: i64,
    name: String,
}

impl Feed {
    /// One page of the feed.
    ///
    /// The page and its enrichment are read inside one transaction, so every
    /// `is_liked` agrees with the `like_count` next to it.
    pub async fn get(pool: &SqlitePool, req: &FeedRequest) -> ApiResult<Vec<PostSummary>> {
        let mut tx = pool.begin().await?;

        let posts = match &req.mode {
            FeedMode::Recommended => Feed::recommended(&mut tx, req).await?,
            mode => {
                let selection = Feed::select(&mut tx, mode, req.viewer_id).await?;
                Feed::fetch(&mut tx, &selection, req.limit, req.offset).await?
            }
        };

        let summaries = Feed::enrich(&mut tx, posts, req.viewer_id).await?;

        tx.commit().await?;

        if let (FeedMode::Search(keyword), Some(viewer_id)) = (&req.mode, req.viewer_id) {
            if !is_blank(keyword) {
                let pool = pool.clone();
                let keyword = keyword.clone();
                tokio::spawn(async move {
                    if let Err(err) = SearchHistory::track(&pool, viewer_id, &keyword).await {
                        error!("failed to track search of user {}: {}", viewer_id, err);
                    }
                });
            }
        }

        debug!("{:?} feed: {} posts", req.mode, summaries.len());
        Ok(summaries)
    }

    /// Total number of posts a mode can page through.
    pub async fn count(pool: &SqlitePool, mode: &FeedMode, viewer_id: Option<i64>) -> ApiResult<i64> {
        if *mode == FeedMode::Recommended {
            return Err(ApiError::BadRequest(
                "recommended feed has no total count".to_string(),
            ));
        }

        let mut tx = pool.begin().await?;
        let selection = Feed::select(&mut tx, mode, viewer_id).await?;

        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM posts p");
        selection.push_filter(&mut builder);

        let total = builder.build_query_scalar::<i64>().fetch_one(&mut *tx).await?;
        tx.commit().await?;

        Ok(total)
    }

    /// A single enriched post.
    pub async fn post(pool: &SqlitePool, id: i64, viewer_id: Option<i64>) -> ApiResult<PostSummary> {
        let mut tx = pool.begin().await?;

        let post = Post::find_by_id(&mut tx, id)
            .await?
            .ok_or(ApiError::PostNotFound)?;
        let summary = Feed::enrich(&mut tx, vec![post], viewer_id)
            .await?
            .pop()
            .ok_or(ApiError::PostNotFound)?;

        tx.commit().await?;
        Ok(summary)
    }

    async fn select(
        conn: &mut SqliteConnection,
        mode: &FeedMode,
        viewer_id: Option<i64>,
    ) -> ApiResult<Selection> {
        let selection = match mode {
            FeedMode::Home => Selection::Newest,
            FeedMode::Popular => Selection::Popular,
            FeedMode::Saved => Selection::SavedBy(viewer_id.ok_or(ApiError::MissingViewer)?),
            FeedMode::Category(path) => {
                let taxonomy = Taxonomy::load(&mut *conn).await?;
                match taxonomy.resolve(path) {
                    FilterSpec::ByKeyword(Keyword::Home) => Selection::Newest,
                    FilterSpec::ByKeyword(Keyword::Popular) => Selection::Popular,
                    FilterSpec::ByKeyword(Keyword::Saved) => {
                        Selection::SavedBy(viewer_id.ok_or(ApiError::MissingViewer)?)
                    }
                    FilterSpec::ByTagSet(tag_ids) if tag_ids.is_empty() => Selection::Nothing,
                    FilterSpec::ByTagSet(tag_ids) => Selection::Tagged(tag_ids),
                }
            }
            FeedMode::Search(keyword) => {
                let taxonomy = Taxonomy::load(&mut *conn).await?;
                Selection::matching(&taxonomy, &[keyword.clone()], None)
            }
            FeedMode::Recommended => Selection::Popular,
            FeedMode::Author(author_id) => Selection::ByAuthor(*author_id),
        };
        Ok(selection)
    }

    async fn fetch(
        conn: &mut SqliteConnection,
        selection: &Selection,
        limit: u32,
        offset: u32,
    ) -> ApiResult<Vec<Post>> {
        if *selection == Selection::Nothing || limit == 0 {
            return Ok(vec![]);
        }

        let mut builder = QueryBuilder::<Sqlite>::new("SELECT ");
        builder.push(POST_COLUMNS).push(POST_FROM);
        selection.push_filter(&mut builder);
        selection.push_order(&mut builder);
        builder
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let posts = builder.build_query_as::<Post>().fetch_all(&mut *conn).await?;
        Ok(posts)
    }

    /// Posts matching the viewer's most searched keywords, never more than
    /// `RECOMMENDED_CAP`. Falls back to popular posts.
    async fn recommended(conn: &mut SqliteConnection, req: &FeedRequest) -> ApiResult<Vec<Post>> {
        let Some(viewer_id) = req.viewer_id else {
            return Feed::fetch(conn, &Selection::Popular, req.limit, req.offset).await;
        };

        let limit = req.limit.min(RECOMMENDED_CAP);
        let keywords = SearchHistory::top_keywords(&mut *conn, viewer_id, RECOMMENDED_KEYWORDS).await?;

        if !keywords.is_empty() {
            let taxonomy = Taxonomy::load(&mut *conn).await?;
            let selection = Selection::matching(&taxonomy, &keywords, Some(viewer_id));
            let posts = Feed::fetch(&mut *conn, &selection, limit, req.offset).await?;
            if !posts.is_empty() || req.offset > 0 {
                return Ok(posts);
            }
        }

        Feed::fetch(conn, &Selection::Popular, limit, req.offset).await
    }

    /// Attaches tag names, media and viewer flags, keeping the order of `posts`.
    pub(crate) async fn enrich(
        conn: &mut SqliteConnection,
        posts: Vec<Post>,
        viewer_id: Option<i64>,
    ) -> ApiResult<Vec<PostSummary>> {
        if posts.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();

        let mut parent_tags = tag_names(&mut *conn, &ids, "post_parent_tags", "parent_tags", "parent_tag_id").await?;
        let mut child_tags = tag_names(&mut *conn, &ids, "post_child_tags", "child_tags", "child_tag_id").await?;
        let mut media = Media::for_posts(&mut *conn, &ids).await?;

        let (liked, saved) = match viewer_id {
            Some(viewer_id) => (
                Membership::PostLike.members_among(&mut *conn, &ids, viewer_id).await?,
                Membership::PostSave.members_among(&mut *conn, &ids, viewer_id).await?,
            ),
            None => (HashSet::new(), HashSet::new()),
        };

        let summaries = posts
            .into_iter()
            .map(|post| {
                let id = post.id;
                let mut summary = PostSummary::from(post);
                summary.parent_tags = parent_tags.remove(&id).unwrap_or_default();
                summary.child_tags = child_tags.remove(&id).unwrap_or_default();
                if let Some(m) = media.remove(&id) {
                    summary.images = m.images;
                    summary.files = m.files;
                }
                summary.is_liked = liked.contains(&id);
                summary.is_saved = saved.contains(&id);
                summary
            })
            .collect();

        Ok(summaries)
    }
}

async fn tag_names(
    conn: &mut SqliteConnection,
    post_ids: &[i64],
    join_table: &str,
    tag_table: &str,
    tag_column: &str,
) -> ApiResult<HashMap<i64, Vec<String>>> {
    let sql = format!(
        r#"
        SELECT j.post_id, t.name
        FROM {join_table} j
        JOIN {tag_table} t ON t.id = j.{tag_column}
        WHERE j.post_id IN (SELECT value FROM json_each(?))
        ORDER BY t.id
        "#
    );
    let rows = query_as::<_, TagName>(&sql)
        .bind(json_ids(post_ids))
        .fetch_all(&mut *conn)
        .await?;

    let mut names: HashMap<i64, Vec<String>> = HashMap::new();
    for row in rows {
        names.entry(row.post_id).or_default().push(row.name);
    }
    Ok(names)
}
