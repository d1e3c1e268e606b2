use crate::errors::{bad_request, ApiError, ApiResult};
use crate::model::feed::{CategoryQuery, CountQuery, Feed, FeedCount, FeedMode, FeedPage, FeedRequest, PageQuery, SearchQuery};
use crate::model::media::{Media, MediaCreate, MediaCreated};
use crate::model::post::{CommentCount, CreateResponse, Post, PostCreate, PostSummary, PostUpdate};
use crate::model::reaction::{ToggleResponse, UserQuery};
use crate::model::tag::{Taxonomy, TaxonomyNode};
use crate::model::user::{AuthorQuery, ViewerQuery};
use crate::service::reaction_service::Reactions;
use crate::util::common::{is_blank, Pipe};
use crate::util::extractor::{Json, Path, Query, ValidatedJson};
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::Router;

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/tags", get(get_tags))
        .route("/posts", get(get_home).post(create_post))
        .route("/posts/popular", get(get_popular))
        .route("/posts/category", get(get_by_category))
        .route("/posts/search", get(search_posts))
        .route("/posts/recommended", get(get_recommended))
        .route("/posts/saved", get(get_saved))
        .route("/posts/saved/count", get(count_saved))
        .route("/posts/count", get(count_posts))
        .route("/posts/user/{id}", get(get_by_author))
        .route("/posts/{id}", get(get_post).put(update_post).delete(delete_post))
        .route("/posts/{id}/comment-count", get(get_comment_count))
        .route("/posts/{id}/like", post(like_post))
        .route("/posts/{id}/unlike", post(unlike_post))
        .route("/posts/{id}/save", post(save_post))
        .route("/posts/{id}/unsave", post(unsave_post))
        .route("/posts/{id}/media", post(attach_media))
        .route("/media/{id}", delete(detach_media))
}

async fn get_tags(State(state): State<AppState>) -> ApiResult<Json<Vec<TaxonomyNode>>> {
    let mut conn = state.db.acquire().await?;
    let taxonomy = Taxonomy::load(&mut conn).await?;
    Ok(Json(taxonomy.into_tree()))
}

async fn feed_page(state: &AppState, mode: FeedMode, limit: Option<u32>, offset: Option<u32>, viewer_id: Option<i64>) -> ApiResult<Json<FeedPage>> {
    let feed = &state.config.feed;
    let offset = offset.unwrap_or(0);
    let req = FeedRequest::new(mode)
        .page(feed.page_size(limit), offset)
        .viewer(viewer_id);

    let posts = Feed::get(&state.db, &req).await?;
    let size = posts.len();

    Json(FeedPage { posts, size, offset }).pipe(Ok)
}

async fn get_home(State(state): State<AppState>, Query(query): Query<PageQuery>) -> ApiResult<Json<FeedPage>> {
    feed_page(&state, FeedMode::Home, query.limit, query.offset, query.user_id).await
}

async fn get_popular(State(state): State<AppState>, Query(query): Query<PageQuery>) -> ApiResult<Json<FeedPage>> {
    feed_page(&state, FeedMode::Popular, query.limit, query.offset, query.user_id).await
}

async fn get_by_category(State(state): State<AppState>, Query(query): Query<CategoryQuery>) -> ApiResult<Json<FeedPage>> {
    let path = query.category_path.ok_or(ApiError::CategoryRequired)?;
    feed_page(&state, FeedMode::Category(path), query.limit, query.offset, query.user_id).await
}

async fn search_posts(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> ApiResult<Json<FeedPage>> {
    if is_blank(&query.keyword) {
        return Err(bad_request("keyword can not be empty"));
    }
    feed_page(&state, FeedMode::Search(query.keyword), query.limit, query.offset, query.user_id).await
}

async fn get_recommended(State(state): State<AppState>, Query(query): Query<PageQuery>) -> ApiResult<Json<FeedPage>> {
    feed_page(&state, FeedMode::Recommended, query.limit, query.offset, query.user_id).await
}

async fn get_saved(State(state): State<AppState>, Query(query): Query<PageQuery>) -> ApiResult<Json<FeedPage>> {
    feed_page(&state, FeedMode::Saved, query.limit, query.offset, query.user_id).await
}

async fn get_by_author(State(state): State<AppState>, Path(id): Path<i64>, Query(query): Query<PageQuery>) -> ApiResult<Json<FeedPage>> {
    feed_page(&state, FeedMode::Author(id), query.limit, query.offset, query.user_id).await
}

async fn count_posts(State(state): State<AppState>, Query(query): Query<CountQuery>) -> ApiResult<Json<FeedCount>> {
    let mode = match (query.keyword, query.category_path) {
        (Some(keyword), _) if !is_blank(&keyword) => FeedMode::Search(keyword),
        (_, Some(path)) => FeedMode::Category(path),
        _ => FeedMode::Home,
    };
    let total = Feed::count(&state.db, &mode, query.user_id).await?;
    Ok(Json(FeedCount { total }))
}

async fn count_saved(State(state): State<AppState>, Query(query): Query<UserQuery>) -> ApiResult<Json<FeedCount>> {
    let total = Reactions::count_saved(&state.db, query.user_id).await?;
    Ok(Json(FeedCount { total }))
}

async fn get_post(State(state): State<AppState>, Path(id): Path<i64>, Query(query): Query<ViewerQuery>) -> ApiResult<Json<PostSummary>> {
    let post = Feed::post(&state.db, id, query.user_id).await?;
    Ok(Json(post))
}

async fn get_comment_count(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<CommentCount>> {
    let comment_count = Post::get_comment_count(&state.db, id).await?;
    Ok(Json(CommentCount { post_id: id, comment_count }))
}

async fn create_post(State(state): State<AppState>, ValidatedJson(post): ValidatedJson<PostCreate>) -> ApiResult<Json<CreateResponse>> {
    let res = Post::create(&state.db, &post).await?;
    Ok(Json(res))
}

async fn update_post(State(state): State<AppState>, Path(id): Path<i64>, Json(post): Json<PostUpdate>) -> ApiResult<StatusCode> {
    Post::update(&state.db, id, &post).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_post(State(state): State<AppState>, Path(id): Path<i64>, Query(query): Query<AuthorQuery>) -> ApiResult<StatusCode> {
    Post::delete(&state.db, id, query.author_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn like_post(State(state): State<AppState>, Path(id): Path<i64>, Query(query): Query<UserQuery>) -> ApiResult<Json<ToggleResponse>> {
    Reactions::like_post(&state.db, id, query.user_id).await.map(Json)
}

async fn unlike_post(State(state): State<AppState>, Path(id): Path<i64>, Query(query): Query<UserQuery>) -> ApiResult<Json<ToggleResponse>> {
    Reactions::unlike_post(&state.db, id, query.user_id).await.map(Json)
}

async fn save_post(State(state): State<AppState>, Path(id): Path<i64>, Query(query): Query<UserQuery>) -> ApiResult<Json<ToggleResponse>> {
    Reactions::save_post(&state.db, id, query.user_id).await.map(Json)
}

async fn unsave_post(State(state): State<AppState>, Path(id): Path<i64>, Query(query): Query<UserQuery>) -> ApiResult<Json<ToggleResponse>> {
    Reactions::unsave_post(&state.db, id, query.user_id).await.map(Json)
}

async fn attach_media(State(state): State<AppState>, Path(id): Path<i64>, ValidatedJson(media): ValidatedJson<MediaCreate>) -> ApiResult<Json<MediaCreated>> {
    let media_id = Media::attach(&state.db, id, &media).await?;
    Ok(Json(MediaCreated { id: media_id }))
}

async fn detach_media(State(state): State<AppState>, Path(id): Path<i64>, Query(query): Query<AuthorQuery>) -> ApiResult<StatusCode> {
    Media::detach(&state.db, id, query.author_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
