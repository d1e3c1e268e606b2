use crate::errors::ApiResult;
use crate::model::comment::{Comment, CommentCreate, CommentCreated, CommentDeleted, CommentNode, CommentUpdate};
use crate::model::reaction::{ToggleResponse, UserQuery};
use crate::model::user::{AuthorQuery, ViewerQuery};
use crate::service::reaction_service::Reactions;
use crate::util::extractor::{Json, Path, Query};
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::Router;

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/comments", post(add_comment))
        .route("/comments/post/{post_id}", get(get_tree))
        .route("/comments/{id}", put(edit_comment).delete(delete_comment))
        .route("/comments/{id}/like", post(like_comment))
        .route("/comments/{id}/unlike", post(unlike_comment))
}

async fn add_comment(State(state): State<AppState>, Json(comment): Json<CommentCreate>) -> ApiResult<(StatusCode, Json<CommentCreated>)> {
    let created = Comment::add(&state.db, &comment).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_tree(State(state): State<AppState>, Path(post_id): Path<i64>, Query(query): Query<ViewerQuery>) -> ApiResult<Json<Vec<CommentNode>>> {
    let tree = Comment::tree(&state.db, post_id, query.user_id).await?;
    Ok(Json(tree))
}

async fn edit_comment(State(state): State<AppState>, Path(id): Path<i64>, Json(update): Json<CommentUpdate>) -> ApiResult<StatusCode> {
    Comment::edit(&state.db, id, &update).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_comment(State(state): State<AppState>, Path(id): Path<i64>, Query(query): Query<AuthorQuery>) -> ApiResult<Json<CommentDeleted>> {
    let removed = Comment::delete(&state.db, id, query.author_id).await?;
    Ok(Json(CommentDeleted { removed }))
}

async fn like_comment(State(state): State<AppState>, Path(id): Path<i64>, Query(query): Query<UserQuery>) -> ApiResult<Json<ToggleResponse>> {
    Reactions::like_comment(&state.db, id, query.user_id).await.map(Json)
}

async fn unlike_comment(State(state): State<AppState>, Path(id): Path<i64>, Query(query): Query<UserQuery>) -> ApiResult<Json<ToggleResponse>> {
    Reactions::unlike_comment(&state.db, id, query.user_id).await.map(Json)
}
