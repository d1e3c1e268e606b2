use crate::util::extractor::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use derive_more::Display;
use serde::Serialize;
use sqlx::error::ErrorKind as DbErrorKind;
use std::error::Error;
use std::fmt;
use std::fmt::Debug;
use validator::ValidationErrors;

pub type ApiResult<T> = Result<T, ApiError>;

/// Coarse failure taxonomy every `ApiError` belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorKind {
    #[display("not_found")]
    NotFound,
    #[display("not_owner")]
    NotOwner,
    #[display("invalid_input")]
    InvalidInput,
    #[display("storage_error")]
    Storage,
}

#[derive(Serialize, Debug)]
pub struct ErrorMessage {
    pub success: bool,
    pub code: u16,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug)]
pub enum ApiError {
    PostNotFound,
    CommentNotFound,
    AuthorNotFound,
    UserNotFound,
    MediaNotFound,

    NotOwner,

    EmptyContent,
    InvalidParent,
    MissingViewer,
    CategoryRequired,
    UnknownTag(String),
    BadRequest(String),

    PathError(u16, String),

    QueryRejection(QueryRejection),
    JsonRejection(JsonRejection),

    ValidationError(ValidationErrors),

    Sqlx(sqlx::Error),

    Anyhow(anyhow::Error),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        use ApiError::*;

        match self {
            PostNotFound | CommentNotFound | AuthorNotFound | UserNotFound | MediaNotFound => {
                ErrorKind::NotFound
            }
            NotOwner => ErrorKind::NotOwner,
            EmptyContent | InvalidParent | MissingViewer | CategoryRequired | UnknownTag(_)
            | BadRequest(_) | PathError(..) | QueryRejection(_) | JsonRejection(_)
            | ValidationError(_) => ErrorKind::InvalidInput,
            Sqlx(_) | Anyhow(_) => ErrorKind::Storage,
        }
    }

    /// Stable machine-readable code.
    pub fn error_code(&self) -> &'static str {
        use ApiError::*;

        match self {
            PostNotFound => "POST_NOT_FOUND",
            CommentNotFound => "COMMENT_NOT_FOUND",
            AuthorNotFound => "AUTHOR_NOT_FOUND",
            UserNotFound => "USER_NOT_FOUND",
            MediaNotFound => "MEDIA_NOT_FOUND",
            NotOwner => "NOT_OWNER",
            EmptyContent => "EMPTY_CONTENT",
            InvalidParent => "INVALID_PARENT",
            MissingViewer => "MISSING_VIEWER",
            CategoryRequired => "CATEGORY_REQUIRED",
            UnknownTag(_) => "UNKNOWN_TAG",
            PathError(404, _) => "NOT_FOUND",
            PathError(405, _) => "METHOD_NOT_ALLOWED",
            PathError(500, _) => "INTERNAL_ERROR",
            BadRequest(_) | PathError(..) | QueryRejection(_) | JsonRejection(_) => "BAD_REQUEST",
            ValidationError(_) => "VALIDATION_ERROR",
            Sqlx(_) | Anyhow(_) => "STORAGE_ERROR",
        }
    }

    fn code(&self) -> u16 {
        use ApiError::*;

        match self {
            PathError(code, _) => *code,
            Sqlx(sqlx::Error::Database(dbe)) => match dbe.kind() {
                DbErrorKind::UniqueViolation => 409,
                DbErrorKind::ForeignKeyViolation
                | DbErrorKind::NotNullViolation
                | DbErrorKind::CheckViolation => 400,
                _ => 500,
            },
            _ => match self.kind() {
                ErrorKind::NotFound => 404,
                ErrorKind::NotOwner => 403,
                ErrorKind::InvalidInput => 400,
                ErrorKind::Storage => 500,
            },
        }
    }

    pub fn message(&self) -> String {
        use ApiError::*;

        match self {
            PostNotFound => "post not found".to_string(),
            CommentNotFound => "comment not found".to_string(),
            AuthorNotFound => "author not found".to_string(),
            UserNotFound => "user not found".to_string(),
            MediaNotFound => "media not found".to_string(),
            NotOwner => "only the author may modify this content".to_string(),
            EmptyContent => "content can not be empty".to_string(),
            InvalidParent => "parent comment does not belong to this post".to_string(),
            MissingViewer => "a viewer is required for this feed".to_string(),
            CategoryRequired => "categoryPath is required".to_string(),
            UnknownTag(name) => format!("unknown tag: {name}"),
            BadRequest(msg) => msg.clone(),
            PathError(_, msg) => msg.clone(),
            QueryRejection(error) => error.body_text(),
            JsonRejection(error) => error.body_text(),
            ValidationError(err) => err.to_string().replace('\n', "; "),
            Sqlx(err) => root_cause(err),
            Anyhow(err) => err.root_cause().to_string(),
        }
    }
}

// Only the innermost message is exposed, never the chain.
fn root_cause(err: &(dyn Error + 'static)) -> String {
    let mut cause = err;
    while let Some(source) = cause.source() {
        cause = source;
    }
    cause.to_string()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.kind() == ErrorKind::Storage {
            tracing::error!("storage error: {:?}", self);
        }

        let code = self.code();
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (
            status,
            Json(ErrorMessage {
                success: false,
                code,
                error: self.error_code().to_string(),
                message: Some(self.message()),
            }),
        )
            .into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl Error for ApiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        use ApiError::*;
        match self {
            QueryRejection(err) => Some(err),
            JsonRejection(err) => Some(err),
            ValidationError(err) => Some(err),
            Sqlx(err) => Some(err),
            Anyhow(err) => err.source(),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Sqlx(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Anyhow(err)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::QueryRejection(rejection)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::JsonRejection(rejection)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        ApiError::ValidationError(err)
    }
}

pub fn bad_request(msg: &str) -> ApiError {
    ApiError::BadRequest(msg.to_string())
}
