pub mod comment_api;
pub mod post_api;
