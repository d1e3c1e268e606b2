pub mod comment_service;
pub mod feed_service;
pub mod media_service;
pub mod post_service;
pub mod reaction_service;
pub mod search_service;
pub mod tag_service;
pub mod task_service;
pub mod user_service;
