pub mod comment;
pub mod feed;
pub mod media;
pub mod post;
pub mod reaction;
pub mod search;
pub mod tag;
pub mod user;
