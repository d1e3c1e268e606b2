use agora::config::db::DB;
use agora::model::post::{Post, PostCreate};
use agora::model::user::User;

/// A fresh in-memory database with migrations and the seed taxonomy applied.
pub async fn setup_db() -> DB {
    let db = DB::in_memory().await.unwrap();
    db.migrate().await.unwrap();
    db
}

pub async fn create_user(db: &DB, name: &str) -> i64 {
    User::create(db, name, None).await.unwrap().id
}

pub fn new_post(author_id: i64, title: &str, body: &str, child_tags: &[&str]) -> PostCreate {
    PostCreate {
        author_id,
        title: title.to_string(),
        body: body.to_string(),
        parent_tag: None,
        child_tags: child_tags.iter().map(|t| t.to_string()).collect(),
    }
}

pub async fn create_post(db: &DB, author_id: i64, title: &str, child_tags: &[&str]) -> i64 {
    let post = new_post(author_id, title, &format!("body of {title}"), child_tags);
    Post::create(db, &post).await.unwrap().id
}
