#[cfg(test)]
mod tests {
    use crate::tests::common::{create_post, create_user, new_post, setup_db};
    use agora::config::db::DB;
    use agora::model::feed::{Feed, FeedMode, FeedRequest};
    use agora::model::media::{Media, MediaCreate, MediaKind};
    use agora::model::post::{Post, PostSummary, PostUpdate};
    use agora::model::search::SearchHistory;
    use agora::service::reaction_service::Reactions;
    use agora::util::maybe::MaybeAbsent;
    use std::time::Duration;

    async fn feed(db: &DB, req: FeedRequest) -> Vec<PostSummary> {
        Feed::get(db, &req).await.unwrap()
    }

    fn ids(posts: &[PostSummary]) -> Vec<i64> {
        posts.iter().map(|p| p.row.id).collect()
    }

    async fn set_counters(db: &DB, post_id: i64, likes: i64, comments: i64) {
        sqlx::query("UPDATE posts SET like_count = ?, comment_count = ? WHERE id = ?")
            .bind(likes)
            .bind(comments)
            .bind(post_id)
            .execute(&db.pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_home_is_newest_first_and_pages() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;

        let p1 = create_post(&db, alice, "first", &["Web"]).await;
        let p2 = create_post(&db, alice, "second", &["Web"]).await;
        let p3 = create_post(&db, alice, "third", &["Web"]).await;

        let posts = feed(&db, FeedRequest::new(FeedMode::Home)).await;
        assert_eq!(ids(&posts), vec![p3, p2, p1]);

        let posts = feed(&db, FeedRequest::new(FeedMode::Home).page(1, 1)).await;
        assert_eq!(ids(&posts), vec![p2]);

        let posts = feed(&db, FeedRequest::new(FeedMode::Home).page(10, 3)).await;
        assert!(posts.is_empty());

        assert_eq!(Feed::count(&db, &FeedMode::Home, None).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_popular_uses_three_keys() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;

        let a = create_post(&db, alice, "a", &["Web"]).await;
        let b = create_post(&db, alice, "b", &["Web"]).await;
        let c = create_post(&db, alice, "c", &["Web"]).await;

        set_counters(&db, a, 5, 2).await;
        set_counters(&db, b, 5, 1).await;
        set_counters(&db, c, 3, 9).await;

        let posts = feed(&db, FeedRequest::new(FeedMode::Popular)).await;
        assert_eq!(ids(&posts), vec![a, b, c]);
    }

    #[tokio::test]
    async fn test_category_or_semantics() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;

        let both = create_post(&db, alice, "web and mobile", &["Web", "Mobile"]).await;
        let web = create_post(&db, alice, "web only", &["Web"]).await;
        let linux = create_post(&db, alice, "linux", &["Linux / Ubuntu"]).await;

        let posts = feed(&db, FeedRequest::new(FeedMode::Category("/dev".into()))).await;
        assert_eq!(ids(&posts), vec![web, both]);

        let posts = feed(&db, FeedRequest::new(FeedMode::Category("/dev/mobile".into()))).await;
        assert_eq!(ids(&posts), vec![both]);

        let posts = feed(&db, FeedRequest::new(FeedMode::Category("Linux / Ubuntu".into()))).await;
        assert_eq!(ids(&posts), vec![linux]);

        let posts = feed(&db, FeedRequest::new(FeedMode::Category("/os".into()))).await;
        assert_eq!(ids(&posts), vec![linux]);

        let count = Feed::count(&db, &FeedMode::Category("/dev".into()), None).await.unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_unknown_category_is_empty() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;
        create_post(&db, alice, "hello", &["Web"]).await;

        let posts = feed(&db, FeedRequest::new(FeedMode::Category("/unknown/path".into()))).await;
        assert!(posts.is_empty());

        let count = Feed::count(&db, &FeedMode::Category("nothing".into()), None).await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_category_keywords() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;
        let p1 = create_post(&db, alice, "one", &["Web"]).await;
        let p2 = create_post(&db, alice, "two", &["Web"]).await;
        set_counters(&db, p1, 3, 0).await;

        let posts = feed(&db, FeedRequest::new(FeedMode::Category("".into()))).await;
        assert_eq!(ids(&posts), vec![p2, p1]);

        let posts = feed(&db, FeedRequest::new(FeedMode::Category("/popular".into()))).await;
        assert_eq!(ids(&posts), vec![p1, p2]);

        let err = Feed::get(&db, &FeedRequest::new(FeedMode::Category("saved".into())))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "MISSING_VIEWER");
    }

    #[tokio::test]
    async fn test_search_matches_any_field() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;

        let by_title = create_post(&db, alice, "Learning RUST the hard way", &["Web"]).await;
        let by_body = Post::create(&db, &new_post(alice, "notes", "some rust snippets", &["Data"]))
            .await
            .unwrap()
            .id;
        let by_child_tag = create_post(&db, alice, "kernel", &["Linux / Ubuntu"]).await;
        let by_parent_tag = create_post(&db, alice, "jobs", &["IT Jobs"]).await;

        let posts = feed(&db, FeedRequest::new(FeedMode::Search("rust".into()))).await;
        assert_eq!(ids(&posts), vec![by_body, by_title]);

        let posts = feed(&db, FeedRequest::new(FeedMode::Search("ubuntu".into()))).await;
        assert_eq!(ids(&posts), vec![by_child_tag]);

        let posts = feed(&db, FeedRequest::new(FeedMode::Search("career".into()))).await;
        assert_eq!(ids(&posts), vec![by_parent_tag]);

        // LIKE wildcards in the keyword are literal
        let posts = feed(&db, FeedRequest::new(FeedMode::Search("%".into()))).await;
        assert!(posts.is_empty());

        let count = Feed::count(&db, &FeedMode::Search("RUST".into()), None).await.unwrap();
        assert_eq!(count, 2);

        // case folds beyond ASCII on both sides
        let vietnamese = create_post(&db, alice, "Học LẬP TRÌNH nhúng", &["Web"]).await;
        let german = Post::create(&db, &new_post(alice, "reise", "Über die Straße", &["Web"]))
            .await
            .unwrap()
            .id;
        for keyword in ["lập trình", "LẬP TRÌNH", "Lập Trình"] {
            let posts = feed(&db, FeedRequest::new(FeedMode::Search(keyword.into()))).await;
            assert_eq!(ids(&posts), vec![vietnamese], "keyword {keyword:?}");
        }
        for keyword in ["über", "ÜBER", "straße"] {
            let posts = feed(&db, FeedRequest::new(FeedMode::Search(keyword.into()))).await;
            assert_eq!(ids(&posts), vec![german], "keyword {keyword:?}");
        }
    }

    #[tokio::test]
    async fn test_search_sees_updated_text() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;
        let id = create_post(&db, alice, "draft", &["Web"]).await;

        let update = PostUpdate {
            author_id: alice,
            title: MaybeAbsent::Present("Đường ĐI".into()),
            ..Default::default()
        };
        Post::update(&db, id, &update).await.unwrap();

        let posts = feed(&db, FeedRequest::new(FeedMode::Search("đường đi".into()))).await;
        assert_eq!(ids(&posts), vec![id]);
        let posts = feed(&db, FeedRequest::new(FeedMode::Search("draft".into()))).await;
        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn test_recommended_folds_tracked_keywords() {
        let db = setup_db().await;
        let author = create_user(&db, "author").await;
        let viewer = create_user(&db, "viewer").await;

        let matching = create_post(&db, author, "Đà Nẵng meetup", &["Web"]).await;
        let other = create_post(&db, author, "unrelated", &["Web"]).await;
        set_counters(&db, other, 9, 0).await;

        SearchHistory::track(&db, viewer, "ĐÀ NẴNG").await.unwrap();

        let req = FeedRequest::new(FeedMode::Recommended).viewer(Some(viewer));
        assert_eq!(ids(&feed(&db, req).await), vec![matching]);
    }

    #[tokio::test]
    async fn test_search_is_tracked_for_viewer() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;
        create_post(&db, alice, "rust", &["Web"]).await;

        let req = FeedRequest::new(FeedMode::Search("  Rust ".into())).viewer(Some(alice));
        feed(&db, req).await;

        let mut history = vec![];
        for _ in 0..50 {
            history = SearchHistory::list(&db, alice).await.unwrap();
            if !history.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].keyword, "rust");
        assert_eq!(history[0].search_count, 1);
    }

    #[tokio::test]
    async fn test_saved_requires_viewer_and_orders_by_save_time() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;

        let older = create_post(&db, alice, "older", &["Web"]).await;
        let newer = create_post(&db, alice, "newer", &["Web"]).await;
        create_post(&db, alice, "unsaved", &["Web"]).await;

        let err = Feed::get(&db, &FeedRequest::new(FeedMode::Saved)).await.unwrap_err();
        assert_eq!(err.error_code(), "MISSING_VIEWER");

        Reactions::save_post(&db, newer, bob).await.unwrap();
        Reactions::save_post(&db, older, bob).await.unwrap();

        let posts = feed(&db, FeedRequest::new(FeedMode::Saved).viewer(Some(bob))).await;
        assert_eq!(ids(&posts), vec![older, newer]);
        assert!(posts.iter().all(|p| p.is_saved));

        assert_eq!(Feed::count(&db, &FeedMode::Saved, Some(bob)).await.unwrap(), 2);
        assert_eq!(Reactions::count_saved(&db, bob).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_recommended_is_capped() {
        let db = setup_db().await;
        let author = create_user(&db, "author").await;
        let viewer = create_user(&db, "viewer").await;

        for i in 0..8 {
            create_post(&db, author, &format!("rust tip {i}"), &["Web"]).await;
        }
        let own = create_post(&db, viewer, "my rust question", &["Web"]).await;

        // no history: popular with the cap
        let req = FeedRequest::new(FeedMode::Recommended).page(50, 0).viewer(Some(viewer));
        assert_eq!(feed(&db, req).await.len(), 5);

        SearchHistory::track(&db, viewer, "rust").await.unwrap();
        let req = FeedRequest::new(FeedMode::Recommended).page(50, 0).viewer(Some(viewer));
        let posts = feed(&db, req).await;
        assert_eq!(posts.len(), 5);
        assert!(!ids(&posts).contains(&own));

        let req = FeedRequest::new(FeedMode::Recommended).page(3, 0).viewer(Some(viewer));
        assert_eq!(feed(&db, req).await.len(), 3);

        // without a viewer it is plain popular and the cap does not apply
        let req = FeedRequest::new(FeedMode::Recommended).page(50, 0);
        assert_eq!(feed(&db, req).await.len(), 9);
    }

    #[tokio::test]
    async fn test_recommended_falls_back_to_popular() {
        let db = setup_db().await;
        let author = create_user(&db, "author").await;
        let viewer = create_user(&db, "viewer").await;

        let p1 = create_post(&db, author, "one", &["Web"]).await;
        let p2 = create_post(&db, author, "two", &["Web"]).await;
        set_counters(&db, p1, 4, 0).await;

        SearchHistory::track(&db, viewer, "nothing matches this").await.unwrap();

        let req = FeedRequest::new(FeedMode::Recommended).viewer(Some(viewer));
        assert_eq!(ids(&feed(&db, req).await), vec![p1, p2]);
    }

    #[tokio::test]
    async fn test_author_feed() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;

        let a1 = create_post(&db, alice, "a1", &["Web"]).await;
        create_post(&db, bob, "b1", &["Web"]).await;
        let a2 = create_post(&db, alice, "a2", &["Web"]).await;

        let posts = feed(&db, FeedRequest::new(FeedMode::Author(alice))).await;
        assert_eq!(ids(&posts), vec![a2, a1]);
        assert_eq!(posts[0].row.author_name.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_enrichment() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;

        let id = create_post(&db, alice, "enriched", &["Web", "IT Jobs"]).await;
        let other = create_post(&db, alice, "plain", &["Data"]).await;

        for (kind, name) in [(MediaKind::File, "b.pdf"), (MediaKind::Image, "a.png"), (MediaKind::Image, "c.png")] {
            let media = MediaCreate {
                author_id: alice,
                kind,
                binary_ref: format!("blob/{name}"),
                mime_type: "application/octet-stream".into(),
                display_name: name.into(),
                size_bytes: 10,
            };
            Media::attach(&db, id, &media).await.unwrap();
        }

        Reactions::like_post(&db, id, bob).await.unwrap();
        Reactions::save_post(&db, other, bob).await.unwrap();

        let posts = feed(&db, FeedRequest::new(FeedMode::Home).viewer(Some(bob))).await;
        let post = posts.iter().find(|p| p.row.id == id).unwrap();

        assert_eq!(post.child_tags, vec!["Web", "IT Jobs"]);
        assert_eq!(post.parent_tags, vec!["Development", "Career"]);
        let images: Vec<&str> = post.images.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(images, vec!["a.png", "c.png"]);
        assert_eq!(post.files.len(), 1);
        assert_eq!(post.row.like_count, 1);
        assert!(post.is_liked);
        assert!(!post.is_saved);

        let plain = posts.iter().find(|p| p.row.id == other).unwrap();
        assert!(!plain.is_liked);
        assert!(plain.is_saved);
        assert!(plain.images.is_empty());

        // no viewer, no flags
        let posts = feed(&db, FeedRequest::new(FeedMode::Home)).await;
        assert!(posts.iter().all(|p| !p.is_liked && !p.is_saved));

        let single = Feed::post(&db, id, Some(bob)).await.unwrap();
        assert!(single.is_liked);
        assert_eq!(single.child_tags.len(), 2);

        let err = Feed::post(&db, 999, None).await.unwrap_err();
        assert_eq!(err.error_code(), "POST_NOT_FOUND");
    }
}
