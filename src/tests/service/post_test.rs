#[cfg(test)]
mod tests {
    use crate::tests::common::{create_post, create_user, new_post, setup_db};
    use agora::model::comment::{Comment, CommentCreate};
    use agora::model::feed::Feed;
    use agora::model::media::{Media, MediaCreate, MediaKind};
    use agora::model::post::{Post, PostUpdate};
    use agora::model::tag::Taxonomy;
    use agora::service::reaction_service::Reactions;
    use agora::util::maybe::MaybeAbsent;

    #[tokio::test]
    async fn test_create_resolves_tags() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;

        let mut post = new_post(alice, "hello", "world", &["web", "Linux / Ubuntu"]);
        post.parent_tag = Some("Career".into());
        let created = Post::create(&db, &post).await.unwrap();
        assert_eq!(created.created_at, created.updated_at);

        let summary = Feed::post(&db, created.id, None).await.unwrap();
        assert_eq!(summary.child_tags, vec!["Web", "Linux / Ubuntu"]);
        assert_eq!(summary.parent_tags, vec!["Development", "Operating Systems", "Career"]);
        assert_eq!(summary.row.like_count, 0);
        assert_eq!(summary.row.comment_count, 0);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;

        let err = Post::create(&db, &new_post(alice, "hello", "world", &["Rust"])).await.unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_TAG");

        let err = Post::create(&db, &new_post(alice, "  ", "world", &["Web"])).await.unwrap_err();
        assert_eq!(err.error_code(), "EMPTY_CONTENT");

        let err = Post::create(&db, &new_post(999, "hello", "world", &["Web"])).await.unwrap_err();
        assert_eq!(err.error_code(), "AUTHOR_NOT_FOUND");

        let err = Post::create(&db, &new_post(alice, "hello", "world", &[])).await.unwrap_err();
        assert_eq!(err.error_code(), "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_update_by_author_only() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;
        let id = create_post(&db, alice, "hello", &["Web"]).await;

        let update = PostUpdate {
            author_id: bob,
            title: MaybeAbsent::Present("stolen".into()),
            ..Default::default()
        };
        let err = Post::update(&db, id, &update).await.unwrap_err();
        assert_eq!(err.error_code(), "NOT_OWNER");

        let update = PostUpdate {
            author_id: alice,
            title: MaybeAbsent::Present("renamed".into()),
            child_tags: MaybeAbsent::Present(vec!["IT Jobs".into()]),
            ..Default::default()
        };
        Post::update(&db, id, &update).await.unwrap();

        let summary = Feed::post(&db, id, None).await.unwrap();
        assert_eq!(summary.row.title, "renamed");
        assert_eq!(summary.row.body, "body of hello");
        assert_eq!(summary.child_tags, vec!["IT Jobs"]);
        assert_eq!(summary.parent_tags, vec!["Career"]);

        let err = Post::update(&db, 999, &update).await.unwrap_err();
        assert_eq!(err.error_code(), "POST_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_update_parent_keeps_children() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;
        let id = create_post(&db, alice, "hello", &["Web"]).await;

        let update = PostUpdate {
            author_id: alice,
            parent_tag: MaybeAbsent::Present(Some("General".into())),
            ..Default::default()
        };
        Post::update(&db, id, &update).await.unwrap();

        let summary = Feed::post(&db, id, None).await.unwrap();
        assert_eq!(summary.child_tags, vec!["Web"]);
        assert_eq!(summary.parent_tags, vec!["Development", "General"]);
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;
        let id = create_post(&db, alice, "hello", &["Web"]).await;

        Reactions::like_post(&db, id, bob).await.unwrap();
        Reactions::save_post(&db, id, bob).await.unwrap();
        let comment = CommentCreate {
            post_id: id,
            author_id: bob,
            parent_comment_id: None,
            content: "nice".into(),
        };
        let comment_id = Comment::add(&db, &comment).await.unwrap().id;

        let err = Post::delete(&db, id, bob).await.unwrap_err();
        assert_eq!(err.error_code(), "NOT_OWNER");

        Post::delete(&db, id, alice).await.unwrap();

        assert!(!Post::exists(&db, id).await.unwrap());
        assert!(Comment::find(&db, comment_id).await.unwrap().is_none());
        assert_eq!(Reactions::count_saved(&db, bob).await.unwrap(), 0);

        let tag_links = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM post_child_tags WHERE post_id = ?")
            .bind(id)
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(tag_links, 0);
    }

    #[tokio::test]
    async fn test_media_is_author_only() {
        let db = setup_db().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;
        let id = create_post(&db, alice, "hello", &["Web"]).await;

        let mut media = MediaCreate {
            author_id: bob,
            kind: MediaKind::Image,
            binary_ref: "blob/1".into(),
            mime_type: "image/png".into(),
            display_name: "cat.png".into(),
            size_bytes: 42,
        };
        let err = Media::attach(&db, id, &media).await.unwrap_err();
        assert_eq!(err.error_code(), "NOT_OWNER");

        media.author_id = alice;
        let media_id = Media::attach(&db, id, &media).await.unwrap();

        let kind = sqlx::query_scalar::<_, MediaKind>("SELECT kind FROM post_media WHERE id = ?")
            .bind(media_id)
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(kind, MediaKind::Image);

        let summary = Feed::post(&db, id, None).await.unwrap();
        assert_eq!(summary.images.len(), 1);
        assert_eq!(summary.images[0].name, "cat.png");
        assert_eq!(summary.images[0].mime_type, "image/png");

        let err = Media::detach(&db, media_id, bob).await.unwrap_err();
        assert_eq!(err.error_code(), "NOT_OWNER");

        Media::detach(&db, media_id, alice).await.unwrap();
        assert!(Feed::post(&db, id, None).await.unwrap().images.is_empty());

        let err = Media::detach(&db, media_id, alice).await.unwrap_err();
        assert_eq!(err.error_code(), "MEDIA_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_seed_taxonomy() {
        let db = setup_db().await;
        let mut conn = db.acquire().await.unwrap();
        let tree = Taxonomy::load(&mut conn).await.unwrap().into_tree();

        let codes: Vec<&str> = tree.iter().map(|n| n.parent.code.as_str()).collect();
        assert_eq!(codes, vec!["dev", "os", "security", "resources", "career", "general"]);
        assert!(tree.iter().all(|n| !n.children.is_empty()));
    }

    #[tokio::test]
    async fn test_comment_count_of_missing_post() {
        let db = setup_db().await;
        let err = Post::get_comment_count(&db, 1).await.unwrap_err();
        assert_eq!(err.error_code(), "POST_NOT_FOUND");
    }
}
