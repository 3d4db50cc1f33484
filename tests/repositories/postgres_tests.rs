//! Counter deltas of the PostgreSQL repositories

use pretty_assertions::assert_eq;
use sqlx::PgPool;

use social_api::domain::{
    Comment, CommentRepository, Follow, FollowRepository, FollowStatus, Post, PostRepository, User,
    UserRepository,
};
use social_api::infrastructure::repositories::{
    PgCommentRepository, PgFollowRepository, PgPostRepository, PgUserRepository,
};

async fn seed_user(pool: &PgPool, id: i64) -> User {
    PgUserRepository::new(pool.clone())
        .create(&User::new(
            id,
            format!("user{id}"),
            format!("user{id}@example.com"),
            "not-a-real-hash".into(),
        ))
        .await
        .unwrap()
}

async fn seed_post(pool: &PgPool, id: i64, author: i64) -> Post {
    PgPostRepository::new(pool.clone())
        .create(&Post::new(id, author), &[])
        .await
        .unwrap()
}

async fn reload_user(pool: &PgPool, id: i64) -> User {
    PgUserRepository::new(pool.clone()).find_by_id(id).await.unwrap().unwrap()
}

async fn reload_post(pool: &PgPool, id: i64) -> Post {
    PgPostRepository::new(pool.clone()).find_by_id(id).await.unwrap().unwrap()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_like_and_unlike_move_likes_count_once(pool: PgPool) {
    seed_user(&pool, 1).await;
    seed_user(&pool, 2).await;
    seed_post(&pool, 100, 1).await;
    let posts = PgPostRepository::new(pool.clone());

    assert!(posts.add_like(100, 2).await.unwrap());
    assert!(!posts.add_like(100, 2).await.unwrap());
    assert_eq!(reload_post(&pool, 100).await.likes_count, 1);

    assert!(posts.remove_like(100, 2).await.unwrap());
    assert!(!posts.remove_like(100, 2).await.unwrap());
    assert_eq!(reload_post(&pool, 100).await.likes_count, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_comment_delete_removes_replies_from_count(pool: PgPool) {
    seed_user(&pool, 1).await;
    seed_post(&pool, 100, 1).await;
    let comments = PgCommentRepository::new(pool.clone());

    comments.create(&Comment::new(10, 100, 1, None, "top".into())).await.unwrap();
    comments.create(&Comment::new(11, 100, 1, Some(10), "reply a".into())).await.unwrap();
    comments.create(&Comment::new(12, 100, 1, Some(10), "reply b".into())).await.unwrap();
    comments.create(&Comment::new(13, 100, 1, None, "other".into())).await.unwrap();
    assert_eq!(reload_post(&pool, 100).await.comments_count, 4);

    assert_eq!(comments.delete(10).await.unwrap(), 3);
    assert_eq!(reload_post(&pool, 100).await.comments_count, 1);
    assert!(comments.find_by_id(11).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_follow_request_counts_only_once_accepted(pool: PgPool) {
    seed_user(&pool, 1).await;
    seed_user(&pool, 2).await;
    let follows = PgFollowRepository::new(pool.clone());

    follows.create(&Follow::new(1, 2, FollowStatus::Pending)).await.unwrap();
    assert_eq!(reload_user(&pool, 2).await.followers_count, 0);

    let accepted = follows.accept(1, 2).await.unwrap().unwrap();
    assert!(accepted.is_accepted());
    assert!(follows.accept(1, 2).await.unwrap().is_none());
    assert_eq!(reload_user(&pool, 1).await.following_count, 1);
    assert_eq!(reload_user(&pool, 2).await.followers_count, 1);

    follows.delete(1, 2).await.unwrap();
    assert_eq!(reload_user(&pool, 1).await.following_count, 0);
    assert_eq!(reload_user(&pool, 2).await.followers_count, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_posts_count_follows_create_and_delete(pool: PgPool) {
    seed_user(&pool, 1).await;
    seed_post(&pool, 100, 1).await;
    seed_post(&pool, 101, 1).await;
    assert_eq!(reload_user(&pool, 1).await.posts_count, 2);

    PgPostRepository::new(pool.clone()).delete(100).await.unwrap();
    assert_eq!(reload_user(&pool, 1).await.posts_count, 1);
}
