use async_trait::async_trait;
use chrono::Utc;

use super::{newest_first, MemoryStore, Tables};
use crate::domain::{Page, Pagination, Post, PostRepository, User};
use crate::shared::error::AppError;

pub struct MemoryPostRepository {
    store: MemoryStore,
}

impl MemoryPostRepository {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }

    fn select(
        &self,
        pagination: Pagination,
        filter: impl Fn(&Tables, &Post) -> bool,
        by_likes: bool,
    ) -> Page<Post> {
        let tables = self.store.tables().read();
        let mut posts: Vec<Post> = tables
            .posts
            .values()
            .filter(|p| filter(&*tables, p))
            .cloned()
            .collect();
        if by_likes {
            posts.sort_by(|a, b| {
                b.likes_count
                    .cmp(&a.likes_count)
                    .then(b.created_at.cmp(&a.created_at))
                    .then(b.id.cmp(&a.id))
            });
        } else {
            newest_first(&mut posts, |p| (p.created_at, p.id));
        }
        Page::from_vec(posts, pagination)
    }
}

#[async_trait]
impl PostRepository for MemoryPostRepository {
    async fn create(&self, post: &Post, hashtags: &[String]) -> Result<Post, AppError> {
        let mut tables = self.store.tables().write();
        tables.posts.insert(post.id, post.clone());
        tables.link_hashtags(post.id, hashtags);
        if let Some(author) = tables.users.get_mut(&post.user_id) {
            author.posts_count += 1;
        }
        Ok(post.clone())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, AppError> {
        Ok(self.store.tables().read().posts.get(&id).cloned())
    }

    async fn update(&self, post: &Post, hashtags: Option<&[String]>) -> Result<Post, AppError> {
        let mut tables = self.store.tables().write();
        let updated = {
            let stored = tables
                .posts
                .get_mut(&post.id)
                .ok_or_else(|| AppError::not_found("POST_NOT_FOUND", "Post not found"))?;
            stored.caption = post.caption.clone();
            stored.location = post.location.clone();
            stored.likes_enabled = post.likes_enabled;
            stored.comments_enabled = post.comments_enabled;
            stored.is_archived = post.is_archived;
            stored.updated_at = Utc::now();
            stored.clone()
        };
        if let Some(hashtags) = hashtags {
            tables.unlink_hashtags(post.id);
            tables.link_hashtags(post.id, hashtags);
        }
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<Option<Post>, AppError> {
        let mut tables = self.store.tables().write();
        let Some(post) = tables.posts.remove(&id) else {
            return Ok(None);
        };
        tables.unlink_hashtags(id);
        tables.likes.retain(|(post_id, _), _| *post_id != id);
        let top_level: Vec<i64> = tables
            .comments
            .values()
            .filter(|c| c.post_id == id && c.parent_id.is_none())
            .map(|c| c.id)
            .collect();
        for comment_id in top_level {
            tables.remove_comment_tree(comment_id);
        }
        if let Some(author) = tables.users.get_mut(&post.user_id) {
            author.posts_count -= 1;
        }
        Ok(Some(post))
    }

    async fn find_by_user(
        &self,
        user_id: i64,
        archived: bool,
        pagination: Pagination,
    ) -> Result<Page<Post>, AppError> {
        Ok(self.select(
            pagination,
            |_, p| p.user_id == user_id && p.is_archived == archived,
            false,
        ))
    }

    async fn feed(&self, author_ids: &[i64], pagination: Pagination) -> Result<Page<Post>, AppError> {
        Ok(self.select(
            pagination,
            |_, p| !p.is_archived && author_ids.contains(&p.user_id),
            false,
        ))
    }

    async fn explore(&self, exclude_user: Option<i64>, pagination: Pagination) -> Result<Page<Post>, AppError> {
        Ok(self.select(
            pagination,
            |tables, p| {
                !p.is_archived && !tables.user_is_private(p.user_id) && Some(p.user_id) != exclude_user
            },
            true,
        ))
    }

    async fn find_by_hashtag(&self, tag: &str, pagination: Pagination) -> Result<Page<Post>, AppError> {
        Ok(self.select(
            pagination,
            |tables, p| {
                !p.is_archived
                    && !tables.user_is_private(p.user_id)
                    && tables.post_hashtags.contains(&(p.id, tag.to_string()))
            },
            false,
        ))
    }

    async fn add_like(&self, post_id: i64, user_id: i64) -> Result<bool, AppError> {
        let mut tables = self.store.tables().write();
        if tables.likes.contains_key(&(post_id, user_id)) {
            return Ok(false);
        }
        let Some(post) = tables.posts.get_mut(&post_id) else {
            return Err(AppError::not_found("POST_NOT_FOUND", "Post not found"));
        };
        post.likes_count += 1;
        tables.likes.insert((post_id, user_id), Utc::now());
        Ok(true)
    }

    async fn remove_like(&self, post_id: i64, user_id: i64) -> Result<bool, AppError> {
        let mut tables = self.store.tables().write();
        if tables.likes.remove(&(post_id, user_id)).is_none() {
            return Ok(false);
        }
        if let Some(post) = tables.posts.get_mut(&post_id) {
            post.likes_count -= 1;
        }
        Ok(true)
    }

    async fn has_liked(&self, post_id: i64, user_id: i64) -> Result<bool, AppError> {
        Ok(self.store.tables().read().likes.contains_key(&(post_id, user_id)))
    }

    async fn liked_post_ids(&self, user_id: i64, post_ids: &[i64]) -> Result<Vec<i64>, AppError> {
        let tables = self.store.tables().read();
        Ok(post_ids
            .iter()
            .copied()
            .filter(|post_id| tables.likes.contains_key(&(*post_id, user_id)))
            .collect())
    }

    async fn likers(&self, post_id: i64, pagination: Pagination) -> Result<Page<User>, AppError> {
        let tables = self.store.tables().read();
        let mut likes: Vec<(i64, chrono::DateTime<Utc>)> = tables
            .likes
            .iter()
            .filter(|((p, _), _)| *p == post_id)
            .map(|((_, user_id), at)| (*user_id, *at))
            .collect();
        newest_first(&mut likes, |(user_id, at)| (*at, *user_id));
        let users = likes
            .into_iter()
            .filter_map(|(user_id, _)| tables.users.get(&user_id).cloned())
            .collect();
        Ok(Page::from_vec(users, pagination))
    }
}
