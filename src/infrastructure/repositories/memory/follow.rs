use async_trait::async_trait;

use super::{MemoryStore, Tables};
use crate::domain::{Follow, FollowRepository, FollowStatus, Page, Pagination, User};
use crate::shared::error::AppError;

pub struct MemoryFollowRepository {
    store: MemoryStore,
}

impl MemoryFollowRepository {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }

    fn shift_counters(tables: &mut Tables, follower_id: i64, following_id: i64, delta: i64) {
        if let Some(follower) = tables.users.get_mut(&follower_id) {
            follower.following_count += delta;
        }
        if let Some(following) = tables.users.get_mut(&following_id) {
            following.followers_count += delta;
        }
    }

    /// Users on one side of matching edges, most recent edge first.
    fn edge_users(
        &self,
        pagination: Pagination,
        matches: impl Fn(&Follow) -> Option<i64>,
    ) -> Page<User> {
        let tables = self.store.tables().read();
        let mut edges: Vec<(&Follow, i64)> = tables
            .follows
            .values()
            .filter_map(|f| matches(f).map(|user_id| (f, user_id)))
            .collect();
        edges.sort_by(|a, b| b.0.created_at.cmp(&a.0.created_at).then(b.1.cmp(&a.1)));
        let users = edges
            .into_iter()
            .filter_map(|(_, user_id)| tables.users.get(&user_id).cloned())
            .collect();
        Page::from_vec(users, pagination)
    }
}

#[async_trait]
impl FollowRepository for MemoryFollowRepository {
    async fn find(&self, follower_id: i64, following_id: i64) -> Result<Option<Follow>, AppError> {
        Ok(self
            .store
            .tables()
            .read()
            .follows
            .get(&(follower_id, following_id))
            .cloned())
    }

    async fn create(&self, follow: &Follow) -> Result<Follow, AppError> {
        let mut tables = self.store.tables().write();
        let key = (follow.follower_id, follow.following_id);
        if tables.follows.contains_key(&key) {
            return Err(AppError::bad_request("ALREADY_FOLLOWING", "Already following this user"));
        }
        tables.follows.insert(key, follow.clone());
        if follow.is_accepted() {
            Self::shift_counters(&mut tables, follow.follower_id, follow.following_id, 1);
        }
        Ok(follow.clone())
    }

    async fn accept(&self, follower_id: i64, following_id: i64) -> Result<Option<Follow>, AppError> {
        let mut tables = self.store.tables().write();
        let accepted = match tables.follows.get_mut(&(follower_id, following_id)) {
            Some(follow) if follow.status == FollowStatus::Pending => {
                follow.status = FollowStatus::Accepted;
                follow.clone()
            }
            _ => return Ok(None),
        };
        Self::shift_counters(&mut tables, follower_id, following_id, 1);
        Ok(Some(accepted))
    }

    async fn delete(&self, follower_id: i64, following_id: i64) -> Result<Option<Follow>, AppError> {
        let mut tables = self.store.tables().write();
        let Some(follow) = tables.follows.remove(&(follower_id, following_id)) else {
            return Ok(None);
        };
        if follow.is_accepted() {
            Self::shift_counters(&mut tables, follower_id, following_id, -1);
        }
        Ok(Some(follow))
    }

    async fn followers(&self, user_id: i64, pagination: Pagination) -> Result<Page<User>, AppError> {
        Ok(self.edge_users(pagination, |f| {
            (f.following_id == user_id && f.is_accepted()).then_some(f.follower_id)
        }))
    }

    async fn following(&self, user_id: i64, pagination: Pagination) -> Result<Page<User>, AppError> {
        Ok(self.edge_users(pagination, |f| {
            (f.follower_id == user_id && f.is_accepted()).then_some(f.following_id)
        }))
    }

    async fn pending_requests(&self, user_id: i64, pagination: Pagination) -> Result<Page<User>, AppError> {
        Ok(self.edge_users(pagination, |f| {
            (f.following_id == user_id && !f.is_accepted()).then_some(f.follower_id)
        }))
    }

    async fn following_ids(&self, user_id: i64) -> Result<Vec<i64>, AppError> {
        let tables = self.store.tables().read();
        Ok(tables
            .follows
            .values()
            .filter(|f| f.follower_id == user_id && f.is_accepted())
            .map(|f| f.following_id)
            .collect())
    }
}
