use async_trait::async_trait;
use chrono::Utc;

use super::MemoryStore;
use crate::domain::{Page, Pagination, User, UserRepository};
use crate::shared::error::AppError;

pub struct MemoryUserRepository {
    store: MemoryStore,
}

impl MemoryUserRepository {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.store.tables().read().users.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[i64]) -> Result<Vec<User>, AppError> {
        let tables = self.store.tables().read();
        Ok(ids.iter().filter_map(|id| tables.users.get(id).cloned()).collect())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let tables = self.store.tables().read();
        Ok(tables
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let tables = self.store.tables().read();
        Ok(tables
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn create(&self, user: &User) -> Result<User, AppError> {
        let mut tables = self.store.tables().write();
        let taken = tables.users.values().any(|u| {
            u.email.eq_ignore_ascii_case(&user.email) || u.username.eq_ignore_ascii_case(&user.username)
        });
        if taken {
            return Err(AppError::bad_request(
                "USER_EXISTS",
                "User with this email or username already exists",
            ));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn update(&self, user: &User) -> Result<User, AppError> {
        let mut tables = self.store.tables().write();
        let stored = tables
            .users
            .get_mut(&user.id)
            .ok_or_else(|| AppError::not_found("USER_NOT_FOUND", "User not found"))?;

        stored.full_name = user.full_name.clone();
        stored.bio = user.bio.clone();
        stored.website = user.website.clone();
        stored.avatar_url = user.avatar_url.clone();
        stored.is_private = user.is_private;
        stored.password_hash = user.password_hash.clone();
        stored.updated_at = Utc::now();

        Ok(stored.clone())
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        Ok(self.find_by_email(email).await?.is_some())
    }

    async fn username_exists(&self, username: &str) -> Result<bool, AppError> {
        Ok(self.find_by_username(username).await?.is_some())
    }

    async fn search(&self, query: &str, pagination: Pagination) -> Result<Page<User>, AppError> {
        let needle = query.to_lowercase();
        let tables = self.store.tables().read();
        let mut matches: Vec<User> = tables
            .users
            .values()
            .filter(|u| {
                u.username.to_lowercase().contains(&needle)
                    || u.full_name
                        .as_deref()
                        .is_some_and(|name| name.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            b.followers_count
                .cmp(&a.followers_count)
                .then_with(|| a.username.cmp(&b.username))
        });
        Ok(Page::from_vec(matches, pagination))
    }
}
