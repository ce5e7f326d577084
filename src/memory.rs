//! In-process credential store.
//!
//! Backs the service when no `DATABASE_URL` is configured and in tests. It
//! enforces the same uniqueness rules as the Postgres schema and reports them
//! with the same `StoreError::UniqueViolation`.

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::repo::UserRepo;
use crate::auth::repo_types::{NewUser, User};
use crate::db::StoreError;
use crate::favorites::repo::FavoriteRepo;
use crate::favorites::repo_types::{Favorite, NewFavorite};

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
    favorites: Mutex<Vec<Favorite>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn create(&self, user: NewUser<'_>) -> Result<User, StoreError> {
        let mut users = self.users.lock().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation);
        }
        let row = User {
            id: Uuid::new_v4(),
            email: user.email.to_string(),
            password_hash: user.password_hash.to_string(),
            name: user.name.map(str::to_string),
            reset_token: None,
            reset_token_expires: None,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(row.clone());
        Ok(row)
    }

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires: OffsetDateTime,
    ) -> Result<(), StoreError> {
        let mut users = self.users.lock().await;
        if let Some(user) = users.iter_mut().find(|u| u.id == user_id) {
            user.reset_token = Some(token.to_string());
            user.reset_token_expires = Some(expires);
        }
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        now: OffsetDateTime,
        password_hash: &str,
    ) -> Result<Option<Uuid>, StoreError> {
        let mut users = self.users.lock().await;
        let matched = users.iter_mut().find(|u| {
            u.reset_token.as_deref() == Some(token)
                && u.reset_token_expires.is_some_and(|exp| exp > now)
        });
        Ok(matched.map(|user| {
            user.password_hash = password_hash.to_string();
            user.reset_token = None;
            user.reset_token_expires = None;
            user.id
        }))
    }
}

#[async_trait]
impl FavoriteRepo for MemoryStore {
    async fn insert(&self, favorite: NewFavorite<'_>) -> Result<Favorite, StoreError> {
        let mut favorites = self.favorites.lock().await;
        if favorites
            .iter()
            .any(|f| f.user_id == favorite.user_id && f.imdb_id == favorite.imdb_id)
        {
            return Err(StoreError::UniqueViolation);
        }
        let row = Favorite {
            id: Uuid::new_v4(),
            user_id: favorite.user_id,
            imdb_id: favorite.imdb_id.to_string(),
            title: favorite.title.to_string(),
            poster: favorite.poster.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        favorites.push(row.clone());
        Ok(row)
    }

    async fn delete(&self, user_id: Uuid, imdb_id: &str) -> Result<u64, StoreError> {
        let mut favorites = self.favorites.lock().await;
        let before = favorites.len();
        favorites.retain(|f| !(f.user_id == user_id && f.imdb_id == imdb_id));
        Ok((before - favorites.len()) as u64)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Favorite>, StoreError> {
        let favorites = self.favorites.lock().await;
        // Reverse insertion order first so equal timestamps still list newest first.
        let mut rows: Vec<Favorite> = favorites
            .iter()
            .rev()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let mut favorites = self.favorites.lock().await;
        let removed = favorites.len() as u64;
        favorites.clear();
        Ok(removed)
    }
}
