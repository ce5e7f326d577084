use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::StoreError;
use crate::favorites::repo_types::{Favorite, NewFavorite};

#[async_trait]
pub trait FavoriteRepo: Send + Sync {
    /// Fails with `StoreError::UniqueViolation` when the (user, imdb id) pair exists.
    async fn insert(&self, favorite: NewFavorite<'_>) -> Result<Favorite, StoreError>;

    /// Returns the number of rows removed, zero included.
    async fn delete(&self, user_id: Uuid, imdb_id: &str) -> Result<u64, StoreError>;

    /// Newest first.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Favorite>, StoreError>;

    async fn delete_all(&self) -> Result<u64, StoreError>;
}

#[derive(Clone)]
pub struct PgFavoriteRepo {
    db: PgPool,
}

impl PgFavoriteRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FavoriteRepo for PgFavoriteRepo {
    async fn insert(&self, favorite: NewFavorite<'_>) -> Result<Favorite, StoreError> {
        let row = sqlx::query_as::<_, Favorite>(
            r#"
            INSERT INTO favorites (user_id, imdb_id, title, poster)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, imdb_id, title, poster, created_at
            "#,
        )
        .bind(favorite.user_id)
        .bind(favorite.imdb_id)
        .bind(favorite.title)
        .bind(favorite.poster)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete(&self, user_id: Uuid, imdb_id: &str) -> Result<u64, StoreError> {
        let res = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND imdb_id = $2")
            .bind(user_id)
            .bind(imdb_id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Favorite>, StoreError> {
        let rows = sqlx::query_as::<_, Favorite>(
            r#"
            SELECT id, user_id, imdb_id, title, poster, created_at
              FROM favorites
             WHERE user_id = $1
             ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let res = sqlx::query("DELETE FROM favorites")
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }
}
