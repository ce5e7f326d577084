use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};
use crate::db::StoreError;

/// Persistence operations the auth flow needs from the credential store.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Fails with `StoreError::UniqueViolation` when the email is taken.
    async fn create(&self, user: NewUser<'_>) -> Result<User, StoreError>;

    /// Overwrites any token already stored for the user.
    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires: OffsetDateTime,
    ) -> Result<(), StoreError>;

    /// Swaps in `password_hash` and clears the token pair, but only for a user
    /// whose token equals `token` and expires after `now`. Returns the id of the
    /// updated user, or `None` when nothing matched.
    async fn consume_reset_token(
        &self,
        token: &str,
        now: OffsetDateTime,
        password_hash: &str,
    ) -> Result<Option<Uuid>, StoreError>;
}

const USER_COLUMNS: &str =
    "id, email, password_hash, name, reset_token, reset_token_expires, created_at";

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, user: NewUser<'_>) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, name)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.name)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires: OffsetDateTime,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE users
               SET reset_token = $2, reset_token_expires = $3
             WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        now: OffsetDateTime,
        password_hash: &str,
    ) -> Result<Option<Uuid>, StoreError> {
        // Single statement: the match and the clear cannot interleave with
        // another reset of the same token.
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE users
               SET password_hash = $3, reset_token = NULL, reset_token_expires = NULL
             WHERE reset_token = $1 AND reset_token_expires > $2
            RETURNING id
            "#,
        )
        .bind(token)
        .bind(now)
        .bind(password_hash)
        .fetch_optional(&self.db)
        .await?;
        Ok(id)
    }
}
