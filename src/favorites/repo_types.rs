use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Favorite movie record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
    pub title: String,
    pub poster: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy)]
pub struct NewFavorite<'a> {
    pub user_id: Uuid,
    pub imdb_id: &'a str,
    pub title: &'a str,
    pub poster: &'a str,
}
