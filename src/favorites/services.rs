use tracing::{info, warn};
use uuid::Uuid;

use crate::db::StoreError;
use crate::error::AppError;
use crate::favorites::dto::RemovedResponse;
use crate::favorites::repo_types::{Favorite, NewFavorite};
use crate::state::AppState;

pub async fn add_favorite(
    st: &AppState,
    user_id: Uuid,
    imdb_id: &str,
    title: &str,
    poster: &str,
) -> Result<Favorite, AppError> {
    let new = NewFavorite {
        user_id,
        imdb_id,
        title,
        poster,
    };
    match st.favorites.insert(new).await {
        Ok(favorite) => {
            info!(%user_id, imdb_id, "favorite added");
            Ok(favorite)
        }
        Err(StoreError::UniqueViolation) => {
            warn!(%user_id, imdb_id, "favorite already present");
            Err(AppError::AlreadyFavorited)
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn remove_favorite(
    st: &AppState,
    user_id: Uuid,
    imdb_id: &str,
) -> Result<RemovedResponse, AppError> {
    let removed_count = st.favorites.delete(user_id, imdb_id).await?;
    info!(%user_id, imdb_id, removed_count, "favorite removed");
    Ok(RemovedResponse { removed_count })
}

pub async fn list_favorites(st: &AppState, user_id: Uuid) -> Result<Vec<Favorite>, AppError> {
    Ok(st.favorites.list_by_user(user_id).await?)
}

pub async fn clear_all(st: &AppState) -> Result<RemovedResponse, AppError> {
    let removed_count = st.favorites.delete_all().await?;
    warn!(removed_count, "all favorites cleared");
    Ok(RemovedResponse { removed_count })
}
