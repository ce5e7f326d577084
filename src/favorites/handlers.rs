use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::{AdminAccess, AuthUser},
    error::AppError,
    extract::{ValidJson, ValidQuery},
    favorites::{
        dto::{AddFavoriteRequest, RemoveFavoriteQuery, RemovedResponse},
        repo_types::Favorite,
        services,
    },
    state::AppState,
};

pub fn favorite_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/favorites",
            post(add_favorite).get(list_favorites).delete(remove_favorite),
        )
        .route("/favorites/clear-all", delete(clear_all))
}

#[instrument(skip_all, fields(user_id = %claims.sub, imdb_id = %payload.imdb_id))]
pub async fn add_favorite(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ValidJson(payload): ValidJson<AddFavoriteRequest>,
) -> Result<(StatusCode, Json<Favorite>), AppError> {
    if payload.imdb_id.trim().is_empty() {
        return Err(AppError::Validation("imdbID is required".into()));
    }
    let favorite = services::add_favorite(
        &state,
        claims.sub,
        payload.imdb_id.trim(),
        &payload.title,
        &payload.poster,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(favorite)))
}

#[instrument(skip_all, fields(user_id = %claims.sub, imdb_id = %q.imdb_id))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ValidQuery(q): ValidQuery<RemoveFavoriteQuery>,
) -> Result<Json<RemovedResponse>, AppError> {
    if q.imdb_id.trim().is_empty() {
        return Err(AppError::Validation("imdbID query parameter is required".into()));
    }
    let res = services::remove_favorite(&state, claims.sub, q.imdb_id.trim()).await?;
    Ok(Json(res))
}

#[instrument(skip_all, fields(user_id = %claims.sub))]
pub async fn list_favorites(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Vec<Favorite>>, AppError> {
    let items = services::list_favorites(&state, claims.sub).await?;
    Ok(Json(items))
}

#[instrument(skip_all)]
pub async fn clear_all(
    State(state): State<AppState>,
    _admin: AdminAccess,
) -> Result<Json<RemovedResponse>, AppError> {
    Ok(Json(services::clear_all(&state).await?))
}
