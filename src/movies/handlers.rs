use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::instrument;

use crate::{error::AppError, extract::ValidQuery, state::AppState};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub title: String,
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct DetailQuery {
    #[serde(default)]
    pub id: String,
}

pub fn movie_routes() -> Router<AppState> {
    Router::new()
        .route("/movies/search", get(search))
        .route("/movies/detail", get(detail))
}

#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    ValidQuery(q): ValidQuery<SearchQuery>,
) -> Result<Json<JsonValue>, AppError> {
    let title = q.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("title query parameter is required".into()));
    }
    if q.page == Some(0) {
        return Err(AppError::Validation("page starts at 1".into()));
    }
    Ok(Json(state.movies.search(title, q.page).await?))
}

#[instrument(skip(state))]
pub async fn detail(
    State(state): State<AppState>,
    ValidQuery(q): ValidQuery<DetailQuery>,
) -> Result<Json<JsonValue>, AppError> {
    let id = q.id.trim();
    if id.is_empty() {
        return Err(AppError::Validation("id query parameter is required".into()));
    }
    Ok(Json(state.movies.detail(id).await?))
}
