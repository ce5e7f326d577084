use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct AddFavoriteRequest {
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
    pub title: String,
    pub poster: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveFavoriteQuery {
    #[serde(rename = "imdbID", default)]
    pub imdb_id: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemovedResponse {
    pub removed_count: u64,
}
