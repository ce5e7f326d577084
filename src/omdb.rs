//! OMDb client.
//!
//! Search and detail lookups are forwarded to the OMDb HTTP API and the JSON
//! body is handed back untouched. Only the search path interprets the
//! `"Response": "False"` envelope, as a not-found.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::OmdbConfig;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Upstream answered but reported no result.
    #[error("{0}")]
    NotFound(String),
    /// Transport failure, non-success status or unreadable body.
    #[error("upstream request failed: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait MovieGateway: Send + Sync {
    async fn search(&self, title: &str, page: Option<u32>) -> Result<JsonValue, GatewayError>;
    async fn detail(&self, imdb_id: &str) -> Result<JsonValue, GatewayError>;
}

pub struct OmdbClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OmdbClient {
    pub fn new(cfg: &OmdbConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.base_url.clone(),
            api_key: cfg.api_key.clone(),
        })
    }

    async fn get(&self, params: &[(&str, String)]) -> Result<JsonValue, GatewayError> {
        let mut query: Vec<(&str, String)> = vec![("apikey", self.api_key.clone())];
        query.extend_from_slice(params);

        let response = self
            .http
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "omdb request failed");
                GatewayError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "omdb returned non-success status");
            return Err(GatewayError::Unavailable(format!("status {status}")));
        }

        response.json::<JsonValue>().await.map_err(|e| {
            warn!(error = %e, "omdb body is not json");
            GatewayError::Unavailable(e.to_string())
        })
    }
}

#[async_trait]
impl MovieGateway for OmdbClient {
    async fn search(&self, title: &str, page: Option<u32>) -> Result<JsonValue, GatewayError> {
        let mut params = vec![("s", title.to_string())];
        if let Some(page) = page {
            params.push(("page", page.to_string()));
        }
        let body = self.get(&params).await?;

        if body.get("Response").and_then(JsonValue::as_str) == Some("False") {
            let message = body
                .get("Error")
                .and_then(JsonValue::as_str)
                .unwrap_or("Movie not found!")
                .to_string();
            debug!(title, %message, "omdb search returned no results");
            return Err(GatewayError::NotFound(message));
        }
        Ok(body)
    }

    async fn detail(&self, imdb_id: &str) -> Result<JsonValue, GatewayError> {
        self.get(&[("i", imdb_id.to_string()), ("plot", "full".to_string())])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OmdbClient {
        OmdbClient::new(&OmdbConfig {
            api_key: "test-key".into(),
            base_url: format!("{}/", server.uri()),
        })
        .expect("client builds")
    }

    #[tokio::test]
    async fn search_passes_body_through() {
        let server = MockServer::start().await;
        let body = json!({
            "Search": [{"Title": "The Matrix", "imdbID": "tt0133093"}],
            "totalResults": "1",
            "Response": "True"
        });
        Mock::given(method("GET"))
            .and(query_param("apikey", "test-key"))
            .and(query_param("s", "Matrix"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let got = client_for(&server).search("Matrix", Some(2)).await.unwrap();
        assert_eq!(got, body);
    }

    #[tokio::test]
    async fn search_false_response_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("s", "zzzz"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"Response": "False", "Error": "Movie not found!"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).search("zzzz", None).await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(ref m) if m == "Movie not found!"));
    }

    #[tokio::test]
    async fn upstream_error_status_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server).search("Matrix", None).await.unwrap_err();
        assert!(matches!(err, GatewayError::Unavailable(_)));
    }

    #[tokio::test]
    async fn non_json_body_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).detail("tt0111161").await.unwrap_err();
        assert!(matches!(err, GatewayError::Unavailable(_)));
    }

    #[tokio::test]
    async fn detail_requests_full_plot_and_passes_through() {
        let server = MockServer::start().await;
        let body = json!({"Response": "False", "Error": "Incorrect IMDb ID."});
        Mock::given(method("GET"))
            .and(query_param("i", "tt-bad"))
            .and(query_param("plot", "full"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let got = client_for(&server).detail("tt-bad").await.unwrap();
        assert_eq!(got, body);
    }
}
