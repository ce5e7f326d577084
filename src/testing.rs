use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use tokio::sync::Mutex;

use crate::config::{AppConfig, JwtConfig, OmdbConfig};
use crate::mail::{Mail, Notifier};
use crate::memory::MemoryStore;
use crate::omdb::{GatewayError, MovieGateway};
use crate::state::AppState;

pub const ADMIN_TOKEN: &str = "admin-secret";

/// Lowest work factor bcrypt accepts; keeps hashing fast in tests.
pub const TEST_COST: u32 = 4;

/// Keeps every delivered message; can be switched to fail every send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Mail>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn fail(&self, on: bool) {
        self.failing.store(on, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<Mail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, mail: &Mail) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("smtp connection refused");
        }
        self.sent.lock().await.push(mail.clone());
        Ok(())
    }
}

/// Canned OMDb answers: "missing" is not found, "down" is unavailable.
pub struct StubGateway;

#[async_trait]
impl MovieGateway for StubGateway {
    async fn search(&self, title: &str, page: Option<u32>) -> Result<JsonValue, GatewayError> {
        match title {
            "missing" => Err(GatewayError::NotFound("Movie not found!".into())),
            "down" => Err(GatewayError::Unavailable("connection reset".into())),
            _ => Ok(json!({
                "Search": [{"Title": title, "imdbID": "tt0111161"}],
                "page": page.unwrap_or(1),
                "Response": "True"
            })),
        }
    }

    async fn detail(&self, imdb_id: &str) -> Result<JsonValue, GatewayError> {
        Ok(json!({"imdbID": imdb_id, "Plot": "full", "Response": "True"}))
    }
}

pub struct Harness {
    pub state: AppState,
    pub outbox: Arc<RecordingNotifier>,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: None,
        jwt: JwtConfig {
            secret: "test-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 5,
        },
        mail: None,
        omdb: OmdbConfig {
            api_key: "test".into(),
            base_url: "http://omdb.invalid/".into(),
        },
        bcrypt_cost: TEST_COST,
        reset_url_base: "http://localhost:3000/auth/reset-password".into(),
        admin_token: Some(ADMIN_TOKEN.into()),
        cors_origin: "http://localhost:5173".into(),
    }
}

pub fn harness_with(config: AppConfig) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let outbox = Arc::new(RecordingNotifier::default());
    let state = AppState::from_parts(
        Arc::new(config),
        store.clone(),
        store,
        outbox.clone(),
        Arc::new(StubGateway),
    );
    Harness { state, outbox }
}

pub fn harness() -> Harness {
    harness_with(test_config())
}
