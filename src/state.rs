use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::repo::{PgUserRepo, UserRepo};
use crate::config::AppConfig;
use crate::db;
use crate::favorites::repo::{FavoriteRepo, PgFavoriteRepo};
use crate::mail::{LogNotifier, Notifier, SmtpNotifier};
use crate::memory::MemoryStore;
use crate::omdb::{MovieGateway, OmdbClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepo>,
    pub favorites: Arc<dyn FavoriteRepo>,
    pub notifier: Arc<dyn Notifier>,
    pub movies: Arc<dyn MovieGateway>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let (users, favorites): (Arc<dyn UserRepo>, Arc<dyn FavoriteRepo>) =
            match config.database_url.as_deref() {
                Some(url) => {
                    let pool = db::connect(url).await?;
                    info!("connected to postgres");
                    (
                        Arc::new(PgUserRepo::new(pool.clone())) as Arc<dyn UserRepo>,
                        Arc::new(PgFavoriteRepo::new(pool)) as Arc<dyn FavoriteRepo>,
                    )
                }
                None => {
                    warn!("DATABASE_URL not set; using in-process store, data is lost on restart");
                    let store = Arc::new(MemoryStore::new());
                    (
                        store.clone() as Arc<dyn UserRepo>,
                        store as Arc<dyn FavoriteRepo>,
                    )
                }
            };

        let notifier: Arc<dyn Notifier> = match &config.mail {
            Some(mail) => Arc::new(SmtpNotifier::new(mail)?) as Arc<dyn Notifier>,
            None => {
                warn!("MAIL_HOST not set; outgoing mail will only be logged");
                Arc::new(LogNotifier) as Arc<dyn Notifier>
            }
        };

        if config.omdb.api_key.is_empty() {
            warn!("OMDB_API_KEY not set; movie lookups will be rejected upstream");
        }
        let movies = Arc::new(OmdbClient::new(&config.omdb)?) as Arc<dyn MovieGateway>;

        Ok(Self::from_parts(config, users, favorites, notifier, movies))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserRepo>,
        favorites: Arc<dyn FavoriteRepo>,
        notifier: Arc<dyn Notifier>,
        movies: Arc<dyn MovieGateway>,
    ) -> Self {
        Self {
            config,
            users,
            favorites,
            notifier,
            movies,
        }
    }
}
