use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// SMTP settings. Absent when `MAIL_HOST` is not set.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OmdbConfig {
    pub api_key: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// `None` runs the service against the in-process store.
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub mail: Option<MailConfig>,
    pub omdb: OmdbConfig,
    pub bcrypt_cost: u32,
    pub reset_url_base: String,
    pub admin_token: Option<String>,
    pub cors_origin: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = non_empty("DATABASE_URL");
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "cinelog".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "cinelog-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24),
        };

        let mail = match non_empty("MAIL_HOST") {
            Some(host) => Some(MailConfig {
                host,
                port: std::env::var("MAIL_PORT")
                    .ok()
                    .and_then(|v| v.parse::<u16>().ok())
                    .unwrap_or(587),
                user: std::env::var("MAIL_USER").unwrap_or_default(),
                pass: std::env::var("MAIL_PASS").unwrap_or_default(),
                from: std::env::var("MAIL_FROM")
                    .unwrap_or_else(|_| "\"CineLog Support\" <support@cinelog.com>".into()),
            }),
            None => None,
        };

        let omdb = OmdbConfig {
            api_key: std::env::var("OMDB_API_KEY").unwrap_or_default(),
            base_url: std::env::var("OMDB_BASE_URL")
                .unwrap_or_else(|_| "http://www.omdbapi.com/".into()),
        };

        let bcrypt_cost = std::env::var("BCRYPT_COST")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(crate::auth::password::HASH_COST);

        Ok(Self {
            database_url,
            jwt,
            mail,
            omdb,
            bcrypt_cost,
            reset_url_base: std::env::var("RESET_URL_BASE")
                .unwrap_or_else(|_| "http://localhost:3000/auth/reset-password".into()),
            admin_token: non_empty("ADMIN_TOKEN"),
            cors_origin: std::env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
        })
    }
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
