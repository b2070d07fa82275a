//! Process configuration, read once at startup.

use chrono::Duration;
use thiserror::Error;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 60 * 60 * 24 * 7;

#[derive(Debug, Clone)]
pub struct Config {
    pub public_host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub session_ttl: Duration,
    pub nats_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str, fallback: &str| lookup(key).unwrap_or_else(|| fallback.to_string());

        let port = get("PORT", "8080");
        let port = port.parse::<u16>().map_err(|_| ConfigError::Invalid { key: "PORT", value: port })?;

        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| {
            format!(
                "postgres://{}:{}@{}:{}/{}",
                get("DB_USER", "admin"), get("DB_PASSWORD", "password"), get("DB_HOST", "localhost"), get("DB_PORT", "5432"), get("DB_NAME", "ecommerce"),
            )
        });

        let db_max_connections = get("DB_MAX_CONNECTIONS", "10");
        let db_max_connections = db_max_connections
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or(ConfigError::Invalid { key: "DB_MAX_CONNECTIONS", value: db_max_connections })?;

        // an unusable ttl falls back to the default rather than refusing to start
        let session_ttl = lookup("SESSION_TTL_SECONDS")
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|secs| *secs > 0)
            .and_then(Duration::try_seconds)
            .unwrap_or_else(|| Duration::seconds(DEFAULT_SESSION_TTL_SECONDS));

        Ok(Self {
            public_host: get("PUBLIC_HOST", "http://localhost"),
            port,
            database_url,
            db_max_connections,
            session_ttl,
            nats_url: lookup("NATS_URL").filter(|url| !url.is_empty()),
        })
    }

    pub fn bind_address(&self) -> String { format!("0.0.0.0:{}", self.port) }
}
