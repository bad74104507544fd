use std::path::PathBuf;
use std::time::Duration;

use crate::error::ClientError;

#[derive(Clone, Debug)]
pub struct Config {
    pub data_dir: PathBuf,
    pub database_url: String,
    pub db_max_connections: u32,
    pub session_expiry_hours: i64,
    pub mirror_key: String,
    pub resubscribe_max_attempts: u32,
    pub resubscribe_base_delay_ms: u64,
    pub resubscribe_max_delay_ms: u64,
    pub media_library_access: bool,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = PathBuf::from("./ochat-data");
        Config {
            database_url: default_database_url(&data_dir),
            data_dir,
            db_max_connections: 5,
            session_expiry_hours: 720,
            mirror_key: "CHAT_MESSAGES".to_string(),
            resubscribe_max_attempts: 5,
            resubscribe_base_delay_ms: 500,
            resubscribe_max_delay_ms: 8000,
            media_library_access: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ClientError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = Config::default();
        let data_dir = std::env::var("OCHAT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        Ok(Config {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| default_database_url(&data_dir)),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            session_expiry_hours: parse_var("SESSION_EXPIRY_HOURS", defaults.session_expiry_hours)?,
            mirror_key: std::env::var("MIRROR_KEY").unwrap_or(defaults.mirror_key),
            resubscribe_max_attempts: parse_var(
                "RESUBSCRIBE_MAX_ATTEMPTS",
                defaults.resubscribe_max_attempts,
            )?,
            resubscribe_base_delay_ms: parse_var(
                "RESUBSCRIBE_BASE_DELAY_MS",
                defaults.resubscribe_base_delay_ms,
            )?,
            resubscribe_max_delay_ms: parse_var(
                "RESUBSCRIBE_MAX_DELAY_MS",
                defaults.resubscribe_max_delay_ms,
            )?,
            media_library_access: parse_var("MEDIA_LIBRARY_ACCESS", defaults.media_library_access)?,
            data_dir,
        })
    }

    pub fn blob_dir(&self) -> PathBuf {
        self.data_dir.join("blobs")
    }

    pub fn resubscribe_base_delay(&self) -> Duration {
        Duration::from_millis(self.resubscribe_base_delay_ms)
    }

    pub fn resubscribe_max_delay(&self) -> Duration {
        Duration::from_millis(self.resubscribe_max_delay_ms)
    }
}

fn default_database_url(data_dir: &std::path::Path) -> String {
    format!("sqlite://{}/ochat.db", data_dir.display())
}

fn parse_var<T>(name: &str, default: T) -> Result<T, ClientError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| ClientError::Config(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}
