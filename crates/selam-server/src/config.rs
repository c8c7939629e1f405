//! Server configuration loaded from environment variables.
//!
//! Every setting has a default so the server starts with zero configuration
//! for local development. Empty variables count as unset.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use chrono_tz::Tz;

use selam_shared::constants::{
    DEFAULT_HTTP_PORT, DEFAULT_TIME_ZONE, DEFAULT_VERSE_COUNTS_URL, MAX_TOKENS_PER_BATCH,
};

/// Firebase Cloud Messaging (HTTP v1) settings.
#[derive(Clone)]
pub struct FcmConfig {
    /// Env: `FCM_PROJECT_ID`
    pub project_id: String,

    /// OAuth2 access token with the `firebase.messaging` scope, minted by the
    /// deployment (e.g. `gcloud auth print-access-token`).
    /// Env: `FCM_ACCESS_TOKEN`
    pub access_token: String,

    /// Env: `FCM_ENDPOINT`
    /// Default: `https://fcm.googleapis.com`
    pub endpoint: String,

    /// Maximum in-flight sends per batch.
    /// Env: `FCM_CONCURRENCY`
    /// Default: `32`
    pub concurrency: usize,
}

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: platform data directory (see `selam_store::Database::new`).
    pub database_path: Option<PathBuf>,

    /// Shared secret a scheduler must present in `x-cron-secret`.
    /// Env: `CRON_SECRET`
    /// Default: unset, which leaves the notify endpoint open. Production
    /// deployments must set it.
    pub cron_secret: Option<String>,

    /// Bearer token for the daily verse editor API.
    /// Env: `ADMIN_TOKEN`
    /// Default: unset (editor API disabled).
    pub admin_token: Option<String>,

    /// HS256 secret used to verify user identity tokens on push token routes.
    /// Env: `AUTH_JWT_SECRET`
    /// Default: unset (push token registration rejected).
    pub auth_jwt_secret: Option<String>,

    /// Zone that decides which calendar day "today" is.
    /// Env: `TIME_ZONE`
    /// Default: `Africa/Addis_Ababa`
    pub time_zone: Tz,

    /// Skip the daily verse send if it already went out for today's key.
    /// Env: `NOTIFY_ONCE_PER_DAY` (true/false)
    /// Default: `false`
    pub notify_once_per_day: bool,

    /// Tokens per multicast batch, capped at the gateway limit of 500.
    /// Env: `PUSH_BATCH_SIZE`
    pub push_batch_size: usize,

    /// JSON list of books with per-chapter verse counts, cached for a day.
    /// Env: `VERSE_COUNTS_URL`
    /// Default: the bkuhl/bible-verse-counts-per-chapter dataset on GitHub.
    pub verse_counts_url: String,

    /// Present when both `FCM_PROJECT_ID` and `FCM_ACCESS_TOKEN` are set;
    /// otherwise pushes are only logged.
    pub fcm: Option<FcmConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: None,
            cron_secret: None,
            admin_token: None,
            auth_jwt_secret: None,
            time_zone: chrono_tz::Africa::Addis_Ababa,
            notify_once_per_day: false,
            push_batch_size: MAX_TOKENS_PER_BATCH,
            verse_counts_url: DEFAULT_VERSE_COUNTS_URL.to_string(),
            fcm: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(addr) = var("HTTP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.http_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default"),
            }
        }

        config.database_path = var("DATABASE_PATH").map(PathBuf::from);
        config.cron_secret = var("CRON_SECRET");
        config.admin_token = var("ADMIN_TOKEN");
        config.auth_jwt_secret = var("AUTH_JWT_SECRET");

        if let Some(name) = var("TIME_ZONE") {
            match name.parse::<Tz>() {
                Ok(tz) => config.time_zone = tz,
                Err(_) => tracing::warn!(
                    value = %name,
                    default = DEFAULT_TIME_ZONE,
                    "Unknown TIME_ZONE, using default"
                ),
            }
        }

        if let Some(val) = var("NOTIFY_ONCE_PER_DAY") {
            config.notify_once_per_day = val == "true" || val == "1";
        }

        if let Some(val) = var("PUSH_BATCH_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if (1..=MAX_TOKENS_PER_BATCH).contains(&n) => config.push_batch_size = n,
                _ => tracing::warn!(
                    value = %val,
                    max = MAX_TOKENS_PER_BATCH,
                    "Invalid PUSH_BATCH_SIZE, using default"
                ),
            }
        }

        if let Some(url) = var("VERSE_COUNTS_URL") {
            config.verse_counts_url = url;
        }

        if let (Some(project_id), Some(access_token)) = (var("FCM_PROJECT_ID"), var("FCM_ACCESS_TOKEN")) {
            let mut fcm = FcmConfig {
                project_id,
                access_token,
                endpoint: "https://fcm.googleapis.com".to_string(),
                concurrency: 32,
            };
            if let Some(endpoint) = var("FCM_ENDPOINT") {
                fcm.endpoint = endpoint.trim_end_matches('/').to_string();
            }
            if let Some(val) = var("FCM_CONCURRENCY") {
                match val.parse::<usize>() {
                    Ok(n) if n > 0 => fcm.concurrency = n,
                    _ => tracing::warn!(value = %val, "Invalid FCM_CONCURRENCY, using default"),
                }
            }
            config.fcm = Some(fcm);
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }
}

// Secrets are reported as present/absent only.
impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("database_path", &self.database_path)
            .field("cron_secret", &self.cron_secret.as_ref().map(|_| "[redacted]"))
            .field("admin_token", &self.admin_token.as_ref().map(|_| "[redacted]"))
            .field("auth_jwt_secret", &self.auth_jwt_secret.as_ref().map(|_| "[redacted]"))
            .field("time_zone", &self.time_zone.name())
            .field("notify_once_per_day", &self.notify_once_per_day)
            .field("push_batch_size", &self.push_batch_size)
            .field("verse_counts_url", &self.verse_counts_url)
            .field("fcm", &self.fcm)
            .finish()
    }
}

impl fmt::Debug for FcmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FcmConfig")
            .field("project_id", &self.project_id)
            .field("access_token", &"[redacted]")
            .field("endpoint", &self.endpoint)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}
