//! # selam-server
//!
//! HTTP backend for the Selam church app.
//!
//! This binary provides:
//! - **Daily verse notifier** triggered by an external scheduler; pushes the
//!   verse scheduled for today's date to every registered device
//! - **Push token registration** for signed-in app users
//! - **Daily verse editor API** where editors schedule verses by Ethiopian date
//! - **Verse counts** per chapter, used to bound the editor's verse picker
//! - **Calendar helpers** converting between the Ethiopian and Gregorian
//!   calendars

mod api;
mod auth;
mod config;
mod documents;
mod error;
mod notifier;
mod push;
mod verse_counts;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use selam_shared::constants::APP_NAME;
use selam_store::Database;

use crate::api::AppState;
use crate::auth::IdentityVerifier;
use crate::config::ServerConfig;
use crate::documents::SqliteDocuments;
use crate::notifier::DailyVerseNotifier;
use crate::push::{DryRunDispatcher, FcmDispatcher, PushDispatcher};
use crate::verse_counts::VerseCountCatalog;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,selam_server=debug")),
        )
        .init();

    info!("Starting {} server v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");
    info!(
        cron_secret = config.cron_secret.is_some(),
        editor_enabled = config.admin_token.is_some(),
        identity_enabled = config.auth_jwt_secret.is_some(),
        fcm_enabled = config.fcm.is_some(),
        time_zone = %config.time_zone.name(),
        "Feature settings"
    );
    if config.cron_secret.is_none() {
        warn!("CRON_SECRET is not set; anyone can trigger the daily verse notification");
    }

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------
    let database = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    info!(path = ?database.path(), "Database ready");
    let db = Arc::new(Mutex::new(database));

    let dispatcher: Arc<dyn PushDispatcher> = match &config.fcm {
        Some(fcm) => {
            info!(project = %fcm.project_id, endpoint = %fcm.endpoint, "Using FCM dispatcher");
            Arc::new(FcmDispatcher::new(fcm)?)
        }
        None => {
            warn!("FCM is not configured; push notifications will only be logged");
            Arc::new(DryRunDispatcher)
        }
    };

    let documents = Arc::new(SqliteDocuments::new(db.clone()));
    let mut notifier = DailyVerseNotifier::new(
        documents.clone(),
        documents.clone(),
        dispatcher,
        config.cron_secret.clone(),
        config.time_zone,
    )
    .with_batch_size(config.push_batch_size);
    if config.notify_once_per_day {
        notifier = notifier.with_log(documents);
    }

    let identity = config
        .auth_jwt_secret
        .as_deref()
        .map(|secret| Arc::new(IdentityVerifier::new(secret)));

    let verse_counts = Arc::new(VerseCountCatalog::new(config.verse_counts_url.clone())?);

    let http_addr = config.http_addr;
    let app_state = AppState {
        db,
        notifier: Arc::new(notifier),
        identity,
        verse_counts,
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
