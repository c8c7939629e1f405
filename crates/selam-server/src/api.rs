use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use selam_shared::calendar::{self, DateParts};
use selam_shared::constants::CRON_SECRET_HEADER;
use selam_shared::form::{PushTokenPayload, VerseDraft, VerseForm};
use selam_shared::{DailyVerse, DateKey, EthiopianDate, GregorianDate, VerseCounts};
use selam_store::Database;

use crate::auth::{verify_admin_token, AuthenticatedUser, IdentityVerifier};
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::notifier::{DailyVerseNotifier, NotifyError, NotifyReport, Trigger};
use crate::verse_counts::VerseCountCatalog;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub notifier: Arc<DailyVerseNotifier>,
    /// `None` when no `AUTH_JWT_SECRET` is configured.
    pub identity: Option<Arc<IdentityVerifier>>,
    pub verse_counts: Arc<VerseCountCatalog>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/notify-daily-verse",
            get(notify_daily_verse).post(notify_daily_verse),
        )
        .route("/api/push-tokens", post(register_push_token))
        .route("/api/push-tokens/:device_id", delete(unregister_push_token))
        .route("/api/daily-verses", get(list_verses).post(create_verse))
        .route("/api/daily-verses/:id", put(update_verse).delete(delete_verse))
        .route("/api/verse-counts", get(verse_counts))
        .route("/api/calendar/to-gregorian", get(calendar_to_gregorian))
        .route("/api/calendar/to-ethiopian", get(calendar_to_ethiopian))
        .route("/api/calendar/today", get(calendar_today))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ---------------------------------------------------------------------------
// Daily verse job
// ---------------------------------------------------------------------------

async fn notify_daily_verse(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<NotifyReport>, NotifyError> {
    let presented = headers
        .get(CRON_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let outcome = state
        .notifier
        .clone()
        .run_isolated(Trigger::new(presented))
        .await?;

    Ok(Json(NotifyReport::from(outcome)))
}

// ---------------------------------------------------------------------------
// Push token registration
// ---------------------------------------------------------------------------

fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthenticatedUser, ServerError> {
    let identity = state
        .identity
        .as_ref()
        .ok_or_else(|| ServerError::Unauthorized("Identity provider unavailable".into()))?;
    identity.authenticate(headers)
}

async fn register_push_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<PushTokenPayload>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let user = authenticate(&state, &headers)?;

    let Json(payload) = payload.map_err(|e| {
        debug!(error = %e, "Unreadable push token payload");
        ServerError::InvalidPayload
    })?;
    let registration = payload.validate().map_err(|e| {
        debug!(error = %e, "Invalid push token payload");
        ServerError::InvalidPayload
    })?;

    if registration.user_id != user.uid {
        return Err(ServerError::Forbidden(
            "Cannot register a token for another user".into(),
        ));
    }

    let token = state.db.lock().await.upsert_push_token(&registration)?;
    info!(
        doc_id = %token.doc_id(),
        platform = %token.platform,
        app_version = %token.app_version,
        "Push token registered"
    );

    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn unregister_push_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(device_id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let user = authenticate(&state, &headers)?;

    let deleted = state.db.lock().await.delete_push_token(&user.uid, &device_id)?;
    info!(user = %user.uid, device_id = %device_id, deleted, "Push token removed");

    Ok(Json(serde_json::json!({ "ok": true })))
}

// ---------------------------------------------------------------------------
// Daily verse editor
// ---------------------------------------------------------------------------

fn read_form(payload: Result<Json<VerseForm>, JsonRejection>) -> Result<VerseForm, ServerError> {
    payload
        .map(|Json(form)| form)
        .map_err(|e| ServerError::BadRequest(e.body_text()))
}

/// Bound the verse number by the chapter's length. Editing stays possible
/// while the count source is down; only the bundled chapter check applies then.
async fn check_verse_bounds(state: &AppState, draft: &VerseDraft) -> Result<(), ServerError> {
    match state.verse_counts.get().await {
        Ok(counts) => Ok(counts.check(draft.book, draft.chapter, draft.verse)?),
        Err(e) => {
            warn!(error = %e, "Verse counts unavailable, skipping verse bound check");
            Ok(())
        }
    }
}

async fn verse_counts(State(state): State<AppState>) -> Result<Json<VerseCounts>, ServerError> {
    let counts = state.verse_counts.get().await.map_err(|e| {
        warn!(error = %e, "Failed to fetch verse counts");
        ServerError::BadGateway("Failed to fetch verse counts".into())
    })?;
    Ok(Json(VerseCounts::clone(&counts)))
}

async fn list_verses(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<DailyVerse>>, ServerError> {
    verify_admin_token(&headers, &state.config)?;
    let verses = state.db.lock().await.list_verses()?;
    Ok(Json(verses))
}

async fn create_verse(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<VerseForm>, JsonRejection>,
) -> Result<(StatusCode, Json<DailyVerse>), ServerError> {
    verify_admin_token(&headers, &state.config)?;
    let draft = read_form(payload)?.into_draft()?;
    check_verse_bounds(&state, &draft).await?;

    let verse = state.db.lock().await.insert_verse(&draft)?;
    info!(
        id = %verse.id,
        ethiopian = %draft.ethiopian_date,
        key = %verse.display_date_key,
        "Daily verse created"
    );

    Ok((StatusCode::CREATED, Json(verse)))
}

async fn update_verse(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<VerseForm>, JsonRejection>,
) -> Result<Json<DailyVerse>, ServerError> {
    verify_admin_token(&headers, &state.config)?;
    let draft = read_form(payload)?.into_draft()?;
    check_verse_bounds(&state, &draft).await?;

    let verse = state.db.lock().await.update_verse(&id, &draft)?;
    info!(id = %verse.id, key = %verse.display_date_key, "Daily verse updated");

    Ok(Json(verse))
}

async fn delete_verse(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    verify_admin_token(&headers, &state.config)?;

    if !state.db.lock().await.delete_verse(&id)? {
        return Err(ServerError::NotFound(format!("daily verse {id}")));
    }
    info!(id = %id, "Daily verse deleted");

    Ok(Json(serde_json::json!({ "ok": true })))
}

// ---------------------------------------------------------------------------
// Calendar helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct CalendarResponse {
    ethiopian: EthiopianDate,
    ethiopian_month_name: &'static str,
    ethiopian_leap_year: bool,
    gregorian: GregorianDate,
    date_key: DateKey,
}

impl CalendarResponse {
    fn new(ethiopian: EthiopianDate, gregorian: GregorianDate) -> Self {
        Self {
            ethiopian,
            ethiopian_month_name: ethiopian.month_name(),
            ethiopian_leap_year: ethiopian.is_leap_year(),
            gregorian,
            date_key: DateKey::from(gregorian),
        }
    }
}

fn read_parts(query: Result<Query<DateParts>, QueryRejection>) -> Result<DateParts, ServerError> {
    query
        .map(|Query(parts)| parts)
        .map_err(|e| ServerError::BadRequest(e.body_text()))
}

async fn calendar_to_gregorian(
    query: Result<Query<DateParts>, QueryRejection>,
) -> Result<Json<CalendarResponse>, ServerError> {
    let ethiopian = EthiopianDate::try_from(read_parts(query)?)
        .map_err(|e| ServerError::BadRequest(e.to_string()))?;
    Ok(Json(CalendarResponse::new(ethiopian, ethiopian.to_gregorian())))
}

async fn calendar_to_ethiopian(
    query: Result<Query<DateParts>, QueryRejection>,
) -> Result<Json<CalendarResponse>, ServerError> {
    let gregorian = GregorianDate::try_from(read_parts(query)?)
        .and_then(|g| g.to_ethiopian().map(|e| (e, g)))
        .map_err(|e| ServerError::BadRequest(e.to_string()));
    let (ethiopian, gregorian) = gregorian?;
    Ok(Json(CalendarResponse::new(ethiopian, gregorian)))
}

async fn calendar_today(
    State(state): State<AppState>,
) -> Result<Json<CalendarResponse>, ServerError> {
    let gregorian = calendar::today_in(state.config.time_zone);
    let ethiopian = gregorian
        .to_ethiopian()
        .map_err(|e| ServerError::Internal(e.to_string()))?;
    Ok(Json(CalendarResponse::new(ethiopian, gregorian)))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
