use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::{DateTime, FixedOffset, Timelike, Utc};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::api::types::{
    CityDto, NotificationsDto, PrayerTimeDto, PrayerTimesDto, QiblaDto, ScheduleNotificationsDto,
    ScheduledNotificationsDto, ToggleNotificationsDto,
};
use crate::collectors::aladhan::PrayerTimesReport;
use crate::collectors::provider::TimingsProvider;
use crate::core::cities::{self, City, WILAYA_CAPITALS};
use crate::core::qibla::GeoPoint;
use crate::core::schedule::{current_prayer, TimeOfDay};
use crate::scheduler::dispatch::{NotificationError, NotificationService};

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<TimingsProvider>,
    pub notifications: Arc<NotificationService>,
    pub utc_offset: FixedOffset,
    pub db_path: PathBuf,
}

impl AppState {
    fn local_now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.utc_offset)
    }

    async fn lookup(&self, city: &str, now: &DateTime<FixedOffset>) -> PrayerTimesReport {
        self.provider.lookup(city, now.date_naive(), now.timestamp()).await
    }
}

#[derive(Debug, Deserialize)]
struct CityQuery {
    #[serde(default)]
    q: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PrayerTimesQuery {
    city: String,
}

#[derive(Debug, Deserialize)]
struct QiblaQuery {
    lat: f64,
    lng: f64,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/cities", get(list_cities))
        .route("/cities/wilayas", get(list_wilayas))
        .route("/prayer-times", get(get_prayer_times))
        .route("/qibla", get(get_qibla))
        .route(
            "/notifications",
            get(list_notifications).post(schedule_notifications).delete(cancel_notifications),
        )
        .route("/notifications/enabled", put(toggle_notifications))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
}

pub async fn run_server(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, router(state)).await
}

/// Canonical spelling when the input names a featured city exactly,
/// otherwise the trimmed input unchanged.
fn canonical_city(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(
        cities::find(trimmed)
            .map(|c| c.name.to_string())
            .unwrap_or_else(|| trimmed.to_string()),
    )
}

fn city_dto(c: &City) -> CityDto {
    CityDto {
        name: c.name,
        region: c.region,
        lat: c.latitude,
        lon: c.longitude,
        qibla_bearing: c.location().qibla_bearing(),
    }
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = crate::utils::db::open_or_init(&state.db_path).is_ok();
    let notifications = state.notifications.is_enabled().await;
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok", "db": db_ok, "notifications": notifications })))
}

async fn list_cities(Query(q): Query<CityQuery>) -> impl IntoResponse {
    let found = cities::search(q.q.as_deref().unwrap_or(""));
    let out: Vec<CityDto> = found.into_iter().map(city_dto).collect();
    (StatusCode::OK, Json(serde_json::json!(out)))
}

async fn list_wilayas() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!(&WILAYA_CAPITALS[..])))
}

async fn get_prayer_times(State(state): State<AppState>, Query(q): Query<PrayerTimesQuery>) -> impl IntoResponse {
    let city = match canonical_city(&q.city) {
        Some(c) => c,
        None => return (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": "missing city"}))),
    };

    let now = state.local_now();
    let report = state.lookup(&city, &now).await;
    (StatusCode::OK, Json(serde_json::json!(prayer_times_dto(report, now))))
}

fn prayer_times_dto(report: PrayerTimesReport, now: DateTime<FixedOffset>) -> PrayerTimesDto {
    let clock = TimeOfDay::new(now.hour() as u8, now.minute() as u8).unwrap_or(TimeOfDay::MIDNIGHT);
    let current = current_prayer(&report.schedule, clock);
    let prayers = report
        .schedule
        .entries()
        .map(|(prayer, time)| PrayerTimeDto {
            prayer,
            arabic: prayer.arabic_name(),
            time: time.to_string(),
            display: time.format_12h(),
            is_current: prayer == current,
        })
        .collect();

    PrayerTimesDto {
        qibla_bearing: report.coordinates.qibla_bearing(),
        current_prayer: current,
        prayers,
        local_time: now,
        report,
    }
}

async fn get_qibla(Query(q): Query<QiblaQuery>) -> impl IntoResponse {
    match GeoPoint::new(q.lat, q.lng) {
        Ok(p) => (
            StatusCode::OK,
            Json(serde_json::json!(QiblaDto { lat: p.latitude, lon: p.longitude, bearing: p.qibla_bearing() })),
        ),
        Err(e) => (StatusCode::UNPROCESSABLE_ENTITY, Json(serde_json::json!({"error": e.to_string()}))),
    }
}

async fn list_notifications(State(state): State<AppState>) -> impl IntoResponse {
    let (city, pending) = state.notifications.pending().await;
    let enabled = state.notifications.is_enabled().await;
    (StatusCode::OK, Json(serde_json::json!(NotificationsDto { city, enabled, pending })))
}

async fn schedule_notifications(
    State(state): State<AppState>,
    Json(body): Json<ScheduleNotificationsDto>,
) -> impl IntoResponse {
    let city = match canonical_city(&body.city) {
        Some(c) => c,
        None => return (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": "missing city"}))),
    };
    if !state.notifications.is_enabled().await {
        return (StatusCode::CONFLICT, Json(serde_json::json!({"error": NotificationError::Disabled.to_string()})));
    }

    let now = state.local_now();
    let report = state.lookup(&city, &now).await;
    if report.is_fallback {
        warn!(city = %city, "Scheduling reminders from fallback prayer times");
    }
    match state.notifications.reschedule(&city, &report.schedule, &now).await {
        Ok(pending) => (
            StatusCode::OK,
            Json(serde_json::json!(ScheduledNotificationsDto {
                city,
                is_fallback: report.is_fallback,
                pending,
            })),
        ),
        Err(NotificationError::Disabled) => {
            (StatusCode::CONFLICT, Json(serde_json::json!({"error": NotificationError::Disabled.to_string()})))
        }
        Err(e) => (StatusCode::UNPROCESSABLE_ENTITY, Json(serde_json::json!({"error": e.to_string()}))),
    }
}

async fn toggle_notifications(
    State(state): State<AppState>,
    Json(body): Json<ToggleNotificationsDto>,
) -> impl IntoResponse {
    state.notifications.set_enabled(body.enabled).await;
    (StatusCode::OK, Json(serde_json::json!({"enabled": body.enabled})))
}

async fn cancel_notifications(State(state): State<AppState>) -> impl IntoResponse {
    let cancelled = state.notifications.cancel_all().await;
    (StatusCode::OK, Json(serde_json::json!({"cancelled": cancelled})))
}
