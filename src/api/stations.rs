//! Station API Endpoints
//!
//! Start, stop and inspect stations; reset the whole venue.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::AppResult;
use crate::models::session_record::SessionRecord;
use crate::models::station::{format_timer, Station, MIN_FIXED_HOURS};
use crate::services::station_registry::StopOutcome;

/// Create station API routes
pub fn create_station_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_stations))
        .route("/reset", post(reset_all))
        .route("/:id", get(get_station))
        .route("/:id/start-fixed", post(start_fixed))
        .route("/:id/start-open", post(start_open))
        .route("/:id/stop", post(stop_station))
}

/// Station plus the values a card displays
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StationView {
    #[serde(flatten)]
    pub station: Station,

    /// Timer as `HH:MM:SS`
    pub display: String,

    /// End of a fixed rental, Unix milliseconds
    pub ends_at: Option<i64>,
}

impl From<Station> for StationView {
    fn from(station: Station) -> Self {
        Self {
            display: format_timer(station.timer),
            ends_at: station.end_time().map(|t| t.timestamp_millis()),
            station,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartFixedRequest {
    pub hours: Option<u32>,
    #[serde(default)]
    pub user_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOpenRequest {
    #[serde(default)]
    pub user_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopResponse {
    pub station: StationView,
    pub session: Option<SessionRecord>,
}

impl From<StopOutcome> for StopResponse {
    fn from(outcome: StopOutcome) -> Self {
        Self {
            station: outcome.station.into(),
            session: outcome.session,
        }
    }
}

/// Request body, or its defaults when the client sent none
fn body_or_default<T: Default>(request: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    match request {
        Ok(Json(body)) => Ok(body),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(T::default()),
        Err(rejection) => Err(rejection.into()),
    }
}

/// List every station
pub async fn list_stations(State(state): State<AppState>) -> Json<Vec<StationView>> {
    let stations = state.registry.stations().await;
    Json(stations.into_iter().map(StationView::from).collect())
}

/// Get one station
pub async fn get_station(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> AppResult<Json<StationView>> {
    Ok(Json(state.registry.station(id).await?.into()))
}

/// Start a fixed rental; `hours` defaults to one
pub async fn start_fixed(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    request: Result<Json<StartFixedRequest>, JsonRejection>,
) -> AppResult<Json<StationView>> {
    let request = body_or_default(request)?;
    let hours = request.hours.unwrap_or(MIN_FIXED_HOURS);
    let station = state
        .registry
        .start_fixed(id, hours, request.user_name)
        .await?;
    Ok(Json(station.into()))
}

/// Start an open-ended rental
pub async fn start_open(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    request: Result<Json<StartOpenRequest>, JsonRejection>,
) -> AppResult<Json<StationView>> {
    let request = body_or_default(request)?;
    let station = state.registry.start_open(id, request.user_name).await?;
    Ok(Json(station.into()))
}

/// Stop a station, recording the session when there is one
pub async fn stop_station(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> AppResult<Json<StopResponse>> {
    Ok(Json(state.registry.stop(id).await?.into()))
}

/// Return every station to idle
pub async fn reset_all(State(state): State<AppState>) -> Json<Vec<StationView>> {
    state.registry.reset_all().await;
    list_stations(State(state)).await
}
