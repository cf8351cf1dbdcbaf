//! API request handlers for the Parking API

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use parking_core::{Error, ParkingLot, RecordFilter, SpotId};
use std::sync::Arc;
use tracing::{error, info};

use crate::models::{
    DataResponse, EntryRequest, EntryResponse, ExitRequest, ExitResponse, RecordView, SpaceView,
    StatsQuery, StatsResponse,
};
use crate::storage::Store;

/// Shared application state
pub struct AppState {
    pub lot: ParkingLot<Store>,
}

/// API Error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message
        });

        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::InvalidSpot(_) => StatusCode::NOT_FOUND,
            Error::AlreadyOccupied(_) | Error::NotOccupied(_) | Error::NoOpenRecord(_) => {
                StatusCode::CONFLICT
            }
            Error::InvalidInterval { .. } | Error::InvalidPlate(_) => StatusCode::BAD_REQUEST,
            Error::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::JsonSerialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("Request failed: {}", err);
        }

        ApiError {
            status,
            message: err.to_string(),
        }
    }
}

/// Health check endpoint
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.lot.store().health_check().await {
        Ok(()) => Json(serde_json::json!({
            "status": "healthy",
            "service": "parking-api"
        }))
        .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Current state of every space
pub async fn parking_status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DataResponse<SpaceView>>, ApiError> {
    let spaces = state.lot.list_spaces().await?;

    Ok(Json(DataResponse {
        data: spaces.into_iter().map(SpaceView::from).collect(),
    }))
}

/// Stay history, optionally limited to an entry-date range
pub async fn list_records_handler(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<RecordFilter>,
) -> Result<Json<DataResponse<RecordView>>, ApiError> {
    let records = state.lot.list_records(&filter).await?;

    Ok(Json(DataResponse {
        data: records.into_iter().map(RecordView::from).collect(),
    }))
}

/// Open records that no space points at
pub async fn orphaned_records_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DataResponse<RecordView>>, ApiError> {
    let records = state.lot.orphaned_records().await?;

    Ok(Json(DataResponse {
        data: records.into_iter().map(RecordView::from).collect(),
    }))
}

/// Dashboard counters
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsResponse>, ApiError> {
    let day = query.day.unwrap_or_else(|| state.lot.today());
    let stats = state.lot.get_stats(day).await?;

    Ok(Json(stats.into()))
}

/// Register a vehicle entering a space
pub async fn entry_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EntryRequest>,
) -> Result<Json<EntryResponse>, ApiError> {
    info!(
        "Entry request: spot {} plate {:?}",
        payload.spot_id, payload.license_plate
    );

    let receipt = state
        .lot
        .record_entry(SpotId(payload.spot_id), &payload.license_plate)
        .await?;

    Ok(Json(receipt.into()))
}

/// Register a vehicle leaving a space
pub async fn exit_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ExitRequest>,
) -> Result<Json<ExitResponse>, ApiError> {
    info!("Exit request: spot {}", payload.spot_id);

    let receipt = state.lot.record_exit(SpotId(payload.spot_id)).await?;

    Ok(Json(receipt.into()))
}
