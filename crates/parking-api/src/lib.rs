//! Parking API Service
//!
//! REST surface over the parking lot core. The dashboard polls it for live
//! occupancy, statistics and history; staff post entries and exits.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /api/parking-status` - State of every space
//! - `GET /api/records` - Stay history (`?start_date=&end_date=`)
//! - `GET /api/records/orphaned` - Open records with no space
//! - `GET /api/stats` - Occupancy and daily figures (`?day=`)
//! - `POST /api/entry` - Park a vehicle
//! - `POST /api/exit` - Release a space and bill the stay

pub mod config;
pub mod handlers;
pub mod models;
pub mod storage;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::{Config, StorageBackend};
pub use handlers::AppState;
pub use storage::{RedisStore, Store};

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/api/parking-status", get(handlers::parking_status_handler))
        .route("/api/records", get(handlers::list_records_handler))
        .route(
            "/api/records/orphaned",
            get(handlers::orphaned_records_handler),
        )
        .route("/api/stats", get(handlers::stats_handler))
        .route("/api/entry", post(handlers::entry_handler))
        .route("/api/exit", post(handlers::exit_handler))
        .with_state(shared_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
