//! Integration tests for the Parking API

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, TimeZone, Utc};
use parking_api::{create_router, AppState, Store};
use parking_core::{LotConfig, ManualClock, MemoryStore, OccupyPolicy, ParkingLot};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

/// Helper to create a test app over an in-memory lot at 2024-01-01 08:00 UTC
async fn create_test_app(config: LotConfig) -> (Router, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap(),
    ));

    let lot = ParkingLot::new(Store::Memory(MemoryStore::new()), clock.clone(), config);
    lot.initialize().await.unwrap();

    (create_router(AppState { lot }), clock)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(
        app,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .uri(uri)
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
    )
    .await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };

    (status, json)
}

#[tokio::test]
async fn test_health_check() {
    let (app, _clock) = create_test_app(LotConfig::default()).await;

    let (status, json) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "parking-api");
}

#[tokio::test]
async fn test_parking_status_lists_all_spaces() {
    let (app, _clock) = create_test_app(LotConfig::default()).await;

    let (status, json) = get(&app, "/api/parking-status").await;

    assert_eq!(status, StatusCode::OK);
    let spaces = json["data"].as_array().unwrap();
    assert_eq!(spaces.len(), 8);
    assert_eq!(spaces[0]["id"], 1);
    assert_eq!(spaces[7]["id"], 8);
    assert!(spaces
        .iter()
        .all(|s| s["is_occupied"] == false && s["license_plate"].is_null()));
}

#[tokio::test]
async fn test_entry_and_exit_flow() {
    let (app, clock) = create_test_app(LotConfig::default()).await;

    let (status, json) = post(
        &app,
        "/api/entry",
        json!({ "spot_id": 5, "license_plate": "ABC123" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["spot_id"], 5);
    assert_eq!(json["license_plate"], "ABC123");

    let (_, json) = get(&app, "/api/parking-status").await;
    let space = &json["data"][4];
    assert_eq!(space["is_occupied"], true);
    assert_eq!(space["license_plate"], "ABC123");
    assert_eq!(space["entry_time"], "2024-01-01T08:00:00Z");

    clock.advance(Duration::minutes(90));

    let (status, json) = post(&app, "/api/exit", json!({ "spot_id": 5 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["license_plate"], "ABC123");
    assert_eq!(json["duration"], 90);
    assert_eq!(json["fee"], 3500);

    let (_, json) = get(&app, "/api/parking-status").await;
    assert_eq!(json["data"][4]["is_occupied"], false);
    assert!(json["data"][4]["entry_time"].is_null());

    let (status, json) = get(&app, "/api/records").await;
    assert_eq!(status, StatusCode::OK);
    let records = json["data"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"], "completed");
    assert_eq!(records[0]["fee"], 3500);
    assert_eq!(records[0]["duration_minutes"], 90);
    assert_eq!(records[0]["exit_time"], "2024-01-01T09:30:00Z");
}

#[tokio::test]
async fn test_double_entry_is_conflict() {
    let (app, _clock) = create_test_app(LotConfig::default()).await;

    let (status, _) = post(
        &app,
        "/api/entry",
        json!({ "spot_id": 2, "license_plate": "FIRST1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = post(
        &app,
        "/api/entry",
        json!({ "spot_id": 2, "license_plate": "SECOND" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("already occupied"));
}

#[tokio::test]
async fn test_overwrite_policy_replaces_occupant() {
    let config = LotConfig {
        occupy_policy: OccupyPolicy::Overwrite,
        ..LotConfig::default()
    };
    let (app, _clock) = create_test_app(config).await;

    post(
        &app,
        "/api/entry",
        json!({ "spot_id": 2, "license_plate": "TYPO1" }),
    )
    .await;
    let (status, _) = post(
        &app,
        "/api/entry",
        json!({ "spot_id": 2, "license_plate": "FIXED1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = get(&app, "/api/parking-status").await;
    assert_eq!(json["data"][1]["license_plate"], "FIXED1");

    let (_, json) = get(&app, "/api/records/orphaned").await;
    assert!(json["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_error_statuses() {
    let (app, _clock) = create_test_app(LotConfig::default()).await;

    let (status, json) = post(&app, "/api/exit", json!({ "spot_id": 3 })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("not occupied"));

    let (status, _) = post(&app, "/api/exit", json!({ "spot_id": 99 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post(
        &app,
        "/api/entry",
        json!({ "spot_id": 1, "license_plate": "   " }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = post(
        &app,
        "/api/entry",
        json!({ "spot_id": 1, "license_plate": "ABC\nFORGED LOG LINE" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("plate"));

    // Malformed body is rejected by the extractor
    let (status, _) = post(&app, "/api/entry", json!({ "spot_id": 1 })).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_records_date_filter() {
    let (app, clock) = create_test_app(LotConfig::default()).await;

    post(
        &app,
        "/api/entry",
        json!({ "spot_id": 1, "license_plate": "DAY1" }),
    )
    .await;
    clock.advance(Duration::days(1));
    post(
        &app,
        "/api/entry",
        json!({ "spot_id": 2, "license_plate": "DAY2" }),
    )
    .await;
    clock.advance(Duration::days(1));
    post(
        &app,
        "/api/entry",
        json!({ "spot_id": 3, "license_plate": "DAY3" }),
    )
    .await;

    let (status, json) = get(
        &app,
        "/api/records?start_date=2024-01-01&end_date=2024-01-02",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let plates: Vec<_> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["license_plate"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(plates, ["DAY2", "DAY1"]);

    let (status, _) = get(&app, "/api/records?start_date=yesterday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats() {
    let (app, clock) = create_test_app(LotConfig::default()).await;

    post(
        &app,
        "/api/entry",
        json!({ "spot_id": 1, "license_plate": "AAA111" }),
    )
    .await;
    post(
        &app,
        "/api/entry",
        json!({ "spot_id": 2, "license_plate": "BBB222" }),
    )
    .await;
    clock.advance(Duration::minutes(150));
    post(&app, "/api/exit", json!({ "spot_id": 1 })).await;

    let (status, json) = get(&app, "/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["occupied_spots"], 1);
    assert_eq!(json["available_spots"], 7);
    assert_eq!(json["today_entries"], 2);
    assert_eq!(json["today_revenue"], 5000);

    let (_, json) = get(&app, "/api/stats?day=2024-01-02").await;
    assert_eq!(json["today_entries"], 0);
    assert_eq!(json["today_revenue"], 0);
    assert_eq!(json["occupied_spots"], 1);
}
