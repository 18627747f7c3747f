use armada_timer::models::station::HOUR_MILLIS;
use serde_json::{json, Value};

use crate::common::create_test_app;

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app().await;
    let response = app.server.get("/api/health").await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.text(), "OK");
}

#[tokio::test]
async fn test_list_stations() {
    let app = create_test_app().await;
    let response = app.server.get("/api/stations").await;

    assert_eq!(response.status_code(), 200);
    let stations: Vec<Value> = response.json();
    assert_eq!(stations.len(), 10);
    assert_eq!(stations[0]["id"], 1);
    assert_eq!(stations[9]["id"], 10);
    assert!(stations.iter().all(|s| s["status"] == "Libre"));
    assert!(stations.iter().all(|s| s["display"] == "00:00:00"));
}

#[tokio::test]
async fn test_start_fixed() {
    let app = create_test_app().await;
    let response = app
        .server
        .post("/api/stations/3/start-fixed")
        .json(&json!({ "hours": 2, "userName": "Ana" }))
        .await;

    assert_eq!(response.status_code(), 200);
    let station: Value = response.json();
    assert_eq!(station["running"], true);
    assert_eq!(station["mode"], "fixed");
    assert_eq!(station["status"], "Ocupada");
    assert_eq!(station["userName"], "Ana");
    assert_eq!(station["timer"], 2 * HOUR_MILLIS);
    assert_eq!(station["display"], "02:00:00");
    assert!(station["endsAt"].is_i64());
}

#[tokio::test]
async fn test_start_fixed_without_body_defaults_to_one_hour() {
    let app = create_test_app().await;
    let response = app.server.post("/api/stations/1/start-fixed").await;

    assert_eq!(response.status_code(), 200);
    let station: Value = response.json();
    assert_eq!(station["timer"], HOUR_MILLIS);
    assert_eq!(station["userName"], "");
}

#[tokio::test]
async fn test_start_open() {
    let app = create_test_app().await;
    let response = app
        .server
        .post("/api/stations/4/start-open")
        .json(&json!({ "userName": "Luis" }))
        .await;

    assert_eq!(response.status_code(), 200);
    let station: Value = response.json();
    assert_eq!(station["mode"], "free");
    assert_eq!(station["timer"], 0);
    assert!(station["endsAt"].is_null());
}

#[tokio::test]
async fn test_start_errors() {
    let app = create_test_app().await;
    app.server.post("/api/stations/2/start-open").await;

    let response = app.server.post("/api/stations/2/start-open").await;
    assert_eq!(response.status_code(), 409);
    let body: Value = response.json();
    assert_eq!(body["error"], "StationAlreadyRunning");

    let response = app.server.post("/api/stations/11/start-open").await;
    assert_eq!(response.status_code(), 404);
    let body: Value = response.json();
    assert_eq!(body["error"], "StationNotFound");

    let response = app
        .server
        .post("/api/stations/5/start-fixed")
        .json(&json!({ "hours": 13 }))
        .await;
    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"], "InvalidHours");

    let response = app
        .server
        .post("/api/stations/5/start-fixed")
        .json(&json!({ "hours": "two" }))
        .await;
    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"], "ValidationError");

    assert_eq!(app.registry.active_tick_tasks().await, 1);
}

#[tokio::test]
async fn test_get_station() {
    let app = create_test_app().await;
    let response = app.server.get("/api/stations/7").await;
    assert_eq!(response.status_code(), 200);
    let station: Value = response.json();
    assert_eq!(station["id"], 7);

    let response = app.server.get("/api/stations/0").await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_stop_returns_session() {
    let app = create_test_app().await;
    app.server
        .post("/api/stations/6/start-open")
        .json(&json!({ "userName": "Ana" }))
        .await;
    app.clock.advance_seconds(90);

    let response = app.server.post("/api/stations/6/stop").await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert_eq!(body["station"]["running"], false);
    assert_eq!(body["station"]["status"], "Libre");
    assert_eq!(body["session"]["pc"], 6);
    assert_eq!(body["session"]["user"], "Ana");
    assert_eq!(body["session"]["start"], "1/1/24, 10:00:00");
    assert_eq!(body["session"]["duration"], 90);

    // Idle station: nothing to record
    let response = app.server.post("/api/stations/6/stop").await;
    let body: Value = response.json();
    assert!(body["session"].is_null());
}

#[tokio::test]
async fn test_reset_all() {
    let app = create_test_app().await;
    app.server.post("/api/stations/1/start-open").await;
    app.server.post("/api/stations/2/start-fixed").await;

    let response = app.server.post("/api/stations/reset").await;
    assert_eq!(response.status_code(), 200);

    let stations: Vec<Value> = response.json();
    assert_eq!(stations.len(), 10);
    assert!(stations.iter().all(|s| s["running"] == false));
    assert_eq!(app.registry.active_tick_tasks().await, 0);
}
