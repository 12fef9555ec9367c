//! Mock KigaliGo backend for integration tests: implements the documented
//! API contract (bearer-authenticated routes, cookie-backed refresh) with
//! knobs for failure injection and call counting.

#![allow(dead_code)]

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const REFRESH_COOKIE: &str = "refresh_token=mock-refresh";

pub struct MockBackend {
    pub refresh_calls: AtomicUsize,
    pub me_calls: AtomicUsize,
    pub refresh_fail: AtomicBool,
    pub refresh_delay_ms: AtomicU64,
    /// When false, a successful refresh mints a token the API still rejects.
    pub refresh_rotates: AtomicBool,
    pub logout_fail: AtomicBool,
    pub valid_token: Mutex<String>,
    pub refreshed_token: Mutex<String>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            refresh_calls: AtomicUsize::new(0),
            me_calls: AtomicUsize::new(0),
            refresh_fail: AtomicBool::new(false),
            refresh_delay_ms: AtomicU64::new(0),
            refresh_rotates: AtomicBool::new(true),
            logout_fail: AtomicBool::new(false),
            valid_token: Mutex::new("token123".to_string()),
            refreshed_token: Mutex::new("refreshed-token".to_string()),
        })
    }

    pub fn set_valid_token(&self, token: &str) {
        *self.valid_token.lock().unwrap() = token.to_string();
    }

    pub fn reset_counters(&self) {
        self.refresh_calls.store(0, Ordering::SeqCst);
        self.me_calls.store(0, Ordering::SeqCst);
    }

    pub async fn spawn(self: &Arc<Self>) -> String {
        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/register", post(register))
            .route("/api/auth/refresh", post(refresh))
            .route("/api/auth/logout", post(logout))
            .route("/api/auth/me", get(me))
            .route("/api/auth/verify-email", get(verify_email))
            .route("/api/auth/forgot-password", post(forgot_password))
            .route("/api/auth/reset-password", post(reset_password))
            .route("/api/v1/vehicles/nearby", get(nearby_vehicles))
            .route("/api/v1/statistics", get(statistics))
            .route("/api/v1/fare/estimate", get(estimate_fare))
            .route("/api/v1/routes/plan", get(plan_route))
            .route("/api/v1/reports", post(submit_report))
            .with_state(Arc::clone(self));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("mock backend addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock backend serve");
        });
        format!("http://{}", addr)
    }
}

async fn login(State(state): State<Arc<MockBackend>>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    if email == "test@example.com" && password == "Password123!" {
        state.set_valid_token("token123");
        (
            [(
                header::SET_COOKIE,
                format!("{}; Path=/; HttpOnly", REFRESH_COOKIE),
            )],
            Json(json!({
                "access_token": "token123",
                "user": { "id": 1, "email": email, "name": "Test User" },
            })),
        )
            .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid credentials" })),
        )
            .into_response()
    }
}

async fn register(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    if password.chars().count() < 12 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "errors": { "password": ["Shorter than minimum length 12."] } })),
        )
            .into_response();
    }
    if email == "taken@example.com" {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "message": "Email already registered" })),
        )
            .into_response();
    }
    (
        StatusCode::CREATED,
        Json(json!({ "message": "Verification email sent", "dev_token": "dev-verify-token" })),
    )
        .into_response()
}

async fn refresh(State(state): State<Arc<MockBackend>>, headers: HeaderMap) -> Response {
    let delay = state.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);

    let has_cookie = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(|cookies| cookies.contains(REFRESH_COOKIE))
        .unwrap_or(false);
    if state.refresh_fail.load(Ordering::SeqCst) || !has_cookie {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Session expired" })),
        )
            .into_response();
    }

    let token = state.refreshed_token.lock().unwrap().clone();
    if state.refresh_rotates.load(Ordering::SeqCst) {
        state.set_valid_token(&token);
    }
    Json(json!({ "access_token": token })).into_response()
}

async fn logout(State(state): State<Arc<MockBackend>>) -> Response {
    if state.logout_fail.load(Ordering::SeqCst) {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "logout backend down" })),
        )
            .into_response()
    } else {
        Json(json!({})).into_response()
    }
}

async fn me(State(state): State<Arc<MockBackend>>, headers: HeaderMap) -> Response {
    state.me_calls.fetch_add(1, Ordering::SeqCst);
    let expected = format!("Bearer {}", state.valid_token.lock().unwrap());
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value == expected)
        .unwrap_or(false);
    if authorized {
        Json(json!({ "user": { "id": 1, "email": "test@example.com", "name": "Test User" } }))
            .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Token expired" })),
        )
            .into_response()
    }
}

async fn verify_email(Query(params): Query<HashMap<String, String>>) -> Response {
    if params.get("token").map(String::as_str) == Some("dev-verify-token") {
        Json(json!({ "message": "Email verified successfully" })).into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Invalid or expired verification token" })),
        )
            .into_response()
    }
}

async fn forgot_password(Json(body): Json<Value>) -> Response {
    if body["email"].as_str().unwrap_or_default().contains('@') {
        Json(json!({ "message": "Password reset instructions sent" })).into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Validation error" })),
        )
            .into_response()
    }
}

async fn reset_password(Json(body): Json<Value>) -> Response {
    if body["token"].as_str().unwrap_or_default() == "reset-ok" {
        Json(json!({ "message": "Password reset successful" })).into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Invalid or expired reset token" })),
        )
            .into_response()
    }
}

async fn nearby_vehicles(Query(params): Query<HashMap<String, String>>) -> Response {
    let lat: f64 = params
        .get("lat")
        .and_then(|v| v.parse().ok())
        .unwrap_or(-1.9441);
    let lng: f64 = params
        .get("lng")
        .and_then(|v| v.parse().ok())
        .unwrap_or(30.0619);
    // deliberately unsorted; the client orders nearest-first
    Json(json!({
        "vehicles": [
            {
                "id": 2, "vehicle_type": "bus", "registration": "RAD 456 B",
                "operator": "KBS", "current_lat": -1.9500, "current_lng": 30.0600,
                "distance_km": 2.4, "eta_minutes": 3.6, "is_active": true, "last_seen": null,
            },
            {
                "id": 1, "vehicle_type": "moto", "registration": "RAC 123 A",
                "operator": null, "current_lat": -1.9445, "current_lng": 30.0620,
                "distance_km": 0.8, "eta_minutes": 1.2, "is_active": true, "last_seen": null,
            },
        ],
        "count": 2,
        "center": { "lat": lat, "lng": lng },
        "radius_km": 5.0,
    }))
    .into_response()
}

async fn statistics() -> Response {
    Json(json!({
        "statistics": {
            "total_vehicles": 42, "active_vehicles": 42, "total_zones": 5,
            "total_stops": 18, "total_trips": 1250, "today_trips": 85,
        },
        "timestamp": "2025-01-01T00:00:00",
    }))
    .into_response()
}

async fn estimate_fare(Query(params): Query<HashMap<String, String>>) -> Response {
    let mode = params.get("mode").cloned().unwrap_or_else(|| "bus".to_string());
    Json(json!({
        "fare": { "base_fare": 500, "distance_fare": 750, "time_fare": 100, "total_fare": 1350 },
        "mode": mode,
        "distance_km": 5.0,
        "duration_minutes": 10.0,
        "currency": "RWF",
        "timestamp": null,
    }))
    .into_response()
}

async fn plan_route() -> Response {
    Json(json!({
        "origin": { "lat": -1.9441, "lng": 30.0619 },
        "destination": { "lat": -1.9614, "lng": 30.0907 },
        "options": [
            {
                "mode": "bus", "distance_km": 3.8, "duration_minutes": 7.6,
                "estimated_fare": 570, "route_polyline": null,
                "steps": ["Take bus from origin", "Transfer if needed", "Arrive at destination"],
            },
            {
                "mode": "moto", "distance_km": 3.8, "duration_minutes": 5.7,
                "estimated_fare": 1140, "route_polyline": null,
                "steps": ["Take motorcycle taxi", "Direct route to destination"],
            },
        ],
        "timestamp": null,
    }))
    .into_response()
}

async fn submit_report(Json(body): Json<Value>) -> Response {
    if body["title"].as_str().unwrap_or_default().is_empty()
        && body["description"].as_str().unwrap_or_default().is_empty()
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Title or description is required" })),
        )
            .into_response();
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Report submitted successfully. Thank you for helping improve our service!",
            "report_id": "RPT-20250101000000",
            "status": "pending",
            "timestamp": null,
        })),
    )
        .into_response()
}
