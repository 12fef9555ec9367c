pub mod client;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    #[serde(default)]
    pub is_email_verified: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_login: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeResponse {
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiMessage {
    pub message: String,
}

/// Registration outcome. `dev_token` is only present when the backend runs
/// in non-production mode and echoes the email-verification token.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterOutcome {
    pub message: String,
    #[serde(default)]
    pub dev_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: i64,
    pub vehicle_type: String,
    #[serde(default)]
    pub registration: Option<String>,
    #[serde(default)]
    pub operator: Option<String>,
    pub current_lat: f64,
    pub current_lng: f64,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub eta_minutes: Option<f64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub last_seen: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct NearbyVehicles {
    pub vehicles: Vec<Vehicle>,
    pub count: usize,
    pub center: GeoPoint,
    pub radius_km: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub id: i64,
    pub name: String,
    pub code: Option<String>,
    pub district: Option<String>,
    pub center_lat: f64,
    pub center_lng: f64,
    #[serde(default)]
    pub population: Option<u64>,
    #[serde(default)]
    pub stops_count: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZoneList {
    pub zones: Vec<Zone>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stop {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub zone_id: Option<i64>,
    pub lat: f64,
    pub lng: f64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StopList {
    pub stops: Vec<Stop>,
    pub count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FareBreakdown {
    pub base_fare: i64,
    pub distance_fare: i64,
    pub time_fare: i64,
    pub total_fare: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FareEstimate {
    pub fare: FareBreakdown,
    pub mode: String,
    pub distance_km: f64,
    pub duration_minutes: f64,
    pub currency: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteOption {
    pub mode: String,
    pub distance_km: f64,
    pub duration_minutes: f64,
    pub estimated_fare: i64,
    #[serde(default)]
    pub route_polyline: Option<String>,
    #[serde(default)]
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoutePlan {
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub options: Vec<RouteOption>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Issue report submitted by a rider. `client_reference` correlates the
/// submission with local logs before the backend assigns a report id.
#[derive(Debug, Clone, Serialize)]
pub struct NewReport {
    #[serde(rename = "type")]
    pub report_type: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_registration: Option<String>,
    pub client_reference: String,
}

impl NewReport {
    pub fn new(report_type: &str, title: &str, description: &str) -> Self {
        Self {
            report_type: report_type.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            location: None,
            vehicle_registration: None,
            client_reference: uuid::Uuid::new_v4().to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportReceipt {
    #[serde(default)]
    pub success: bool,
    pub message: String,
    pub report_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub report_type: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportList {
    pub reports: Vec<ReportSummary>,
    pub count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Statistics {
    pub total_vehicles: u64,
    pub active_vehicles: u64,
    pub total_zones: u64,
    pub total_stops: u64,
    pub total_trips: u64,
    pub today_trips: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatisticsResponse {
    pub statistics: Statistics,
    #[serde(default)]
    pub timestamp: Option<String>,
}
