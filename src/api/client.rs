//! HTTP client for the KigaliGo backend.
//!
//! Every outgoing request attaches the current access token as a bearer
//! credential when one is held. A 401 on an authenticated route is recovered
//! once: the request waits on the shared refresh flight, then re-sends with
//! the fresh token. A second failure propagates unchanged. Requests to
//! credential endpoints (login, register, password reset) never take the
//! refresh path, so a 401 there surfaces the server's own message.

use super::*;
use crate::auth::refresh::RefreshCoordinator;
use crate::auth::tokens::TokenStore;
use crate::settings::ApiSettings;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub type FieldErrors = HashMap<String, Vec<String>>;

/// Fixed user-facing guidance for one error category.
#[derive(Debug, Clone, Copy)]
pub struct ErrorAdvice {
    pub title: &'static str,
    pub message: &'static str,
    pub action: &'static str,
}

const ADVICE_NETWORK: ErrorAdvice = ErrorAdvice {
    title: "Network Error",
    message: "Unable to connect to the server. Please check your internet connection.",
    action: "Please try again later.",
};
const ADVICE_TIMEOUT: ErrorAdvice = ErrorAdvice {
    title: "Request Timeout",
    message: "The request took too long to complete.",
    action: "Please check your connection and try again.",
};
const ADVICE_VALIDATION: ErrorAdvice = ErrorAdvice {
    title: "Invalid Input",
    message: "Please check your input and try again.",
    action: "Make sure all required fields are filled correctly.",
};
const ADVICE_UNAUTHORIZED: ErrorAdvice = ErrorAdvice {
    title: "Authentication Required",
    message: "You need to be logged in to access this feature.",
    action: "Please log in to continue.",
};
const ADVICE_FORBIDDEN: ErrorAdvice = ErrorAdvice {
    title: "Access Denied",
    message: "You don't have permission to perform this action.",
    action: "Contact support if you believe this is an error.",
};
const ADVICE_NOT_FOUND: ErrorAdvice = ErrorAdvice {
    title: "Not Found",
    message: "The requested resource was not found.",
    action: "Please check the information and try again.",
};
const ADVICE_RATE_LIMIT: ErrorAdvice = ErrorAdvice {
    title: "Too Many Requests",
    message: "You've made too many requests. Please wait.",
    action: "Try again in a few moments.",
};
const ADVICE_SERVER: ErrorAdvice = ErrorAdvice {
    title: "Server Error",
    message: "Something went wrong on our end.",
    action: "Please try again in a few minutes.",
};
const ADVICE_UNKNOWN: ErrorAdvice = ErrorAdvice {
    title: "Unexpected Error",
    message: "An unexpected error occurred.",
    action: "Please try again or contact support.",
};

/// Error taxonomy for backend calls. Payloads are owned so a single failure
/// can be cloned out to every waiter queued on a refresh flight.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("validation error")]
    Validation {
        message: Option<String>,
        errors: FieldErrors,
    },
    #[error("unauthorized")]
    Unauthorized { message: Option<String> },
    #[error("forbidden")]
    Forbidden { message: Option<String> },
    #[error("not found")]
    NotFound { message: Option<String> },
    #[error("rate limited")]
    RateLimited {
        message: Option<String>,
        retry_after_secs: Option<u64>,
    },
    #[error("server error ({status})")]
    Server { status: u16, message: Option<String> },
    #[error("unexpected response ({status})")]
    Unexpected { status: u16, message: Option<String> },
    #[error("invalid response body: {0}")]
    Decode(String),
    #[error("session expired")]
    SessionExpired,
}

impl ApiError {
    pub(crate) fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Network(err.to_string())
        }
    }

    pub(crate) fn from_status(status: u16, body: Option<ErrorBody>) -> Self {
        let message = body.as_ref().and_then(ErrorBody::best_message);
        match status {
            400 => ApiError::Validation {
                message,
                errors: body.and_then(|b| b.errors).unwrap_or_default(),
            },
            401 => ApiError::Unauthorized { message },
            403 => ApiError::Forbidden { message },
            404 => ApiError::NotFound { message },
            429 => ApiError::RateLimited {
                message,
                retry_after_secs: body.and_then(|b| b.retry_after),
            },
            500..=599 => ApiError::Server { status, message },
            _ => ApiError::Unexpected { status, message },
        }
    }

    pub fn advice(&self) -> &'static ErrorAdvice {
        match self {
            ApiError::Network(_) => &ADVICE_NETWORK,
            ApiError::Timeout => &ADVICE_TIMEOUT,
            ApiError::Validation { .. } => &ADVICE_VALIDATION,
            ApiError::Unauthorized { .. } | ApiError::SessionExpired => &ADVICE_UNAUTHORIZED,
            ApiError::Forbidden { .. } => &ADVICE_FORBIDDEN,
            ApiError::NotFound { .. } => &ADVICE_NOT_FOUND,
            ApiError::RateLimited { .. } => &ADVICE_RATE_LIMIT,
            ApiError::Server { .. } => &ADVICE_SERVER,
            ApiError::Unexpected { .. } | ApiError::Decode(_) => &ADVICE_UNKNOWN,
        }
    }

    fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Validation { message, .. }
            | ApiError::Unauthorized { message }
            | ApiError::Forbidden { message }
            | ApiError::NotFound { message }
            | ApiError::RateLimited { message, .. }
            | ApiError::Server { message, .. }
            | ApiError::Unexpected { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Message suitable for direct display. Prefers the server-supplied
    /// message, then field-level validation detail, then the fixed advice.
    pub fn user_message(&self) -> String {
        if let Some(message) = self.server_message() {
            return message.to_string();
        }
        if let ApiError::Validation { errors, .. } = self {
            for field in ["email", "password"] {
                if let Some(first) = errors.get(field).and_then(|list| list.first()) {
                    return first.clone();
                }
            }
        }
        self.advice().message.to_string()
    }
}

/// Error payload shape shared by the backend's endpoints. Some routes use
/// `message`, others `error`; both are accepted.
#[derive(Debug, Clone, Deserialize, Default)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub errors: Option<FieldErrors>,
    #[serde(default)]
    pub retry_after: Option<u64>,
}

impl ErrorBody {
    fn best_message(&self) -> Option<String> {
        self.message.clone().or_else(|| self.error.clone())
    }
}

pub(crate) fn build_http_client(settings: &ApiSettings) -> Result<reqwest::Client, ApiError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .cookie_store(true)
        .build()
        .map_err(|e| ApiError::Network(e.to_string()))
}

struct RequestSpec {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    /// Attach the bearer token and recover a 401 via the refresh flight.
    /// False for credential endpoints, where a 401 means bad credentials.
    authenticate: bool,
}

impl RequestSpec {
    fn get(path: &str) -> Self {
        Self {
            method: Method::GET,
            path: path.to_string(),
            query: Vec::new(),
            body: None,
            authenticate: true,
        }
    }

    fn post(path: &str, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            path: path.to_string(),
            query: Vec::new(),
            body: Some(body),
            authenticate: true,
        }
    }

    fn public(mut self) -> Self {
        self.authenticate = false;
        self
    }

    fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenStore>,
    refresher: Arc<RefreshCoordinator>,
}

impl ApiClient {
    pub fn new(
        http: reqwest::Client,
        base_url: String,
        tokens: Arc<TokenStore>,
        refresher: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            http,
            base_url,
            tokens,
            refresher,
        }
    }

    async fn dispatch(
        &self,
        spec: &RequestSpec,
        bearer: Option<&str>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}{}", self.base_url, spec.path);
        let mut request = self.http.request(spec.method.clone(), &url);
        if !spec.query.is_empty() {
            request = request.query(&spec.query);
        }
        if let Some(body) = &spec.body {
            request = request.json(body);
        }
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        request.send().await.map_err(|e| ApiError::from_reqwest(&e))
    }

    async fn read_error(response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let body = response.json::<ErrorBody>().await.ok();
        ApiError::from_status(status, body)
    }

    async fn finish<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        if response.status().is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()))
        } else {
            Err(Self::read_error(response).await)
        }
    }

    async fn send<T: DeserializeOwned>(&self, spec: RequestSpec) -> Result<T, ApiError> {
        let response = self.run(&spec).await?;
        Self::finish(response).await
    }

    /// Like `send` but discards the response body (endpoints returning `{}`).
    async fn send_unit(&self, spec: RequestSpec) -> Result<(), ApiError> {
        let response = self.run(&spec).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::read_error(response).await)
        }
    }

    async fn run(&self, spec: &RequestSpec) -> Result<reqwest::Response, ApiError> {
        let token = if spec.authenticate {
            self.tokens.get()
        } else {
            None
        };
        let response = self.dispatch(spec, token.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED || !spec.authenticate {
            return Ok(response);
        }

        // First 401 on an authenticated route: wait on the (single-flight)
        // refresh, then re-send exactly once. The fresh token is committed
        // to the store before the coordinator resolves us.
        log::debug!("401 on {} {}, refreshing session", spec.method, spec.path);
        let fresh = Arc::clone(&self.refresher).refresh_access_token().await?;
        self.dispatch(spec, Some(&fresh)).await
    }

    // ---- auth endpoints ----

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<RegisterOutcome, ApiError> {
        self.send(
            RequestSpec::post(
                "/api/auth/register",
                serde_json::json!({ "email": email, "password": password, "name": name }),
            )
            .public(),
        )
        .await
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember: bool,
    ) -> Result<LoginResponse, ApiError> {
        self.send(
            RequestSpec::post(
                "/api/auth/login",
                serde_json::json!({ "email": email, "password": password, "remember": remember }),
            )
            .public(),
        )
        .await
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        self.send_unit(RequestSpec::post("/api/auth/logout", serde_json::json!({})))
            .await
    }

    pub async fn me(&self) -> Result<User, ApiError> {
        let response: MeResponse = self.send(RequestSpec::get("/api/auth/me")).await?;
        Ok(response.user)
    }

    pub async fn verify_email(&self, token: &str) -> Result<ApiMessage, ApiError> {
        self.send(
            RequestSpec::get("/api/auth/verify-email")
                .with_query(vec![("token".to_string(), token.to_string())])
                .public(),
        )
        .await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<ApiMessage, ApiError> {
        self.send(
            RequestSpec::post(
                "/api/auth/forgot-password",
                serde_json::json!({ "email": email }),
            )
            .public(),
        )
        .await
    }

    pub async fn reset_password(&self, token: &str, password: &str) -> Result<ApiMessage, ApiError> {
        self.send(
            RequestSpec::post(
                "/api/auth/reset-password",
                serde_json::json!({ "token": token, "password": password }),
            )
            .public(),
        )
        .await
    }

    // ---- transit endpoints ----

    pub async fn nearby_vehicles(
        &self,
        center: GeoPoint,
        radius_km: f64,
        vehicle_type: Option<&str>,
    ) -> Result<NearbyVehicles, ApiError> {
        let mut query = vec![
            ("lat".to_string(), center.lat.to_string()),
            ("lng".to_string(), center.lng.to_string()),
            ("radius".to_string(), radius_km.to_string()),
        ];
        if let Some(kind) = vehicle_type {
            query.push(("type".to_string(), kind.to_string()));
        }
        self.send(RequestSpec::get("/api/v1/vehicles/nearby").with_query(query))
            .await
    }

    pub async fn zones(&self) -> Result<ZoneList, ApiError> {
        self.send(RequestSpec::get("/api/v1/zones")).await
    }

    pub async fn stops(&self, zone_id: Option<i64>) -> Result<StopList, ApiError> {
        let mut spec = RequestSpec::get("/api/v1/stops");
        if let Some(zone) = zone_id {
            spec = spec.with_query(vec![("zone_id".to_string(), zone.to_string())]);
        }
        self.send(spec).await
    }

    pub async fn estimate_fare(
        &self,
        distance_km: f64,
        duration_minutes: f64,
        mode: &str,
    ) -> Result<FareEstimate, ApiError> {
        self.send(RequestSpec::get("/api/v1/fare/estimate").with_query(vec![
            ("distance_km".to_string(), distance_km.to_string()),
            ("duration_minutes".to_string(), duration_minutes.to_string()),
            ("mode".to_string(), mode.to_string()),
        ]))
        .await
    }

    pub async fn plan_route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<RoutePlan, ApiError> {
        self.send(RequestSpec::get("/api/v1/routes/plan").with_query(vec![
            (
                "origin".to_string(),
                format!("{},{}", origin.lat, origin.lng),
            ),
            (
                "destination".to_string(),
                format!("{},{}", destination.lat, destination.lng),
            ),
        ]))
        .await
    }

    pub async fn submit_report(&self, report: &NewReport) -> Result<ReportReceipt, ApiError> {
        let body = serde_json::to_value(report).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.send(RequestSpec::post("/api/v1/reports", body)).await
    }

    pub async fn reports(
        &self,
        report_type: Option<&str>,
        status: Option<&str>,
    ) -> Result<ReportList, ApiError> {
        let mut query = Vec::new();
        if let Some(kind) = report_type {
            query.push(("type".to_string(), kind.to_string()));
        }
        if let Some(state) = status {
            query.push(("status".to_string(), state.to_string()));
        }
        self.send(RequestSpec::get("/api/v1/reports").with_query(query))
            .await
    }

    pub async fn statistics(&self) -> Result<StatisticsResponse, ApiError> {
        self.send(RequestSpec::get("/api/v1/statistics")).await
    }
}
