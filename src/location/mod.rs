//! Geolocation types and the platform positioning seam.
//!
//! The `Geolocator` trait mirrors the positioning surface the client needs
//! from its host platform: one-shot position requests, a continuous watch
//! subscription, and permission introspection. The poller in this module's
//! `poller` submodule coalesces both mechanisms into one reported position.

pub mod poller;

pub use poller::LocationPoller;

use crate::settings::LocationSettings;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub lat: f64,
    pub lng: f64,
    /// Reported accuracy radius in meters.
    pub accuracy: f64,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub timestamp_ms: i64,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location information is unavailable")]
    PositionUnavailable,
    #[error("location request timed out")]
    Timeout,
    #[error("geolocation is not supported on this platform")]
    Unsupported,
}

impl GeoError {
    pub fn user_message(&self) -> &'static str {
        match self {
            GeoError::PermissionDenied => {
                "Location permission denied. Please enable location services in your settings."
            }
            GeoError::PositionUnavailable => "Location information is unavailable.",
            GeoError::Timeout => "Location request timed out. Please try again.",
            GeoError::Unsupported => "Location is not supported on this device.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    Prompt,
    Unsupported,
}

#[derive(Debug, Clone, Copy)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    pub maximum_age: Duration,
}

impl From<&LocationSettings> for PositionOptions {
    fn from(settings: &LocationSettings) -> Self {
        Self {
            high_accuracy: settings.high_accuracy,
            timeout: Duration::from_secs(settings.timeout_secs),
            maximum_age: Duration::from_secs(settings.maximum_age_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

/// An active continuous-watch subscription. Dropping the receiver does not
/// release the platform callback; call `Geolocator::clear_watch` with the id.
pub struct PositionWatch {
    pub id: WatchId,
    pub updates: mpsc::Receiver<Result<GeoPosition, GeoError>>,
}

/// Platform positioning capability.
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn permission_state(&self) -> PermissionState;

    /// Request a single position reading.
    async fn current_position(&self, options: &PositionOptions) -> Result<GeoPosition, GeoError>;

    /// Subscribe to continuous position updates pushed by the platform.
    fn watch_position(&self, options: &PositionOptions) -> Result<PositionWatch, GeoError>;

    /// Release a watch subscription obtained from `watch_position`.
    fn clear_watch(&self, id: WatchId);
}
