//! Realtime nearby-vehicle tracking.
//!
//! Polls the backend on a fixed cadence and publishes distance-sorted
//! snapshots. Transient failures retry with exponential backoff; rate
//! limiting waits out the server-suggested delay. Background failures are
//! logged rather than surfaced per occurrence. A manual `refresh` supersedes
//! any poll already in flight, and only the newest request's result is
//! applied.

use crate::api::client::{ApiClient, ApiError};
use crate::api::{GeoPoint, Vehicle};
use crate::settings::VehicleSettings;
use chrono::Utc;
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Duration, MissedTickBehavior};

const RATE_LIMIT_FALLBACK_SECS: u64 = 5;

#[derive(Debug, Clone, Default)]
pub struct VehicleSnapshot {
    pub vehicles: Vec<Vehicle>,
    pub last_update_ms: Option<i64>,
}

struct TrackerShared {
    api: Arc<ApiClient>,
    settings: VehicleSettings,
    center: GeoPoint,
    vehicle_type: Option<String>,
    snapshot: watch::Sender<VehicleSnapshot>,
    last_error: Mutex<Option<ApiError>>,
    refresh_now: Notify,
    generation: AtomicU64,
}

pub struct VehicleTracker {
    shared: Arc<TrackerShared>,
    task: JoinHandle<()>,
}

impl VehicleTracker {
    pub fn start(
        api: Arc<ApiClient>,
        settings: VehicleSettings,
        center: GeoPoint,
        vehicle_type: Option<String>,
    ) -> Self {
        let (snapshot, _) = watch::channel(VehicleSnapshot::default());
        let shared = Arc::new(TrackerShared {
            api,
            settings,
            center,
            vehicle_type,
            snapshot,
            last_error: Mutex::new(None),
            refresh_now: Notify::new(),
            generation: AtomicU64::new(0),
        });
        let task = tokio::spawn(run_loop(Arc::clone(&shared)));
        Self { shared, task }
    }

    /// Observe vehicle snapshots, sorted nearest-first.
    pub fn snapshots(&self) -> watch::Receiver<VehicleSnapshot> {
        self.shared.snapshot.subscribe()
    }

    /// Trigger an immediate poll. Any request already in flight is dropped
    /// and its (stale) result discarded.
    pub fn refresh(&self) {
        self.shared.refresh_now.notify_one();
    }

    pub fn last_error(&self) -> Option<ApiError> {
        self.shared.last_error.lock().unwrap().clone()
    }

    pub fn stop(&self) {
        self.task.abort();
        log::debug!("vehicle tracker stopped");
    }
}

impl Drop for VehicleTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_loop(shared: Arc<TrackerShared>) {
    let mut ticker = interval(Duration::from_secs(shared.settings.interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        // the first tick fires immediately, so the initial fetch is prompt
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shared.refresh_now.notified() => {
                ticker.reset();
            }
        }
        poll_once(&shared).await;
    }
}

async fn poll_once(shared: &TrackerShared) {
    let generation = shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
    let mut attempt: u32 = 0;

    loop {
        let fetch = shared.api.nearby_vehicles(
            shared.center,
            shared.settings.radius_km,
            shared.vehicle_type.as_deref(),
        );
        let result = tokio::select! {
            result = fetch => result,
            _ = shared.refresh_now.notified() => {
                // Superseded mid-flight: drop this request, hand the wakeup
                // back to the main loop so it issues a fresh one.
                shared.refresh_now.notify_one();
                return;
            }
        };

        if shared.generation.load(Ordering::SeqCst) != generation {
            return;
        }

        match result {
            Ok(mut nearby) => {
                nearby.vehicles.sort_by(|a, b| {
                    a.distance_km
                        .unwrap_or(0.0)
                        .partial_cmp(&b.distance_km.unwrap_or(0.0))
                        .unwrap_or(CmpOrdering::Equal)
                });
                *shared.last_error.lock().unwrap() = None;
                log::debug!("vehicle poll returned {} vehicles", nearby.vehicles.len());
                let _ = shared.snapshot.send_replace(VehicleSnapshot {
                    vehicles: nearby.vehicles,
                    last_update_ms: Some(Utc::now().timestamp_millis()),
                });
                return;
            }
            Err(ApiError::RateLimited {
                retry_after_secs, ..
            }) => {
                let wait = retry_after_secs.unwrap_or(RATE_LIMIT_FALLBACK_SECS);
                log::warn!("vehicle poll rate limited, retrying in {}s", wait);
                sleep(Duration::from_secs(wait)).await;
            }
            Err(err) => {
                attempt += 1;
                if attempt > shared.settings.max_retries {
                    log::error!(
                        "vehicle poll failed after {} retries: {}",
                        shared.settings.max_retries,
                        err
                    );
                    *shared.last_error.lock().unwrap() = Some(err);
                    return;
                }
                let delay = shared
                    .settings
                    .retry_delay_ms
                    .saturating_mul(1u64 << (attempt - 1));
                log::warn!(
                    "vehicle poll attempt {} failed ({}), retrying in {}ms",
                    attempt,
                    err,
                    delay
                );
                sleep(Duration::from_millis(delay)).await;
            }
        }
    }
}
