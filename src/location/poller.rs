//! Continuous location tracking with an interval fallback.
//!
//! Two mechanisms feed one position slot: the platform's continuous watch,
//! and a fixed-interval one-shot poll that covers platforms where the watch
//! is slow to fire. A reading is accepted only when it is the first, or it
//! moved beyond a small coordinate epsilon, which keeps GPS jitter from
//! producing a stream of redundant updates.

use super::{GeoError, GeoPosition, Geolocator, PositionOptions, WatchId};
use crate::settings::LocationSettings;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Coordinate delta below which two readings count as the same position
/// (~11m at the equator).
pub const COORD_EPSILON: f64 = 0.0001;

struct PollerShared {
    provider: Arc<dyn Geolocator>,
    last: Mutex<Option<GeoPosition>>,
    positions: watch::Sender<Option<GeoPosition>>,
    last_error: Mutex<Option<GeoError>>,
    denied: AtomicBool,
}

impl PollerShared {
    /// Accept the reading if it is the first or moved beyond the epsilon.
    fn accept(&self, position: GeoPosition) -> bool {
        let mut last = self.last.lock().unwrap();
        if let Some(prev) = *last {
            if (position.lat - prev.lat).abs() <= COORD_EPSILON
                && (position.lng - prev.lng).abs() <= COORD_EPSILON
            {
                return false;
            }
        }
        *last = Some(position);
        let _ = self.positions.send_replace(Some(position));
        true
    }

    fn record_error(&self, err: GeoError) {
        if err == GeoError::PermissionDenied {
            // Permanent for this session; surfaced once.
            if !self.denied.swap(true, Ordering::SeqCst) {
                log::error!("{}", err.user_message());
            }
        } else {
            log::warn!("location update failed: {}", err);
        }
        *self.last_error.lock().unwrap() = Some(err);
    }
}

/// Tracks the device position until `stop` (or drop).
pub struct LocationPoller {
    shared: Arc<PollerShared>,
    watch_id: WatchId,
    watch_task: JoinHandle<()>,
    interval_task: Option<JoinHandle<()>>,
    stopped: AtomicBool,
}

impl LocationPoller {
    pub fn start(
        provider: Arc<dyn Geolocator>,
        settings: &LocationSettings,
    ) -> Result<Self, GeoError> {
        let options = PositionOptions::from(settings);
        let mut subscription = provider.watch_position(&options)?;
        let watch_id = subscription.id;

        let (positions, _) = watch::channel(None);
        let shared = Arc::new(PollerShared {
            provider: Arc::clone(&provider),
            last: Mutex::new(None),
            positions,
            last_error: Mutex::new(None),
            denied: AtomicBool::new(false),
        });

        let watch_task = {
            let shared = Arc::clone(&shared);
            tokio::spawn(async move {
                while let Some(update) = subscription.updates.recv().await {
                    match update {
                        Ok(position) => {
                            shared.accept(position);
                        }
                        Err(err) => {
                            shared.record_error(err);
                            if err == GeoError::PermissionDenied {
                                break;
                            }
                        }
                    }
                }
            })
        };

        // Interval fallback: explicitly re-request a position on a fixed
        // cadence in case the watch is slow to fire. Disabled when the
        // interval is zero.
        let interval_task = if settings.update_interval_secs > 0 {
            let shared = Arc::clone(&shared);
            let period = Duration::from_secs(settings.update_interval_secs);
            Some(tokio::spawn(async move {
                let mut ticker = interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                // the first tick completes immediately; the watch covers that
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    if shared.denied.load(Ordering::SeqCst) {
                        break;
                    }
                    match shared.provider.current_position(&options).await {
                        Ok(position) => {
                            shared.accept(position);
                        }
                        Err(err) => {
                            shared.record_error(err);
                            if err == GeoError::PermissionDenied {
                                break;
                            }
                        }
                    }
                }
            }))
        } else {
            None
        };

        log::debug!("location poller started (watch {:?})", watch_id);
        Ok(Self {
            shared,
            watch_id,
            watch_task,
            interval_task,
            stopped: AtomicBool::new(false),
        })
    }

    /// Observe accepted positions. The receiver holds the most recent
    /// accepted position, `None` until the first fix.
    pub fn positions(&self) -> watch::Receiver<Option<GeoPosition>> {
        self.shared.positions.subscribe()
    }

    pub fn current(&self) -> Option<GeoPosition> {
        *self.shared.last.lock().unwrap()
    }

    pub fn last_error(&self) -> Option<GeoError> {
        *self.shared.last_error.lock().unwrap()
    }

    pub fn permission_denied(&self) -> bool {
        self.shared.denied.load(Ordering::SeqCst)
    }

    /// Release the platform watch and stop the fallback poll. Idempotent.
    /// No position writes occur after this returns.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.watch_task.abort();
        if let Some(task) = &self.interval_task {
            task.abort();
        }
        self.shared.provider.clear_watch(self.watch_id);
        log::debug!("location poller stopped (watch {:?})", self.watch_id);
    }
}

impl Drop for LocationPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
