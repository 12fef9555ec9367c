//! Single-flight access-token refresh.
//!
//! At most one refresh HTTP call is outstanding at any time. Callers that
//! need a fresh token while a flight is in progress are queued and settled
//! together when it completes. The new token is committed to the store
//! before any waiter is resolved, so a resolved caller can never read a
//! stale token.

use super::tokens::TokenStore;
use super::{AuthEvents, SessionEvent};
use crate::api::client::ApiError;
use crate::api::RefreshResponse;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    waiters: Vec<oneshot::Sender<Result<String, ApiError>>>,
}

pub struct RefreshCoordinator {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenStore>,
    events: AuthEvents,
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    pub fn new(
        http: reqwest::Client,
        base_url: String,
        tokens: Arc<TokenStore>,
        events: AuthEvents,
    ) -> Self {
        Self {
            http,
            base_url,
            tokens,
            events,
            state: Mutex::new(RefreshState::default()),
        }
    }

    /// Obtain a fresh access token, sharing any refresh already in flight.
    ///
    /// The first caller starts the flight; every caller (initiator included)
    /// waits on its outcome. The flight itself runs as a detached task, so a
    /// caller that gets cancelled mid-wait cannot strand the queue: the
    /// coordinator always settles back to idle with every waiter resolved.
    /// On failure every waiter is rejected, the token store is cleared and a
    /// single `Invalidated` event is published for the failed flight.
    pub async fn refresh_access_token(self: Arc<Self>) -> Result<String, ApiError> {
        let rx = {
            let mut state = self.state.lock().unwrap();
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            if !state.refreshing {
                state.refreshing = true;
                let coordinator = Arc::clone(&self);
                tokio::spawn(async move {
                    coordinator.run_flight().await;
                });
            }
            rx
        };
        rx.await.unwrap_or(Err(ApiError::SessionExpired))
    }

    async fn run_flight(&self) {
        let result = match self.request_refresh().await {
            Ok(token) => {
                // Commit before waking anyone up.
                self.tokens.set(&token);
                log::debug!("access token refreshed");
                Ok(token)
            }
            Err(err) => {
                self.tokens.clear();
                log::warn!("token refresh failed: {}", err);
                Err(err)
            }
        };

        let waiters = {
            let mut state = self.state.lock().unwrap();
            state.refreshing = false;
            std::mem::take(&mut state.waiters)
        };
        for tx in waiters {
            let _ = tx.send(result.clone());
        }

        if result.is_err() {
            self.events.publish(SessionEvent::Invalidated);
        }
    }

    /// One refresh call. Authentication rides on the HTTP-only refresh
    /// cookie the client's cookie store carries; no bearer token is sent.
    async fn request_refresh(&self) -> Result<String, ApiError> {
        let url = format!("{}/api/auth/refresh", self.base_url);
        let response = self
            .http
            .post(&url)
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json().await.ok();
            return Err(ApiError::from_status(status.as_u16(), body));
        }

        let parsed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(parsed.access_token)
    }
}
