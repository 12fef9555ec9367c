//! Auth session facade.
//!
//! One place for everything account-shaped: registration, sign-in/out,
//! password reset, email verification and the silent session restore at
//! startup. Wraps the backend calls with consistent user-message mapping
//! and keeps the derived session state consistent with the token store.

use super::refresh::RefreshCoordinator;
use super::tokens::TokenStore;
use super::{AuthEvents, SessionEvent, SessionSnapshot};
use crate::api::client::{ApiClient, ApiError};
use crate::api::{ApiMessage, RegisterOutcome, User};
use crate::settings::ApiSettings;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

pub struct AuthSession {
    api: Arc<ApiClient>,
    refresher: Arc<RefreshCoordinator>,
    tokens: Arc<TokenStore>,
    events: AuthEvents,
    state: Mutex<SessionSnapshot>,
    init_timeout: Duration,
}

impl AuthSession {
    pub fn new(
        api: Arc<ApiClient>,
        refresher: Arc<RefreshCoordinator>,
        tokens: Arc<TokenStore>,
        events: AuthEvents,
        settings: &ApiSettings,
    ) -> Self {
        Self {
            api,
            refresher,
            tokens,
            events,
            state: Mutex::new(SessionSnapshot {
                user: None,
                authenticated: false,
                loading: true,
            }),
            init_timeout: Duration::from_millis(settings.init_timeout_ms),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().unwrap().clone()
    }

    pub fn events(&self) -> &AuthEvents {
        &self.events
    }

    /// React to `Invalidated` broadcasts from the refresh coordinator by
    /// resetting local session state, independent of any in-flight call.
    pub fn spawn_invalidation_listener(self: Arc<Self>) -> JoinHandle<()> {
        let session = self;
        let mut rx = session.events.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(SessionEvent::Invalidated) => {
                        log::info!("session invalidated, clearing local state");
                        session.clear_local_state();
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("session event listener lagged by {}", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Attempt to restore a previous session on startup via a silent
    /// refresh. Never fails: any error (or a hang beyond the safety
    /// timeout) settles the session to unauthenticated with `loading`
    /// cleared.
    pub async fn initialize(&self) {
        let restored = tokio::time::timeout(self.init_timeout, self.restore_session()).await;

        let mut state = self.state.lock().unwrap();
        match restored {
            Ok(Ok(user)) => {
                log::info!("session restored for {}", user.email);
                state.user = Some(user);
                state.authenticated = true;
            }
            Ok(Err(err)) => {
                log::info!("no active session: {}", err);
                state.user = None;
                state.authenticated = false;
            }
            Err(_) => {
                log::warn!(
                    "session restore exceeded {}ms, continuing unauthenticated",
                    self.init_timeout.as_millis()
                );
                state.user = None;
                state.authenticated = false;
            }
        }
        state.loading = false;
    }

    async fn restore_session(&self) -> Result<User, ApiError> {
        Arc::clone(&self.refresher).refresh_access_token().await?;
        self.api.me().await
    }

    /// Register a new account. Field-level validation problems (email
    /// taken, weak password) arrive in the error's `user_message`.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<RegisterOutcome, ApiError> {
        match self.api.register(email, password, name).await {
            Ok(outcome) => {
                log::info!("registration accepted for {}", email);
                Ok(outcome)
            }
            Err(err) => {
                log::warn!("registration failed: {}", err.user_message());
                Err(err)
            }
        }
    }

    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
        remember: bool,
    ) -> Result<User, ApiError> {
        match self.api.login(email, password, remember).await {
            Ok(login) => {
                self.tokens.set(&login.access_token);
                {
                    let mut state = self.state.lock().unwrap();
                    state.user = Some(login.user.clone());
                    state.authenticated = true;
                    state.loading = false;
                }
                self.events.publish(SessionEvent::SignedIn);
                log::info!("signed in as {}", login.user.email);
                Ok(login.user)
            }
            Err(err) => {
                // Session stays exactly as it was; caller decides what to show
                log::warn!("sign-in failed: {}", err.user_message());
                Err(err)
            }
        }
    }

    /// Best-effort backend logout. Local state is cleared unconditionally;
    /// a signed-out client must never stay locally authenticated because
    /// the network was down.
    pub async fn sign_out(&self) {
        if let Err(err) = self.api.logout().await {
            log::warn!("logout request failed: {}", err);
        }
        self.clear_local_state();
        self.events.publish(SessionEvent::SignedOut);
        log::info!("signed out");
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<ApiMessage, ApiError> {
        match self.api.forgot_password(email).await {
            Ok(message) => Ok(message),
            Err(err) => {
                log::warn!("password reset request failed: {}", err.user_message());
                Err(err)
            }
        }
    }

    pub async fn reset_password(&self, token: &str, password: &str) -> Result<ApiMessage, ApiError> {
        match self.api.reset_password(token, password).await {
            Ok(message) => Ok(message),
            Err(err) => {
                log::warn!("password reset failed: {}", err.user_message());
                Err(err)
            }
        }
    }

    pub async fn verify_email(&self, token: &str) -> Result<ApiMessage, ApiError> {
        match self.api.verify_email(token).await {
            Ok(message) => Ok(message),
            Err(err) => {
                log::warn!("email verification failed: {}", err.user_message());
                Err(err)
            }
        }
    }

    /// Re-fetch the signed-in user's profile. Failure propagates without
    /// touching session state; this is a profile read, not a token refresh.
    pub async fn refresh_user(&self) -> Result<User, ApiError> {
        let user = self.api.me().await?;
        self.state.lock().unwrap().user = Some(user.clone());
        Ok(user)
    }

    fn clear_local_state(&self) {
        self.tokens.clear();
        let mut state = self.state.lock().unwrap();
        state.user = None;
        state.authenticated = false;
        state.loading = false;
    }
}
