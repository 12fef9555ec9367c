//! KigaliGo client core.
//!
//! UI-independent heart of the KigaliGo transit client: authenticated
//! backend access with in-memory tokens and single-flight refresh, realtime
//! vehicle and device-location tracking, fare estimation and trip planning
//! calls. A shell (desktop window, web view) embeds [`App`] and observes
//! state through snapshots and watch channels.

pub mod api;
pub mod auth;
pub mod location;
pub mod password;
pub mod settings;
pub mod vehicles;

pub use api::client::{ApiClient, ApiError};
pub use auth::{AuthEvents, AuthSession, RefreshCoordinator, SessionEvent, TokenStore};
pub use settings::Settings;

use std::sync::Arc;
use tokio::task::JoinHandle;

/// Initialize logging for embedding binaries. Call once at startup.
pub fn init_logging() {
    env_logger::init();
}

/// The assembled client core. Single construction point for the token
/// store, event channel, refresh coordinator, HTTP client and session
/// facade, all shared by reference rather than hidden globals.
pub struct App {
    pub settings: Settings,
    pub tokens: Arc<TokenStore>,
    pub events: AuthEvents,
    pub api: Arc<ApiClient>,
    pub auth: Arc<AuthSession>,
    invalidation_listener: JoinHandle<()>,
}

impl App {
    /// Construct every component and wire them together. Must run inside a
    /// tokio runtime; does not touch the network.
    pub fn assemble(settings: Settings) -> Result<Self, ApiError> {
        let tokens = Arc::new(TokenStore::new());
        let events = AuthEvents::new();
        let base_url = settings.api.resolved_base_url();
        let http = api::client::build_http_client(&settings.api)?;

        let refresher = Arc::new(RefreshCoordinator::new(
            http.clone(),
            base_url.clone(),
            Arc::clone(&tokens),
            events.clone(),
        ));
        let api = Arc::new(ApiClient::new(
            http,
            base_url,
            Arc::clone(&tokens),
            Arc::clone(&refresher),
        ));
        let auth = Arc::new(AuthSession::new(
            Arc::clone(&api),
            refresher,
            Arc::clone(&tokens),
            events.clone(),
            &settings.api,
        ));
        let invalidation_listener = Arc::clone(&auth).spawn_invalidation_listener();

        Ok(Self {
            settings,
            tokens,
            events,
            api,
            auth,
            invalidation_listener,
        })
    }

    /// Assemble the core and attempt to restore a previous session. The
    /// restore is bounded; this never fails because of it.
    pub async fn bootstrap(settings: Settings) -> Result<Self, ApiError> {
        let app = Self::assemble(settings)?;
        app.auth.initialize().await;
        Ok(app)
    }

    pub fn shutdown(&self) {
        self.invalidation_listener.abort();
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.shutdown();
    }
}
