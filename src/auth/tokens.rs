use std::sync::Mutex;

/// Process-wide holder of the current access token.
///
/// Kept in memory only, never written to durable storage; the refresh
/// credential lives in the backend-managed HTTP-only cookie. Constructed
/// once at startup and shared by reference into the HTTP client and the
/// refresh coordinator.
#[derive(Debug, Default)]
pub struct TokenStore {
    current: Mutex<Option<String>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, token: &str) {
        *self.current.lock().unwrap() = Some(token.to_string());
    }

    pub fn get(&self) -> Option<String> {
        self.current.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        *self.current.lock().unwrap() = None;
    }
}
