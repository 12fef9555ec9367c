use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    pub base_url: Option<String>,      // falls back to KIGALIGO_API_URL, then localhost
    pub timeout_secs: u64,
    pub init_timeout_ms: u64,          // upper bound on the silent-refresh at startup
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 10,
            init_timeout_ms: 2000,
        }
    }
}

impl ApiSettings {
    /// Resolve the backend base URL: explicit setting, then the
    /// `KIGALIGO_API_URL` environment variable, then the local default.
    pub fn resolved_base_url(&self) -> String {
        if let Some(ref url) = self.base_url {
            return url.trim_end_matches('/').to_string();
        }
        std::env::var("KIGALIGO_API_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationSettings {
    pub update_interval_secs: u64,     // fallback poll cadence (5-15s sensible)
    pub high_accuracy: bool,
    pub timeout_secs: u64,
    pub maximum_age_secs: u64,
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self {
            update_interval_secs: 10,
            high_accuracy: true,
            timeout_secs: 10,
            maximum_age_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleSettings {
    pub radius_km: f64,
    pub interval_secs: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for VehicleSettings {
    fn default() -> Self {
        Self {
            radius_km: 5.0,
            interval_secs: 30,
            max_retries: 3,
            retry_delay_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub location: LocationSettings,
    #[serde(default)]
    pub vehicles: VehicleSettings,
}

fn get_settings_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".config"));
    config_dir.join("kigaligo").join("settings.json")
}

pub fn load_settings() -> Result<Settings, SettingsError> {
    let path = get_settings_path();

    if !path.exists() {
        return Ok(Settings::default());
    }

    let contents = std::fs::read_to_string(&path)?;
    let settings = serde_json::from_str(&contents)?;
    Ok(settings)
}

pub fn save_settings(settings: &Settings) -> Result<(), SettingsError> {
    let path = get_settings_path();

    // Ensure directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = serde_json::to_string_pretty(settings)?;
    std::fs::write(&path, contents)?;

    log::info!("Settings saved to {:?}", path);
    Ok(())
}
