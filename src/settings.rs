use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// Connection details for the remote store, kept in `~/.config/roomsync/settings.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub store_url: String,
    #[serde(default)]
    pub service_key: String,
    #[serde(default = "default_table")]
    pub table: String,
    /// Per-call timeout for every remote request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_table() -> String {
    "reservations".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_url: String::new(),
            service_key: String::new(),
            table: default_table(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("roomsync")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn load_settings() -> Result<Settings> {
    let path = settings_path();
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(&path)?;
    serde_json::from_str(&content)
        .map_err(|e| SyncError::Settings(format!("{}: {e}", path.display())))
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| SyncError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    restrict_permissions(&settings_path())?;
    Ok(())
}

/// The file holds the service key, so keep it owner-only where the platform allows.
#[cfg(unix)]
fn restrict_permissions(path: &std::path::Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &std::path::Path) -> Result<()> {
    Ok(())
}
