use zeroize::Zeroize;

use crate::error::{Result, SyncError};
use crate::settings::{load_settings, save_settings, settings_path};

pub fn run(url: &str, table: &str, timeout: u64) -> Result<()> {
    let mut settings = load_settings()?;
    settings.store_url = url.trim_end_matches('/').to_string();
    settings.table = table.to_string();
    settings.timeout_secs = timeout;

    let mut key = rpassword::prompt_password("Service key: ")?;
    if key.trim().is_empty() {
        key.zeroize();
        return Err(SyncError::Settings("Service key cannot be empty".into()));
    }
    settings.service_key = key.trim().to_string();
    key.zeroize();

    save_settings(&settings)?;
    settings.service_key.zeroize();

    println!("Saved store settings to {}", settings_path().display());
    Ok(())
}
