use tauri::{AppHandle, State};
use tauri_plugin_store::StoreExt;
use tracing::{info, warn};

use crate::config::RetouchConfig;

pub const PREFERENCES_FILE: &str = "preferences.json";
/// Stored processor URL, applied at the next launch.
pub const PROCESSOR_URL_KEY: &str = "processor_url";

#[tauri::command]
pub fn get_config(config: State<'_, RetouchConfig>) -> Result<RetouchConfig, String> {
    Ok(config.inner().clone())
}

#[tauri::command]
pub fn get_preference(app: AppHandle, key: &str) -> Result<Option<String>, String> {
    info!("Getting preference: {}", key);
    let store = app.store(PREFERENCES_FILE).map_err(|e| {
        warn!("Failed to open store: {}", e);
        e.to_string()
    })?;
    let value = store.get(key).and_then(|v| v.as_str().map(|s| s.to_string()));
    Ok(value)
}

#[tauri::command]
pub fn set_preference(
    app: AppHandle,
    config: State<'_, RetouchConfig>,
    key: &str,
    value: &str,
) -> Result<(), String> {
    info!("Setting preference: {} = {}", key, value);
    if key == PROCESSOR_URL_KEY {
        let candidate = RetouchConfig {
            processor_url: value.to_string(),
            ..config.inner().clone()
        };
        candidate.validate().map_err(|e| format!("{:#}", e))?;
    }

    let store = app.store(PREFERENCES_FILE).map_err(|e| {
        warn!("Failed to open store: {}", e);
        e.to_string()
    })?;
    store.set(key, serde_json::json!(value));
    store.save().map_err(|e| {
        warn!("Failed to save store: {}", e);
        e.to_string()
    })
}

/// Replace the processor URL in `config` with the stored one if it is valid.
pub fn apply_stored_url(app: &AppHandle, config: &mut RetouchConfig) {
    let Ok(store) = app.store(PREFERENCES_FILE) else {
        return;
    };
    let Some(url) = store
        .get(PROCESSOR_URL_KEY)
        .and_then(|v| v.as_str().map(|s| s.to_string()))
        .filter(|s| !s.is_empty())
    else {
        return;
    };

    let candidate = RetouchConfig {
        processor_url: url,
        ..config.clone()
    };
    match candidate.validate() {
        Ok(()) => {
            info!("Using stored processor URL {}", candidate.processor_url);
            *config = candidate;
        }
        Err(e) => warn!("Ignoring stored processor URL: {:#}", e),
    }
}
