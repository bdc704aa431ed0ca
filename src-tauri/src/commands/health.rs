use serde::Serialize;
use tauri::State;
use tracing::info;

use super::session::AppDispatcher;
use crate::config::{default_config_path, RetouchConfig};
use crate::dispatcher::Command;
use crate::session::Connection;

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub processor_url: String,
    pub connected: bool,
    pub message: Option<String>,
    pub config_path: Option<String>,
    pub export_dir: String,
}

#[tauri::command]
pub async fn run_health_check(
    dispatcher: State<'_, AppDispatcher>,
    config: State<'_, RetouchConfig>,
) -> Result<HealthReport, String> {
    info!("Running health check against {}", config.processor_url);

    let outcome = dispatcher.dispatch(Command::CheckConnection).await;
    let connected = dispatcher.controller().view().connection == Connection::Connected;
    info!("Processor reachable: {}", connected);

    Ok(HealthReport {
        processor_url: config.processor_url.clone(),
        connected,
        message: outcome.message(),
        config_path: default_config_path().map(|p| p.to_string_lossy().to_string()),
        export_dir: dispatcher.export_dir().to_string_lossy().to_string(),
    })
}
