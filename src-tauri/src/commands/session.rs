use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use tauri::State;
use tracing::info;

use crate::dispatcher::{Command, CommandDispatcher, KeyChord};
use crate::processor::{HttpProcessor, ImageFile};
use crate::session::{Field, Outcome, OutcomeKind, SessionView};

pub type AppDispatcher = CommandDispatcher<HttpProcessor>;

/// What the frontend gets back from every session command.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub outcome: OutcomeKind,
    pub message: Option<String>,
    pub view: SessionView,
}

impl DispatchReport {
    fn new(outcome: Outcome, dispatcher: &AppDispatcher) -> Self {
        Self {
            outcome: outcome.kind(),
            message: outcome.message(),
            view: dispatcher.controller().view(),
        }
    }
}

#[tauri::command]
pub fn get_session(dispatcher: State<'_, AppDispatcher>) -> Result<SessionView, String> {
    Ok(dispatcher.controller().view())
}

/// `data` is the file content, base64 encoded by the webview.
#[tauri::command]
pub async fn load_image(
    dispatcher: State<'_, AppDispatcher>,
    filename: String,
    data: String,
) -> Result<DispatchReport, String> {
    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|e| format!("Invalid file data: {}", e))?;
    info!("Received {} ({} bytes) from webview", filename, bytes.len());

    let outcome = dispatcher
        .controller()
        .load_image(ImageFile::new(filename, bytes))
        .await;
    Ok(DispatchReport::new(outcome, &dispatcher))
}

#[tauri::command]
pub fn update_draft(
    dispatcher: State<'_, AppDispatcher>,
    field: Field,
    value: f64,
) -> Result<DispatchReport, String> {
    let outcome = dispatcher.controller().update_draft(field, value);
    Ok(DispatchReport::new(outcome, &dispatcher))
}

#[tauri::command]
pub async fn run_command(
    dispatcher: State<'_, AppDispatcher>,
    command: Command,
) -> Result<DispatchReport, String> {
    let outcome = dispatcher.dispatch(command).await;
    Ok(DispatchReport::new(outcome, &dispatcher))
}

/// Returns `None` for chords with no binding so the webview can let the
/// browser handle them.
#[tauri::command]
pub async fn handle_key(
    dispatcher: State<'_, AppDispatcher>,
    chord: KeyChord,
) -> Result<Option<DispatchReport>, String> {
    let outcome = dispatcher.dispatch_key(&chord).await;
    Ok(outcome.map(|o| DispatchReport::new(o, &dispatcher)))
}

/// Save-as: like `Command::Save` but to an explicit path.
#[tauri::command]
pub async fn export_image(
    dispatcher: State<'_, AppDispatcher>,
    path: String,
) -> Result<DispatchReport, String> {
    let outcome = dispatcher
        .controller()
        .export(std::path::Path::new(&path))
        .await;
    Ok(DispatchReport::new(outcome, &dispatcher))
}
