use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["window", "__TAURI__", "core"], catch)]
    async fn invoke(cmd: &str, args: JsValue) -> Result<JsValue, JsValue>;
}

// -- Arg structs for serialization --

#[derive(Serialize)]
struct LoadImageArgs {
    filename: String,
    data: String,
}

#[derive(Serialize)]
struct UpdateDraftArgs {
    field: String,
    value: f64,
}

#[derive(Serialize)]
struct RunCommandArgs {
    command: String,
}

#[derive(Serialize)]
struct HandleKeyArgs {
    chord: KeyChord,
}

#[derive(Serialize)]
struct ExportImageArgs {
    path: String,
}

#[derive(Serialize)]
struct GetPreferenceArgs {
    key: String,
}

#[derive(Serialize)]
struct SetPreferenceArgs {
    key: String,
    value: String,
}

// -- Types matching backend structs --

#[derive(Debug, Clone, Default, Serialize)]
pub struct KeyChord {
    pub key: String,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageInfo {
    pub id: String,
    pub filename: String,
    pub format: String,
    #[serde(default)]
    pub mode: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Snapshot {
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HistorySummary {
    pub entries: Vec<Snapshot>,
    pub cursor: Option<usize>,
    pub can_undo: bool,
    pub can_redo: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Histogram {
    Rgb {
        red: Vec<u64>,
        green: Vec<u64>,
        blue: Vec<u64>,
    },
    Gray {
        gray: Vec<u64>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Banner {
    pub kind: String,
    pub message: String,
}

impl Banner {
    pub fn is_persistent(&self) -> bool {
        self.kind == "persistent"
    }
}

/// Everything the editor renders.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionView {
    pub phase: String,
    pub activity: String,
    pub image: Option<ImageInfo>,
    pub draft: Snapshot,
    pub history: HistorySummary,
    pub is_processing: bool,
    pub is_uploading: bool,
    pub replaying: bool,
    pub original_preview: Option<String>,
    pub processed_preview: Option<String>,
    pub show_histogram: bool,
    pub comparison: bool,
    pub histogram_original: Option<Histogram>,
    pub histogram_processed: Option<Histogram>,
    pub banner: Option<Banner>,
    pub connection: String,
}

impl SessionView {
    pub fn is_busy(&self) -> bool {
        self.is_processing || self.is_uploading || self.replaying || self.activity == "exporting"
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DispatchReport {
    pub outcome: String,
    pub message: Option<String>,
    pub view: SessionView,
}

/// The configuration the backend is running with.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActiveConfig {
    pub processor_url: String,
    pub request_timeout_secs: u64,
    pub settle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthReport {
    pub processor_url: String,
    pub connected: bool,
    pub message: Option<String>,
    pub config_path: Option<String>,
    pub export_dir: String,
}

// -- Typed invoke helpers --

fn js_error(e: JsValue) -> String {
    e.as_string().unwrap_or_else(|| "Unknown error".to_string())
}

async fn call<A: Serialize, T: DeserializeOwned>(cmd: &str, args: &A) -> Result<T, String> {
    let args = serde_wasm_bindgen::to_value(args).map_err(|e| e.to_string())?;
    let result = invoke(cmd, args).await.map_err(js_error)?;
    serde_wasm_bindgen::from_value(result).map_err(|e| e.to_string())
}

pub async fn get_session() -> Result<SessionView, String> {
    call("get_session", &serde_json::json!({})).await
}

pub async fn load_image(filename: &str, data: String) -> Result<DispatchReport, String> {
    call(
        "load_image",
        &LoadImageArgs {
            filename: filename.to_string(),
            data,
        },
    )
    .await
}

/// `field` is one of `brightness`, `contrast`, `saturation`.
pub async fn update_draft(field: &str, value: f64) -> Result<DispatchReport, String> {
    call(
        "update_draft",
        &UpdateDraftArgs {
            field: field.to_string(),
            value,
        },
    )
    .await
}

/// `command` is a snake_case command name such as `apply` or `toggle_histogram`.
pub async fn run_command(command: &str) -> Result<DispatchReport, String> {
    call(
        "run_command",
        &RunCommandArgs {
            command: command.to_string(),
        },
    )
    .await
}

pub async fn handle_key(chord: KeyChord) -> Result<Option<DispatchReport>, String> {
    call("handle_key", &HandleKeyArgs { chord }).await
}

pub async fn export_image(path: &str) -> Result<DispatchReport, String> {
    call(
        "export_image",
        &ExportImageArgs {
            path: path.to_string(),
        },
    )
    .await
}

pub async fn get_config() -> Result<ActiveConfig, String> {
    call("get_config", &serde_json::json!({})).await
}

pub async fn run_health_check() -> Result<HealthReport, String> {
    call("run_health_check", &serde_json::json!({})).await
}

pub async fn get_preference(key: &str) -> Result<Option<String>, String> {
    call(
        "get_preference",
        &GetPreferenceArgs {
            key: key.to_string(),
        },
    )
    .await
}

pub async fn set_preference(key: &str, value: &str) -> Result<(), String> {
    let args = serde_wasm_bindgen::to_value(&SetPreferenceArgs {
        key: key.to_string(),
        value: value.to_string(),
    })
    .map_err(|e| e.to_string())?;

    invoke("set_preference", args)
        .await
        .map(|_| ())
        .map_err(js_error)
}
