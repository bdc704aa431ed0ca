//! Maps user triggers (buttons, keyboard chords) onto controller operations.
//!
//! Every command is checked against the controller's [`Capabilities`] before
//! it is forwarded; a command whose predicate does not hold is refused here
//! without touching the controller.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::processor::{ImageInfo, RemoteProcessor};
use crate::session::{Capabilities, Outcome, Refusal, SessionController};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Apply,
    Undo,
    Redo,
    Reset,
    AutoAdjust,
    Clahe,
    SCurve,
    ToggleHistogram,
    ToggleComparison,
    Save,
    NewImage,
    CheckConnection,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Apply => "apply",
            Command::Undo => "undo",
            Command::Redo => "redo",
            Command::Reset => "reset",
            Command::AutoAdjust => "auto_adjust",
            Command::Clahe => "clahe",
            Command::SCurve => "s_curve",
            Command::ToggleHistogram => "toggle_histogram",
            Command::ToggleComparison => "toggle_comparison",
            Command::Save => "save",
            Command::NewImage => "new_image",
            Command::CheckConnection => "check_connection",
        }
    }

    /// The refusal this command gets under `caps`, or `None` if it may run.
    pub fn gate(&self, caps: &Capabilities) -> Option<Refusal> {
        let busy = caps.busy();
        let needs_image = !matches!(self, Command::NewImage | Command::CheckConnection);
        if needs_image && !caps.has_image {
            return Some(Refusal::NoImage);
        }
        match self {
            Command::Apply | Command::AutoAdjust | Command::Clahe | Command::SCurve if busy => {
                Some(Refusal::Busy)
            }
            Command::Undo | Command::Redo | Command::Reset if busy => Some(Refusal::Busy),
            Command::Undo if !caps.can_undo => Some(Refusal::NothingToUndo),
            Command::Redo if !caps.can_redo => Some(Refusal::NothingToRedo),
            Command::Save if !caps.has_processed => Some(Refusal::NoProcessedImage),
            Command::Save if busy => Some(Refusal::Busy),
            _ => None,
        }
    }

    pub fn is_enabled(&self, caps: &Capabilities) -> bool {
        self.gate(caps).is_none()
    }
}

/// A key press as reported by the webview.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct KeyChord {
    pub key: String,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub meta: bool,
    #[serde(default)]
    pub shift: bool,
}

impl KeyChord {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// Ctrl on Linux/Windows, Cmd on macOS.
    fn primary(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Resolve a chord to a command. Bindings all use the primary modifier.
///
/// Ctrl+Z undoes when there is something to undo and otherwise resets.
pub fn bind_key(chord: &KeyChord, caps: &Capabilities) -> Option<Command> {
    if !chord.primary() {
        return None;
    }
    let key = chord.key.to_ascii_lowercase();
    let command = match (key.as_str(), chord.shift) {
        ("enter", _) => Command::Apply,
        ("z", false) if caps.can_undo => Command::Undo,
        ("z", false) => Command::Reset,
        ("z", true) | ("y", _) => Command::Redo,
        ("a", _) => Command::AutoAdjust,
        ("h", _) => Command::ToggleHistogram,
        ("s", _) => Command::Save,
        _ => return None,
    };
    Some(command)
}

/// Where Save writes the processed image.
pub fn export_path(dir: &Path, image: &ImageInfo) -> PathBuf {
    let name = Path::new(&image.filename)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "image.jpg".to_string());
    dir.join(format!("processed_{}", name))
}

pub struct CommandDispatcher<P: RemoteProcessor> {
    controller: SessionController<P>,
    export_dir: PathBuf,
}

impl<P: RemoteProcessor> CommandDispatcher<P> {
    pub fn new(controller: SessionController<P>, export_dir: PathBuf) -> Self {
        Self {
            controller,
            export_dir,
        }
    }

    pub fn controller(&self) -> &SessionController<P> {
        &self.controller
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// Run `command` if its capability predicate holds.
    pub async fn dispatch(&self, command: Command) -> Outcome {
        let caps = self.controller.capabilities();
        if let Some(refusal) = command.gate(&caps) {
            debug!("{} not available: {}", command.name(), refusal.reason());
            return Outcome::Refused(refusal);
        }

        info!("Dispatching {}", command.name());
        match command {
            Command::Apply => self.controller.commit().await,
            Command::Undo => self.controller.undo().await,
            Command::Redo => self.controller.redo().await,
            Command::Reset => self.controller.reset(),
            Command::AutoAdjust => self.controller.auto_adjust().await,
            Command::Clahe => self.controller.clahe().await,
            Command::SCurve => self.controller.s_curve().await,
            Command::ToggleHistogram => self.controller.toggle_histogram().await,
            Command::ToggleComparison => self.controller.toggle_comparison(),
            Command::Save => match self.controller.image() {
                Some(image) => {
                    let path = export_path(&self.export_dir, &image);
                    self.controller.export(&path).await
                }
                None => Outcome::Refused(Refusal::NoImage),
            },
            Command::NewImage => self.controller.new_image().await,
            Command::CheckConnection => self.controller.check_connection().await,
        }
    }

    /// Resolve and dispatch a key press. `None` when the chord is unbound.
    pub async fn dispatch_key(&self, chord: &KeyChord) -> Option<Outcome> {
        let command = bind_key(chord, &self.controller.capabilities())?;
        Some(self.dispatch(command).await)
    }
}
