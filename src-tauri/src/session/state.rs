use serde::Serialize;

use super::history::HistorySummary;
use super::snapshot::Snapshot;
use crate::error::RetouchError;
use crate::processor::preview::to_data_url;
use crate::processor::{Histogram, ImageId, ImageInfo, Preview};

/// What the session is doing right now. Everything except `Idle` holds the
/// single remote slot; only the variants that change the processed image
/// count as processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Idle,
    Uploading,
    Committing,
    Replaying,
    Enhancing,
    Exporting,
}

/// Coarse lifecycle of a session as the view sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Uninitialized,
    Drafting,
    Committing,
    Replaying,
    Enhancing,
}

/// The live editing session. Only the controller mutates it.
#[derive(Debug, Clone)]
pub struct SessionState {
    image: Option<ImageInfo>,
    draft: Snapshot,
    activity: Activity,
    epoch: u64,
    original_preview: Option<Preview>,
    processed_preview: Option<Preview>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            image: None,
            draft: Snapshot::identity(),
            activity: Activity::Idle,
            epoch: 0,
            original_preview: None,
            processed_preview: None,
        }
    }

    pub fn image(&self) -> Option<&ImageInfo> {
        self.image.as_ref()
    }

    pub fn image_id(&self) -> Option<&ImageId> {
        self.image.as_ref().map(|i| &i.id)
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn draft(&self) -> Snapshot {
        self.draft
    }

    pub fn set_draft(&mut self, draft: Snapshot) {
        self.draft = draft;
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    pub fn is_processing(&self) -> bool {
        matches!(
            self.activity,
            Activity::Committing | Activity::Replaying | Activity::Enhancing
        )
    }

    pub fn is_uploading(&self) -> bool {
        self.activity == Activity::Uploading
    }

    pub fn is_busy(&self) -> bool {
        self.activity != Activity::Idle
    }

    /// Identifies the current image lifetime. Bumped on teardown so that
    /// responses to requests issued before it can be recognised and dropped.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn begin(&mut self, activity: Activity) {
        self.activity = activity;
    }

    pub fn finish(&mut self) {
        self.activity = Activity::Idle;
    }

    pub fn phase(&self) -> Phase {
        if self.image.is_none() {
            return Phase::Uninitialized;
        }
        match self.activity {
            Activity::Committing => Phase::Committing,
            Activity::Replaying => Phase::Replaying,
            Activity::Enhancing => Phase::Enhancing,
            Activity::Idle | Activity::Uploading | Activity::Exporting => Phase::Drafting,
        }
    }

    /// Install a freshly uploaded image with an identity draft.
    pub fn start_session(&mut self, info: ImageInfo, original: Preview) {
        self.image = Some(info);
        self.draft = Snapshot::identity();
        self.original_preview = Some(original);
        self.processed_preview = None;
        self.activity = Activity::Idle;
    }

    /// Forget the image entirely.
    pub fn teardown(&mut self) {
        self.image = None;
        self.draft = Snapshot::identity();
        self.original_preview = None;
        self.processed_preview = None;
        self.activity = Activity::Idle;
        self.epoch += 1;
    }

    pub fn original_preview(&self) -> Option<&Preview> {
        self.original_preview.as_ref()
    }

    pub fn processed_preview(&self) -> Option<&Preview> {
        self.processed_preview.as_ref()
    }

    pub fn set_processed_preview(&mut self, preview: Option<Preview>) {
        self.processed_preview = preview;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Connection {
    Checking,
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerKind {
    /// Shown until the next operation.
    Transient,
    /// Shown until the processor answers again; offers a retry.
    Persistent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
}

impl From<&RetouchError> for Banner {
    fn from(err: &RetouchError) -> Self {
        Self {
            kind: if err.is_persistent() {
                BannerKind::Persistent
            } else {
                BannerKind::Transient
            },
            message: err.to_string(),
        }
    }
}

/// Presentation-only flags and cached data. None of it is part of the edit
/// timeline.
#[derive(Debug, Clone)]
pub struct ViewState {
    pub show_histogram: bool,
    pub comparison: bool,
    pub histogram_original: Option<Histogram>,
    pub histogram_processed: Option<Histogram>,
    pub banner: Option<Banner>,
    pub connection: Connection,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            show_histogram: false,
            comparison: false,
            histogram_original: None,
            histogram_processed: None,
            banner: None,
            connection: Connection::Checking,
        }
    }
}

impl ViewState {
    pub fn report(&mut self, err: &RetouchError) {
        if err.is_persistent() {
            self.connection = Connection::Disconnected;
        }
        self.banner = Some(Banner::from(err));
    }

    /// A successful round trip proves the processor is reachable.
    pub fn note_success(&mut self) {
        self.connection = Connection::Connected;
        self.banner = None;
    }

    /// Drop everything tied to the previous image. Connectivity is kept.
    pub fn clear_for_new_image(&mut self) {
        self.show_histogram = false;
        self.comparison = false;
        self.histogram_original = None;
        self.histogram_processed = None;
        self.banner = None;
    }
}

/// Everything the frontend renders, in one serializable value.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub phase: Phase,
    pub activity: Activity,
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
    pub connection: Connection,
}

impl SessionView {
    pub fn build(
        state: &SessionState,
        history: HistorySummary,
        view: &ViewState,
        replaying: bool,
    ) -> Self {
        Self {
            phase: state.phase(),
            activity: state.activity(),
            image: state.image().cloned(),
            draft: state.draft(),
            history,
            is_processing: state.is_processing(),
            is_uploading: state.is_uploading(),
            replaying,
            original_preview: state.original_preview().map(to_data_url),
            processed_preview: state.processed_preview().map(to_data_url),
            show_histogram: view.show_histogram,
            comparison: view.comparison,
            histogram_original: view.histogram_original.clone(),
            histogram_processed: view.histogram_processed.clone(),
            banner: view.banner.clone(),
            connection: view.connection,
        }
    }
}
