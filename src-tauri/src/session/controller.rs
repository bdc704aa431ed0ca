//! The edit-session controller.
//!
//! Owns the draft, the history and the replay guard for one session and is
//! the only place any of them change. Operations take `&self`; the state
//! lock is held only between suspension points, never across a processor
//! call. The single-in-flight rule is enforced here through
//! [`Activity`], not by whatever view sits on top.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::history::HistoryStack;
use super::replay::ReplayGuard;
use super::snapshot::{Adjustments, Field, Snapshot};
use super::state::{Activity, Phase, SessionState, SessionView, ViewState};
use crate::config::RetouchConfig;
use crate::error::RetouchError;
use crate::processor::{ImageFile, ImageId, ImageInfo, OneShot, Preview, RemoteProcessor, Variant};

/// Why an operation was not attempted. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Refusal {
    NoImage,
    Busy,
    NothingToUndo,
    NothingToRedo,
    ImageLoaded,
    InvalidValue,
    NoProcessedImage,
}

impl Refusal {
    pub fn reason(&self) -> &'static str {
        match self {
            Refusal::NoImage => "no image loaded",
            Refusal::Busy => "another operation is in progress",
            Refusal::NothingToUndo => "nothing to undo",
            Refusal::NothingToRedo => "nothing to redo",
            Refusal::ImageLoaded => "an image is already loaded",
            Refusal::InvalidValue => "value is not a number",
            Refusal::NoProcessedImage => "no processed image to save",
        }
    }
}

/// Result of a controller operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied,
    Refused(Refusal),
    Failed(RetouchError),
    /// The session the operation started in was torn down before it
    /// finished; its result was discarded.
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Applied,
    Refused,
    Failed,
    Superseded,
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Applied => OutcomeKind::Applied,
            Outcome::Refused(_) => OutcomeKind::Refused,
            Outcome::Failed(_) => OutcomeKind::Failed,
            Outcome::Superseded => OutcomeKind::Superseded,
        }
    }

    pub fn message(&self) -> Option<String> {
        match self {
            Outcome::Applied | Outcome::Superseded => None,
            Outcome::Refused(r) => Some(r.reason().to_string()),
            Outcome::Failed(e) => Some(e.to_string()),
        }
    }
}

/// Capability predicates the dispatcher gates commands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub has_image: bool,
    pub is_processing: bool,
    pub is_uploading: bool,
    pub is_exporting: bool,
    pub replaying: bool,
    pub can_undo: bool,
    pub can_redo: bool,
    pub has_processed: bool,
}

impl Capabilities {
    /// Some remote call holds the slot.
    pub fn busy(&self) -> bool {
        self.is_processing || self.is_uploading || self.is_exporting || self.replaying
    }

    /// Free to start a remote round trip.
    pub fn ready(&self) -> bool {
        self.has_image && !self.busy()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Undo,
    Redo,
}

impl Direction {
    fn name(self) -> &'static str {
        match self {
            Direction::Undo => "undo",
            Direction::Redo => "redo",
        }
    }

    fn exhausted(self) -> Refusal {
        match self {
            Direction::Undo => Refusal::NothingToUndo,
            Direction::Redo => Refusal::NothingToRedo,
        }
    }

    /// Step the cursor back to where it was before this direction moved it.
    fn revert(self, history: &mut HistoryStack) {
        match self {
            Direction::Undo => history.redo(),
            Direction::Redo => history.undo(),
        };
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: SessionState,
    history: HistoryStack,
    view: ViewState,
}

/// Marks the processing slot as taken for one epoch. If the operation's
/// future is dropped before it reaches [`disarm`](Self::disarm) the slot is
/// returned on drop, and a replay puts the cursor and draft back.
struct ProcessingSlot<'a> {
    inner: &'a Mutex<Inner>,
    epoch: u64,
    armed: bool,
    rollback: Option<(Direction, Snapshot)>,
}

impl<'a> ProcessingSlot<'a> {
    fn new(inner: &'a Mutex<Inner>, epoch: u64) -> Self {
        Self {
            inner,
            epoch,
            armed: true,
            rollback: None,
        }
    }

    /// A slot for a replay that already moved the cursor in `direction` and
    /// replaced `previous` as the draft.
    fn replaying(
        inner: &'a Mutex<Inner>,
        epoch: u64,
        direction: Direction,
        previous: Snapshot,
    ) -> Self {
        Self {
            inner,
            epoch,
            armed: true,
            rollback: Some((direction, previous)),
        }
    }

    /// Must not be called with the state lock held.
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ProcessingSlot<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut guard = lock_inner(self.inner);
        let inner = &mut *guard;
        if inner.state.epoch() != self.epoch {
            return;
        }
        warn!("Operation abandoned mid-flight, releasing processing slot");
        inner.state.finish();
        if let Some((direction, previous)) = self.rollback.take() {
            direction.revert(&mut inner.history);
            inner.state.set_draft(previous);
        }
    }
}

fn lock_inner(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn refused(op: &str, refusal: Refusal) -> Outcome {
    debug!("{} refused: {}", op, refusal.reason());
    Outcome::Refused(refusal)
}

fn superseded(op: &str) -> Outcome {
    info!("{} finished after the session was replaced, discarding result", op);
    Outcome::Superseded
}

/// Upload failures surface as upload errors unless the processor could not
/// be reached at all.
fn as_upload_error(err: RetouchError) -> RetouchError {
    match err {
        RetouchError::Process(m) | RetouchError::NotFound(m) | RetouchError::InvalidImage(m) => {
            RetouchError::Upload(m)
        }
        other => other,
    }
}

fn describe(adj: &Adjustments) -> String {
    format!(
        "brightness={:.2} contrast={:.2} saturation={:.2}",
        adj.brightness, adj.contrast, adj.saturation
    )
}

pub struct SessionController<P: RemoteProcessor> {
    processor: P,
    inner: Mutex<Inner>,
    replay: ReplayGuard,
    settle_timeout: Duration,
    clahe: OneShot,
    s_curve: OneShot,
}

impl<P: RemoteProcessor> SessionController<P> {
    pub fn new(processor: P, config: &RetouchConfig) -> Self {
        Self {
            processor,
            inner: Mutex::new(Inner::default()),
            replay: ReplayGuard::new(),
            settle_timeout: config.settle_timeout(),
            clahe: config.clahe(),
            s_curve: config.s_curve(),
        }
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        lock_inner(&self.inner)
    }

    // ---- read side ----

    pub fn view(&self) -> SessionView {
        let inner = self.lock();
        SessionView::build(
            &inner.state,
            inner.history.summary(),
            &inner.view,
            self.replay.is_replaying(),
        )
    }

    pub fn capabilities(&self) -> Capabilities {
        let inner = self.lock();
        Capabilities {
            has_image: inner.state.has_image(),
            is_processing: inner.state.is_processing(),
            is_uploading: inner.state.is_uploading(),
            is_exporting: inner.state.activity() == Activity::Exporting,
            replaying: self.replay.is_replaying(),
            can_undo: inner.history.can_undo(),
            can_redo: inner.history.can_redo(),
            has_processed: inner.state.processed_preview().is_some(),
        }
    }

    pub fn draft(&self) -> Snapshot {
        self.lock().state.draft()
    }

    pub fn phase(&self) -> Phase {
        self.lock().state.phase()
    }

    pub fn image(&self) -> Option<ImageInfo> {
        self.lock().state.image().cloned()
    }

    pub fn history(&self) -> HistoryStack {
        self.lock().history.clone()
    }

    pub fn is_replaying(&self) -> bool {
        self.replay.is_replaying()
    }

    // ---- operations ----

    /// Upload `file` and open a session on it.
    pub async fn load_image(&self, file: ImageFile) -> Outcome {
        let epoch = {
            let mut inner = self.lock();
            if inner.state.has_image() {
                return refused("load_image", Refusal::ImageLoaded);
            }
            if inner.state.is_busy() {
                return refused("load_image", Refusal::Busy);
            }
            inner.state.begin(Activity::Uploading);
            inner.view.banner = None;
            inner.state.epoch()
        };

        let slot = ProcessingSlot::new(&self.inner, epoch);
        let result = self.upload_with_preview(&file).await;
        slot.disarm();

        let orphan = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            if inner.state.epoch() != epoch {
                result.ok().map(|(info, _)| info.id)
            } else {
                inner.state.finish();
                return match result {
                    Ok((info, original)) => {
                        info!(
                            "Session opened on {} ({}x{}, {})",
                            info.filename, info.width, info.height, info.format
                        );
                        inner.state.start_session(info, original);
                        inner.history.reset(inner.state.draft());
                        inner.view.note_success();
                        Outcome::Applied
                    }
                    Err(e) => {
                        warn!("Failed to open {}: {}", file.filename, e);
                        inner.view.report(&e);
                        Outcome::Failed(e)
                    }
                };
            }
        };

        if let Some(id) = orphan {
            self.discard_remote(&id).await;
        }
        superseded("load_image")
    }

    async fn upload_with_preview(
        &self,
        file: &ImageFile,
    ) -> Result<(ImageInfo, Preview), RetouchError> {
        let info = self.processor.upload(file).await.map_err(as_upload_error)?;
        match self.processor.fetch_preview(&info.id, Variant::Original).await {
            Ok(original) => Ok((info, original)),
            Err(e) => {
                self.discard_remote(&info.id).await;
                Err(as_upload_error(e))
            }
        }
    }

    /// Edit one factor of the draft. Purely local.
    pub fn update_draft(&self, field: Field, value: f64) -> Outcome {
        let mut inner = self.lock();
        if inner.state.is_processing() {
            return refused("update_draft", Refusal::Busy);
        }
        match inner.state.draft().with_field(field, value) {
            Some(draft) => {
                inner.state.set_draft(draft);
                Outcome::Applied
            }
            None => refused("update_draft", Refusal::InvalidValue),
        }
    }

    /// Send the draft to the processor and record it once confirmed.
    pub async fn commit(&self) -> Outcome {
        let (id, draft, epoch) = {
            let mut inner = self.lock();
            let id = match self.admit_round_trip(&inner.state) {
                Ok(id) => id,
                Err(refusal) => return refused("commit", refusal),
            };
            inner.state.begin(Activity::Committing);
            (id, inner.state.draft(), inner.state.epoch())
        };

        info!("Committing {}", describe(&draft.adjustments()));
        let slot = ProcessingSlot::new(&self.inner, epoch);
        let result = self.render(&id, draft.adjustments()).await;
        slot.disarm();

        let outcome = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            if inner.state.epoch() != epoch {
                return superseded("commit");
            }
            inner.state.finish();
            match result {
                Ok(preview) => {
                    inner.state.set_processed_preview(Some(preview));
                    self.record(&mut inner.history, draft.restamped());
                    inner.view.note_success();
                    Outcome::Applied
                }
                Err(e) => {
                    warn!("Commit failed: {}", e);
                    inner.view.report(&e);
                    Outcome::Failed(e)
                }
            }
        };

        if outcome.is_applied() {
            self.refresh_processed_histogram(&id, epoch).await;
        }
        outcome
    }

    pub async fn undo(&self) -> Outcome {
        self.replay(Direction::Undo).await
    }

    pub async fn redo(&self) -> Outcome {
        self.replay(Direction::Redo).await
    }

    /// Move the cursor, show the target snapshot and drive it through the
    /// processor with history pushes suppressed until the call settles.
    async fn replay(&self, direction: Direction) -> Outcome {
        let op = direction.name();
        let (id, target, previous, epoch, permit) = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            let id = match self.admit_round_trip(&inner.state) {
                Ok(id) => id,
                Err(refusal) => return refused(op, refusal),
            };
            let possible = match direction {
                Direction::Undo => inner.history.can_undo(),
                Direction::Redo => inner.history.can_redo(),
            };
            if !possible {
                return refused(op, direction.exhausted());
            }
            let Some(permit) = self.replay.try_enter() else {
                return refused(op, Refusal::Busy);
            };
            let target = match direction {
                Direction::Undo => inner.history.undo(),
                Direction::Redo => inner.history.redo(),
            };
            let Some(target) = target else {
                return refused(op, direction.exhausted());
            };

            let previous = inner.state.draft();
            inner.state.set_draft(target);
            inner.state.begin(Activity::Replaying);
            (id, target, previous, inner.state.epoch(), permit)
        };

        info!("Replaying {}: {}", op, describe(&target.adjustments()));
        let slot = ProcessingSlot::replaying(&self.inner, epoch, direction, previous);
        let result = permit
            .await_settled(self.settle_timeout, self.render(&id, target.adjustments()))
            .await;
        slot.disarm();

        let outcome = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            if inner.state.epoch() != epoch {
                return superseded(op);
            }
            inner.state.finish();
            match result {
                Ok(preview) => {
                    inner.state.set_processed_preview(Some(preview));
                    inner.view.note_success();
                    Outcome::Applied
                }
                Err(e) => {
                    warn!("{} failed, restoring previous position: {}", op, e);
                    direction.revert(&mut inner.history);
                    inner.state.set_draft(previous);
                    inner.view.report(&e);
                    Outcome::Failed(e)
                }
            }
        };
        permit.release();

        if outcome.is_applied() {
            self.refresh_processed_histogram(&id, epoch).await;
        }
        outcome
    }

    /// Run a one-shot enhancement. The draft and history are left alone.
    pub async fn one_shot(&self, op: OneShot) -> Outcome {
        let (id, epoch) = {
            let mut inner = self.lock();
            let id = match self.admit_round_trip(&inner.state) {
                Ok(id) => id,
                Err(refusal) => return refused(op.name(), refusal),
            };
            inner.state.begin(Activity::Enhancing);
            (id, inner.state.epoch())
        };

        info!("Applying {}", op.name());
        let slot = ProcessingSlot::new(&self.inner, epoch);
        let result = self.enhance(&id, &op).await;
        slot.disarm();

        let outcome = {
            let mut inner = self.lock();
            if inner.state.epoch() != epoch {
                return superseded(op.name());
            }
            inner.state.finish();
            match result {
                Ok(preview) => {
                    inner.state.set_processed_preview(Some(preview));
                    inner.view.note_success();
                    Outcome::Applied
                }
                Err(e) => {
                    warn!("{} failed: {}", op.name(), e);
                    inner.view.report(&e);
                    Outcome::Failed(e)
                }
            }
        };

        if outcome.is_applied() {
            self.refresh_processed_histogram(&id, epoch).await;
        }
        outcome
    }

    pub async fn auto_adjust(&self) -> Outcome {
        self.one_shot(OneShot::AutoAdjust).await
    }

    pub async fn clahe(&self) -> Outcome {
        self.one_shot(self.clahe).await
    }

    pub async fn s_curve(&self) -> Outcome {
        self.one_shot(self.s_curve).await
    }

    /// Back to identity with a fresh single-entry history. Local only.
    pub fn reset(&self) -> Outcome {
        let mut guard = self.lock();
        let inner = &mut *guard;
        if !inner.state.has_image() {
            return refused("reset", Refusal::NoImage);
        }
        if inner.state.is_processing() || self.replay.is_replaying() {
            return refused("reset", Refusal::Busy);
        }
        inner.state.set_draft(Snapshot::identity());
        inner.state.set_processed_preview(None);
        inner.history.reset(inner.state.draft());
        inner.view.histogram_processed = None;
        info!("Session reset to identity");
        Outcome::Applied
    }

    /// Tear the session down and release the remote image. Always admitted;
    /// anything still in flight finds a newer epoch and is discarded.
    pub async fn new_image(&self) -> Outcome {
        let released = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            let id = inner.state.image_id().cloned();
            if inner.state.is_busy() {
                info!("Starting over with {:?} still in flight", inner.state.activity());
            }
            inner.state.teardown();
            inner.history.clear();
            inner.view.clear_for_new_image();
            id
        };

        if let Some(id) = released {
            self.discard_remote(&id).await;
        }
        info!("Session cleared");
        Outcome::Applied
    }

    /// Probe the processor and update the connection banner.
    pub async fn check_connection(&self) -> Outcome {
        let result = self.processor.health().await;
        let mut inner = self.lock();
        match result {
            Ok(()) => {
                inner.view.note_success();
                Outcome::Applied
            }
            Err(e) => {
                warn!("Processor health check failed: {}", e);
                inner.view.report(&e);
                Outcome::Failed(e)
            }
        }
    }

    /// Hiding is always allowed. Showing fetches histograms, so it waits for
    /// the remote slot like any other call.
    pub async fn toggle_histogram(&self) -> Outcome {
        let (id, epoch, with_processed) = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            let Some(id) = inner.state.image_id().cloned() else {
                return refused("toggle_histogram", Refusal::NoImage);
            };
            if inner.view.show_histogram {
                inner.view.show_histogram = false;
                return Outcome::Applied;
            }
            if inner.state.is_busy() || self.replay.is_replaying() {
                return refused("toggle_histogram", Refusal::Busy);
            }
            inner.view.show_histogram = true;
            (
                id,
                inner.state.epoch(),
                inner.state.processed_preview().is_some(),
            )
        };

        let original = self.processor.fetch_histogram(&id, Variant::Original).await;
        let processed = if with_processed {
            Some(self.processor.fetch_histogram(&id, Variant::Processed).await)
        } else {
            None
        };

        let mut inner = self.lock();
        if inner.state.epoch() != epoch {
            return superseded("toggle_histogram");
        }
        match original {
            Ok(h) => inner.view.histogram_original = Some(h),
            Err(e) => warn!("Failed to load original histogram: {}", e),
        }
        match processed {
            Some(Ok(h)) => inner.view.histogram_processed = Some(h),
            Some(Err(e)) => warn!("Failed to load processed histogram: {}", e),
            None => {}
        }
        Outcome::Applied
    }

    pub fn toggle_comparison(&self) -> Outcome {
        let mut inner = self.lock();
        if !inner.state.has_image() {
            return refused("toggle_comparison", Refusal::NoImage);
        }
        inner.view.comparison = !inner.view.comparison;
        Outcome::Applied
    }

    /// Download the processed image and write it to `path`. The download
    /// holds the remote slot so nothing rewrites the processed image under it.
    pub async fn export(&self, path: &Path) -> Outcome {
        let (id, epoch) = {
            let mut inner = self.lock();
            let Some(id) = inner.state.image_id().cloned() else {
                return refused("export", Refusal::NoImage);
            };
            if inner.state.processed_preview().is_none() {
                return refused("export", Refusal::NoProcessedImage);
            }
            if inner.state.is_busy() || self.replay.is_replaying() {
                return refused("export", Refusal::Busy);
            }
            inner.state.begin(Activity::Exporting);
            (id, inner.state.epoch())
        };

        let slot = ProcessingSlot::new(&self.inner, epoch);
        let result = self.save_processed(&id, path.to_path_buf()).await;
        slot.disarm();

        let mut inner = self.lock();
        if inner.state.epoch() != epoch {
            return superseded("export");
        }
        inner.state.finish();
        match result {
            Ok(size) => {
                info!("Exported {} bytes to {:?}", size, path);
                Outcome::Applied
            }
            Err(e) => {
                warn!("Export to {:?} failed: {}", path, e);
                inner.view.report(&e);
                Outcome::Failed(e)
            }
        }
    }

    // ---- helpers ----

    /// Preconditions shared by every operation that starts a round trip.
    fn admit_round_trip(&self, state: &SessionState) -> Result<ImageId, Refusal> {
        let id = state.image_id().cloned().ok_or(Refusal::NoImage)?;
        if state.is_busy() || self.replay.is_replaying() {
            return Err(Refusal::Busy);
        }
        Ok(id)
    }

    fn record(&self, history: &mut HistoryStack, snapshot: Snapshot) {
        if self.replay.is_replaying() {
            debug!("Replay in progress, not recording snapshot");
            return;
        }
        if let Some(evicted) = history.push(snapshot) {
            debug!("History full, evicted snapshot from {}", evicted.created_at());
        }
    }

    async fn render(&self, id: &ImageId, adjustments: Adjustments) -> Result<Preview, RetouchError> {
        self.processor.process(id, &adjustments).await?;
        self.processor.fetch_preview(id, Variant::Processed).await
    }

    async fn enhance(&self, id: &ImageId, op: &OneShot) -> Result<Preview, RetouchError> {
        self.processor.apply_one_shot(id, op).await?;
        self.processor.fetch_preview(id, Variant::Processed).await
    }

    async fn refresh_processed_histogram(&self, id: &ImageId, epoch: u64) {
        if !self.lock().view.show_histogram {
            return;
        }
        let result = self.processor.fetch_histogram(id, Variant::Processed).await;
        let mut inner = self.lock();
        if inner.state.epoch() != epoch || !inner.view.show_histogram {
            return;
        }
        match result {
            Ok(h) => inner.view.histogram_processed = Some(h),
            Err(e) => warn!("Failed to refresh histogram: {}", e),
        }
    }

    async fn save_processed(&self, id: &ImageId, path: PathBuf) -> Result<usize, RetouchError> {
        let bytes = self.processor.download(id, Variant::Processed).await?;
        let size = bytes.len();
        tokio::task::spawn_blocking(move || {
            std::fs::write(&path, bytes)
                .map_err(|e| RetouchError::Export(format!("{}: {}", path.display(), e)))
        })
        .await
        .map_err(|e| RetouchError::Export(format!("Export task failed: {}", e)))??;
        Ok(size)
    }

    /// Best-effort delete. Failures are logged and otherwise ignored.
    async fn discard_remote(&self, id: &ImageId) {
        match self.processor.delete(id).await {
            Ok(()) => debug!("Released remote image {}", id),
            Err(e) => warn!("Failed to release remote image {}: {}", id, e),
        }
    }
}
