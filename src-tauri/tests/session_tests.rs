use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use retouch_tauri::dispatcher::{Command, CommandDispatcher, KeyChord};
use retouch_tauri::processor::{
    Histogram, ImageFile, ImageId, ImageInfo, OneShot, Preview, RemoteProcessor, Variant,
};
use retouch_tauri::session::{
    Adjustments, BannerKind, Connection, Field, Outcome, Phase, Refusal, SessionController,
    MAX_DEPTH,
};
use retouch_tauri::{RetouchConfig, RetouchError};

/// In-memory processor. Calls can be held open, made to hang or made to fail.
#[derive(Default)]
struct ScriptedProcessor {
    uploads: AtomicUsize,
    process_calls: AtomicUsize,
    one_shot_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    fail_upload: AtomicBool,
    fail_process: AtomicBool,
    fail_delete: AtomicBool,
    fail_health: AtomicBool,
    hold_process: AtomicBool,
    hang_process: AtomicBool,
    hold_download: AtomicBool,
    entered: Notify,
    gate: Notify,
    processed: Mutex<Vec<Adjustments>>,
}

impl ScriptedProcessor {
    fn process_count(&self) -> usize {
        self.process_calls.load(Ordering::SeqCst)
    }

    fn last_processed(&self) -> Option<Adjustments> {
        self.processed.lock().unwrap().last().copied()
    }
}

fn preview(tag: u8) -> Preview {
    Preview {
        mime_type: "image/png".to_string(),
        bytes: vec![tag; 8],
        width: 4,
        height: 4,
    }
}

#[async_trait]
impl RemoteProcessor for ScriptedProcessor {
    async fn health(&self) -> Result<(), RetouchError> {
        if self.fail_health.load(Ordering::SeqCst) {
            return Err(RetouchError::Connectivity("connection refused".into()));
        }
        Ok(())
    }

    async fn upload(&self, file: &ImageFile) -> Result<ImageInfo, RetouchError> {
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(RetouchError::Upload("File must be an image".into()));
        }
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(ImageInfo {
            id: ImageId::new(format!("img-{}", n)),
            filename: file.filename.clone(),
            format: "PNG".to_string(),
            mode: "RGB".to_string(),
            width: 4,
            height: 4,
            size_bytes: file.bytes.len() as u64,
        })
    }

    async fn process(&self, _id: &ImageId, adjustments: &Adjustments) -> Result<(), RetouchError> {
        self.process_calls.fetch_add(1, Ordering::SeqCst);
        if self.hold_process.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.gate.notified().await;
        }
        if self.hang_process.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_process.load(Ordering::SeqCst) {
            return Err(RetouchError::Process("invalid factor".into()));
        }
        self.processed.lock().unwrap().push(*adjustments);
        Ok(())
    }

    async fn apply_one_shot(&self, _id: &ImageId, _op: &OneShot) -> Result<(), RetouchError> {
        self.one_shot_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch_preview(&self, _id: &ImageId, variant: Variant) -> Result<Preview, RetouchError> {
        Ok(preview(if variant.is_processed() { 2 } else { 1 }))
    }

    async fn fetch_histogram(
        &self,
        _id: &ImageId,
        _variant: Variant,
    ) -> Result<Histogram, RetouchError> {
        Ok(Histogram::Rgb {
            red: vec![1; 4],
            green: vec![2; 4],
            blue: vec![3; 4],
        })
    }

    async fn download(&self, _id: &ImageId, _variant: Variant) -> Result<Vec<u8>, RetouchError> {
        if self.hold_download.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.gate.notified().await;
        }
        Ok(vec![0xFF, 0xD8])
    }

    async fn delete(&self, _id: &ImageId) -> Result<(), RetouchError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(RetouchError::NotFound("Imagem não encontrada".into()));
        }
        Ok(())
    }
}

type Controller = SessionController<ScriptedProcessor>;

fn controller_with(config: RetouchConfig) -> Arc<Controller> {
    Arc::new(SessionController::new(ScriptedProcessor::default(), &config))
}

async fn loaded() -> Arc<Controller> {
    let controller = controller_with(RetouchConfig::default());
    let outcome = controller
        .load_image(ImageFile::new("beach.png", vec![1, 2, 3, 4]))
        .await;
    assert_eq!(outcome, Outcome::Applied);
    controller
}

async fn edit_and_commit(controller: &Controller, field: Field, value: f64) {
    assert!(controller.update_draft(field, value).is_applied());
    let outcome = controller.commit().await;
    assert_eq!(outcome, Outcome::Applied, "commit of {:?}={} failed", field, value);
}

fn factors(controller: &Controller) -> Vec<(f64, f64, f64)> {
    controller
        .history()
        .entries()
        .map(|s| (s.brightness(), s.contrast(), s.saturation()))
        .collect()
}

// ---- history semantics through the controller ----

#[tokio::test]
async fn test_new_edit_after_undo_truncates_forward_branch() {
    let controller = loaded().await;
    assert_eq!(factors(&controller), vec![(1.0, 1.0, 1.0)]);

    edit_and_commit(&controller, Field::Brightness, 1.5).await;
    assert_eq!(factors(&controller), vec![(1.0, 1.0, 1.0), (1.5, 1.0, 1.0)]);
    assert_eq!(controller.history().cursor(), Some(1));

    assert_eq!(controller.undo().await, Outcome::Applied);
    assert!(controller.draft().adjustments().is_identity());
    assert_eq!(controller.history().cursor(), Some(0));
    assert_eq!(controller.history().len(), 2);

    edit_and_commit(&controller, Field::Contrast, 2.0).await;
    assert_eq!(factors(&controller), vec![(1.0, 1.0, 1.0), (1.0, 2.0, 1.0)]);
    assert_eq!(controller.history().cursor(), Some(1));
    assert!(!controller.capabilities().can_redo);
}

#[tokio::test]
async fn test_twenty_edits_evict_the_first() {
    let controller = loaded().await;
    for i in 1..=MAX_DEPTH {
        edit_and_commit(&controller, Field::Brightness, 1.0 + i as f64 * 0.1).await;
    }

    let history = controller.history();
    assert_eq!(history.len(), MAX_DEPTH);
    assert_eq!(history.cursor(), Some(MAX_DEPTH - 1));
    // The identity seed went first, the first edit is now the oldest entry
    let oldest = history.entries().next().unwrap().brightness();
    assert!((oldest - 1.1).abs() < 1e-9, "oldest entry is {}", oldest);

    edit_and_commit(&controller, Field::Brightness, 0.5).await;
    let history = controller.history();
    assert_eq!(history.len(), MAX_DEPTH);
    let oldest = history.entries().next().unwrap().brightness();
    assert!((oldest - 1.2).abs() < 1e-9, "oldest entry is {}", oldest);
}

#[tokio::test]
async fn test_undo_then_redo_is_identity() {
    let controller = loaded().await;
    edit_and_commit(&controller, Field::Saturation, 2.5).await;
    edit_and_commit(&controller, Field::Contrast, 0.4).await;

    let draft = controller.draft().adjustments();
    let cursor = controller.history().cursor();

    assert_eq!(controller.undo().await, Outcome::Applied);
    assert_eq!(controller.redo().await, Outcome::Applied);

    assert_eq!(controller.draft().adjustments(), draft);
    assert_eq!(controller.history().cursor(), cursor);
    assert_eq!(controller.processor().last_processed(), Some(draft));
}

#[tokio::test]
async fn test_undo_and_redo_at_edges_issue_no_call() {
    let controller = loaded().await;
    assert_eq!(controller.undo().await, Outcome::Refused(Refusal::NothingToUndo));
    assert_eq!(controller.redo().await, Outcome::Refused(Refusal::NothingToRedo));
    assert_eq!(controller.processor().process_count(), 0);

    edit_and_commit(&controller, Field::Brightness, 2.0).await;
    let before = controller.history();
    assert_eq!(controller.redo().await, Outcome::Refused(Refusal::NothingToRedo));
    assert_eq!(controller.history(), before);
    assert_eq!(controller.processor().process_count(), 1);
}

// ---- single in-flight operation ----

#[tokio::test]
async fn test_commit_while_processing_is_refused() {
    let controller = loaded().await;
    controller.processor().hold_process.store(true, Ordering::SeqCst);
    controller.update_draft(Field::Brightness, 1.8);

    let first = {
        let c = controller.clone();
        tokio::spawn(async move { c.commit().await })
    };
    controller.processor().entered.notified().await;

    assert_eq!(controller.phase(), Phase::Committing);
    assert_eq!(controller.commit().await, Outcome::Refused(Refusal::Busy));
    assert_eq!(controller.auto_adjust().await, Outcome::Refused(Refusal::Busy));
    assert_eq!(controller.undo().await, Outcome::Refused(Refusal::Busy));
    assert_eq!(
        controller.update_draft(Field::Contrast, 2.0),
        Outcome::Refused(Refusal::Busy)
    );
    assert_eq!(controller.processor().process_count(), 1);
    assert_eq!(controller.processor().one_shot_calls.load(Ordering::SeqCst), 0);

    controller.processor().gate.notify_one();
    assert_eq!(first.await.unwrap(), Outcome::Applied);
    assert_eq!(controller.history().len(), 2);
    assert_eq!(controller.draft().contrast(), 1.0);
}

#[tokio::test]
async fn test_failed_commit_leaves_history_and_draft_untouched() {
    let controller = loaded().await;
    edit_and_commit(&controller, Field::Brightness, 1.5).await;
    controller.update_draft(Field::Saturation, 2.2);

    let history = controller.history();
    let draft = controller.draft();
    controller.processor().fail_process.store(true, Ordering::SeqCst);

    let outcome = controller.commit().await;
    assert!(matches!(outcome, Outcome::Failed(RetouchError::Process(_))));
    assert_eq!(controller.history(), history);
    assert_eq!(controller.draft(), draft);

    let view = controller.view();
    assert_eq!(view.banner.unwrap().kind, BannerKind::Transient);
    assert!(!view.is_processing);

    // The preserved draft can be retried
    controller.processor().fail_process.store(false, Ordering::SeqCst);
    assert_eq!(controller.commit().await, Outcome::Applied);
    assert!(controller.view().banner.is_none());
}

// ---- replay suppression ----

#[tokio::test]
async fn test_nothing_is_recorded_while_replaying() {
    let controller = loaded().await;
    edit_and_commit(&controller, Field::Brightness, 1.5).await;
    edit_and_commit(&controller, Field::Brightness, 2.0).await;
    let before = controller.history();

    controller.processor().hold_process.store(true, Ordering::SeqCst);
    let replay = {
        let c = controller.clone();
        tokio::spawn(async move { c.undo().await })
    };
    controller.processor().entered.notified().await;

    // The draft moves before the round trip is issued
    assert_eq!(controller.draft().brightness(), 1.5);
    assert!(controller.is_replaying());
    assert!(controller.view().replaying);
    assert_eq!(controller.phase(), Phase::Replaying);

    // A rapid second keypress must not push or start another replay
    assert_eq!(controller.commit().await, Outcome::Refused(Refusal::Busy));
    assert_eq!(controller.undo().await, Outcome::Refused(Refusal::Busy));
    assert_eq!(controller.reset(), Outcome::Refused(Refusal::Busy));

    controller.processor().gate.notify_one();
    assert_eq!(replay.await.unwrap(), Outcome::Applied);

    assert!(!controller.is_replaying());
    let after = controller.history();
    assert_eq!(after.len(), before.len());
    assert!(after.entries().eq(before.entries()));
    assert_eq!(after.cursor(), Some(1));
}

#[tokio::test]
async fn test_failed_replay_rolls_back() {
    let controller = loaded().await;
    edit_and_commit(&controller, Field::Contrast, 2.0).await;
    controller.processor().fail_process.store(true, Ordering::SeqCst);

    let outcome = controller.undo().await;
    assert!(matches!(outcome, Outcome::Failed(_)));
    assert_eq!(controller.history().cursor(), Some(1));
    assert_eq!(controller.draft().contrast(), 2.0);
    assert!(!controller.is_replaying());
}

#[tokio::test(start_paused = true)]
async fn test_hung_replay_is_released_by_fallback_timeout() {
    let controller = controller_with(RetouchConfig {
        settle_timeout_secs: 5,
        ..RetouchConfig::default()
    });
    controller
        .load_image(ImageFile::new("beach.png", vec![1]))
        .await;
    edit_and_commit(&controller, Field::Brightness, 2.0).await;

    controller.processor().hang_process.store(true, Ordering::SeqCst);
    let outcome = controller.undo().await;
    assert_eq!(
        outcome,
        Outcome::Failed(RetouchError::Timeout(Duration::from_secs(5)))
    );
    assert!(!controller.is_replaying());
    assert!(controller.capabilities().ready());
    assert_eq!(controller.history().cursor(), Some(1));
    assert_eq!(controller.draft().brightness(), 2.0);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_commit_releases_processing_slot() {
    let controller = loaded().await;
    controller.processor().hold_process.store(true, Ordering::SeqCst);

    let abandoned = tokio::time::timeout(Duration::from_secs(1), controller.commit()).await;
    assert!(abandoned.is_err());

    assert_eq!(controller.phase(), Phase::Drafting);
    assert!(controller.capabilities().ready());
    assert_eq!(controller.history().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_undo_restores_cursor_and_draft() {
    let controller = loaded().await;
    edit_and_commit(&controller, Field::Brightness, 2.0).await;
    controller.processor().hold_process.store(true, Ordering::SeqCst);

    let abandoned = tokio::time::timeout(Duration::from_secs(1), controller.undo()).await;
    assert!(abandoned.is_err());

    assert!(!controller.is_replaying());
    assert!(controller.capabilities().ready());
    assert_eq!(controller.history().cursor(), Some(1));
    assert_eq!(controller.history().len(), 2);
    assert_eq!(controller.draft().brightness(), 2.0);
}

#[tokio::test]
async fn test_round_trips_wait_for_export_download() {
    let dir = tempfile::TempDir::new().unwrap();
    let controller = loaded().await;
    assert_eq!(controller.auto_adjust().await, Outcome::Applied);
    controller.processor().hold_download.store(true, Ordering::SeqCst);

    let path = dir.path().join("out.jpg");
    let export = {
        let c = controller.clone();
        let path = path.clone();
        tokio::spawn(async move { c.export(&path).await })
    };
    controller.processor().entered.notified().await;

    assert!(!controller.capabilities().ready());
    assert_eq!(controller.commit().await, Outcome::Refused(Refusal::Busy));
    assert_eq!(controller.clahe().await, Outcome::Refused(Refusal::Busy));
    assert_eq!(controller.export(&path).await, Outcome::Refused(Refusal::Busy));
    assert_eq!(controller.processor().process_count(), 0);
    assert_eq!(controller.processor().one_shot_calls.load(Ordering::SeqCst), 1);

    controller.processor().gate.notify_one();
    assert_eq!(export.await.unwrap(), Outcome::Applied);
    assert_eq!(std::fs::read(&path).unwrap(), vec![0xFF, 0xD8]);
    assert_eq!(controller.commit().await, Outcome::Applied);
}

// ---- one-shot operations ----

#[tokio::test]
async fn test_one_shots_bypass_the_timeline() {
    let controller = loaded().await;
    controller.update_draft(Field::Brightness, 1.3);

    assert_eq!(controller.auto_adjust().await, Outcome::Applied);
    assert_eq!(controller.clahe().await, Outcome::Applied);
    assert_eq!(controller.s_curve().await, Outcome::Applied);

    assert_eq!(controller.processor().one_shot_calls.load(Ordering::SeqCst), 3);
    assert_eq!(controller.history().len(), 1);
    assert_eq!(controller.draft().brightness(), 1.3);
    assert!(controller.view().processed_preview.is_some());
}

// ---- session lifecycle ----

#[tokio::test]
async fn test_upload_failure_leaves_session_uninitialized() {
    let controller = controller_with(RetouchConfig::default());
    controller.processor().fail_upload.store(true, Ordering::SeqCst);

    let outcome = controller
        .load_image(ImageFile::new("notes.txt", b"hello".to_vec()))
        .await;
    assert!(matches!(outcome, Outcome::Failed(RetouchError::Upload(_))));
    assert_eq!(controller.phase(), Phase::Uninitialized);
    assert!(controller.history().is_empty());
    assert_eq!(controller.view().banner.unwrap().kind, BannerKind::Transient);
}

#[tokio::test]
async fn test_new_image_swallows_cleanup_failure() {
    let controller = loaded().await;
    edit_and_commit(&controller, Field::Brightness, 2.0).await;
    controller.processor().fail_delete.store(true, Ordering::SeqCst);

    assert_eq!(controller.new_image().await, Outcome::Applied);
    assert_eq!(controller.processor().delete_calls.load(Ordering::SeqCst), 1);

    let view = controller.view();
    assert_eq!(view.phase, Phase::Uninitialized);
    assert!(view.image.is_none());
    assert!(view.banner.is_none());
    assert!(view.history.entries.is_empty());
    assert!(view.original_preview.is_none());

    // And a fresh image can be opened afterwards
    let outcome = controller
        .load_image(ImageFile::new("forest.png", vec![5]))
        .await;
    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(controller.image().unwrap().id.as_str(), "img-1");
}

#[tokio::test]
async fn test_new_image_during_commit_discards_late_result() {
    let controller = loaded().await;
    controller.processor().hold_process.store(true, Ordering::SeqCst);
    controller.update_draft(Field::Brightness, 2.0);

    let pending = {
        let c = controller.clone();
        tokio::spawn(async move { c.commit().await })
    };
    controller.processor().entered.notified().await;

    assert_eq!(controller.new_image().await, Outcome::Applied);
    controller.processor().gate.notify_one();

    assert_eq!(pending.await.unwrap(), Outcome::Superseded);
    assert_eq!(controller.phase(), Phase::Uninitialized);
    assert!(controller.history().is_empty());
    assert!(controller.view().processed_preview.is_none());
}

#[tokio::test]
async fn test_reset_without_image_is_refused() {
    let controller = controller_with(RetouchConfig::default());
    assert_eq!(controller.reset(), Outcome::Refused(Refusal::NoImage));
}

// ---- connectivity ----

#[tokio::test]
async fn test_connectivity_banner_is_persistent_until_recovered() {
    let controller = controller_with(RetouchConfig::default());
    assert_eq!(controller.view().connection, Connection::Checking);

    controller.processor().fail_health.store(true, Ordering::SeqCst);
    let outcome = controller.check_connection().await;
    assert!(matches!(outcome, Outcome::Failed(RetouchError::Connectivity(_))));
    let view = controller.view();
    assert_eq!(view.connection, Connection::Disconnected);
    assert_eq!(view.banner.unwrap().kind, BannerKind::Persistent);

    controller.processor().fail_health.store(false, Ordering::SeqCst);
    assert_eq!(controller.check_connection().await, Outcome::Applied);
    let view = controller.view();
    assert_eq!(view.connection, Connection::Connected);
    assert!(view.banner.is_none());
}

// ---- histogram panel ----

#[tokio::test]
async fn test_histogram_follows_commits_while_shown() {
    let controller = loaded().await;
    assert_eq!(controller.toggle_histogram().await, Outcome::Applied);
    let view = controller.view();
    assert!(view.histogram_original.is_some());
    assert!(view.histogram_processed.is_none());

    edit_and_commit(&controller, Field::Brightness, 1.2).await;
    assert!(controller.view().histogram_processed.is_some());

    assert_eq!(controller.reset(), Outcome::Applied);
    assert!(controller.view().histogram_processed.is_none());
}

#[tokio::test]
async fn test_histogram_is_not_fetched_during_a_commit() {
    let controller = loaded().await;
    controller.processor().hold_process.store(true, Ordering::SeqCst);
    controller.update_draft(Field::Contrast, 1.4);

    let commit = {
        let c = controller.clone();
        tokio::spawn(async move { c.commit().await })
    };
    controller.processor().entered.notified().await;

    assert_eq!(
        controller.toggle_histogram().await,
        Outcome::Refused(Refusal::Busy)
    );
    let view = controller.view();
    assert!(!view.show_histogram);
    assert!(view.histogram_original.is_none());

    controller.processor().gate.notify_one();
    assert_eq!(commit.await.unwrap(), Outcome::Applied);
    assert_eq!(controller.toggle_histogram().await, Outcome::Applied);
    assert!(controller.view().histogram_processed.is_some());
}

// ---- dispatcher ----

fn dispatcher(controller: Controller) -> CommandDispatcher<ScriptedProcessor> {
    CommandDispatcher::new(controller, std::env::temp_dir())
}

#[tokio::test]
async fn test_dispatch_gates_before_reaching_controller() {
    let controller = SessionController::new(ScriptedProcessor::default(), &RetouchConfig::default());
    let dispatcher = dispatcher(controller);

    assert_eq!(
        dispatcher.dispatch(Command::Apply).await,
        Outcome::Refused(Refusal::NoImage)
    );
    assert_eq!(dispatcher.controller().processor().process_count(), 0);

    dispatcher
        .controller()
        .load_image(ImageFile::new("beach.png", vec![1]))
        .await;
    assert_eq!(
        dispatcher.dispatch(Command::Undo).await,
        Outcome::Refused(Refusal::NothingToUndo)
    );
    assert_eq!(
        dispatcher.dispatch(Command::Save).await,
        Outcome::Refused(Refusal::NoProcessedImage)
    );
    assert_eq!(dispatcher.dispatch(Command::Apply).await, Outcome::Applied);
    assert_eq!(dispatcher.dispatch(Command::ToggleComparison).await, Outcome::Applied);
    assert!(dispatcher.controller().view().comparison);
}

#[tokio::test]
async fn test_ctrl_z_undoes_then_resets() {
    let controller = SessionController::new(ScriptedProcessor::default(), &RetouchConfig::default());
    let dispatcher = dispatcher(controller);
    dispatcher
        .controller()
        .load_image(ImageFile::new("beach.png", vec![1]))
        .await;
    dispatcher.controller().update_draft(Field::Brightness, 2.0);
    dispatcher.dispatch(Command::Apply).await;

    let ctrl_z = KeyChord::new("z").with_ctrl();
    assert_eq!(dispatcher.dispatch_key(&ctrl_z).await, Some(Outcome::Applied));
    assert_eq!(dispatcher.controller().history().cursor(), Some(0));
    assert_eq!(dispatcher.controller().history().len(), 2);

    // Nothing left to undo: the same chord resets
    assert_eq!(dispatcher.dispatch_key(&ctrl_z).await, Some(Outcome::Applied));
    assert_eq!(dispatcher.controller().history().len(), 1);

    assert_eq!(dispatcher.dispatch_key(&KeyChord::new("z")).await, None);
}

#[tokio::test]
async fn test_save_writes_processed_image_to_export_dir() {
    let dir = tempfile::TempDir::new().unwrap();
    let controller = SessionController::new(ScriptedProcessor::default(), &RetouchConfig::default());
    let dispatcher = CommandDispatcher::new(controller, dir.path().to_path_buf());
    dispatcher
        .controller()
        .load_image(ImageFile::new("beach.png", vec![1]))
        .await;
    dispatcher.dispatch(Command::AutoAdjust).await;

    let save = KeyChord::new("s").with_meta();
    assert_eq!(dispatcher.dispatch_key(&save).await, Some(Outcome::Applied));
    let written = std::fs::read(dir.path().join("processed_beach.png")).unwrap();
    assert_eq!(written, vec![0xFF, 0xD8]);
}
