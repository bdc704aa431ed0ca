//! The editing session: upload, tune, apply, step through history.
//!
//! All state lives in the backend; this page forwards events and renders the
//! `SessionView` that comes back.

use leptos::ev;
use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::commands::{self, DispatchReport, KeyChord, SessionView};
use crate::components::adjustments_panel::AdjustmentsPanel;
use crate::components::drop_zone::{DropZone, PickedFile};
use crate::components::histogram_panel::HistogramPanel;
use crate::components::history_panel::HistoryPanel;
use crate::components::status_badge::ConnectionBadge;

/// Keys the backend binds under Ctrl/Cmd. Only these suppress the browser
/// default.
const BOUND_KEYS: [&str; 6] = ["enter", "z", "y", "a", "h", "s"];

fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    }
}

#[component]
pub fn EditorPage() -> impl IntoView {
    let (session, set_session) = signal::<Option<SessionView>>(None);
    let (notice, set_notice) = signal::<Option<String>>(None);
    let (pending, set_pending) = signal(false);
    let (export_path, set_export_path) = signal(String::new());

    let apply_report = move |result: Result<DispatchReport, String>| match result {
        Ok(report) => {
            set_notice.set(if report.outcome == "refused" {
                report.message
            } else {
                None
            });
            set_session.set(Some(report.view));
        }
        Err(e) => set_notice.set(Some(e)),
    };

    // Load the current session on mount
    Effect::new(move |_| {
        spawn_local(async move {
            match commands::get_session().await {
                Ok(view) => set_session.set(Some(view)),
                Err(e) => set_notice.set(Some(format!("Failed to load session: {}", e))),
            }
        });
    });

    let run = move |command: &'static str| {
        set_pending.set(true);
        spawn_local(async move {
            apply_report(commands::run_command(command).await);
            set_pending.set(false);
        });
    };

    let keydown = window_event_listener(ev::keydown, move |ev| {
        if !(ev.ctrl_key() || ev.meta_key()) {
            return;
        }
        let key = ev.key().to_ascii_lowercase();
        if !BOUND_KEYS.contains(&key.as_str()) {
            return;
        }
        ev.prevent_default();
        let chord = KeyChord {
            key,
            ctrl: ev.ctrl_key(),
            meta: ev.meta_key(),
            shift: ev.shift_key(),
        };
        spawn_local(async move {
            match commands::handle_key(chord).await {
                Ok(Some(report)) => apply_report(Ok(report)),
                Ok(None) => {}
                Err(e) => apply_report(Err(e)),
            }
        });
    });
    on_cleanup(move || keydown.remove());

    let on_file = Callback::new(move |file: PickedFile| {
        set_pending.set(true);
        spawn_local(async move {
            apply_report(commands::load_image(&file.filename, file.base64).await);
            set_pending.set(false);
        });
    });

    let on_slider = Callback::new(move |(field, value): (String, f64)| {
        spawn_local(async move {
            apply_report(commands::update_draft(&field, value).await);
        });
    });

    let on_export = move |_| {
        let path = export_path.get();
        if path.trim().is_empty() {
            return;
        }
        set_pending.set(true);
        spawn_local(async move {
            apply_report(commands::export_image(path.trim()).await);
            set_pending.set(false);
        });
    };

    let busy = Signal::derive(move || {
        pending.get() || session.get().map(|s| s.is_busy()).unwrap_or(false)
    });
    let has_image = move || session.get().and_then(|s| s.image).is_some();
    let connection = Signal::derive(move || {
        session
            .get()
            .map(|s| s.connection)
            .unwrap_or_else(|| "checking".to_string())
    });
    let draft = Signal::derive(move || session.get().map(|s| s.draft).unwrap_or_default());
    let history = Signal::derive(move || session.get().map(|s| s.history).unwrap_or_default());
    let can = move |pred: fn(&SessionView) -> bool| {
        move || !busy.get() && session.get().map(|s| pred(&s)).unwrap_or(false)
    };

    view! {
        <div class="page editor-page">
            <div class="editor-header">
                <h2>"Editor"</h2>
                <ConnectionBadge
                    connection=connection
                    on_retry=Callback::new(move |_| run("check_connection"))
                />
            </div>

            {move || session.get().and_then(|s| s.banner).map(|banner| {
                let persistent = banner.is_persistent();
                view! {
                    <div class=if persistent { "banner banner-persistent" } else { "banner banner-transient" }>
                        <span>{banner.message}</span>
                        {persistent.then(|| view! {
                            <button class="btn btn-small" on:click=move |_| run("check_connection")>
                                "Retry"
                            </button>
                        })}
                    </div>
                }
            })}

            {move || notice.get().map(|n| view! { <p class="editor-notice">{n}</p> })}

            <Show
                when=has_image
                fallback=move || view! {
                    <DropZone
                        on_file=on_file
                        uploading=Signal::derive(move || {
                            session.get().map(|s| s.is_uploading).unwrap_or(false) || pending.get()
                        })
                    />
                }
            >
                {move || session.get().and_then(|s| s.image).map(|info| view! {
                    <p class="image-info">
                        {format!(
                            "{} \u{2022} {}x{} \u{2022} {} \u{2022} {}",
                            info.filename,
                            info.width,
                            info.height,
                            info.format,
                            format_size(info.size_bytes)
                        )}
                    </p>
                })}

                <div class="preview-area">
                    {move || {
                        let current = session.get()?;
                        let original = current.original_preview.clone();
                        let processed = current.processed_preview.clone();
                        Some(if current.comparison {
                            view! {
                                <div class="preview-compare">
                                    <figure>
                                        <img src=original alt="Original" />
                                        <figcaption>"Original"</figcaption>
                                    </figure>
                                    <figure>
                                        <img src=processed.or(current.original_preview) alt="Processed" />
                                        <figcaption>"Processed"</figcaption>
                                    </figure>
                                </div>
                            }
                            .into_any()
                        } else {
                            view! {
                                <img class="preview-single" src=processed.or(original) alt="Preview" />
                            }
                            .into_any()
                        })
                    }}
                    <Show when=move || busy.get()>
                        <div class="preview-overlay"><div class="spinner"></div></div>
                    </Show>
                </div>

                <AdjustmentsPanel draft=draft disabled=busy on_change=on_slider />

                <div class="action-buttons">
                    <button class="btn btn-primary" title="Ctrl+Enter"
                        disabled=move || !can(|_| true)()
                        on:click=move |_| run("apply")>"Apply"</button>
                    <button class="btn btn-secondary" title="Ctrl+Z"
                        disabled=move || !can(|s| s.history.can_undo)()
                        on:click=move |_| run("undo")>"Undo"</button>
                    <button class="btn btn-secondary" title="Ctrl+Shift+Z"
                        disabled=move || !can(|s| s.history.can_redo)()
                        on:click=move |_| run("redo")>"Redo"</button>
                    <button class="btn btn-secondary"
                        disabled=move || !can(|_| true)()
                        on:click=move |_| run("reset")>"Reset"</button>
                </div>

                <div class="action-buttons">
                    <button class="btn btn-secondary" title="Ctrl+A"
                        disabled=move || !can(|_| true)()
                        on:click=move |_| run("auto_adjust")>"Auto Adjust"</button>
                    <button class="btn btn-secondary"
                        disabled=move || !can(|_| true)()
                        on:click=move |_| run("clahe")>"CLAHE"</button>
                    <button class="btn btn-secondary"
                        disabled=move || !can(|_| true)()
                        on:click=move |_| run("s_curve")>"S-Curve"</button>
                </div>

                <div class="action-buttons">
                    <button class="btn btn-small" title="Ctrl+H"
                        on:click=move |_| run("toggle_histogram")>
                        {move || if session.get().map(|s| s.show_histogram).unwrap_or(false) { "Hide Histogram" } else { "Show Histogram" }}
                    </button>
                    <button class="btn btn-small"
                        on:click=move |_| run("toggle_comparison")>
                        {move || if session.get().map(|s| s.comparison).unwrap_or(false) { "Single View" } else { "Compare" }}
                    </button>
                    <button class="btn btn-small" title="Ctrl+S"
                        disabled=move || !can(|s| s.processed_preview.is_some())()
                        on:click=move |_| run("save")>"Save"</button>
                    <button class="btn btn-small btn-danger"
                        on:click=move |_| run("new_image")>"New Image"</button>
                </div>

                <div class="input-row">
                    <input
                        type="text"
                        class="input"
                        placeholder="/path/to/output.jpg"
                        prop:value=move || export_path.get()
                        on:input=move |ev| set_export_path.set(event_target_value(&ev))
                    />
                    <button class="btn btn-small"
                        disabled=move || !can(|s| s.processed_preview.is_some())()
                        on:click=on_export>"Save As"</button>
                </div>

                <Show when=move || session.get().map(|s| s.show_histogram).unwrap_or(false)>
                    <HistogramPanel
                        original=Signal::derive(move || session.get().and_then(|s| s.histogram_original))
                        processed=Signal::derive(move || session.get().and_then(|s| s.histogram_processed))
                    />
                </Show>

                <HistoryPanel history=history />
            </Show>
        </div>
    }
}
