use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::commands::{self, ActiveConfig};

/// Preference key read by the backend at startup.
const PROCESSOR_URL_KEY: &str = "processor_url";

#[component]
pub fn SettingsPage() -> impl IntoView {
    let (processor_url, set_processor_url) = signal(String::new());
    let (url_status, set_url_status) = signal::<Option<String>>(None);
    let (active, set_active) = signal::<Option<ActiveConfig>>(None);

    // Load the running config and the stored processor URL on mount
    Effect::new(move |_| {
        spawn_local(async move {
            match commands::get_config().await {
                Ok(config) => set_active.set(Some(config)),
                Err(e) => set_url_status.set(Some(format!("Failed to load config: {}", e))),
            }

            match commands::get_preference(PROCESSOR_URL_KEY).await {
                Ok(Some(url)) => {
                    set_processor_url.set(url);
                }
                Ok(None) => {}
                Err(e) => {
                    set_url_status.set(Some(format!("Failed to load preference: {}", e)));
                }
            }
        });
    });

    let save_processor_url = move |_| {
        let url = processor_url.get();
        spawn_local(async move {
            match commands::set_preference(PROCESSOR_URL_KEY, url.trim()).await {
                Ok(()) => {
                    set_url_status.set(Some("Saved. Restart Retouch to connect to the new address.".to_string()));
                }
                Err(e) => {
                    set_url_status.set(Some(format!("Failed to save: {}", e)));
                }
            }
        });
    };

    view! {
        <div class="page settings-page">
            <h2>"Settings"</h2>

            <section class="settings-section">
                <h3>"Processor"</h3>
                <p class="section-description">
                    "Address of the image processing service. RETOUCH_PROCESSOR_URL overrides this when set."
                </p>

                {move || active.get().map(|c| view! {
                    <p class="status-text">
                        {format!(
                            "Connected to {} (request timeout {}s, undo/redo settle limit {}s)",
                            c.processor_url, c.request_timeout_secs, c.settle_timeout_secs
                        )}
                    </p>
                })}

                <div class="form-group">
                    <label for="processor-url">"Processor URL"</label>
                    <div class="input-row">
                        <input
                            id="processor-url"
                            type="text"
                            placeholder="http://localhost:8000"
                            class="input"
                            prop:value=move || processor_url.get()
                            on:input=move |ev| {
                                set_processor_url.set(event_target_value(&ev));
                            }
                        />
                        <button class="btn btn-save" on:click=save_processor_url>"Save"</button>
                    </div>
                    <Show when=move || url_status.get().is_some()>
                        <p class="status-text">{move || url_status.get().unwrap_or_default()}</p>
                    </Show>
                </div>
            </section>

            <section class="settings-section">
                <h3>"Keyboard Shortcuts"</h3>
                <ul class="shortcut-list">
                    <li><kbd>"Ctrl+Enter"</kbd>" Apply adjustments"</li>
                    <li><kbd>"Ctrl+Z"</kbd>" Undo (reset when there is nothing to undo)"</li>
                    <li><kbd>"Ctrl+Shift+Z"</kbd>" / "<kbd>"Ctrl+Y"</kbd>" Redo"</li>
                    <li><kbd>"Ctrl+A"</kbd>" Auto adjust"</li>
                    <li><kbd>"Ctrl+H"</kbd>" Toggle histogram"</li>
                    <li><kbd>"Ctrl+S"</kbd>" Save processed image"</li>
                </ul>
            </section>
        </div>
    }
}
