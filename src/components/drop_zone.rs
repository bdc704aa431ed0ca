//! Upload area for the first image of a session.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;

/// A file picked by the user, ready to send to the backend.
#[derive(Debug, Clone)]
pub struct PickedFile {
    pub filename: String,
    pub base64: String,
}

#[component]
pub fn DropZone(
    /// Invoked once the dropped or browsed file has been read.
    on_file: Callback<PickedFile>,
    /// True while the backend is uploading.
    #[prop(into)]
    uploading: Signal<bool>,
) -> impl IntoView {
    let (is_over, set_is_over) = signal(false);
    let (is_reading, set_is_reading) = signal(false);
    let (read_error, set_read_error) = signal::<Option<String>>(None);
    let file_input_id = "image-file-input";

    let load = move |file: web_sys::File| {
        set_is_reading.set(true);
        set_read_error.set(None);
        spawn_local(async move {
            let filename = file.name();
            match read_file_as_base64(file).await {
                Ok(base64) => on_file.run(PickedFile { filename, base64 }),
                Err(e) => {
                    web_sys::console::error_1(&format!("Failed to read file: {}", e).into());
                    set_read_error.set(Some(e));
                }
            }
            set_is_reading.set(false);
        });
    };

    let on_drop = move |ev: web_sys::DragEvent| {
        ev.prevent_default();
        set_is_over.set(false);
        if let Some(file) = ev
            .data_transfer()
            .and_then(|dt| dt.files())
            .and_then(|files| files.get(0))
        {
            load(file);
        }
    };

    let on_input_change = move |ev: web_sys::Event| {
        let input: web_sys::HtmlInputElement = event_target(&ev);
        if let Some(file) = input.files().and_then(|files| files.get(0)) {
            load(file);
        }
    };

    let busy = move || is_reading.get() || uploading.get();

    view! {
        <div
            class="drop-zone"
            class:drop-zone-active=move || is_over.get()
            class:drop-zone-loading=busy
            on:dragover=move |ev: web_sys::DragEvent| {
                ev.prevent_default();
                set_is_over.set(true);
            }
            on:dragleave=move |_| set_is_over.set(false)
            on:drop=on_drop
        >
            <Show
                when=busy
                fallback=move || view! {
                    <div class="drop-zone-content">
                        <p class="drop-main">"Drop an image here"</p>
                        <p class="drop-hint">"or"</p>
                        <label for=file_input_id class="btn btn-secondary">
                            "Browse Files"
                        </label>
                        <input
                            type="file"
                            id=file_input_id
                            accept="image/*"
                            style="display: none"
                            on:change=on_input_change
                        />
                        <p class="drop-formats">"Supports JPEG, PNG, WebP, BMP, TIFF"</p>
                        {move || read_error.get().map(|e| view! { <p class="drop-error">{e}</p> })}
                    </div>
                }
            >
                <div class="drop-zone-loading-content">
                    <div class="spinner"></div>
                    <p>"Uploading image..."</p>
                </div>
            </Show>
        </div>
    }
}

async fn read_file_as_base64(file: web_sys::File) -> Result<String, String> {
    use js_sys::{ArrayBuffer, Uint8Array};
    use wasm_bindgen_futures::JsFuture;

    let array_buffer: ArrayBuffer = JsFuture::from(file.array_buffer())
        .await
        .map_err(|e| format!("Failed to read file: {:?}", e))?
        .dyn_into()
        .map_err(|_| "Failed to convert to ArrayBuffer")?;

    let bytes = Uint8Array::new(&array_buffer).to_vec();
    Ok(STANDARD.encode(bytes))
}
