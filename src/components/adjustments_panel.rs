use leptos::prelude::*;

use crate::commands::Snapshot;

const FIELDS: [(&str, &str); 3] = [
    ("brightness", "Brightness"),
    ("contrast", "Contrast"),
    ("saturation", "Saturation"),
];

fn value_of(draft: &Snapshot, field: &str) -> f64 {
    match field {
        "brightness" => draft.brightness,
        "contrast" => draft.contrast,
        _ => draft.saturation,
    }
}

/// The three factor sliders. Values range over 0.0..=3.0 with 1.0 as
/// "unchanged".
#[component]
pub fn AdjustmentsPanel(
    #[prop(into)] draft: Signal<Snapshot>,
    #[prop(into)] disabled: Signal<bool>,
    /// (field, value) on every slider movement.
    on_change: Callback<(String, f64)>,
) -> impl IntoView {
    view! {
        <div class="adjustments-panel">
            {FIELDS
                .iter()
                .map(|&(field, label)| {
                    view! {
                        <div class="slider-row">
                            <label class="slider-label">{label}</label>
                            <input
                                type="range"
                                min="0"
                                max="3"
                                step="0.05"
                                class="slider"
                                disabled=move || disabled.get()
                                prop:value=move || value_of(&draft.get(), field).to_string()
                                on:input=move |ev| {
                                    if let Ok(value) = event_target_value(&ev).parse::<f64>() {
                                        on_change.run((field.to_string(), value));
                                    }
                                }
                            />
                            <span class="slider-value">
                                {move || format!("{:.2}", value_of(&draft.get(), field))}
                            </span>
                        </div>
                    }
                })
                .collect::<Vec<_>>()}
        </div>
    }
}
