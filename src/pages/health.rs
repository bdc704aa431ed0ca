use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::commands::{self, HealthReport};
use crate::components::status_badge::{CheckStatus, StatusBadge};

#[component]
pub fn HealthPage() -> impl IntoView {
    let (checking, set_checking) = signal(false);
    let (report, set_report) = signal::<Option<HealthReport>>(None);
    let (error, set_error) = signal::<Option<String>>(None);

    let do_health_check = move || {
        set_checking.set(true);
        set_error.set(None);
        spawn_local(async move {
            match commands::run_health_check().await {
                Ok(r) => {
                    set_report.set(Some(r));
                }
                Err(e) => {
                    set_error.set(Some(format!("Health check failed: {}", e)));
                }
            }
            set_checking.set(false);
        });
    };

    // Auto-run health check on mount
    Effect::new(move |_| {
        do_health_check();
    });

    view! {
        <div class="page health-page">
            <h2>"Health Check"</h2>
            <p class="page-description">
                "Verify that Retouch can reach the image processor."
            </p>

            <button
                class="btn btn-primary"
                on:click=move |_| do_health_check()
                disabled=move || checking.get()
            >
                {move || if checking.get() { "Checking..." } else { "Run Health Check" }}
            </button>

            {move || {
                error.get().map(|e| {
                    view! {
                        <div class="health-error">
                            <span class="status-text status-error">{e}</span>
                        </div>
                    }
                })
            }}

            {move || {
                report.get().map(|r| {
                    let processor_status = if r.connected { CheckStatus::Pass } else { CheckStatus::Fail };
                    let processor_detail = match r.message.clone() {
                        Some(msg) => format!("{} ({})", r.processor_url, msg),
                        None => r.processor_url.clone(),
                    };
                    let config_status = if r.config_path.is_some() { CheckStatus::Pass } else { CheckStatus::Unknown };
                    let config_detail = r.config_path.clone().unwrap_or_else(|| "No config directory".to_string());

                    view! {
                        <div class="health-results">
                            <StatusBadge label="Processor" status=processor_status detail=processor_detail />
                            <StatusBadge label="Config file" status=config_status detail=config_detail />
                            <StatusBadge label="Save folder" status=CheckStatus::Pass detail=r.export_dir.clone() />
                        </div>
                    }
                })
            }}
        </div>
    }
}
