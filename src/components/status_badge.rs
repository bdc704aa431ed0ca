use leptos::prelude::*;

/// Status for a health check item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Fail,
    Unknown,
}

impl CheckStatus {
    /// Map the backend's connection state onto a badge.
    pub fn from_connection(connection: &str) -> Self {
        match connection {
            "connected" => CheckStatus::Pass,
            "disconnected" => CheckStatus::Fail,
            _ => CheckStatus::Unknown,
        }
    }
}

#[component]
pub fn StatusBadge(
    /// The label text, e.g. "Processor"
    #[prop(into)]
    label: String,
    /// The status of this check
    status: CheckStatus,
    /// Optional detail text, e.g. the URL checked
    #[prop(optional, into)]
    detail: Option<String>,
) -> impl IntoView {
    let (icon, class) = match status {
        CheckStatus::Pass => ("\u{2713}", "status-badge status-pass"),
        CheckStatus::Fail => ("\u{2717}", "status-badge status-fail"),
        CheckStatus::Unknown => ("?", "status-badge status-unknown"),
    };

    view! {
        <div class="health-item">
            <span class=class>{icon}</span>
            <span class="health-name">{label}</span>
            <span class="health-detail">{detail.unwrap_or_default()}</span>
        </div>
    }
}

/// Compact processor status shown in the editor header.
#[component]
pub fn ConnectionBadge(
    #[prop(into)] connection: Signal<String>,
    on_retry: Callback<()>,
) -> impl IntoView {
    view! {
        <div class="connection-badge">
            {move || {
                let status = CheckStatus::from_connection(&connection.get());
                let text = match status {
                    CheckStatus::Pass => "Processor online",
                    CheckStatus::Fail => "Processor offline",
                    CheckStatus::Unknown => "Checking processor...",
                };
                view! {
                    <StatusBadge label=text status=status />
                    {(status == CheckStatus::Fail).then(|| view! {
                        <button class="btn btn-small btn-secondary" on:click=move |_| on_retry.run(())>
                            "Retry"
                        </button>
                    })}
                }
            }}
        </div>
    }
}
