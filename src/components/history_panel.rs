//! Timeline of committed adjustments.
//!
//! Entries after the cursor are the redo branch and are dimmed; the next
//! apply discards them.

use leptos::prelude::*;

use crate::commands::HistorySummary;

#[component]
pub fn HistoryPanel(#[prop(into)] history: Signal<HistorySummary>) -> impl IntoView {
    view! {
        <div class="history-panel">
            <h4 class="history-title">"History"</h4>
            {move || {
                let summary = history.get();
                let cursor = summary.cursor;
                view! {
                    <ol class="history-list">
                        {summary
                            .entries
                            .iter()
                            .enumerate()
                            .map(|(i, s)| {
                                let class = match cursor {
                                    Some(c) if i == c => "history-item history-current",
                                    Some(c) if i > c => "history-item history-redo",
                                    _ => "history-item",
                                };
                                view! {
                                    <li class=class>
                                        {format!(
                                            "B {:.2} / C {:.2} / S {:.2}",
                                            s.brightness, s.contrast, s.saturation
                                        )}
                                    </li>
                                }
                            })
                            .collect::<Vec<_>>()}
                    </ol>
                }
            }}
        </div>
    }
}
