use leptos::prelude::*;

use crate::commands::Histogram;

/// Bars per channel; 256 buckets are folded down to this many.
const BARS: usize = 64;

fn fold(counts: &[u64]) -> Vec<u64> {
    if counts.is_empty() {
        return Vec::new();
    }
    let per_bar = counts.len().div_ceil(BARS).max(1);
    counts.chunks(per_bar).map(|c| c.iter().sum()).collect()
}

fn channels(histogram: &Histogram) -> Vec<(&'static str, Vec<u64>)> {
    match histogram {
        Histogram::Rgb { red, green, blue } => vec![
            ("red", fold(red)),
            ("green", fold(green)),
            ("blue", fold(blue)),
        ],
        Histogram::Gray { gray } => vec![("gray", fold(gray))],
    }
}

#[component]
fn HistogramChart(#[prop(into)] title: String, histogram: Histogram) -> impl IntoView {
    let channels = channels(&histogram);
    let peak = channels
        .iter()
        .flat_map(|(_, bars)| bars.iter().copied())
        .max()
        .unwrap_or(0)
        .max(1);

    view! {
        <div class="histogram-chart">
            <h4 class="histogram-title">{title}</h4>
            {channels
                .into_iter()
                .map(|(name, bars)| {
                    view! {
                        <div class=format!("histogram-channel channel-{}", name)>
                            {bars
                                .into_iter()
                                .map(|count| {
                                    let height = count as f64 / peak as f64 * 100.0;
                                    view! {
                                        <span class="histogram-bar" style=format!("height: {:.1}%", height)></span>
                                    }
                                })
                                .collect::<Vec<_>>()}
                        </div>
                    }
                })
                .collect::<Vec<_>>()}
        </div>
    }
}

#[component]
pub fn HistogramPanel(
    #[prop(into)] original: Signal<Option<Histogram>>,
    #[prop(into)] processed: Signal<Option<Histogram>>,
) -> impl IntoView {
    view! {
        <div class="histogram-panel">
            {move || original.get().map(|h| view! { <HistogramChart title="Original" histogram=h /> })}
            {move || processed.get().map(|h| view! { <HistogramChart title="Processed" histogram=h /> })}
        </div>
    }
}
