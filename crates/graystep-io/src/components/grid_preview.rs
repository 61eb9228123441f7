//! Heatmap display of a [`RenderableGrid`] with labeled axes.
//!
//! The grid is rasterized into a Blob URL by a [`BlobUrlRenderer`] held
//! in component state. A new URL is produced in an effect, only when the
//! grid instance changes; the previous one is revoked as it is replaced,
//! and the last one when the component unmounts.

use std::rc::Rc;

use dioxus::prelude::*;
use graystep_pipeline::{Axis, GridRenderer, RenderableGrid, TARGET_TICKS, present};

use crate::raster::BlobUrlRenderer;

/// Props for the [`GridPreview`] component.
#[derive(Props, Clone)]
pub struct GridPreviewProps {
    /// Grid to display. Compared by pointer.
    grid: Rc<RenderableGrid>,
    /// Caption above the plot.
    title: String,
    /// Width over height shared by every preview on the page.
    aspect: f64,
    /// Message shown in place of the plot, e.g. a decode failure.
    #[props(default)]
    error: Option<String>,
}

impl PartialEq for GridPreviewProps {
    fn eq(&self, other: &Self) -> bool {
        #[allow(clippy::float_cmp)]
        let same_aspect = self.aspect == other.aspect;
        Rc::ptr_eq(&self.grid, &other.grid)
            && same_aspect
            && self.title == other.title
            && self.error == other.error
    }
}

/// Grid handle that compares by identity, so the render effect keys on
/// the grid instance rather than walking its samples.
#[derive(Clone)]
struct GridKey(Rc<RenderableGrid>);

impl PartialEq for GridKey {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Heatmap with axis ticks, titles and a contrast scale.
///
/// An empty grid shows "No image available" along with the error text,
/// if any. The plot area and the placeholder both take the shared
/// aspect ratio, so an empty preview matches its populated neighbor.
#[component]
pub fn GridPreview(props: GridPreviewProps) -> Element {
    let grid = &props.grid;
    let mut renderer = use_signal(BlobUrlRenderer::default);
    let mut render_error = use_signal(|| Option::<String>::None);

    {
        let mut renderer = renderer;
        use_drop(move || {
            if let Ok(mut r) = renderer.try_write() {
                r.clear();
            }
        });
    }

    let key = GridKey(Rc::clone(grid));
    use_effect(use_reactive!(|key| {
        let outcome = present(&mut *renderer.write(), &key.0);
        render_error.set(outcome.err().map(|e| e.to_string()));
    }));

    let title = &props.title;
    let aspect = props.aspect;

    if grid.is_empty() {
        return rsx! {
            figure { class: "grid-preview",
                figcaption { "{title}" }
                div { class: "grid-placeholder", style: "aspect-ratio: {aspect}",
                    p { class: "text-secondary", "No image available" }
                    if let Some(ref err) = props.error {
                        p { class: "text-error small", "{err}" }
                    }
                }
            }
        };
    }

    let url = renderer.read().url().map(str::to_owned);
    let x_ticks = tick_marks(&grid.x_axis);
    let y_ticks = tick_marks(&grid.y_axis);
    let x_title = grid.x_axis.title.clone();
    let y_title = grid.y_axis.title.clone();
    let z_min = format_tick(f64::from(grid.z_range.min));
    let z_max = format_tick(f64::from(grid.z_range.max));
    let failure = render_error();

    rsx! {
        figure { class: "grid-preview",
            figcaption { "{title}" }
            div { class: "plot",
                span { class: "axis-title y-title", "{y_title}" }
                div { class: "y-ticks",
                    for (i, (pct, label)) in y_ticks.into_iter().enumerate() {
                        span { key: "{i}", class: "tick", style: "bottom: {pct}%", "{label}" }
                    }
                }
                div { class: "plot-area", style: "aspect-ratio: {aspect}",
                    if let Some(ref url) = url {
                        img { src: "{url}", class: "heatmap", alt: "{title}" }
                    } else if let Some(ref failure) = failure {
                        p { class: "text-error small", "Failed to render: {failure}" }
                    }
                }
                div { class: "colorbar",
                    span { class: "tick", "{z_max}" }
                    div { class: "colorbar-gradient" }
                    span { class: "tick", "{z_min}" }
                }
                div { class: "x-ticks",
                    for (i, (pct, label)) in x_ticks.into_iter().enumerate() {
                        span { key: "{i}", class: "tick", style: "left: {pct}%", "{label}" }
                    }
                }
                span { class: "axis-title x-title", "{x_title}" }
            }
            if let Some(ref err) = props.error {
                p { class: "text-error small", "{err}" }
            }
        }
    }
}

/// Tick positions as percentages of the axis, with their labels.
fn tick_marks(axis: &Axis) -> Vec<(f64, String)> {
    if axis.max <= 0.0 {
        return Vec::new();
    }
    axis.ticks(TARGET_TICKS)
        .into_iter()
        .map(|t| (t / axis.max * 100.0, format_tick(t)))
        .collect()
}

/// Up to two decimals, trailing zeros trimmed.
fn format_tick(value: f64) -> String {
    let text = format!("{value:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_owned()
    } else {
        text.to_owned()
    }
}
