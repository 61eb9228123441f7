//! Blocking progress overlay shown while a conversion runs.

use dioxus::prelude::*;
use graystep_pipeline::ProgressEvent;

/// Props for the [`ProgressOverlay`] component.
#[derive(Props, Clone, PartialEq)]
pub struct ProgressOverlayProps {
    /// Latest event, or `None` before the first one arrives.
    event: Option<ProgressEvent>,
    /// Requests cancellation of the run.
    on_cancel: EventHandler<()>,
}

/// Modal progress bar with the current step name and a cancel button.
///
/// Covers the page so no other control can be used mid-run.
#[component]
pub fn ProgressOverlay(props: ProgressOverlayProps) -> Element {
    let percent = props.event.map_or(0, |e| e.percent);
    let label = props.event.map_or("Starting", |e| e.label());
    let complete = props.event.is_some_and(|e| e.is_complete());
    let mut cancelling = use_signal(|| false);

    rsx! {
        div { class: "overlay", role: "dialog", aria_modal: "true", aria_label: "Converting",
            div { class: "overlay-card",
                p { class: "overlay-label", "{label}" }
                div {
                    class: "progress",
                    role: "progressbar",
                    aria_valuemin: "0",
                    aria_valuemax: "100",
                    aria_valuenow: "{percent}",
                    div { class: "progress-fill", style: "width: {percent}%" }
                }
                p { class: "text-secondary small tabular", "{percent}%" }
                button {
                    class: "btn",
                    disabled: complete || cancelling(),
                    onclick: move |_| {
                        cancelling.set(true);
                        props.on_cancel.call(());
                    },
                    if cancelling() { "Cancelling..." } else { "Cancel" }
                }
            }
        }
    }
}
