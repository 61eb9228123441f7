use std::rc::Rc;

use dioxus::prelude::*;
use graystep_io::{
    BrowserPacer, FileUpload, GridPreview, ProgressOverlay, StepListEditor, UnitsControl,
    UploadedFile,
};
use graystep_pipeline::{
    AxisConfig, ConversionPipeline, ConversionSession, ConvertedSamples, NativeExecutor,
    StepList, StepOutcome, to_grid,
};

fn main() {
    dioxus::launch(app);
}

type Pipeline = ConversionPipeline<NativeExecutor, BrowserPacer>;

/// Root application component.
///
/// Owns the conversion session, the step list, and the axis settings,
/// and wires the upload zone, step editor, previews, and progress
/// overlay together.
#[allow(clippy::too_many_lines)]
fn app() -> Element {
    // --- Application state ---
    let mut session = use_signal(ConversionSession::new);
    let mut steps = use_signal(StepList::new);
    let mut axis = use_signal(AxisConfig::default);
    let mut filename = use_signal(|| Option::<String>::None);
    // Errors that never reach the session, e.g. starting a run without
    // enabled steps.
    let mut error = use_signal(|| Option::<String>::None);
    // Shared by both previews. Only the original publishes it, so the
    // converted preview keeps the original's size even while empty.
    let mut aspect = use_signal(|| 1.0_f64);
    let pipeline = use_hook(|| Rc::new(Pipeline::new(NativeExecutor, BrowserPacer)));

    // Both previews derive from the session snapshots and share the
    // axis configuration. Neither ever sees the buffer being written.
    let original_grid = use_memo(move || {
        let session = session.read();
        let mut published = None;
        let grid = to_grid(session.original().as_ref(), &axis(), |ratio| {
            published = Some(ratio);
        });
        (Rc::new(grid), published)
    });
    use_effect(move || {
        if let Some(ratio) = original_grid.read().1 {
            aspect.set(ratio);
        }
    });
    let converted_grid = use_memo(move || {
        let session = session.read();
        Rc::new(to_grid(session.converted().as_ref(), &axis(), |_| {}))
    });

    // --- File upload handler ---
    let on_upload = move |file: UploadedFile| {
        error.set(None);
        match session.write().load(file.bytes, &file.media_type) {
            Ok(()) => filename.set(Some(file.name)),
            Err(e) => web_sys::console::warn_1(&format!("upload rejected: {e}").into()),
        }
    };

    // --- Conversion ---
    let run_pipeline = Rc::clone(&pipeline);
    let on_convert = move |_| {
        let list = steps.read().clone();
        let lease = match session.write().begin_run(list.steps()) {
            Ok(lease) => lease,
            Err(e) => {
                error.set(Some(e.to_string()));
                return;
            }
        };
        error.set(None);

        let pipeline = Rc::clone(&run_pipeline);
        spawn(async move {
            let mut lease = lease;
            let outcome = pipeline
                .run(lease.image_mut(), list.steps(), |event| {
                    session.write().record_progress(*event);
                })
                .await
                .map(ConvertedSamples::into_report);
            session.write().finish_run(lease, outcome);
        });
    };

    let cancel_token = pipeline.cancel_token();
    let on_cancel = move |()| cancel_token.cancel();

    // --- Derived view state ---
    let converting = session.read().is_converting();
    let progress = session.read().progress().copied();
    let session_error = session.read().error().map(str::to_owned);
    let report = session.read().report().cloned();
    let has_image = session.read().original().is_some();
    let shown_error = error().or(session_error);
    let original_title =
        filename().map_or_else(|| "Original".to_owned(), |n| format!("Original: {n}"));
    let no_enabled = steps.read().enabled_steps().next().is_none();

    // --- Layout ---
    rsx! {
        style { dangerous_inner_html: include_str!("../assets/style.css") }

        div { class: "app",
            header { class: "app-header",
                h1 { "graystep" }
                p { class: "text-muted small",
                    "Compose and run ordered processing steps on grayscale images"
                }
            }

            div { class: "app-body",
                aside { class: "sidebar",
                    FileUpload { on_upload: on_upload, disabled: converting }

                    StepListEditor {
                        steps: steps(),
                        on_change: move |next: StepList| steps.set(next),
                        disabled: converting,
                    }

                    button {
                        class: "btn btn-primary convert",
                        disabled: converting || !has_image || no_enabled,
                        onclick: on_convert,
                        "Convert"
                    }

                    UnitsControl {
                        axis: axis(),
                        on_change: move |next: AxisConfig| axis.set(next),
                    }

                    if let Some(ref report) = report {
                        div { class: "report",
                            h2 { "Last run" }
                            ol {
                                for (i, record) in report.steps.iter().enumerate() {
                                    li { key: "{i}",
                                        span { "{record.name()}" }
                                        {render_outcome(&record.outcome)}
                                    }
                                }
                            }
                            p { class: "text-muted small tabular",
                                "Total: {report.total.as_millis()} ms"
                            }
                        }
                    }
                }

                main { class: "previews",
                    GridPreview {
                        grid: Rc::clone(&original_grid.read().0),
                        title: original_title,
                        aspect: aspect(),
                    }
                    GridPreview {
                        grid: Rc::clone(&converted_grid.read()),
                        title: "Converted".to_owned(),
                        aspect: aspect(),
                        error: shown_error,
                    }
                }
            }

            if converting {
                ProgressOverlay { event: progress, on_cancel: on_cancel }
            }
        }
    }
}

/// One cell of the run report.
fn render_outcome(outcome: &StepOutcome) -> Element {
    match outcome {
        StepOutcome::Succeeded { duration } => {
            let ms = duration.as_millis();
            rsx! { span { class: "text-success tabular", "{ms} ms" } }
        }
        StepOutcome::Failed { message } => {
            let message = message.clone();
            rsx! { span { class: "text-error", "failed: {message}" } }
        }
        StepOutcome::NotAttempted => rsx! { span { class: "text-muted", "not run" } },
    }
}
