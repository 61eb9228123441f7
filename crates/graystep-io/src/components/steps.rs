//! Ordered step list editor.
//!
//! Each row shows one step with its enable toggle, reorder and remove
//! buttons, and a text input per parameter. Edits are applied to a copy
//! of the list and handed back through `on_change`; the list is never
//! mutated in place.

use dioxus::prelude::*;
use dioxus_free_icons::Icon;
use dioxus_free_icons::icons::ld_icons::{LdArrowDown, LdArrowUp, LdTrash2};
use graystep_pipeline::{AlgorithmStep, StepField, StepKind, StepList};

use super::NumberInput;

/// Props for the [`StepListEditor`] component.
#[derive(Props, Clone, PartialEq)]
pub struct StepListEditorProps {
    /// Current list (read-only).
    steps: StepList,
    /// Called with the edited list after every change.
    on_change: EventHandler<StepList>,
    /// Locks all controls while a conversion is running.
    #[props(default)]
    disabled: bool,
}

/// Editor for the ordered step list.
#[component]
pub fn StepListEditor(props: StepListEditorProps) -> Element {
    // Enable toggles that failed validation, keyed by row.
    let toggle_error = use_signal(|| Option::<(usize, String)>::None);
    let disabled = props.disabled;
    let on_change = props.on_change;
    let steps = props.steps;
    let count = steps.len();

    let add_steps = steps.clone();
    let on_add = move |value: String| {
        let Some(kind) = value
            .parse::<usize>()
            .ok()
            .and_then(|i| StepKind::ALL.get(i).copied())
        else {
            web_sys::console::warn_1(&format!("unknown step kind option: {value:?}").into());
            return;
        };
        let mut next = add_steps.clone();
        next.push_default(kind);
        on_change.call(next);
    };

    rsx! {
        div { class: "step-list",
            div { class: "step-list-header",
                h2 { "Steps" }
                select {
                    class: "select",
                    aria_label: "Add step",
                    disabled: disabled,
                    value: "",
                    onchange: move |e| on_add(e.value()),
                    option { value: "", disabled: true, selected: true, "Add step..." }
                    for (i, kind) in StepKind::ALL.iter().enumerate() {
                        option { value: "{i}", "{kind}" }
                    }
                }
            }

            if steps.is_empty() {
                p { class: "text-secondary small", "No steps yet. Add one to get started." }
            }

            for (index, step) in steps.steps().iter().copied().enumerate() {
                {render_step_row(
                    &steps,
                    index,
                    step,
                    count,
                    disabled,
                    toggle_error
                        .read()
                        .as_ref()
                        .filter(|(row, _)| *row == index)
                        .map(|(_, msg)| msg.clone()),
                    on_change,
                    toggle_error,
                )}
            }
        }
    }
}

/// Render one step row.
#[allow(clippy::too_many_arguments, clippy::needless_pass_by_value)]
fn render_step_row(
    steps: &StepList,
    index: usize,
    step: AlgorithmStep,
    count: usize,
    disabled: bool,
    error: Option<String>,
    on_change: EventHandler<StepList>,
    mut toggle_error: Signal<Option<(usize, String)>>,
) -> Element {
    let toggle_id = format!("step-{index}-enabled");
    let toggle_steps = steps.clone();
    let up_steps = steps.clone();
    let down_steps = steps.clone();
    let remove_steps = steps.clone();
    let field_steps = steps.clone();
    let number = index + 1;
    let row_class = if step.enabled {
        "step-row"
    } else {
        "step-row step-disabled"
    };

    rsx! {
        div { key: "{index}-{step.kind():?}", class: "{row_class}",
            div { class: "step-row-header",
                input {
                    r#type: "checkbox",
                    id: "{toggle_id}",
                    checked: step.enabled,
                    disabled: disabled,
                    onchange: move |e| {
                        let mut next = toggle_steps.clone();
                        match next.set_enabled(index, e.checked()) {
                            Ok(()) => {
                                toggle_error.set(None);
                                on_change.call(next);
                            }
                            Err(err) => toggle_error.set(Some((index, err.to_string()))),
                        }
                    },
                }
                label { r#for: "{toggle_id}", class: "step-name", "{number}. {step.name()}" }
                div { class: "step-actions",
                    button {
                        class: "icon-btn",
                        title: "Move up",
                        disabled: disabled || index == 0,
                        onclick: move |_| {
                            let mut next = up_steps.clone();
                            next.move_up(index);
                            toggle_error.set(None);
                            on_change.call(next);
                        },
                        Icon { width: 16, height: 16, icon: LdArrowUp }
                    }
                    button {
                        class: "icon-btn",
                        title: "Move down",
                        disabled: disabled || index + 1 >= count,
                        onclick: move |_| {
                            let mut next = down_steps.clone();
                            next.move_down(index);
                            toggle_error.set(None);
                            on_change.call(next);
                        },
                        Icon { width: 16, height: 16, icon: LdArrowDown }
                    }
                    button {
                        class: "icon-btn danger",
                        title: "Remove",
                        disabled: disabled,
                        onclick: move |_| {
                            let mut next = remove_steps.clone();
                            next.remove(index);
                            toggle_error.set(None);
                            on_change.call(next);
                        },
                        Icon { width: 16, height: 16, icon: LdTrash2 }
                    }
                }
            }

            if let Some(ref err) = error {
                p { class: "text-error small", "{err}" }
            }

            div { class: "step-fields",
                for field in step.kind().fields().iter().copied() {
                    NumberInput {
                        key: "{field:?}",
                        id: field_id(index, field),
                        field,
                        params: step.params,
                        disabled,
                        on_change: {
                            let field_steps = field_steps.clone();
                            move |(field, value): (StepField, f64)| {
                                let mut next = field_steps.clone();
                                match next.set_field(index, field, value) {
                                    Ok(()) => on_change.call(next),
                                    Err(err) => web_sys::console::warn_1(
                                        &format!("rejected {field} = {value}: {err}").into(),
                                    ),
                                }
                            }
                        },
                    }
                }
            }
        }
    }
}

/// DOM id of a parameter input.
fn field_id(index: usize, field: StepField) -> String {
    format!("step-{index}-{field:?}").to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_ids_are_unique_per_row() {
        let a = field_id(0, StepField::A);
        let b = field_id(0, StepField::B);
        let a1 = field_id(1, StepField::A);
        assert_ne!(a, b);
        assert_ne!(a, a1);
        assert_eq!(a, "step-0-a");
    }
}
