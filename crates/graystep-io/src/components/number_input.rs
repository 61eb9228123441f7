//! Text input for one step parameter.

use dioxus::prelude::*;
use graystep_pipeline::{FieldInput, NumericField, StepField, StepParams};

/// Props for the [`NumberInput`] component.
#[derive(Props, Clone, PartialEq)]
pub struct NumberInputProps {
    /// DOM id of the `<input>`.
    id: String,
    /// Parameter edited by this input.
    field: StepField,
    /// Current parameters of the owning step.
    params: StepParams,
    /// Called with the field and its new value once the text commits.
    on_change: EventHandler<(StepField, f64)>,
    #[props(default)]
    disabled: bool,
}

/// Labeled text input that echoes every keystroke but only commits
/// values that parse and pass the step's validation.
///
/// Text that is still a prefix of a number (`-`, `1.`) is shown
/// without an error and without committing.
#[component]
pub fn NumberInput(props: NumberInputProps) -> Element {
    let field = props.field;
    let value = props.params.get(field).unwrap_or_default();
    let mut state = use_signal(|| NumericField::for_step_field(field, value));

    // Pick up changes made elsewhere, such as a step being reset.
    #[allow(clippy::float_cmp)]
    if state.peek().committed() != value {
        state.write().sync(value);
    }

    let params = props.params;
    let on_change = props.on_change;
    let id = props.id;
    let text = state.read().text().to_owned();
    let error = state.read().error().map(str::to_owned);
    let input_class = if error.is_some() {
        "field-input invalid"
    } else {
        "field-input"
    };

    rsx! {
        div { class: "field",
            label { r#for: "{id}", class: "field-label", "{field}" }
            input {
                r#type: "text",
                id: "{id}",
                inputmode: if field.is_integer() { "numeric" } else { "decimal" },
                class: "{input_class}",
                value: "{text}",
                disabled: props.disabled,
                oninput: move |e| {
                    let outcome = state.write().input(&e.value(), |v| {
                        let next = params.with_field(field, v)?;
                        Ok(next.get(field).unwrap_or(v))
                    });
                    if let FieldInput::Committed(v) = outcome {
                        on_change.call((field, v));
                    }
                },
            }
            if let Some(ref err) = error {
                p { class: "text-error small", "{err}" }
            }
        }
    }
}
