//! Axis unit selection.

use dioxus::prelude::*;
use graystep_pipeline::{AxisConfig, AxisUnit};

/// Props for the [`UnitsControl`] component.
#[derive(Props, Clone, PartialEq)]
pub struct UnitsControlProps {
    /// Current axis configuration.
    axis: AxisConfig,
    /// Called with the new configuration on any accepted change.
    on_change: EventHandler<AxisConfig>,
}

/// Pixel/millimeter switch with a millimeters-per-pixel field.
///
/// The scale field only commits text that parses to a positive number;
/// a comma is accepted as decimal separator.
#[component]
pub fn UnitsControl(props: UnitsControlProps) -> Element {
    let axis = props.axis;
    let on_change = props.on_change;
    let mut scale_text = use_signal(|| format!("{}", axis.scale));
    let mut scale_error = use_signal(|| false);

    let unit_value = match axis.unit {
        AxisUnit::Pixels => "px",
        AxisUnit::Millimeters => "mm",
    };
    let scale_class = if scale_error() {
        "field-input invalid"
    } else {
        "field-input"
    };

    rsx! {
        div { class: "units",
            div { class: "field",
                label { r#for: "axis-unit", class: "field-label", "Units" }
                select {
                    id: "axis-unit",
                    class: "select",
                    value: "{unit_value}",
                    onchange: move |e| {
                        let unit = match e.value().as_str() {
                            "px" => AxisUnit::Pixels,
                            "mm" => AxisUnit::Millimeters,
                            other => {
                                web_sys::console::warn_1(
                                    &format!("unknown axis unit: {other:?}").into(),
                                );
                                return;
                            }
                        };
                        on_change.call(AxisConfig { unit, ..axis });
                    },
                    option { value: "px", selected: axis.unit == AxisUnit::Pixels, "Pixels" }
                    option {
                        value: "mm",
                        selected: axis.unit == AxisUnit::Millimeters,
                        "Millimeters"
                    }
                }
            }

            if axis.unit == AxisUnit::Millimeters {
                div { class: "field",
                    label { r#for: "axis-scale", class: "field-label", "mm per px" }
                    input {
                        r#type: "text",
                        id: "axis-scale",
                        inputmode: "decimal",
                        class: "{scale_class}",
                        value: "{scale_text}",
                        oninput: move |e| {
                            let text = e.value();
                            let parsed = AxisConfig::parse_scale(&text);
                            scale_error.set(parsed.is_none() && !text.trim().is_empty());
                            scale_text.set(text);
                            if let Some(scale) = parsed {
                                on_change.call(AxisConfig { scale, ..axis });
                            }
                        },
                    }
                }
            }
        }
    }
}
