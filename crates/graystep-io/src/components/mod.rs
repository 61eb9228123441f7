//! Dioxus UI components for graystep.
//!
//! Provides the file upload zone, step list editor with per-parameter
//! inputs, axis unit control, heatmap preview, and progress overlay.

mod grid_preview;
mod number_input;
mod progress;
mod steps;
mod units;
mod upload;

pub use grid_preview::GridPreview;
pub use number_input::NumberInput;
pub use progress::ProgressOverlay;
pub use steps::StepListEditor;
pub use units::UnitsControl;
pub use upload::{FileUpload, UploadedFile};
