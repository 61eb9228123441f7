//! graystep-io: Browser I/O and Dioxus component library.
//!
//! Handles file uploads, timer-based pacing of conversion runs, grid
//! rasterization into Blob URLs, and provides the reusable UI
//! components of the graystep web application.

pub mod components;
pub mod pacer;
pub mod raster;

pub use components::{
    FileUpload, GridPreview, NumberInput, ProgressOverlay, StepListEditor, UnitsControl,
    UploadedFile,
};
pub use pacer::BrowserPacer;
pub use raster::{BlobUrlRenderer, ObjectUrl, Palette, RasterError};
