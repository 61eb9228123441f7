//! graystep-pipeline: ordered processing of single-channel images (sans-IO).
//!
//! Decodes a grayscale raster, applies a user-ordered list of steps to
//! it in place, and maps the result to a displayable grid:
//!
//! bytes -> [`decode`] -> [`Image`] -> [`ConversionPipeline::run`] ->
//! [`SampleView`] -> [`to_grid`] -> [`RenderableGrid`]
//!
//! This crate has **no I/O dependencies**. It works on in-memory byte
//! slices and leaves file access, timers, and drawing to the caller
//! through the [`Pacer`] and [`GridRenderer`] traits. All browser
//! interaction lives in `graystep-io`.

pub mod decode;
pub mod executor;
pub mod field;
pub mod pipeline;
pub mod session;
pub mod step;
pub mod types;
pub mod visualize;

pub use decode::{SUPPORTED_MEDIA_TYPES, decode, decode_bytes};
pub use executor::{AlgorithmExecutor, ExecutionError, NativeExecutor};
pub use field::{FieldGrammar, FieldInput, NumericField};
pub use pipeline::{
    CancelToken, ConversionPipeline, ConvertedSamples, NoPacing, Pacer, Pacing, ProgressEvent,
    ProgressStatus, RunFailure, RunReport, StepOutcome, StepRecord,
};
pub use session::{ConversionSession, RunLease, SessionState};
pub use step::{AlgorithmStep, StepField, StepKind, StepList, StepParams, ValidationError};
pub use types::{
    BitDepth, Dimensions, Image, PipelineError, SampleSlice, SampleSliceMut, SampleView,
    SampleViewMut,
};
pub use visualize::{
    Axis, AxisConfig, AxisUnit, GridRenderer, MIN_AXIS_SCALE, RenderableGrid, TARGET_TICKS,
    ZRange, present, to_grid,
};
