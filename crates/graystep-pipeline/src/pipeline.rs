//! Conversion pipeline: applies an ordered list of steps to one image
//! in place, yielding to the host between steps.
//!
//! ```rust
//! # use graystep_pipeline::{
//! #     AlgorithmStep, ConversionPipeline, Image, NativeExecutor, NoPacing, StepKind, StepParams,
//! # };
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut image = Image::from_u8(4, 4, vec![128; 16])?;
//! let steps = [AlgorithmStep {
//!     enabled: true,
//!     params: StepParams::LinearTransform { a: 2.0, b: 10.0 },
//! }];
//!
//! let pipeline = ConversionPipeline::new(NativeExecutor, NoPacing);
//! let converted = futures::executor::block_on(pipeline.run(&mut image, &steps, |_| {}))?;
//! assert!(converted.samples.as_u8().is_some_and(|s| s.iter().all(|&v| v == 255)));
//! # Ok(())
//! # }
//! ```
//!
//! # Failure policy
//!
//! A failing step stops the run immediately. Steps that already ran
//! are **not** rolled back: the image holds the result of every step
//! before the failing one, so callers can show how far processing got.
//!
//! # Scheduling
//!
//! Each step runs to completion. Between steps, and once after the
//! last step, the pipeline awaits a [`Pacer`] pause so the host can
//! repaint. Cancellation is only observed at those pauses.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::executor::AlgorithmExecutor;
use crate::step::{AlgorithmStep, StepKind};
use crate::types::{Image, PipelineError, SampleView};

/// Label of the terminal progress status.
pub const COMPLETE_LABEL: &str = "Complete";

/// Suspends the pipeline at its yield points.
///
/// The browser implementation waits on a timer so the UI can repaint;
/// headless callers use [`NoPacing`].
pub trait Pacer {
    /// Hand control back to the host for roughly `duration`.
    fn pause(&self, duration: Duration) -> impl Future<Output = ()>;
}

/// A pacer that never suspends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoPacing;

impl Pacer for NoPacing {
    fn pause(&self, _duration: Duration) -> impl Future<Output = ()> {
        std::future::ready(())
    }
}

/// Delays used at the pipeline's yield points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pacing {
    /// Pause after each step.
    pub yield_delay: Duration,
    /// Pause after the terminal "Complete" event, before returning.
    pub final_display_delay: Duration,
}

impl Pacing {
    /// Default pause after each step.
    pub const DEFAULT_YIELD_DELAY: Duration = Duration::from_millis(10);
    /// Default hold time of the terminal progress state.
    pub const DEFAULT_FINAL_DISPLAY_DELAY: Duration = Duration::from_millis(500);

    /// Zero-length pauses, for headless runs.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            yield_delay: Duration::ZERO,
            final_display_delay: Duration::ZERO,
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            yield_delay: Self::DEFAULT_YIELD_DELAY,
            final_display_delay: Self::DEFAULT_FINAL_DISPLAY_DELAY,
        }
    }
}

/// Shared flag for requesting cancellation of a run.
///
/// Cloning yields a handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token with no pending request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation at the next yield point.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// What the pipeline is doing at the moment a progress event fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressStatus {
    /// About to execute the step at `index` of `total`.
    Running {
        /// Zero-based position among the enabled steps.
        index: usize,
        /// Number of enabled steps.
        total: usize,
        /// Kind of the step about to run.
        kind: StepKind,
    },
    /// All steps finished.
    Complete,
}

/// Progress notification sent before each step and once at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// `round(index / total * 100)`, or 100 when complete.
    pub percent: u8,
    /// Current activity.
    pub status: ProgressStatus,
}

impl ProgressEvent {
    fn running(index: usize, total: usize, kind: StepKind) -> Self {
        Self {
            percent: percent(index, total),
            status: ProgressStatus::Running { index, total, kind },
        }
    }

    const fn complete() -> Self {
        Self {
            percent: 100,
            status: ProgressStatus::Complete,
        }
    }

    /// Human-readable status: the step name, or "Complete".
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self.status {
            ProgressStatus::Running { kind, .. } => kind.label(),
            ProgressStatus::Complete => COMPLETE_LABEL,
        }
    }

    /// Whether this is the terminal event.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self.status, ProgressStatus::Complete)
    }
}

/// `round(index * 100 / total)` with halves rounded up.
fn percent(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let rounded = (index * 200 + total) / (2 * total);
    u8::try_from(rounded.min(100)).unwrap_or(100)
}

/// Result of one step within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// The step ran and returned normally.
    Succeeded {
        /// Wall time spent in the executor.
        duration: Duration,
    },
    /// The step returned an error; the run stopped here.
    Failed {
        /// The executor's error message.
        message: String,
    },
    /// The run stopped before reaching this step.
    NotAttempted,
}

/// Per-step entry of a [`RunReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Kind of the step.
    pub kind: StepKind,
    /// What happened to it.
    pub outcome: StepOutcome,
}

impl StepRecord {
    /// Human-readable step name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.kind.label()
    }
}

/// Per-step outcomes of one run, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// One record per enabled step.
    pub steps: Vec<StepRecord>,
    /// Wall time from start to the final yield point.
    pub total: Duration,
}

impl RunReport {
    fn not_attempted(steps: &[&AlgorithmStep]) -> Self {
        Self {
            steps: steps
                .iter()
                .map(|step| StepRecord {
                    kind: step.kind(),
                    outcome: StepOutcome::NotAttempted,
                })
                .collect(),
            total: Duration::ZERO,
        }
    }

    /// Number of steps that succeeded.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.steps
            .iter()
            .filter(|record| matches!(record.outcome, StepOutcome::Succeeded { .. }))
            .count()
    }

    /// Whether any step ran, successfully or not.
    #[must_use]
    pub fn any_attempted(&self) -> bool {
        self.steps
            .iter()
            .any(|record| record.outcome != StepOutcome::NotAttempted)
    }
}

/// A finished run: a read view over the converted image plus the report.
#[derive(Debug, Clone)]
pub struct ConvertedSamples<'a> {
    /// The fully transformed samples at the image's native depth.
    pub samples: SampleView<'a>,
    /// Per-step outcomes.
    pub report: RunReport,
}

impl ConvertedSamples<'_> {
    /// Drop the borrow on the image, keeping the report.
    #[must_use]
    pub fn into_report(self) -> RunReport {
        self.report
    }
}

/// A failed run: the error plus per-step outcomes up to the failure.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct RunFailure {
    /// Why the run stopped.
    #[source]
    pub error: PipelineError,
    /// Outcomes of every enabled step.
    pub report: RunReport,
}

impl RunFailure {
    fn new(error: PipelineError, report: RunReport) -> Self {
        Self { error, report }
    }
}

impl From<RunFailure> for PipelineError {
    fn from(failure: RunFailure) -> Self {
        failure.error
    }
}

/// Releases the busy flag when a run ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Orchestrates runs of an [`AlgorithmExecutor`] over one image.
///
/// At most one run is in flight per pipeline; a concurrent call to
/// [`run`](Self::run) fails with [`PipelineError::AlreadyRunning`].
#[derive(Debug)]
pub struct ConversionPipeline<E, P = NoPacing> {
    executor: E,
    pacer: P,
    pacing: Pacing,
    cancel: CancelToken,
    busy: AtomicBool,
}

impl<E: AlgorithmExecutor, P: Pacer> ConversionPipeline<E, P> {
    /// A pipeline with default [`Pacing`].
    pub fn new(executor: E, pacer: P) -> Self {
        Self {
            executor,
            pacer,
            pacing: Pacing::default(),
            cancel: CancelToken::new(),
            busy: AtomicBool::new(false),
        }
    }

    /// Replace the yield-point delays.
    #[must_use]
    pub const fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Current yield-point delays.
    #[must_use]
    pub const fn pacing(&self) -> Pacing {
        self.pacing
    }

    /// Handle for cancelling the current or next run.
    ///
    /// The request is cleared when a run starts, so it only affects a
    /// run that is already in flight.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Whether a run is in flight.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Apply the enabled `steps`, in order, to `image` in place.
    ///
    /// `on_progress` fires before each step with
    /// `round(i / n * 100)` and the step's kind, then once with 100 and
    /// [`ProgressStatus::Complete`] after the last step.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::AlreadyRunning`] if another run is in flight.
    /// - [`PipelineError::NoStepsSelected`] if no step is enabled; the
    ///   image is untouched.
    /// - [`PipelineError::Validation`] if an enabled step fails
    ///   validation; the image is untouched.
    /// - [`PipelineError::ExecutionFailure`] if a step fails; earlier
    ///   steps' mutations remain in the image.
    /// - [`PipelineError::Cancelled`] if cancellation was requested and
    ///   observed at a yield point.
    pub async fn run<'a>(
        &self,
        image: &'a mut Image,
        steps: &[AlgorithmStep],
        mut on_progress: impl FnMut(&ProgressEvent),
    ) -> Result<ConvertedSamples<'a>, RunFailure> {
        let enabled: Vec<&AlgorithmStep> = steps.iter().filter(|step| step.enabled).collect();
        let mut report = RunReport::not_attempted(&enabled);

        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            return Err(RunFailure::new(PipelineError::AlreadyRunning, report));
        };
        if enabled.is_empty() {
            return Err(RunFailure::new(PipelineError::NoStepsSelected, report));
        }
        if let Some(err) = enabled.iter().find_map(|step| step.validate().err()) {
            return Err(RunFailure::new(err.into(), report));
        }

        self.cancel.reset();
        let total = enabled.len();
        let started = web_time::Instant::now();
        tracing::debug!(
            steps = total,
            width = image.width(),
            height = image.height(),
            depth = %image.bit_depth(),
            "starting conversion"
        );

        for (index, step) in enabled.iter().enumerate() {
            let kind = step.kind();
            on_progress(&ProgressEvent::running(index, total, kind));
            tracing::debug!(index, step = kind.label(), "applying step");

            let step_started = web_time::Instant::now();
            let result = self.executor.apply(&mut image.view_mut(), &step.params);
            let duration = step_started.elapsed();

            if let Err(cause) = result {
                tracing::warn!(index, step = kind.label(), %cause, "step failed");
                report.steps[index].outcome = StepOutcome::Failed {
                    message: cause.to_string(),
                };
                report.total = started.elapsed();
                return Err(RunFailure::new(
                    PipelineError::ExecutionFailure {
                        step_index: index,
                        step_kind: kind,
                        cause,
                    },
                    report,
                ));
            }
            report.steps[index].outcome = StepOutcome::Succeeded { duration };

            self.pacer.pause(self.pacing.yield_delay).await;

            let completed = index + 1;
            if completed < total && self.cancel.is_cancelled() {
                tracing::warn!(completed, total, "conversion cancelled");
                report.total = started.elapsed();
                return Err(RunFailure::new(
                    PipelineError::Cancelled { completed },
                    report,
                ));
            }
        }

        on_progress(&ProgressEvent::complete());
        report.total = started.elapsed();
        tracing::info!(
            steps = total,
            elapsed_ms = report.total.as_millis(),
            "conversion complete"
        );
        self.pacer.pause(self.pacing.final_display_delay).await;

        Ok(ConvertedSamples {
            samples: image.view(),
            report,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;

    use futures::executor::block_on;

    use super::*;
    use crate::executor::{ExecutionError, NativeExecutor};
    use crate::step::StepParams;
    use crate::types::SampleViewMut;

    fn linear(a: f32, b: f32) -> AlgorithmStep {
        AlgorithmStep {
            enabled: true,
            params: StepParams::LinearTransform { a, b },
        }
    }

    /// Records pause durations and can cancel after a given pause.
    struct RecordingPacer {
        pauses: RefCell<Vec<Duration>>,
        cancel_after: Option<(usize, CancelToken)>,
    }

    impl Pacer for RecordingPacer {
        fn pause(&self, duration: Duration) -> impl Future<Output = ()> {
            let mut pauses = self.pauses.borrow_mut();
            pauses.push(duration);
            if let Some((n, token)) = &self.cancel_after
                && pauses.len() == *n
            {
                token.cancel();
            }
            std::future::ready(())
        }
    }

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(percent(0, 3), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(1, 8), 13);
        assert_eq!(percent(1, 2), 50);
    }

    #[test]
    fn progress_fires_before_each_step_and_at_completion() {
        let mut image = Image::from_u8(2, 2, vec![1; 4]).unwrap();
        let steps = [
            linear(1.0, 1.0),
            AlgorithmStep::create_default(StepKind::MedianBlur),
            linear(1.0, 1.0),
        ];
        let pipeline = ConversionPipeline::new(NativeExecutor, NoPacing);
        let mut events = Vec::new();

        let converted = block_on(pipeline.run(&mut image, &steps, |e| events.push(*e))).unwrap();

        let percents: Vec<u8> = events.iter().map(|e| e.percent).collect();
        assert_eq!(percents, [0, 33, 67, 100]);
        assert_eq!(events[0].label(), "Linear Transform");
        assert_eq!(events[1].label(), "Median Blur");
        assert!(events[3].is_complete());
        assert_eq!(events[3].label(), "Complete");
        assert_eq!(converted.report.succeeded(), 3);
        assert_eq!(converted.samples.as_u8().unwrap(), &[3; 4]);
    }

    #[test]
    fn disabled_steps_are_skipped() {
        let mut image = Image::from_u8(1, 1, vec![10]).unwrap();
        let mut off = linear(0.0, 0.0);
        off.enabled = false;
        let steps = [off, linear(1.0, 5.0)];
        let pipeline = ConversionPipeline::new(NativeExecutor, NoPacing);

        let converted = block_on(pipeline.run(&mut image, &steps, |_| {})).unwrap();
        assert_eq!(converted.samples.as_u8().unwrap(), &[15]);
        assert_eq!(converted.report.steps.len(), 1);
    }

    #[test]
    fn pauses_after_every_step_then_holds_final_state() {
        let mut image = Image::from_u8(1, 1, vec![0]).unwrap();
        let pacer = RecordingPacer {
            pauses: RefCell::new(Vec::new()),
            cancel_after: None,
        };
        let pipeline = ConversionPipeline::new(NativeExecutor, pacer);
        block_on(pipeline.run(&mut image, &[linear(1.0, 0.0), linear(1.0, 0.0)], |_| {})).unwrap();

        let pauses = pipeline.pacer.pauses.borrow();
        assert_eq!(
            *pauses,
            [
                Pacing::DEFAULT_YIELD_DELAY,
                Pacing::DEFAULT_YIELD_DELAY,
                Pacing::DEFAULT_FINAL_DISPLAY_DELAY
            ]
        );
    }

    #[test]
    fn invalid_enabled_step_is_rejected_before_mutation() {
        let mut image = Image::from_u8(1, 1, vec![9]).unwrap();
        let bad = AlgorithmStep {
            enabled: true,
            params: StepParams::GaussianBlur { sigma: -1.0 },
        };
        let pipeline = ConversionPipeline::new(NativeExecutor, NoPacing);

        let failure =
            block_on(pipeline.run(&mut image, &[linear(2.0, 0.0), bad], |_| {})).unwrap_err();
        assert!(matches!(failure.error, PipelineError::Validation(_)));
        assert!(!failure.report.any_attempted());
        assert_eq!(image.view().as_u8().unwrap(), &[9]);
    }

    #[test]
    fn cancellation_is_observed_at_the_next_yield_point() {
        let mut image = Image::from_u8(1, 1, vec![0]).unwrap();
        let token = CancelToken::new();
        let pacer = RecordingPacer {
            pauses: RefCell::new(Vec::new()),
            cancel_after: Some((1, token.clone())),
        };
        let mut pipeline = ConversionPipeline::new(NativeExecutor, pacer);
        pipeline.cancel = token;

        let steps = [linear(1.0, 1.0), linear(1.0, 1.0), linear(1.0, 1.0)];
        let failure = block_on(pipeline.run(&mut image, &steps, |_| {})).unwrap_err();

        assert!(matches!(
            failure.error,
            PipelineError::Cancelled { completed: 1 }
        ));
        assert_eq!(image.view().as_u8().unwrap(), &[1]);
        assert_eq!(failure.report.steps[1].outcome, StepOutcome::NotAttempted);
    }

    #[test]
    fn cancel_after_last_step_still_completes() {
        let mut image = Image::from_u8(1, 1, vec![0]).unwrap();
        let token = CancelToken::new();
        let pacer = RecordingPacer {
            pauses: RefCell::new(Vec::new()),
            cancel_after: Some((1, token.clone())),
        };
        let mut pipeline = ConversionPipeline::new(NativeExecutor, pacer);
        pipeline.cancel = token;

        let converted = block_on(pipeline.run(&mut image, &[linear(1.0, 4.0)], |_| {})).unwrap();
        assert_eq!(converted.samples.as_u8().unwrap(), &[4]);
    }

    #[test]
    fn busy_pipeline_rejects_second_run() {
        let pipeline = ConversionPipeline::new(NativeExecutor, NoPacing);
        let _held = BusyGuard::acquire(&pipeline.busy).unwrap();
        assert!(pipeline.is_running());

        let mut image = Image::from_u8(1, 1, vec![5]).unwrap();
        let failure = block_on(pipeline.run(&mut image, &[linear(2.0, 0.0)], |_| {})).unwrap_err();
        assert!(matches!(failure.error, PipelineError::AlreadyRunning));
        assert_eq!(image.view().as_u8().unwrap(), &[5]);
    }

    #[test]
    fn busy_flag_is_released_after_failure() {
        struct AlwaysFails;
        impl AlgorithmExecutor for AlwaysFails {
            fn hot_pixel_removal(
                &self,
                _: &mut SampleViewMut<'_>,
                _: f32,
                _: f32,
            ) -> Result<(), ExecutionError> {
                Err(ExecutionError::EmptyImage)
            }
            fn gaussian_blur(
                &self,
                _: &mut SampleViewMut<'_>,
                _: f32,
            ) -> Result<(), ExecutionError> {
                Err(ExecutionError::EmptyImage)
            }
            fn median_blur(&self, _: &mut SampleViewMut<'_>, _: u32) -> Result<(), ExecutionError> {
                Err(ExecutionError::EmptyImage)
            }
            fn linear_transform(
                &self,
                _: &mut SampleViewMut<'_>,
                _: f32,
                _: f32,
            ) -> Result<(), ExecutionError> {
                Err(ExecutionError::EmptyImage)
            }
        }

        let pipeline = ConversionPipeline::new(AlwaysFails, NoPacing);
        let mut image = Image::from_u8(1, 1, vec![5]).unwrap();
        let failure = block_on(pipeline.run(&mut image, &[linear(2.0, 0.0)], |_| {})).unwrap_err();
        assert!(matches!(
            failure.error,
            PipelineError::ExecutionFailure {
                step_index: 0,
                step_kind: StepKind::LinearTransform,
                ..
            }
        ));
        assert!(!pipeline.is_running());
        assert_eq!(failure.to_string(), "step 1 (Linear Transform) failed: image has no samples");
    }

    #[test]
    fn report_serializes() {
        let report = RunReport {
            steps: vec![StepRecord {
                kind: StepKind::GaussianBlur,
                outcome: StepOutcome::NotAttempted,
            }],
            total: Duration::from_millis(3),
        };
        let json = serde_json::to_string(&report).unwrap();
        let back: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
