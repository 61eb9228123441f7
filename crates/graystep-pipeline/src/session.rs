//! Conversion session: the single owner of the uploaded image.
//!
//! ```text
//! Empty ──load──▶ Loaded ──begin_run──▶ Converting ──finish_run──▶ Converted
//!                   ▲                                     │
//!                   └──────────── load ◀── Failed ◀───────┘
//! ```
//!
//! While converting, the working image is lent to the caller in a
//! [`RunLease`]; display code only ever sees the original snapshot or
//! the snapshot taken when the last run ended, never the buffer a step
//! is writing.

use serde::{Deserialize, Serialize};

use crate::decode;
use crate::pipeline::{ProgressEvent, RunFailure, RunReport};
use crate::step::AlgorithmStep;
use crate::types::{Image, PipelineError, SampleView};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// Nothing uploaded yet.
    Empty,
    /// An image is decoded and ready.
    Loaded,
    /// A run holds the working image.
    Converting,
    /// The last run completed.
    Converted,
    /// The last run stopped with an error.
    Failed,
}

/// Exclusive loan of the working image for the duration of one run.
///
/// Obtained from [`ConversionSession::begin_run`] and handed back via
/// [`ConversionSession::finish_run`].
#[derive(Debug)]
#[must_use = "a lease must be returned with finish_run"]
pub struct RunLease {
    image: Image,
}

impl RunLease {
    /// The image to pass to the pipeline.
    pub const fn image_mut(&mut self) -> &mut Image {
        &mut self.image
    }

    /// Read access to the working image.
    #[must_use]
    pub const fn image(&self) -> &Image {
        &self.image
    }
}

/// State for one uploaded image and the runs performed on it.
#[derive(Debug)]
pub struct ConversionSession {
    state: SessionState,
    source: Option<Vec<u8>>,
    original: Option<Image>,
    working: Option<Image>,
    converted: Option<Image>,
    progress: Option<ProgressEvent>,
    report: Option<RunReport>,
    error: Option<String>,
}

impl Default for ConversionSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversionSession {
    /// A session with nothing loaded.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SessionState::Empty,
            source: None,
            original: None,
            working: None,
            converted: None,
            progress: None,
            report: None,
            error: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// The uploaded bytes, unchanged.
    #[must_use]
    pub fn source_bytes(&self) -> Option<&[u8]> {
        self.source.as_deref()
    }

    /// The image as decoded, before any step.
    #[must_use]
    pub fn original(&self) -> Option<SampleView<'_>> {
        self.original.as_ref().map(Image::view)
    }

    /// The snapshot taken when the last run ended.
    ///
    /// After a failed run this is the last-known-good partial result.
    #[must_use]
    pub fn converted(&self) -> Option<SampleView<'_>> {
        self.converted.as_ref().map(Image::view)
    }

    /// The latest progress event of the current or last run.
    #[must_use]
    pub const fn progress(&self) -> Option<&ProgressEvent> {
        self.progress.as_ref()
    }

    /// Per-step outcomes of the last finished run.
    #[must_use]
    pub const fn report(&self) -> Option<&RunReport> {
        self.report.as_ref()
    }

    /// Message of the most recent error, cleared by the next success.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether a run currently holds the image.
    #[must_use]
    pub fn is_converting(&self) -> bool {
        self.state == SessionState::Converting
    }

    /// Decode an upload and make it the session's image.
    ///
    /// Replaces any previous image and clears the converted snapshot.
    /// On failure the previous image and state are kept and the error
    /// message is recorded.
    ///
    /// # Errors
    ///
    /// [`PipelineError::AlreadyRunning`] while converting, otherwise
    /// any error from [`decode::decode`].
    pub fn load(&mut self, bytes: Vec<u8>, media_type: &str) -> Result<(), PipelineError> {
        if self.is_converting() {
            return Err(PipelineError::AlreadyRunning);
        }
        let image = match decode::decode(&bytes, media_type) {
            Ok(image) => image,
            Err(err) => {
                tracing::warn!(media_type, %err, "upload rejected");
                self.error = Some(err.to_string());
                return Err(err);
            }
        };

        tracing::debug!(
            width = image.width(),
            height = image.height(),
            depth = %image.bit_depth(),
            "image loaded"
        );
        self.source = Some(bytes);
        self.working = Some(image.clone());
        self.original = Some(image);
        self.converted = None;
        self.progress = None;
        self.report = None;
        self.error = None;
        self.transition(SessionState::Loaded);
        Ok(())
    }

    /// Start a run: reset the working image to the original samples and
    /// lend it out.
    ///
    /// Runs never build on each other. Converting twice with the same
    /// steps yields the same result instead of applying the steps to the
    /// previous output; to chain passes, repeat the steps in one list.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::NoImageLoaded`] before the first upload.
    /// - [`PipelineError::AlreadyRunning`] while a lease is out.
    /// - [`PipelineError::NoStepsSelected`] if no step is enabled.
    /// - [`PipelineError::Validation`] if an enabled step is invalid.
    ///
    /// None of these change the session's state.
    pub fn begin_run(&mut self, steps: &[AlgorithmStep]) -> Result<RunLease, PipelineError> {
        if self.is_converting() {
            return Err(PipelineError::AlreadyRunning);
        }
        let (Some(original), Some(working)) = (self.original.as_ref(), self.working.as_mut()) else {
            return Err(PipelineError::NoImageLoaded);
        };

        let mut enabled = steps.iter().filter(|step| step.enabled).peekable();
        if enabled.peek().is_none() {
            return Err(PipelineError::NoStepsSelected);
        }
        for step in enabled {
            step.validate()?;
        }

        working.copy_samples_from(original)?;
        let image = self.working.take().ok_or(PipelineError::NoImageLoaded)?;
        self.progress = None;
        self.error = None;
        self.transition(SessionState::Converting);
        Ok(RunLease { image })
    }

    /// Store the latest progress event.
    pub fn record_progress(&mut self, event: ProgressEvent) {
        self.progress = Some(event);
    }

    /// Take the image back after a run.
    ///
    /// On success the converted snapshot is replaced. On failure it is
    /// replaced only if some step ran, so the display keeps the
    /// last-known-good samples, and the error message is recorded.
    pub fn finish_run(&mut self, lease: RunLease, outcome: Result<RunReport, RunFailure>) {
        let image = lease.image;
        match outcome {
            Ok(report) => {
                self.converted = Some(image.clone());
                self.report = Some(report);
                self.error = None;
                self.transition(SessionState::Converted);
            }
            Err(RunFailure { error, report }) => {
                if report.any_attempted() {
                    self.converted = Some(image.clone());
                }
                self.report = Some(report);
                self.error = Some(error.to_string());
                self.transition(SessionState::Failed);
            }
        }
        self.working = Some(image);
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(from = ?self.state, to = ?next, "session state");
        self.state = next;
    }
}
