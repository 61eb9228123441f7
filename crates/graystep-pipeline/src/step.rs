//! Algorithm step model: the closed set of processing kinds, their
//! parameters, validation, and the ordered step list the user edits.

use serde::{Deserialize, Serialize};

/// The four processing operations a step can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
    /// Clip samples to a pair of percentile cutoffs.
    HotPixelRemoval,
    /// Separable Gaussian smoothing.
    GaussianBlur,
    /// Square-window median filter.
    MedianBlur,
    /// `a * v + b` remap with clamping to the sample range.
    LinearTransform,
}

impl StepKind {
    /// Every kind, in menu order.
    pub const ALL: [Self; 4] = [
        Self::HotPixelRemoval,
        Self::GaussianBlur,
        Self::MedianBlur,
        Self::LinearTransform,
    ];

    /// Human-readable name shown in progress messages and the editor.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::HotPixelRemoval => "Hot Pixel Removal",
            Self::GaussianBlur => "Gaussian Blur",
            Self::MedianBlur => "Median Blur",
            Self::LinearTransform => "Linear Transform",
        }
    }

    /// Fields that belong to this kind, in display order.
    #[must_use]
    pub const fn fields(self) -> &'static [StepField] {
        match self {
            Self::HotPixelRemoval => &[StepField::LowPercentile, StepField::HighPercentile],
            Self::GaussianBlur => &[StepField::Sigma],
            Self::MedianBlur => &[StepField::KernelRadius],
            Self::LinearTransform => &[StepField::A, StepField::B],
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One editable numeric parameter of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepField {
    /// Lower percentile cutoff of hot pixel removal.
    LowPercentile,
    /// Upper percentile cutoff of hot pixel removal.
    HighPercentile,
    /// Gaussian standard deviation.
    Sigma,
    /// Median window radius.
    KernelRadius,
    /// Linear transform gain.
    A,
    /// Linear transform offset.
    B,
}

impl StepField {
    /// Short label used next to the input.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::LowPercentile => "Low percentile",
            Self::HighPercentile => "High percentile",
            Self::Sigma => "Sigma",
            Self::KernelRadius => "Kernel radius",
            Self::A => "a",
            Self::B => "b",
        }
    }

    /// Whether the field accepts a leading minus sign.
    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::A | Self::B)
    }

    /// Whether the field only takes whole numbers.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::KernelRadius)
    }

    /// Check a candidate value against the field's own domain, ignoring
    /// constraints that involve sibling fields.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming this field when the value is
    /// outside the domain.
    pub fn check(self, value: f64) -> Result<(), ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::new(self, "must be a finite number"));
        }
        match self {
            Self::LowPercentile | Self::HighPercentile if !(0.0..=100.0).contains(&value) => {
                Err(ValidationError::new(self, "must be between 0 and 100"))
            }
            Self::Sigma if value <= 0.0 => {
                Err(ValidationError::new(self, "must be greater than 0"))
            }
            Self::KernelRadius if value < 1.0 || value.fract() != 0.0 => {
                Err(ValidationError::new(self, "must be a whole number of at least 1"))
            }
            Self::KernelRadius if value > f64::from(u32::MAX) => {
                Err(ValidationError::new(self, "is too large"))
            }
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for StepField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A parameter that violates its constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    /// The offending field.
    pub field: StepField,
    /// Why the value was rejected.
    pub reason: String,
}

impl ValidationError {
    /// Build an error for `field` with a human-readable reason.
    #[must_use]
    pub fn new(field: StepField, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Parameters of a step, one variant per [`StepKind`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum StepParams {
    /// Clip samples to the `[low, high]` percentile range.
    HotPixelRemoval {
        /// Lower cutoff percentile, `0 <= low < high`.
        low_percentile: f32,
        /// Upper cutoff percentile, `high <= 100`.
        high_percentile: f32,
    },
    /// Gaussian smoothing.
    GaussianBlur {
        /// Standard deviation in pixels, `> 0`.
        sigma: f32,
    },
    /// Median filter over a `(2r+1)^2` window.
    MedianBlur {
        /// Window radius `r`, `>= 1`.
        kernel_radius: u32,
    },
    /// `round(a * v + b)` clamped to the sample range.
    LinearTransform {
        /// Gain.
        a: f32,
        /// Offset.
        b: f32,
    },
}

impl StepParams {
    /// Default lower percentile for hot pixel removal.
    pub const DEFAULT_LOW_PERCENTILE: f32 = 1.0;
    /// Default upper percentile for hot pixel removal.
    pub const DEFAULT_HIGH_PERCENTILE: f32 = 99.0;
    /// Default Gaussian sigma.
    pub const DEFAULT_SIGMA: f32 = 2.0;
    /// Default median radius.
    pub const DEFAULT_KERNEL_RADIUS: u32 = 2;
    /// Default linear gain.
    pub const DEFAULT_A: f32 = 1.0;
    /// Default linear offset.
    pub const DEFAULT_B: f32 = 0.0;

    /// Valid default parameters for `kind`.
    #[must_use]
    pub const fn default_for(kind: StepKind) -> Self {
        match kind {
            StepKind::HotPixelRemoval => Self::HotPixelRemoval {
                low_percentile: Self::DEFAULT_LOW_PERCENTILE,
                high_percentile: Self::DEFAULT_HIGH_PERCENTILE,
            },
            StepKind::GaussianBlur => Self::GaussianBlur {
                sigma: Self::DEFAULT_SIGMA,
            },
            StepKind::MedianBlur => Self::MedianBlur {
                kernel_radius: Self::DEFAULT_KERNEL_RADIUS,
            },
            StepKind::LinearTransform => Self::LinearTransform {
                a: Self::DEFAULT_A,
                b: Self::DEFAULT_B,
            },
        }
    }

    /// Which kind these parameters belong to.
    #[must_use]
    pub const fn kind(&self) -> StepKind {
        match self {
            Self::HotPixelRemoval { .. } => StepKind::HotPixelRemoval,
            Self::GaussianBlur { .. } => StepKind::GaussianBlur,
            Self::MedianBlur { .. } => StepKind::MedianBlur,
            Self::LinearTransform { .. } => StepKind::LinearTransform,
        }
    }

    /// Current value of `field`, or `None` if the field belongs to a
    /// different kind.
    #[must_use]
    pub fn get(&self, field: StepField) -> Option<f64> {
        match (*self, field) {
            (Self::HotPixelRemoval { low_percentile, .. }, StepField::LowPercentile) => {
                Some(f64::from(low_percentile))
            }
            (
                Self::HotPixelRemoval {
                    high_percentile, ..
                },
                StepField::HighPercentile,
            ) => Some(f64::from(high_percentile)),
            (Self::GaussianBlur { sigma }, StepField::Sigma) => Some(f64::from(sigma)),
            (Self::MedianBlur { kernel_radius }, StepField::KernelRadius) => {
                Some(f64::from(kernel_radius))
            }
            (Self::LinearTransform { a, .. }, StepField::A) => Some(f64::from(a)),
            (Self::LinearTransform { b, .. }, StepField::B) => Some(f64::from(b)),
            _ => None,
        }
    }

    /// Re-check the full constraint table, including cross-field rules.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for &field in self.kind().fields() {
            if let Some(value) = self.get(field) {
                field.check(value)?;
            }
        }
        if let Self::HotPixelRemoval {
            low_percentile,
            high_percentile,
        } = *self
            && low_percentile >= high_percentile
        {
            return Err(ValidationError::new(
                StepField::LowPercentile,
                "must be less than the high percentile",
            ));
        }
        Ok(())
    }

    /// Return a copy with `field` replaced by `value`, leaving every
    /// sibling field untouched.
    ///
    /// The value is narrowed to the variant's storage type (`f32` or
    /// `u32`) after the field-level check passes.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if `field` does not belong to this
    /// kind, if the value is outside the field's domain, or if the
    /// merged parameters break a cross-field rule.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn with_field(&self, field: StepField, value: f64) -> Result<Self, ValidationError> {
        field.check(value)?;
        let narrowed = value as f32;
        if !narrowed.is_finite() {
            return Err(ValidationError::new(field, "is out of range"));
        }
        let updated = match (*self, field) {
            (Self::HotPixelRemoval { high_percentile, .. }, StepField::LowPercentile) => {
                Self::HotPixelRemoval {
                    low_percentile: narrowed,
                    high_percentile,
                }
            }
            (Self::HotPixelRemoval { low_percentile, .. }, StepField::HighPercentile) => {
                Self::HotPixelRemoval {
                    low_percentile,
                    high_percentile: narrowed,
                }
            }
            (Self::GaussianBlur { .. }, StepField::Sigma) => Self::GaussianBlur { sigma: narrowed },
            (Self::MedianBlur { .. }, StepField::KernelRadius) => Self::MedianBlur {
                kernel_radius: value as u32,
            },
            (Self::LinearTransform { b, .. }, StepField::A) => {
                Self::LinearTransform { a: narrowed, b }
            }
            (Self::LinearTransform { a, .. }, StepField::B) => {
                Self::LinearTransform { a, b: narrowed }
            }
            _ => {
                return Err(ValidationError::new(
                    field,
                    format!("does not apply to {}", self.kind()),
                ));
            }
        };
        updated.validate()?;
        Ok(updated)
    }
}

/// One configured algorithm instance within a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmStep {
    /// Whether the step takes part in the next run.
    pub enabled: bool,
    /// Kind and parameters.
    #[serde(flatten)]
    pub params: StepParams,
}

impl AlgorithmStep {
    /// A new, enabled step of `kind` with valid default parameters.
    #[must_use]
    pub const fn create_default(kind: StepKind) -> Self {
        Self {
            enabled: true,
            params: StepParams::default_for(kind),
        }
    }

    /// The step's kind.
    #[must_use]
    pub const fn kind(&self) -> StepKind {
        self.params.kind()
    }

    /// Human-readable name of the step.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.kind().label()
    }

    /// Re-check the constraint table, returning the step on success.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<&Self, ValidationError> {
        self.params.validate()?;
        Ok(self)
    }

    /// Merge a single field edit into the step.
    ///
    /// The `enabled` flag and all other fields are preserved. On error
    /// the step is left unchanged.
    ///
    /// # Errors
    ///
    /// See [`StepParams::with_field`].
    pub fn set_field(&mut self, field: StepField, value: f64) -> Result<(), ValidationError> {
        self.params = self.params.with_field(field, value)?;
        Ok(())
    }
}

/// The user's ordered list of steps.
///
/// Order is significant: steps are applied in list order and the
/// algorithms do not commute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepList {
    steps: Vec<AlgorithmStep>,
}

impl StepList {
    /// An empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// All steps in order, enabled or not.
    #[must_use]
    pub fn steps(&self) -> &[AlgorithmStep] {
        &self.steps
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` if the list has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Borrow the step at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&AlgorithmStep> {
        self.steps.get(index)
    }

    /// Append a default step of `kind`, returning its index.
    pub fn push_default(&mut self, kind: StepKind) -> usize {
        self.steps.push(AlgorithmStep::create_default(kind));
        self.steps.len() - 1
    }

    /// Append a step after validating it.
    ///
    /// # Errors
    ///
    /// Returns the validation failure for an enabled step whose
    /// parameters violate the constraint table.
    pub fn push(&mut self, step: AlgorithmStep) -> Result<usize, ValidationError> {
        if step.enabled {
            step.validate()?;
        }
        self.steps.push(step);
        Ok(self.steps.len() - 1)
    }

    /// Remove and return the step at `index`.
    pub fn remove(&mut self, index: usize) -> Option<AlgorithmStep> {
        (index < self.steps.len()).then(|| self.steps.remove(index))
    }

    /// Swap the step at `index` with its predecessor. No-op at the top.
    pub fn move_up(&mut self, index: usize) {
        if index > 0 && index < self.steps.len() {
            self.steps.swap(index - 1, index);
        }
    }

    /// Swap the step at `index` with its successor. No-op at the bottom.
    pub fn move_down(&mut self, index: usize) {
        if index + 1 < self.steps.len() {
            self.steps.swap(index, index + 1);
        }
    }

    /// Enable or disable the step at `index`.
    ///
    /// Out-of-range indices are ignored.
    ///
    /// # Errors
    ///
    /// Enabling a step whose parameters fail validation is rejected and
    /// leaves it disabled.
    pub fn set_enabled(&mut self, index: usize, enabled: bool) -> Result<(), ValidationError> {
        let Some(step) = self.steps.get_mut(index) else {
            return Ok(());
        };
        if enabled {
            step.validate()?;
        }
        step.enabled = enabled;
        Ok(())
    }

    /// Merge a field edit into the step at `index`.
    ///
    /// Out-of-range indices are ignored.
    ///
    /// # Errors
    ///
    /// See [`AlgorithmStep::set_field`].
    pub fn set_field(
        &mut self,
        index: usize,
        field: StepField,
        value: f64,
    ) -> Result<(), ValidationError> {
        match self.steps.get_mut(index) {
            Some(step) => step.set_field(field, value),
            None => Ok(()),
        }
    }

    /// The enabled steps, in list order.
    pub fn enabled_steps(&self) -> impl Iterator<Item = &AlgorithmStep> {
        self.steps.iter().filter(|step| step.enabled)
    }
}

impl From<Vec<AlgorithmStep>> for StepList {
    fn from(steps: Vec<AlgorithmStep>) -> Self {
        Self { steps }
    }
}
