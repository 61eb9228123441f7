//! The algorithm execution boundary.
//!
//! The pipeline only knows [`AlgorithmExecutor`]: one fallible, in-place
//! entry point per step kind. [`NativeExecutor`] is the in-process
//! implementation; tests and alternative back ends can supply their own.

mod blur;
mod hot_pixel;
mod linear;
mod median;

use crate::step::StepParams;
use crate::types::SampleViewMut;

/// Why an executor could not apply a step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    /// A parameter the executor cannot work with.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The image has no samples.
    #[error("image has no samples")]
    EmptyImage,

    /// The sample buffer could not be rebuilt at the image's shape.
    #[error("sample buffer does not match {width}x{height}")]
    BufferShape {
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },
}

/// Applies steps to an image, mutating it in place.
///
/// Implementations must leave the buffer length and bit depth alone;
/// [`SampleViewMut`] enforces the former. Calls are synchronous and
/// run to completion.
pub trait AlgorithmExecutor {
    /// Clip samples to the given percentile cutoffs.
    ///
    /// # Errors
    ///
    /// Implementation-defined.
    fn hot_pixel_removal(
        &self,
        image: &mut SampleViewMut<'_>,
        low_percentile: f32,
        high_percentile: f32,
    ) -> Result<(), ExecutionError>;

    /// Gaussian smoothing with standard deviation `sigma`.
    ///
    /// # Errors
    ///
    /// Implementation-defined.
    fn gaussian_blur(&self, image: &mut SampleViewMut<'_>, sigma: f32)
    -> Result<(), ExecutionError>;

    /// Median filter over a square window of radius `kernel_radius`.
    ///
    /// # Errors
    ///
    /// Implementation-defined.
    fn median_blur(
        &self,
        image: &mut SampleViewMut<'_>,
        kernel_radius: u32,
    ) -> Result<(), ExecutionError>;

    /// `v -> a * v + b` with the executor's clamping rule.
    ///
    /// # Errors
    ///
    /// Implementation-defined.
    fn linear_transform(
        &self,
        image: &mut SampleViewMut<'_>,
        a: f32,
        b: f32,
    ) -> Result<(), ExecutionError>;

    /// Dispatch to the entry point matching `params`.
    ///
    /// # Errors
    ///
    /// Whatever the selected entry point returns.
    fn apply(
        &self,
        image: &mut SampleViewMut<'_>,
        params: &StepParams,
    ) -> Result<(), ExecutionError> {
        match *params {
            StepParams::HotPixelRemoval {
                low_percentile,
                high_percentile,
            } => self.hot_pixel_removal(image, low_percentile, high_percentile),
            StepParams::GaussianBlur { sigma } => self.gaussian_blur(image, sigma),
            StepParams::MedianBlur { kernel_radius } => self.median_blur(image, kernel_radius),
            StepParams::LinearTransform { a, b } => self.linear_transform(image, a, b),
        }
    }
}

impl<E: AlgorithmExecutor + ?Sized> AlgorithmExecutor for &E {
    fn hot_pixel_removal(
        &self,
        image: &mut SampleViewMut<'_>,
        low_percentile: f32,
        high_percentile: f32,
    ) -> Result<(), ExecutionError> {
        (**self).hot_pixel_removal(image, low_percentile, high_percentile)
    }

    fn gaussian_blur(
        &self,
        image: &mut SampleViewMut<'_>,
        sigma: f32,
    ) -> Result<(), ExecutionError> {
        (**self).gaussian_blur(image, sigma)
    }

    fn median_blur(
        &self,
        image: &mut SampleViewMut<'_>,
        kernel_radius: u32,
    ) -> Result<(), ExecutionError> {
        (**self).median_blur(image, kernel_radius)
    }

    fn linear_transform(
        &self,
        image: &mut SampleViewMut<'_>,
        a: f32,
        b: f32,
    ) -> Result<(), ExecutionError> {
        (**self).linear_transform(image, a, b)
    }
}

/// In-process implementation of every step kind for 8- and 16-bit
/// images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NativeExecutor;

impl AlgorithmExecutor for NativeExecutor {
    fn hot_pixel_removal(
        &self,
        image: &mut SampleViewMut<'_>,
        low_percentile: f32,
        high_percentile: f32,
    ) -> Result<(), ExecutionError> {
        hot_pixel::remove_hot_pixels(image, low_percentile, high_percentile)
    }

    fn gaussian_blur(
        &self,
        image: &mut SampleViewMut<'_>,
        sigma: f32,
    ) -> Result<(), ExecutionError> {
        blur::gaussian_blur(image, sigma)
    }

    fn median_blur(
        &self,
        image: &mut SampleViewMut<'_>,
        kernel_radius: u32,
    ) -> Result<(), ExecutionError> {
        median::median_blur(image, kernel_radius)
    }

    fn linear_transform(
        &self,
        image: &mut SampleViewMut<'_>,
        a: f32,
        b: f32,
    ) -> Result<(), ExecutionError> {
        linear::linear_transform(image, a, b)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::step::{StepKind, StepParams};
    use crate::types::Image;

    #[test]
    fn apply_dispatches_by_kind() {
        let mut img = Image::from_u8(2, 1, vec![10, 20]).unwrap();
        NativeExecutor
            .apply(
                &mut img.view_mut(),
                &StepParams::LinearTransform { a: 1.0, b: 5.0 },
            )
            .unwrap();
        assert_eq!(img.view().as_u8().unwrap(), &[15, 25]);
    }

    #[test]
    fn every_default_step_runs_on_both_depths() {
        for kind in StepKind::ALL {
            let params = StepParams::default_for(kind);

            let mut eight = Image::from_u8(5, 4, (0..20).collect()).unwrap();
            NativeExecutor.apply(&mut eight.view_mut(), &params).unwrap();
            assert_eq!(eight.view().len(), 20);

            let mut sixteen = Image::from_u16(5, 4, (0..20).map(|v| v * 1000).collect()).unwrap();
            NativeExecutor.apply(&mut sixteen.view_mut(), &params).unwrap();
            assert_eq!(sixteen.view().len(), 20);
        }
    }

    #[test]
    fn executor_works_through_reference() {
        let executor = NativeExecutor;
        let by_ref: &dyn AlgorithmExecutor = &executor;
        let mut img = Image::from_u8(1, 1, vec![100]).unwrap();
        by_ref
            .apply(
                &mut img.view_mut(),
                &StepParams::LinearTransform { a: 2.0, b: 0.0 },
            )
            .unwrap();
        assert_eq!(img.view().as_u8().unwrap(), &[200]);
    }
}
