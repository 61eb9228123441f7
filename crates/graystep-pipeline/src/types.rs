//! Shared types for the graystep conversion pipeline.
//!
//! The central type is [`Image`]: a single-channel raster that owns
//! exactly one sample buffer whose element width matches its
//! [`BitDepth`]. Steps mutate it in place through a [`SampleViewMut`];
//! display code reads it through a [`SampleView`].

use serde::{Deserialize, Serialize};

use crate::executor::ExecutionError;
use crate::step::{StepKind, ValidationError};

/// Number of bits per sample, fixed for the lifetime of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitDepth {
    /// One byte per sample.
    Eight,
    /// Two bytes per sample.
    Sixteen,
}

impl BitDepth {
    /// Number of bits per sample (8 or 16).
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::Eight => 8,
            Self::Sixteen => 16,
        }
    }

    /// Largest representable sample value.
    #[must_use]
    pub const fn max_value(self) -> u16 {
        match self {
            Self::Eight => u8::MAX as u16,
            Self::Sixteen => u16::MAX,
        }
    }
}

impl std::fmt::Display for BitDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

/// Image dimensions in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Horizontal sample count.
    pub width: u32,
    /// Vertical sample count.
    pub height: u32,
}

impl Dimensions {
    /// Total number of samples (`width * height`).
    #[must_use]
    pub const fn sample_count(self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Owned sample storage, one variant per bit depth.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Samples {
    U8(Vec<u8>),
    U16(Vec<u16>),
}

/// A decoded single-channel raster.
///
/// Samples are stored row-major with X varying fastest. The buffer
/// length always equals `width * height`: the constructors reject any
/// other length, and the mutable view only hands out fixed-length
/// slices, so steps can rewrite samples but never resize the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    dimensions: Dimensions,
    samples: Samples,
}

impl Image {
    /// Create an 8-bit image from a row-major sample buffer.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] if `samples.len()`
    /// is not `width * height`.
    pub fn from_u8(width: u32, height: u32, samples: Vec<u8>) -> Result<Self, PipelineError> {
        let dimensions = checked_dimensions(width, height, samples.len())?;
        Ok(Self {
            dimensions,
            samples: Samples::U8(samples),
        })
    }

    /// Create a 16-bit image from a row-major sample buffer.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] if `samples.len()`
    /// is not `width * height`.
    pub fn from_u16(width: u32, height: u32, samples: Vec<u16>) -> Result<Self, PipelineError> {
        let dimensions = checked_dimensions(width, height, samples.len())?;
        Ok(Self {
            dimensions,
            samples: Samples::U16(samples),
        })
    }

    /// Horizontal sample count.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.dimensions.width
    }

    /// Vertical sample count.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.dimensions.height
    }

    /// Width and height together.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Sample bit depth.
    #[must_use]
    pub const fn bit_depth(&self) -> BitDepth {
        match self.samples {
            Samples::U8(_) => BitDepth::Eight,
            Samples::U16(_) => BitDepth::Sixteen,
        }
    }

    /// Borrow the samples read-only.
    #[must_use]
    pub fn view(&self) -> SampleView<'_> {
        let samples = match &self.samples {
            Samples::U8(data) => SampleSlice::U8(data),
            Samples::U16(data) => SampleSlice::U16(data),
        };
        SampleView {
            dimensions: self.dimensions,
            samples,
        }
    }

    /// Borrow the samples for in-place mutation.
    #[must_use]
    pub fn view_mut(&mut self) -> SampleViewMut<'_> {
        let samples = match &mut self.samples {
            Samples::U8(data) => SampleSliceMut::U8(data),
            Samples::U16(data) => SampleSliceMut::U16(data),
        };
        SampleViewMut {
            dimensions: self.dimensions,
            samples,
        }
    }

    /// Overwrite every sample with the corresponding sample of `source`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidDimensions`] if `source` differs
    /// in dimensions or bit depth.
    pub fn copy_samples_from(&mut self, source: &Self) -> Result<(), PipelineError> {
        match (&mut self.samples, &source.samples) {
            (Samples::U8(dst), Samples::U8(src)) if self.dimensions == source.dimensions => {
                dst.copy_from_slice(src);
                Ok(())
            }
            (Samples::U16(dst), Samples::U16(src)) if self.dimensions == source.dimensions => {
                dst.copy_from_slice(src);
                Ok(())
            }
            _ => Err(PipelineError::InvalidDimensions {
                width: source.width(),
                height: source.height(),
                len: source.view().len(),
            }),
        }
    }
}

fn checked_dimensions(width: u32, height: u32, len: usize) -> Result<Dimensions, PipelineError> {
    let dimensions = Dimensions { width, height };
    if dimensions.sample_count() == len {
        Ok(dimensions)
    } else {
        Err(PipelineError::InvalidDimensions { width, height, len })
    }
}

/// Read-only sample slice at the image's native depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleSlice<'a> {
    /// 8-bit samples.
    U8(&'a [u8]),
    /// 16-bit samples.
    U16(&'a [u16]),
}

/// Mutable sample slice at the image's native depth.
#[derive(Debug, PartialEq, Eq)]
pub enum SampleSliceMut<'a> {
    /// 8-bit samples.
    U8(&'a mut [u8]),
    /// 16-bit samples.
    U16(&'a mut [u16]),
}

/// Zero-copy read access to an image's samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleView<'a> {
    dimensions: Dimensions,
    samples: SampleSlice<'a>,
}

impl<'a> SampleView<'a> {
    /// Horizontal sample count.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.dimensions.width
    }

    /// Vertical sample count.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.dimensions.height
    }

    /// Width and height together.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Sample bit depth.
    #[must_use]
    pub const fn bit_depth(&self) -> BitDepth {
        match self.samples {
            SampleSlice::U8(_) => BitDepth::Eight,
            SampleSlice::U16(_) => BitDepth::Sixteen,
        }
    }

    /// The underlying depth-typed slice.
    #[must_use]
    pub const fn samples(&self) -> SampleSlice<'a> {
        self.samples
    }

    /// The 8-bit samples, or `None` for a 16-bit image.
    #[must_use]
    pub const fn as_u8(&self) -> Option<&'a [u8]> {
        match self.samples {
            SampleSlice::U8(data) => Some(data),
            SampleSlice::U16(_) => None,
        }
    }

    /// The 16-bit samples, or `None` for an 8-bit image.
    #[must_use]
    pub const fn as_u16(&self) -> Option<&'a [u16]> {
        match self.samples {
            SampleSlice::U16(data) => Some(data),
            SampleSlice::U8(_) => None,
        }
    }

    /// Number of samples.
    #[must_use]
    pub const fn len(&self) -> usize {
        match self.samples {
            SampleSlice::U8(data) => data.len(),
            SampleSlice::U16(data) => data.len(),
        }
    }

    /// Returns `true` if the view holds no samples.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample at `(x, y)` widened to `u16`, with `y = 0` the top row.
    ///
    /// Returns `None` when the coordinate is outside the image.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<u16> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let index = y as usize * self.width() as usize + x as usize;
        match self.samples {
            SampleSlice::U8(data) => data.get(index).map(|&v| u16::from(v)),
            SampleSlice::U16(data) => data.get(index).copied(),
        }
    }

    /// Copy the samples into a new owned [`Image`].
    #[must_use]
    pub fn to_image(&self) -> Image {
        let samples = match self.samples {
            SampleSlice::U8(data) => Samples::U8(data.to_vec()),
            SampleSlice::U16(data) => Samples::U16(data.to_vec()),
        };
        Image {
            dimensions: self.dimensions,
            samples,
        }
    }
}

/// Zero-copy mutable access to an image's samples.
///
/// Slices are fixed-length, so a step can rewrite every sample but can
/// neither grow nor shrink the buffer.
#[derive(Debug)]
pub struct SampleViewMut<'a> {
    dimensions: Dimensions,
    samples: SampleSliceMut<'a>,
}

impl SampleViewMut<'_> {
    /// Horizontal sample count.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.dimensions.width
    }

    /// Vertical sample count.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.dimensions.height
    }

    /// Sample bit depth.
    #[must_use]
    pub const fn bit_depth(&self) -> BitDepth {
        match self.samples {
            SampleSliceMut::U8(_) => BitDepth::Eight,
            SampleSliceMut::U16(_) => BitDepth::Sixteen,
        }
    }

    /// Width and height together.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Number of samples.
    #[must_use]
    pub const fn len(&self) -> usize {
        match &self.samples {
            SampleSliceMut::U8(data) => data.len(),
            SampleSliceMut::U16(data) => data.len(),
        }
    }

    /// Returns `true` if the view holds no samples.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reborrow the depth-typed mutable slice.
    pub fn samples_mut(&mut self) -> SampleSliceMut<'_> {
        match &mut self.samples {
            SampleSliceMut::U8(data) => SampleSliceMut::U8(data),
            SampleSliceMut::U16(data) => SampleSliceMut::U16(data),
        }
    }

    /// Reborrow as a read-only view.
    #[must_use]
    pub fn as_view(&self) -> SampleView<'_> {
        let samples = match &self.samples {
            SampleSliceMut::U8(data) => SampleSlice::U8(data),
            SampleSliceMut::U16(data) => SampleSlice::U16(data),
        };
        SampleView {
            dimensions: self.dimensions,
            samples,
        }
    }
}

/// Errors that can occur while loading images or running the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The declared media type is not one of the accepted encodings.
    #[error("unsupported image type {0:?} (supported: png, jpg, tiff)")]
    UnsupportedMediaType(String),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The bytes could not be decoded as an image.
    #[error("failed to decode image: {0}")]
    DecodeFailure(#[from] image::ImageError),

    /// The decoded image uses a sample layout that has no single-channel
    /// 8- or 16-bit equivalent.
    #[error("unsupported color type: {0}")]
    UnsupportedColorType(String),

    /// The sample buffer length does not match `width * height`.
    #[error("sample buffer of length {len} does not match {width}x{height}")]
    InvalidDimensions {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
        /// Actual buffer length.
        len: usize,
    },

    /// No enabled step was supplied to a run.
    #[error("no algorithms selected")]
    NoStepsSelected,

    /// An enabled step violates its parameter constraints.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A step failed while mutating the image.
    #[error("step {} ({step_kind}) failed: {cause}", step_index + 1)]
    ExecutionFailure {
        /// Zero-based index of the failing step among the enabled steps.
        step_index: usize,
        /// Kind of the failing step.
        step_kind: StepKind,
        /// Why the executor failed.
        #[source]
        cause: ExecutionError,
    },

    /// A run is already in flight for this image.
    #[error("a conversion is already running")]
    AlreadyRunning,

    /// The run was cancelled at a yield point.
    #[error("conversion cancelled after {completed} step(s)")]
    Cancelled {
        /// Number of steps applied before cancellation took effect.
        completed: usize,
    },

    /// A run was requested before any image was loaded.
    #[error("no image loaded")]
    NoImageLoaded,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn from_u8_rejects_mismatched_length() {
        let result = Image::from_u8(3, 2, vec![0; 5]);
        assert!(matches!(
            result,
            Err(PipelineError::InvalidDimensions {
                width: 3,
                height: 2,
                len: 5
            })
        ));
    }

    #[test]
    fn from_u16_reports_depth_and_dimensions() {
        let img = Image::from_u16(2, 3, vec![7; 6]).unwrap();
        assert_eq!(img.bit_depth(), BitDepth::Sixteen);
        assert_eq!(
            img.dimensions(),
            Dimensions {
                width: 2,
                height: 3
            }
        );
        assert_eq!(img.view().len(), 6);
    }

    #[test]
    fn view_get_is_row_major_from_top() {
        let img = Image::from_u8(2, 2, vec![1, 2, 3, 4]).unwrap();
        let view = img.view();
        assert_eq!(view.get(0, 0), Some(1));
        assert_eq!(view.get(1, 0), Some(2));
        assert_eq!(view.get(0, 1), Some(3));
        assert_eq!(view.get(1, 1), Some(4));
        assert_eq!(view.get(2, 0), None);
    }

    #[test]
    fn typed_accessors_match_depth() {
        let eight = Image::from_u8(1, 1, vec![9]).unwrap();
        assert_eq!(eight.view().as_u8(), Some(&[9u8][..]));
        assert!(eight.view().as_u16().is_none());

        let sixteen = Image::from_u16(1, 1, vec![900]).unwrap();
        assert_eq!(sixteen.view().as_u16(), Some(&[900u16][..]));
        assert!(sixteen.view().as_u8().is_none());
    }

    #[test]
    fn view_mut_writes_in_place() {
        let mut img = Image::from_u8(2, 1, vec![1, 2]).unwrap();
        {
            let mut view = img.view_mut();
            if let SampleSliceMut::U8(data) = view.samples_mut() {
                assert_eq!(data.len(), 2);
                data[1] = 200;
            }
        }
        assert_eq!(img.view().as_u8(), Some(&[1u8, 200][..]));
    }

    #[test]
    fn copy_samples_from_requires_same_shape() {
        let mut dst = Image::from_u8(2, 1, vec![0, 0]).unwrap();
        let src = Image::from_u8(2, 1, vec![5, 6]).unwrap();
        dst.copy_samples_from(&src).unwrap();
        assert_eq!(dst, src);

        let other_depth = Image::from_u16(2, 1, vec![5, 6]).unwrap();
        assert!(dst.copy_samples_from(&other_depth).is_err());
    }

    #[test]
    fn bit_depth_limits() {
        assert_eq!(BitDepth::Eight.max_value(), 255);
        assert_eq!(BitDepth::Sixteen.max_value(), 65535);
        assert_eq!(BitDepth::Sixteen.to_string(), "16-bit");
    }

    #[test]
    fn error_display_messages() {
        assert_eq!(
            PipelineError::NoStepsSelected.to_string(),
            "no algorithms selected"
        );
        assert_eq!(
            PipelineError::AlreadyRunning.to_string(),
            "a conversion is already running"
        );
    }
}
