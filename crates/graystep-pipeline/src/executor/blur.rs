//! Gaussian blur at the image's native depth.
//!
//! Wraps [`imageproc::filter::gaussian_blur_f32`], which is generic over
//! the pixel type, so 8- and 16-bit buffers take the same path. The
//! result is copied back into the caller's buffer.

use image::{ImageBuffer, Luma, Primitive};

use super::ExecutionError;
use crate::types::{SampleSliceMut, SampleViewMut};

pub(super) fn gaussian_blur(
    image: &mut SampleViewMut<'_>,
    sigma: f32,
) -> Result<(), ExecutionError> {
    // imageproc panics on non-positive sigma.
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(ExecutionError::InvalidParameter(format!(
            "sigma must be positive, got {sigma}"
        )));
    }
    if image.is_empty() {
        return Err(ExecutionError::EmptyImage);
    }

    let (width, height) = (image.width(), image.height());
    match image.samples_mut() {
        SampleSliceMut::U8(data) => blur_in_place(data, width, height, sigma),
        SampleSliceMut::U16(data) => blur_in_place(data, width, height, sigma),
    }
}

fn blur_in_place<T>(
    data: &mut [T],
    width: u32,
    height: u32,
    sigma: f32,
) -> Result<(), ExecutionError>
where
    T: Primitive + Into<f32> + imageproc::definitions::Clamp<f32>,
{
    let source: ImageBuffer<Luma<T>, Vec<T>> = ImageBuffer::from_raw(width, height, data.to_vec())
        .ok_or(ExecutionError::BufferShape { width, height })?;
    let blurred = imageproc::filter::gaussian_blur_f32(&source, sigma);
    data.copy_from_slice(blurred.as_raw());
    Ok(())
}
