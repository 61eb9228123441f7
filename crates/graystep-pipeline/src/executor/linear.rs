//! Linear remap `v -> round(a * v + b)`, clamped to the sample range.

use super::ExecutionError;
use crate::types::{SampleSliceMut, SampleViewMut};

#[allow(clippy::cast_possible_truncation)]
pub(super) fn linear_transform(
    image: &mut SampleViewMut<'_>,
    a: f32,
    b: f32,
) -> Result<(), ExecutionError> {
    if !a.is_finite() || !b.is_finite() {
        return Err(ExecutionError::InvalidParameter(format!(
            "a and b must be finite, got a={a}, b={b}"
        )));
    }
    let (a, b) = (f64::from(a), f64::from(b));

    match image.samples_mut() {
        SampleSliceMut::U8(data) => {
            for v in data.iter_mut() {
                *v = remap(f64::from(*v), a, b, u8::MAX.into()) as u8;
            }
        }
        SampleSliceMut::U16(data) => {
            for v in data.iter_mut() {
                *v = remap(f64::from(*v), a, b, u16::MAX.into()) as u16;
            }
        }
    }
    Ok(())
}

/// Returns a value in `[0, max]`, safe to narrow.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn remap(v: f64, a: f64, b: f64, max: f64) -> u32 {
    a.mul_add(v, b).round().clamp(0.0, max) as u32
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Image;

    #[test]
    fn clamps_8bit_to_255() {
        let mut img = Image::from_u8(4, 4, vec![128; 16]).unwrap();
        linear_transform(&mut img.view_mut(), 2.0, 10.0).unwrap();
        assert!(img.view().as_u8().unwrap().iter().all(|&v| v == 255));
    }

    #[test]
    fn clamps_negative_to_zero() {
        let mut img = Image::from_u8(2, 1, vec![10, 200]).unwrap();
        linear_transform(&mut img.view_mut(), -1.0, 100.0).unwrap();
        assert_eq!(img.view().as_u8().unwrap(), &[90, 0]);
    }

    #[test]
    fn rounds_to_nearest() {
        let mut img = Image::from_u8(2, 1, vec![3, 5]).unwrap();
        linear_transform(&mut img.view_mut(), 0.5, 0.0).unwrap();
        // 1.5 and 2.5 round away from zero.
        assert_eq!(img.view().as_u8().unwrap(), &[2, 3]);
    }

    #[test]
    fn uses_16bit_range() {
        let mut img = Image::from_u16(2, 1, vec![1000, 40000]).unwrap();
        linear_transform(&mut img.view_mut(), 2.0, 1.0).unwrap();
        assert_eq!(img.view().as_u16().unwrap(), &[2001, 65535]);
    }

    #[test]
    fn non_finite_parameters_are_rejected() {
        let mut img = Image::from_u8(1, 1, vec![1]).unwrap();
        let err = linear_transform(&mut img.view_mut(), f32::NAN, 0.0).unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidParameter(_)));
        assert_eq!(img.view().as_u8().unwrap(), &[1]);
    }
}
