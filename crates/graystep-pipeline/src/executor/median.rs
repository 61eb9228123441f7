//! Median blur over a square `(2r+1) x (2r+1)` window.
//!
//! Borders are padded by repeating the nearest edge sample. 8-bit
//! images use [`imageproc::filter::median_filter`]; it only handles
//! `u8` subpixels, so 16-bit images go through a weighted order
//! statistic with the same padding rule.

use image::GrayImage;

use super::ExecutionError;
use crate::types::{SampleSliceMut, SampleViewMut};

pub(super) fn median_blur(
    image: &mut SampleViewMut<'_>,
    radius: u32,
) -> Result<(), ExecutionError> {
    if radius == 0 {
        return Err(ExecutionError::InvalidParameter(
            "kernel radius must be at least 1".to_owned(),
        ));
    }
    if image.is_empty() {
        return Err(ExecutionError::EmptyImage);
    }

    let (width, height) = (image.width(), image.height());
    match image.samples_mut() {
        // imageproc walks the full padded window, so past the image size
        // the bounded weighted window is cheaper.
        SampleSliceMut::U8(data) if radius >= width.max(height) => {
            let filtered = window_median(data, width as usize, height as usize, radius as usize);
            data.copy_from_slice(&filtered);
        }
        SampleSliceMut::U8(data) => {
            let source = GrayImage::from_raw(width, height, data.to_vec())
                .ok_or(ExecutionError::BufferShape { width, height })?;
            let filtered = imageproc::filter::median_filter(&source, radius, radius);
            data.copy_from_slice(filtered.as_raw());
        }
        SampleSliceMut::U16(data) => {
            let filtered = window_median(data, width as usize, height as usize, radius as usize);
            data.copy_from_slice(&filtered);
        }
    }
    Ok(())
}

/// Source indices a clamp-to-edge window touches along one axis, with
/// how many window positions land on each.
///
/// Only indices inside the image are listed, so the cost is bounded by
/// `len` however large `radius` is. Padding shows up as extra weight on
/// the first and last index.
fn axis_weights(center: usize, len: usize, radius: usize) -> Vec<(usize, u128)> {
    let last = len - 1;
    let lo = center.saturating_sub(radius);
    let hi = center.saturating_add(radius).min(last);
    (lo..=hi)
        .map(|i| {
            let mut weight = 1;
            if i == 0 {
                weight += radius.saturating_sub(center) as u128;
            }
            if i == last {
                weight += center.saturating_add(radius).saturating_sub(last) as u128;
            }
            (i, weight)
        })
        .collect()
}

/// Median of each clamp-to-edge window.
///
/// Window sizes are always odd, so the median is a single sample: the
/// first one, in value order, whose cumulative weight passes half the
/// window.
fn window_median<T: Ord + Copy>(data: &[T], width: usize, height: usize, radius: usize) -> Vec<T> {
    let side = 2 * radius as u128 + 1;
    let mid = side * side / 2;

    let mut window: Vec<(T, u128)> = Vec::new();
    let mut output = Vec::with_capacity(data.len());
    for y in 0..height {
        let rows = axis_weights(y, height, radius);
        for x in 0..width {
            let cols = axis_weights(x, width, radius);
            window.clear();
            for &(row, row_weight) in &rows {
                let line = &data[row * width..(row + 1) * width];
                window.extend(cols.iter().map(|&(col, w)| (line[col], row_weight * w)));
            }
            window.sort_unstable_by_key(|&(value, _)| value);

            let mut seen = 0;
            let median = window.iter().find_map(|&(value, weight)| {
                seen += weight;
                (seen > mid).then_some(value)
            });
            output.push(median.unwrap_or(data[y * width + x]));
        }
    }
    output
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Image;

    #[test]
    fn removes_isolated_spike_8bit() {
        let mut samples = vec![10u8; 25];
        samples[12] = 255;
        let mut img = Image::from_u8(5, 5, samples).unwrap();
        median_blur(&mut img.view_mut(), 1).unwrap();
        assert!(img.view().as_u8().unwrap().iter().all(|&v| v == 10));
    }

    #[test]
    fn removes_isolated_spike_16bit() {
        let mut samples = vec![1000u16; 25];
        samples[12] = 65000;
        let mut img = Image::from_u16(5, 5, samples).unwrap();
        median_blur(&mut img.view_mut(), 1).unwrap();
        assert!(img.view().as_u16().unwrap().iter().all(|&v| v == 1000));
    }

    #[test]
    fn corner_uses_replicated_edges() {
        // 3x1 row [1, 2, 9], radius 1: the left window is
        // [1,1,2] x 3 rows, the right one [2,9,9] x 3 rows.
        let out = window_median(&[1u16, 2, 9], 3, 1, 1);
        assert_eq!(out, [1, 2, 9]);
    }

    /// Brute-force reference: materialize every padded window sample.
    fn full_window_median(data: &[u16], width: usize, height: usize, radius: usize) -> Vec<u16> {
        let clamp = |c: usize, d: usize, len: usize| (c + d).saturating_sub(radius).min(len - 1);
        let side = 2 * radius + 1;
        let mut out = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let mut window = Vec::new();
                for dy in 0..side {
                    for dx in 0..side {
                        window.push(data[clamp(y, dy, height) * width + clamp(x, dx, width)]);
                    }
                }
                window.sort_unstable();
                out.push(window[window.len() / 2]);
            }
        }
        out
    }

    #[test]
    fn weighted_window_matches_full_window() {
        let data: Vec<u16> = (0..35u16).map(|i| (i * 7919) % 503).collect();
        for radius in 1..=6 {
            assert_eq!(
                window_median(&data, 7, 5, radius),
                full_window_median(&data, 7, 5, radius),
                "radius {radius}"
            );
        }
    }

    #[test]
    fn radius_larger_than_image() {
        let out = window_median(&[5u16, 1, 3, 4], 2, 2, 3);
        assert_eq!(out, full_window_median(&[5, 1, 3, 4], 2, 2, 3));
        assert_eq!(out, [4, 3, 3, 4]);
    }

    #[test]
    fn huge_radius_on_tiny_8bit_image_is_cheap() {
        let mut img = Image::from_u8(2, 2, vec![5, 1, 3, 4]).unwrap();
        median_blur(&mut img.view_mut(), u32::MAX).unwrap();
        assert_eq!(img.view().as_u8().unwrap(), [4, 3, 3, 4]);
    }

    #[test]
    fn huge_radius_on_tiny_16bit_image_is_cheap() {
        let mut img = Image::from_u16(2, 2, vec![5, 1, 3, 4]).unwrap();
        median_blur(&mut img.view_mut(), 20_000).unwrap();
        assert_eq!(img.view().as_u16().unwrap(), [4, 3, 3, 4]);

        let mut img = Image::from_u16(2, 2, vec![5, 1, 3, 4]).unwrap();
        median_blur(&mut img.view_mut(), u32::MAX).unwrap();
        assert_eq!(img.view().as_u16().unwrap(), [4, 3, 3, 4]);
    }

    #[test]
    fn zero_radius_is_rejected() {
        let mut img = Image::from_u16(1, 1, vec![3]).unwrap();
        assert!(matches!(
            median_blur(&mut img.view_mut(), 0),
            Err(ExecutionError::InvalidParameter(_))
        ));
    }
}
