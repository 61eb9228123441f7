//! Hot pixel removal by percentile clipping.
//!
//! Both cutoffs are order statistics of the unmodified buffer: the
//! sample at index `floor(p / 100 * n)` (clamped to `n - 1`) of the
//! sorted samples. Samples below the low cutoff are raised to it and
//! samples above the high cutoff are lowered to it.

use super::ExecutionError;
use crate::types::{SampleSliceMut, SampleViewMut};

pub(super) fn remove_hot_pixels(
    image: &mut SampleViewMut<'_>,
    low_percentile: f32,
    high_percentile: f32,
) -> Result<(), ExecutionError> {
    let in_range = |p: f32| (0.0..=100.0).contains(&p);
    if !in_range(low_percentile) || !in_range(high_percentile) {
        return Err(ExecutionError::InvalidParameter(format!(
            "percentiles must be between 0 and 100, got {low_percentile} and {high_percentile}"
        )));
    }
    if low_percentile > high_percentile {
        return Err(ExecutionError::InvalidParameter(format!(
            "low percentile {low_percentile} exceeds high percentile {high_percentile}"
        )));
    }

    match image.samples_mut() {
        SampleSliceMut::U8(data) => clip(data, low_percentile, high_percentile),
        SampleSliceMut::U16(data) => clip(data, low_percentile, high_percentile),
    }
}

fn clip<T: Ord + Copy>(data: &mut [T], low: f32, high: f32) -> Result<(), ExecutionError> {
    if data.is_empty() {
        return Err(ExecutionError::EmptyImage);
    }

    let mut scratch = data.to_vec();
    let low_cutoff = percentile_cutoff(&mut scratch, low);
    let high_cutoff = percentile_cutoff(&mut scratch, high);

    for v in data.iter_mut() {
        *v = (*v).clamp(low_cutoff, high_cutoff);
    }
    Ok(())
}

/// Order statistic for percentile `p` of a non-empty slice.
///
/// Reorders `samples`; the multiset of values is unchanged, so the
/// slice can be reused for the next cutoff.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn percentile_cutoff<T: Ord + Copy>(samples: &mut [T], p: f32) -> T {
    let n = samples.len();
    let index = (f64::from(p) * n as f64 / 100.0).floor() as usize;
    let index = index.min(n - 1);
    *samples.select_nth_unstable(index).1
}
