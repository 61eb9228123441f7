//! Mapping sample buffers to displayable scalar grids.
//!
//! [`to_grid`] turns a [`SampleView`] into a [`RenderableGrid`]: the
//! samples as `f32` in plotting-row order, a contrast range, and two
//! axes in pixels or millimeters. The plot's Y axis points up, so
//! logical row `y` (0 at the top of the image) lands in plotting row
//! `h - 1 - y` and the picture keeps its top-left origin on screen.
//!
//! Drawing is behind [`GridRenderer`]; [`present`] always clears the
//! previous output before drawing the next grid.

use serde::{Deserialize, Serialize};

use crate::types::{SampleSlice, SampleView};

/// Smallest millimeters-per-pixel factor an axis will use.
pub const MIN_AXIS_SCALE: f64 = 1e-3;

/// Tick count the axis labelling aims for.
pub const TARGET_TICKS: usize = 6;

/// Physical unit of the plot axes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisUnit {
    /// One unit per sample.
    #[default]
    Pixels,
    /// Samples scaled by [`AxisConfig::scale`].
    Millimeters,
}

impl AxisUnit {
    /// Abbreviation used in axis titles.
    #[must_use]
    pub const fn abbreviation(self) -> &'static str {
        match self {
            Self::Pixels => "px",
            Self::Millimeters => "mm",
        }
    }
}

/// Axis unit and millimeters-per-pixel factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    /// Unit shown on both axes.
    pub unit: AxisUnit,
    /// Millimeters per pixel, used when `unit` is millimeters.
    pub scale: f64,
}

impl AxisConfig {
    /// Default millimeters per pixel.
    pub const DEFAULT_SCALE: f64 = 16.0 / 10.0;

    /// Multiplier from samples to axis units.
    ///
    /// Always 1 for pixels. For millimeters, the configured scale
    /// clamped to at least [`MIN_AXIS_SCALE`].
    #[must_use]
    pub const fn effective_scale(&self) -> f64 {
        match self.unit {
            AxisUnit::Pixels => 1.0,
            AxisUnit::Millimeters => {
                if self.scale.is_finite() && self.scale > MIN_AXIS_SCALE {
                    self.scale
                } else {
                    MIN_AXIS_SCALE
                }
            }
        }
    }

    /// Parse a user-typed scale.
    ///
    /// Accepts a comma as decimal separator. Returns `None` unless the
    /// result is a finite number greater than zero.
    #[must_use]
    pub fn parse_scale(text: &str) -> Option<f64> {
        text.trim()
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v > 0.0)
    }
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            unit: AxisUnit::Pixels,
            scale: Self::DEFAULT_SCALE,
        }
    }
}

/// One plot axis running from 0 to `max`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    /// Upper end of the axis, in axis units.
    pub max: f64,
    /// Title such as `X [px]`.
    pub title: String,
}

impl Axis {
    fn new(name: char, samples: u32, config: &AxisConfig) -> Self {
        Self {
            max: f64::from(samples) * config.effective_scale(),
            title: format!("{name} [{}]", config.unit.abbreviation()),
        }
    }

    /// Tick positions from 0 to `max` inclusive, about `target` apart.
    #[must_use]
    pub fn ticks(&self, target: usize) -> Vec<f64> {
        ticks(self.max, nice_step(self.max, target))
    }
}

/// Pick a step from `{1, 2, 2.5, 5, 10} x 10^k` closest to
/// `range / target`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn nice_step(range: f64, target: usize) -> f64 {
    if !range.is_finite() || range <= 0.0 || target == 0 {
        return 1.0;
    }
    let rough = range / target as f64;
    let magnitude = 10f64.powf(rough.log10().floor());
    [1.0, 2.0, 2.5, 5.0, 10.0]
        .into_iter()
        .map(|m| m * magnitude)
        .min_by(|a, b| (rough - a).abs().total_cmp(&(rough - b).abs()))
        .unwrap_or(magnitude)
}

/// `0, step, 2*step, ...` up to `max`, with `max` appended if the
/// sequence does not land on it.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ticks(max: f64, step: f64) -> Vec<f64> {
    if !max.is_finite() || max <= 0.0 {
        return vec![0.0];
    }
    if !step.is_finite() || step <= 0.0 {
        return vec![0.0, max];
    }
    // Tolerate accumulated error so 0.1 * 10 still counts as landing on 1.
    let epsilon = step * 1e-9;
    let mut out: Vec<f64> = (0..)
        .map(|i| f64::from(i) * step)
        .take_while(|v| *v <= max + epsilon)
        .map(|v| v.min(max))
        .collect();
    if out.last().is_none_or(|last| (max - last).abs() > epsilon) {
        out.push(max);
    }
    out
}

/// Contrast range used to normalize displayed intensities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZRange {
    /// Value shown darkest.
    pub min: f32,
    /// Value shown brightest.
    pub max: f32,
}

impl ZRange {
    /// `max - min`.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.max - self.min
    }

    /// Map `value` into `[0, 1]`.
    #[must_use]
    pub fn normalize(&self, value: f32) -> f32 {
        let width = self.width();
        if width > 0.0 {
            ((value - self.min) / width).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl Default for ZRange {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

/// A displayable 2D scalar field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderableGrid {
    width: u32,
    height: u32,
    /// Row `r` holds the samples plotted at height `r`; row 0 is the
    /// bottom of the plot.
    values: Vec<f32>,
    /// Contrast range.
    pub z_range: ZRange,
    /// Horizontal axis.
    pub x_axis: Axis,
    /// Vertical axis.
    pub y_axis: Axis,
    /// `width / height` of the source image.
    pub aspect_ratio: f64,
}

impl RenderableGrid {
    /// The "nothing loaded yet" grid.
    #[must_use]
    pub fn empty(axis: &AxisConfig) -> Self {
        Self {
            width: 0,
            height: 0,
            values: Vec::new(),
            z_range: ZRange::default(),
            x_axis: Axis::new('X', 0, axis),
            y_axis: Axis::new('Y', 0, axis),
            aspect_ratio: 1.0,
        }
    }

    /// Whether there is nothing to draw.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of plotting rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// All values, plotting row 0 first.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Values of plotting row `row`, or `None` past the top.
    #[must_use]
    pub fn row(&self, row: u32) -> Option<&[f32]> {
        let width = self.width as usize;
        let start = row as usize * width;
        (row < self.height).then(|| &self.values[start..start + width])
    }

    /// Rows from the top of the plot down, as a raster is stored.
    pub fn rows_top_down(&self) -> impl Iterator<Item = &[f32]> {
        (0..self.height).rev().filter_map(|row| self.row(row))
    }
}

/// Build a grid from an optional sample view.
///
/// An absent or zero-sized view yields [`RenderableGrid::empty`] and
/// publishes nothing. Otherwise `publish_aspect` receives `w / h`
/// before the grid is built, so the caller can size the display.
#[must_use]
pub fn to_grid(
    view: Option<&SampleView<'_>>,
    axis: &AxisConfig,
    mut publish_aspect: impl FnMut(f64),
) -> RenderableGrid {
    let Some(view) = view.filter(|v| v.width() > 0 && v.height() > 0) else {
        return RenderableGrid::empty(axis);
    };
    let (width, height) = (view.width(), view.height());
    let aspect_ratio = f64::from(width) / f64::from(height);
    publish_aspect(aspect_ratio);

    let mut values = Vec::with_capacity(view.len());
    match view.samples() {
        SampleSlice::U8(data) => flip_rows(data, width as usize, &mut values),
        SampleSlice::U16(data) => flip_rows(data, width as usize, &mut values),
    }

    RenderableGrid {
        width,
        height,
        z_range: z_range(&values),
        values,
        x_axis: Axis::new('X', width, axis),
        y_axis: Axis::new('Y', height, axis),
        aspect_ratio,
    }
}

/// Append rows bottom-up, converting to `f32`.
fn flip_rows<T: Copy + Into<f32>>(data: &[T], width: usize, out: &mut Vec<f32>) {
    for row in data.chunks_exact(width).rev() {
        out.extend(row.iter().map(|&v| v.into()));
    }
}

/// Full-scan min/max with the degenerate cases widened.
fn z_range(values: &[f32]) -> ZRange {
    let (min, max) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() || !max.is_finite() {
        ZRange::default()
    } else if min >= max {
        ZRange {
            min: (min - 1.0).max(0.0),
            max: max + 1.0,
        }
    } else {
        ZRange { min, max }
    }
}

/// A drawing surface for grids.
pub trait GridRenderer {
    /// Why drawing failed.
    type Error;

    /// Remove whatever was drawn last.
    fn clear(&mut self);

    /// Draw a non-empty grid.
    ///
    /// # Errors
    ///
    /// Implementation-defined.
    fn render(&mut self, grid: &RenderableGrid) -> Result<(), Self::Error>;
}

/// Clear `renderer`, then draw `grid` unless it is empty.
///
/// # Errors
///
/// Whatever [`GridRenderer::render`] returns.
pub fn present<R: GridRenderer + ?Sized>(
    renderer: &mut R,
    grid: &RenderableGrid,
) -> Result<(), R::Error> {
    renderer.clear();
    if grid.is_empty() {
        return Ok(());
    }
    renderer.render(grid)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::types::Image;

    fn px() -> AxisConfig {
        AxisConfig::default()
    }

    #[test]
    fn absent_view_is_empty_and_publishes_nothing() {
        let mut published = None;
        let grid = to_grid(None, &px(), |a| published = Some(a));
        assert!(grid.is_empty());
        assert!(published.is_none());

        let img = Image::from_u8(0, 3, Vec::new()).unwrap();
        assert!(to_grid(Some(&img.view()), &px(), |_| {}).is_empty());
    }

    #[test]
    fn flat_image_range_is_widened() {
        let img = Image::from_u8(3, 3, vec![7; 9]).unwrap();
        let grid = to_grid(Some(&img.view()), &px(), |_| {});
        assert_eq!(grid.z_range, ZRange { min: 6.0, max: 8.0 });
        assert_eq!(grid.z_range.width(), 2.0);
    }

    #[test]
    fn flat_zero_image_clamps_at_zero() {
        let img = Image::from_u16(2, 1, vec![0, 0]).unwrap();
        let grid = to_grid(Some(&img.view()), &px(), |_| {});
        assert_eq!(grid.z_range, ZRange { min: 0.0, max: 1.0 });
    }

    #[test]
    fn rows_are_flipped() {
        let img = Image::from_u8(2, 2, vec![1, 2, 3, 4]).unwrap();
        let grid = to_grid(Some(&img.view()), &px(), |_| {});
        assert_eq!(grid.row(1).unwrap(), &[1.0, 2.0]);
        assert_eq!(grid.row(0).unwrap(), &[3.0, 4.0]);
        assert!(grid.row(2).is_none());

        let top_down: Vec<&[f32]> = grid.rows_top_down().collect();
        assert_eq!(top_down, [&[1.0, 2.0][..], &[3.0, 4.0][..]]);
        assert_eq!(grid.z_range, ZRange { min: 1.0, max: 4.0 });
    }

    #[test]
    fn shared_aspect_survives_an_empty_neighbor() {
        let img = Image::from_u8(30, 10, vec![0; 300]).unwrap();
        let mut shared = 1.0;
        let original = to_grid(Some(&img.view()), &px(), |a| shared = a);
        let converted = to_grid(None, &px(), |a| shared = a);

        assert!(converted.is_empty());
        assert_eq!(shared, 3.0);
        assert_eq!(shared, original.aspect_ratio);
    }

    #[test]
    fn aspect_ratio_ignores_unit() {
        let img = Image::from_u8(100, 50, vec![0; 5000]).unwrap();
        for config in [
            px(),
            AxisConfig {
                unit: AxisUnit::Millimeters,
                scale: 0.37,
            },
        ] {
            let mut published = 0.0;
            let grid = to_grid(Some(&img.view()), &config, |a| published = a);
            assert_eq!(grid.aspect_ratio, 2.0);
            assert_eq!(published, 2.0);
        }
    }

    #[test]
    fn axes_follow_unit() {
        let img = Image::from_u16(10, 5, vec![0; 50]).unwrap();
        let grid = to_grid(Some(&img.view()), &px(), |_| {});
        assert_eq!(grid.x_axis.max, 10.0);
        assert_eq!(grid.x_axis.title, "X [px]");

        let mm = AxisConfig {
            unit: AxisUnit::Millimeters,
            scale: 2.0,
        };
        let grid = to_grid(Some(&img.view()), &mm, |_| {});
        assert_eq!(grid.x_axis.max, 20.0);
        assert_eq!(grid.y_axis.max, 10.0);
        assert_eq!(grid.y_axis.title, "Y [mm]");
    }

    #[test]
    fn millimeter_scale_is_clamped_positive() {
        let zero = AxisConfig {
            unit: AxisUnit::Millimeters,
            scale: 0.0,
        };
        assert_eq!(zero.effective_scale(), MIN_AXIS_SCALE);

        let ignored = AxisConfig {
            unit: AxisUnit::Pixels,
            scale: 0.0,
        };
        assert_eq!(ignored.effective_scale(), 1.0);
    }

    #[test]
    fn parse_scale_accepts_comma() {
        assert_eq!(AxisConfig::parse_scale("1,6"), Some(1.6));
        assert_eq!(AxisConfig::parse_scale(" 0.5 "), Some(0.5));
        assert_eq!(AxisConfig::parse_scale("0"), None);
        assert_eq!(AxisConfig::parse_scale("-1"), None);
        assert_eq!(AxisConfig::parse_scale("abc"), None);
        assert_eq!(AxisConfig::parse_scale("inf"), None);
    }

    #[test]
    fn nice_steps() {
        assert_eq!(nice_step(100.0, 6), 20.0);
        assert_eq!(nice_step(600.0, 6), 100.0);
        assert_eq!(nice_step(15.0, 6), 2.5);
        assert_eq!(nice_step(0.0, 6), 1.0);
    }

    #[test]
    fn ticks_include_both_ends() {
        assert_eq!(ticks(10.0, 2.5), [0.0, 2.5, 5.0, 7.5, 10.0]);
        assert_eq!(ticks(11.0, 5.0), [0.0, 5.0, 10.0, 11.0]);
        assert_eq!(ticks(0.0, 1.0), [0.0]);
    }

    #[test]
    fn axis_ticks() {
        let axis = Axis::new('X', 100, &px());
        let t = axis.ticks(TARGET_TICKS);
        assert_eq!(t.first(), Some(&0.0));
        assert_eq!(t.last(), Some(&100.0));
        assert_eq!(t.len(), 6);
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
    }

    impl GridRenderer for Recorder {
        type Error = ();

        fn clear(&mut self) {
            self.calls.push("clear");
        }

        fn render(&mut self, _grid: &RenderableGrid) -> Result<(), ()> {
            self.calls.push("render");
            Ok(())
        }
    }

    #[test]
    fn present_clears_before_every_draw() {
        let mut recorder = Recorder::default();
        let img = Image::from_u8(1, 1, vec![3]).unwrap();
        let grid = to_grid(Some(&img.view()), &px(), |_| {});

        present(&mut recorder, &grid).unwrap();
        present(&mut recorder, &RenderableGrid::empty(&px())).unwrap();
        assert_eq!(recorder.calls, ["clear", "render", "clear"]);
    }
}
