//! Raster encoding of grids and Blob URL ownership.
//!
//! A [`RenderableGrid`] is normalized by its contrast range, mapped
//! through a [`Palette`], and encoded as an RGBA PNG. The PNG becomes a
//! Blob URL held by an [`ObjectUrl`], which revokes it exactly once:
//! when it is replaced or dropped.

use graystep_pipeline::{GridRenderer, RenderableGrid};
use image::ImageEncoder;
use wasm_bindgen::JsValue;
use web_sys::BlobPropertyBag;

/// Errors that can occur during grid-to-Blob-URL conversion.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    /// PNG encoding failed.
    #[error("PNG encoding failed: {0}")]
    PngEncode(String),

    /// A browser API call returned an error.
    #[error("browser API error: {0}")]
    JsError(String),
}

impl From<JsValue> for RasterError {
    fn from(value: JsValue) -> Self {
        Self::JsError(format!("{value:?}"))
    }
}

impl From<image::ImageError> for RasterError {
    fn from(err: image::ImageError) -> Self {
        Self::PngEncode(err.to_string())
    }
}

/// 256-entry color lookup table indexed by normalized intensity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<[u8; 4]>,
}

impl Palette {
    /// Black to white.
    #[must_use]
    pub fn grayscale() -> Self {
        Self {
            colors: (0..=u8::MAX).map(|v| [v, v, v, u8::MAX]).collect(),
        }
    }

    /// Color for a normalized value in `[0, 1]`.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn color(&self, t: f32) -> [u8; 4] {
        let last = self.colors.len().saturating_sub(1);
        let index = (t.clamp(0.0, 1.0) * last as f32).round() as usize;
        self.colors
            .get(index.min(last))
            .copied()
            .unwrap_or([0, 0, 0, u8::MAX])
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::grayscale()
    }
}

/// Map a grid to RGBA8 pixels, top row first.
#[must_use]
pub fn grid_to_rgba(grid: &RenderableGrid, palette: &Palette) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(grid.values().len() * 4);
    for row in grid.rows_top_down() {
        for &v in row {
            rgba.extend_from_slice(&palette.color(grid.z_range.normalize(v)));
        }
    }
    rgba
}

/// Encode a grid as RGBA PNG bytes.
///
/// # Errors
///
/// Returns [`RasterError::PngEncode`] if PNG encoding fails.
pub fn grid_to_png(grid: &RenderableGrid, palette: &Palette) -> Result<Vec<u8>, RasterError> {
    let rgba = grid_to_rgba(grid, palette);
    let mut png_bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
    encoder.write_image(
        &rgba,
        grid.width(),
        grid.height(),
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(png_bytes)
}

/// Wrap PNG bytes in a Blob and return its object URL.
///
/// The URL must be released with [`revoke_blob_url`]; prefer holding it
/// in an [`ObjectUrl`].
///
/// # Errors
///
/// Returns [`RasterError::JsError`] if Blob or URL creation fails.
pub fn png_to_blob_url(png_bytes: &[u8]) -> Result<String, RasterError> {
    let uint8_array = js_sys::Uint8Array::from(png_bytes);
    let parts = js_sys::Array::new();
    parts.push(&uint8_array);

    let opts = BlobPropertyBag::new();
    opts.set_type("image/png");
    let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &opts)?;

    Ok(web_sys::Url::create_object_url_with_blob(&blob)?)
}

/// Revoke a Blob URL.
///
/// Best-effort: failures are ignored since the URL may already be gone.
pub fn revoke_blob_url(url: &str) {
    let _ = web_sys::Url::revoke_object_url(url);
}

/// An object URL that is revoked when this handle is dropped.
///
/// Not `Clone`: exactly one owner releases the URL, exactly once.
#[derive(Debug)]
pub struct ObjectUrl {
    url: String,
    release: fn(&str),
}

impl ObjectUrl {
    /// Take ownership of a URL created by [`png_to_blob_url`].
    #[must_use]
    pub fn new(url: String) -> Self {
        Self::with_release(url, revoke_blob_url)
    }

    /// Take ownership of a URL with a custom release function.
    #[must_use]
    pub fn with_release(url: String, release: fn(&str)) -> Self {
        Self { url, release }
    }

    /// The URL, for an `<img src>`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        (self.release)(&self.url);
    }
}

/// Draws grids into a single Blob URL slot.
///
/// Clearing drops the current URL; rendering creates the next one.
#[derive(Debug, Default)]
pub struct BlobUrlRenderer {
    palette: Palette,
    current: Option<ObjectUrl>,
}

impl BlobUrlRenderer {
    /// A renderer using `palette`.
    #[must_use]
    pub const fn new(palette: Palette) -> Self {
        Self {
            palette,
            current: None,
        }
    }

    /// URL of the last rendered grid, if any.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.current.as_ref().map(ObjectUrl::as_str)
    }
}

impl GridRenderer for BlobUrlRenderer {
    type Error = RasterError;

    fn clear(&mut self) {
        self.current = None;
    }

    fn render(&mut self, grid: &RenderableGrid) -> Result<(), RasterError> {
        let png = grid_to_png(grid, &self.palette)?;
        let url = png_to_blob_url(&png)?;
        self.current = Some(ObjectUrl::new(url));
        Ok(())
    }
}
