//! Image decoding into a single-channel [`Image`].
//!
//! Accepts PNG, JPEG and TIFF bytes. The declared media type is checked
//! before any decoding is attempted, and also selects the decoder.
//!
//! Single-channel sources keep their native depth. Alpha is dropped.
//! Color sources are reduced to luminance at their native depth using
//! the `image` crate's weighting (`0.2126*R + 0.7152*G + 0.0722*B`).

use image::{DynamicImage, ImageFormat};

use crate::types::{Image, PipelineError};

/// Media types accepted by [`decode`].
pub const SUPPORTED_MEDIA_TYPES: [&str; 4] = ["image/tiff", "image/png", "image/jpg", "image/jpeg"];

/// Map a declared media type to the decoder that handles it.
///
/// Matching ignores ASCII case and any `;`-separated parameters.
///
/// # Errors
///
/// Returns [`PipelineError::UnsupportedMediaType`] for anything outside
/// [`SUPPORTED_MEDIA_TYPES`].
pub fn check_media_type(media_type: &str) -> Result<ImageFormat, PipelineError> {
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/png" => Ok(ImageFormat::Png),
        "image/jpg" | "image/jpeg" => Ok(ImageFormat::Jpeg),
        "image/tiff" => Ok(ImageFormat::Tiff),
        _ => Err(PipelineError::UnsupportedMediaType(media_type.to_owned())),
    }
}

/// Decode bytes whose media type was declared by the caller.
///
/// # Errors
///
/// Returns [`PipelineError::UnsupportedMediaType`] before touching the
/// bytes if the media type is not accepted, then any error from
/// [`decode_bytes_as`].
pub fn decode(bytes: &[u8], media_type: &str) -> Result<Image, PipelineError> {
    let format = check_media_type(media_type)?;
    decode_bytes_as(bytes, Some(format))
}

/// Decode bytes, guessing the format from their content.
///
/// Used where no media type is available, such as files read from disk.
///
/// # Errors
///
/// See [`decode_bytes_as`].
pub fn decode_bytes(bytes: &[u8]) -> Result<Image, PipelineError> {
    decode_bytes_as(bytes, None)
}

/// Decode bytes with an explicit or guessed format.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty,
/// [`PipelineError::DecodeFailure`] if the data is corrupt or not the
/// declared format, and [`PipelineError::UnsupportedColorType`] for
/// floating-point sources.
pub fn decode_bytes_as(bytes: &[u8], format: Option<ImageFormat>) -> Result<Image, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let dynamic = match format {
        Some(format) => image::load_from_memory_with_format(bytes, format)?,
        None => image::load_from_memory(bytes)?,
    };
    to_single_channel(dynamic)
}

/// Reduce a decoded image to one channel at its native depth.
///
/// # Errors
///
/// Returns [`PipelineError::UnsupportedColorType`] for color types with
/// no 8- or 16-bit integer equivalent.
pub fn to_single_channel(dynamic: DynamicImage) -> Result<Image, PipelineError> {
    let color = dynamic.color();
    let (width, height) = (dynamic.width(), dynamic.height());
    let image = match dynamic {
        DynamicImage::ImageLuma8(gray) => Image::from_u8(width, height, gray.into_raw())?,
        DynamicImage::ImageLuma16(gray) => Image::from_u16(width, height, gray.into_raw())?,
        DynamicImage::ImageLumaA8(_) | DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => {
            tracing::debug!(?color, "reducing to 8-bit single channel");
            Image::from_u8(width, height, dynamic.to_luma8().into_raw())?
        }
        DynamicImage::ImageLumaA16(_)
        | DynamicImage::ImageRgb16(_)
        | DynamicImage::ImageRgba16(_) => {
            tracing::debug!(?color, "reducing to 16-bit single channel");
            Image::from_u16(width, height, dynamic.to_luma16().into_raw())?
        }
        _ => return Err(PipelineError::UnsupportedColorType(format!("{color:?}"))),
    };
    Ok(image)
}
