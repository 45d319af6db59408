//! Image input preparation for classification and captioning.
//!
//! Images are decoded, downscaled so the longest edge fits the configured
//! limit (never upscaled), and re-encoded as JPEG before the base64 trip to
//! the LLM API. Images already within the limit are sent as-is in their
//! original format.

use std::io::Cursor;
use std::path::Path;

use image::ImageFormat;

use crate::error::PipelineError;
use crate::llm::ImageInput;

/// Load the image at `path` and prepare it for an LLM request.
pub fn prepare_image(path: &Path, max_edge: u32) -> Result<ImageInput, PipelineError> {
    let bytes = std::fs::read(path).map_err(|e| PipelineError::ImageInput {
        message: format!("Cannot read image {path:?}: {e}"),
    })?;
    prepare_image_bytes(&bytes, max_edge)
}

/// Prepare raw image bytes for an LLM request.
pub fn prepare_image_bytes(bytes: &[u8], max_edge: u32) -> Result<ImageInput, PipelineError> {
    let format = image::guess_format(bytes).map_err(|e| PipelineError::ImageInput {
        message: format!("Unrecognized image format: {e}"),
    })?;

    let decoded =
        image::load_from_memory_with_format(bytes, format).map_err(|e| {
            PipelineError::ImageInput {
                message: format!("Cannot decode image: {e}"),
            }
        })?;

    let longest = decoded.width().max(decoded.height());
    if longest <= max_edge {
        return Ok(ImageInput::from_bytes(bytes, format_name(format)));
    }

    tracing::debug!(
        "Downscaling image from {}x{} to fit {max_edge}px",
        decoded.width(),
        decoded.height()
    );

    // thumbnail preserves aspect ratio and never upscales
    let resized = decoded.thumbnail(max_edge, max_edge);
    let mut encoded = Cursor::new(Vec::new());
    resized
        .to_rgb8()
        .write_to(&mut encoded, ImageFormat::Jpeg)
        .map_err(|e| PipelineError::ImageInput {
            message: format!("Cannot re-encode image: {e}"),
        })?;

    Ok(ImageInput::from_bytes(&encoded.into_inner(), "jpeg"))
}

fn format_name(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "png",
        ImageFormat::WebP => "webp",
        ImageFormat::Gif => "gif",
        _ => "jpeg",
    }
}
