use std::io::Cursor;

use anyhow::{Context, Result};
use image::{ImageFormat, ImageReader};
use tracing::debug;

/// Image bytes ready for the OCR provider.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Passes PNG and JPEG through and re-encodes anything else as PNG.
///
/// Dimensions come from the source image, which is what the ALTO coordinates
/// were measured against.
pub fn prepare_image(bytes: Vec<u8>) -> Result<PreparedImage> {
    let reader = ImageReader::new(Cursor::new(bytes.as_slice()))
        .with_guessed_format()
        .context("failed to read image header")?;
    let format = reader
        .format()
        .context("unrecognised image format")?;

    if matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
        let (width, height) = reader
            .into_dimensions()
            .context("failed to read image dimensions")?;
        return Ok(PreparedImage {
            bytes,
            width,
            height,
        });
    }

    debug!(?format, "re-encoding image as PNG");
    let decoded = reader.decode().context("failed to decode image")?;
    let mut out = Cursor::new(Vec::new());
    decoded
        .write_to(&mut out, ImageFormat::Png)
        .context("failed to encode image as PNG")?;
    Ok(PreparedImage {
        bytes: out.into_inner(),
        width: decoded.width(),
        height: decoded.height(),
    })
}
