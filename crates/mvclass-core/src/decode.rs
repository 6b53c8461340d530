/*!
Decoding of uploaded image payloads into RGB pixel grids.
*/

use crate::error::{Error, Result};
use image::RgbImage;

/// A decoded image in 8-bit RGB channel order.
#[derive(Debug, Clone)]
pub struct RawImage {
    pixels: RgbImage,
}

impl RawImage {
    /// Wrap an already decoded RGB buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] for zero-area buffers.
    pub fn from_rgb(pixels: RgbImage) -> Result<Self> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(Error::Decode(format!(
                "degenerate {}x{} image",
                pixels.width(),
                pixels.height()
            )));
        }

        Ok(Self { pixels })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Always three; kept for symmetry with tensor shapes.
    pub fn channels(&self) -> usize {
        3
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }
}

/// Decode `bytes` (JPEG, PNG, BMP or WebP) into a [`RawImage`].
///
/// Greyscale, alpha and 16-bit sources are converted to 8-bit RGB.
///
/// # Errors
///
/// Fails with [`Error::Decode`] on empty payloads, unknown formats,
/// corrupt streams and zero-area results.
pub fn decode(bytes: &[u8]) -> Result<RawImage> {
    if bytes.is_empty() {
        return Err(Error::Decode("empty payload".to_owned()));
    }

    let decoded = image::load_from_memory(bytes).map_err(|e| Error::Decode(e.to_string()))?;
    RawImage::from_rgb(decoded.into_rgb8())
}
