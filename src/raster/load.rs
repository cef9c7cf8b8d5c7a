use std::path::Path;

use image::{DynamicImage, RgbImage};

use crate::foundation::error::{EvalError, EvalResult};

/// Decoded 8-bit raster that keeps whatever alpha channel the file carried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// 3 (RGB) or 4 (RGBA).
    pub channels: u8,
    /// Interleaved samples, row-major, tightly packed.
    pub data: Vec<u8>,
}

impl Raster {
    /// Convert a decoded image to 8-bit RGB, or RGBA when the source has alpha.
    pub fn from_dynamic(img: DynamicImage) -> Self {
        let (width, height) = (img.width(), img.height());
        if img.color().has_alpha() {
            Self {
                width,
                height,
                channels: 4,
                data: img.to_rgba8().into_raw(),
            }
        } else {
            Self {
                width,
                height,
                channels: 3,
                data: img.to_rgb8().into_raw(),
            }
        }
    }

    /// `(height, width, channels)`, the order array-based tools report.
    pub fn shape(&self) -> (u32, u32, u8) {
        (self.height, self.width, self.channels)
    }

    /// Whether the raster carries a fourth channel.
    pub fn has_alpha(&self) -> bool {
        self.channels == 4
    }

    /// Keep the first three channels as-is. Alpha is discarded, never composited.
    pub fn to_rgb(&self) -> RgbImage {
        let data = if self.has_alpha() {
            self.data
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect()
        } else {
            self.data.clone()
        };
        // The buffer length is width * height * 3 by construction.
        RgbImage::from_raw(self.width, self.height, data)
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }
}

/// Decode the image at `path`.
///
/// A missing file or a decode failure is an [`EvalError::Image`].
pub fn load_raster(path: &Path) -> EvalResult<Raster> {
    if !path.is_file() {
        return Err(EvalError::image(format!(
            "'{}' does not exist or is not a file",
            path.display()
        )));
    }
    let img = image::open(path)
        .map_err(|e| EvalError::image(format!("decode '{}': {e}", path.display())))?;
    Ok(Raster::from_dynamic(img))
}

#[cfg(test)]
#[path = "../../tests/unit/raster/load.rs"]
mod tests;
