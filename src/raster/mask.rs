use image::RgbImage;

/// Per-pixel foreground flags, always derived from the reference image of a pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    pub width: u32,
    pub height: u32,
    bits: Vec<bool>,
}

impl Mask {
    /// Foreground = RGB differs from the reference's bottom-right pixel.
    pub fn from_corner_background(reference: &RgbImage) -> Self {
        let (width, height) = reference.dimensions();
        if width == 0 || height == 0 {
            return Self {
                width,
                height,
                bits: Vec::new(),
            };
        }
        let bg = reference.get_pixel(width - 1, height - 1).0;
        Self {
            width,
            height,
            bits: reference.pixels().map(|p| p.0 != bg).collect(),
        }
    }

    /// Foreground = any RGB channel non-zero.
    pub fn from_nonzero(reference: &RgbImage) -> Self {
        let (width, height) = reference.dimensions();
        Self {
            width,
            height,
            bits: reference.pixels().map(|p| p.0 != [0, 0, 0]).collect(),
        }
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.bits.iter().any(|&b| b)
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        self.bits[(y * self.width + x) as usize]
    }

    /// Samples of foreground pixels, channels interleaved, row-major.
    pub fn select(&self, img: &RgbImage) -> Vec<u8> {
        img.pixels()
            .zip(&self.bits)
            .filter(|(_, keep)| **keep)
            .flat_map(|(p, _)| p.0)
            .collect()
    }

    /// Same-shape copy with background pixels set to zero.
    pub fn apply(&self, img: &RgbImage) -> RgbImage {
        let mut out = img.clone();
        for (p, keep) in out.pixels_mut().zip(&self.bits) {
            if !keep {
                p.0 = [0, 0, 0];
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/mask.rs"]
mod tests;
