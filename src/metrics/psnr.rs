use image::RgbImage;

use crate::raster::Mask;

/// Peak value for 8-bit samples.
pub const PEAK_8BIT: f64 = 255.0;

/// `10 * log10(range^2 / MSE)` over two equally long sample runs.
///
/// Returns `None` for empty input and `+inf` when the samples are identical.
pub fn psnr(reference: &[u8], candidate: &[u8], data_range: f64) -> Option<f64> {
    if reference.is_empty() || reference.len() != candidate.len() {
        return None;
    }

    let sse: f64 = reference
        .iter()
        .zip(candidate)
        .map(|(&a, &b)| {
            let d = f64::from(a) - f64::from(b);
            d * d
        })
        .sum();
    let mse = sse / reference.len() as f64;

    if mse == 0.0 {
        return Some(f64::INFINITY);
    }
    Some(10.0 * (data_range * data_range / mse).log10())
}

/// PSNR restricted to the foreground pixels of `mask`, 8-bit peak.
pub fn masked_psnr(reference: &RgbImage, candidate: &RgbImage, mask: &Mask) -> Option<f64> {
    psnr(&mask.select(reference), &mask.select(candidate), PEAK_8BIT)
}

#[cfg(test)]
#[path = "../../tests/unit/metrics/psnr.rs"]
mod tests;
