use image::RgbImage;

use crate::foundation::error::{EvalError, EvalResult};

/// Structural similarity with a square uniform window (Wang et al., 2004).
///
/// Defaults match the common reference implementation for 8-bit input: 7x7 window,
/// `K1 = 0.01`, `K2 = 0.03`, sample covariance, and a border of `win_size / 2` excluded from the
/// mean.
#[derive(Clone, Copy, Debug)]
pub struct SsimParams {
    pub win_size: usize,
    pub k1: f64,
    pub k2: f64,
    pub data_range: f64,
}

impl Default for SsimParams {
    fn default() -> Self {
        Self {
            win_size: 7,
            k1: 0.01,
            k2: 0.03,
            data_range: 255.0,
        }
    }
}

/// Mean SSIM of two RGB images, averaged over channels.
pub fn ssim(reference: &RgbImage, candidate: &RgbImage, params: &SsimParams) -> EvalResult<f64> {
    if reference.dimensions() != candidate.dimensions() {
        return Err(EvalError::metric("ssim inputs must have identical dimensions"));
    }
    let (w, h) = reference.dimensions();
    ssim_interleaved(
        reference.as_raw(),
        candidate.as_raw(),
        w as usize,
        h as usize,
        3,
        params,
    )
}

/// Mean SSIM over interleaved 8-bit samples with `channels` channels, averaged over channels.
pub fn ssim_interleaved(
    a: &[u8],
    b: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    params: &SsimParams,
) -> EvalResult<f64> {
    let win = params.win_size;
    if win < 2 || win.is_multiple_of(2) {
        return Err(EvalError::validation("ssim window size must be odd and >= 3"));
    }
    if width < win || height < win {
        return Err(EvalError::metric(format!(
            "ssim window {win} exceeds image extent {width}x{height}"
        )));
    }
    if channels == 0 || a.len() != width * height * channels || b.len() != a.len() {
        return Err(EvalError::metric("ssim sample buffers do not match the shape"));
    }

    let mut total = 0.0;
    for c in 0..channels {
        total += channel_mssim(a, b, width, height, channels, c, params);
    }
    Ok(total / channels as f64)
}

/// Summed-area tables of x, y, x^2, y^2 and x*y for one channel.
///
/// Every entry is an integer below 2^53 for 8-bit input, so window sums are exact.
struct Moments {
    stride: usize,
    x: Vec<f64>,
    y: Vec<f64>,
    xx: Vec<f64>,
    yy: Vec<f64>,
    xy: Vec<f64>,
}

impl Moments {
    fn build(a: &[u8], b: &[u8], width: usize, height: usize, channels: usize, c: usize) -> Self {
        let stride = width + 1;
        let len = stride * (height + 1);
        let mut m = Self {
            stride,
            x: vec![0.0; len],
            y: vec![0.0; len],
            xx: vec![0.0; len],
            yy: vec![0.0; len],
            xy: vec![0.0; len],
        };

        for row in 0..height {
            let (mut sx, mut sy, mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
            for col in 0..width {
                let i = (row * width + col) * channels + c;
                let xv = f64::from(a[i]);
                let yv = f64::from(b[i]);
                sx += xv;
                sy += yv;
                sxx += xv * xv;
                syy += yv * yv;
                sxy += xv * yv;

                let above = row * stride + col + 1;
                let here = (row + 1) * stride + col + 1;
                m.x[here] = m.x[above] + sx;
                m.y[here] = m.y[above] + sy;
                m.xx[here] = m.xx[above] + sxx;
                m.yy[here] = m.yy[above] + syy;
                m.xy[here] = m.xy[above] + sxy;
            }
        }
        m
    }

    fn window(table: &[f64], stride: usize, top: usize, left: usize, size: usize) -> f64 {
        let (bottom, right) = (top + size, left + size);
        table[bottom * stride + right] - table[top * stride + right] - table[bottom * stride + left]
            + table[top * stride + left]
    }
}

fn channel_mssim(
    a: &[u8],
    b: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    c: usize,
    params: &SsimParams,
) -> f64 {
    let win = params.win_size;
    let m = Moments::build(a, b, width, height, channels, c);

    let np = (win * win) as f64;
    let cov_norm = np / (np - 1.0);
    let c1 = (params.k1 * params.data_range).powi(2);
    let c2 = (params.k2 * params.data_range).powi(2);

    let mut sum = 0.0;
    let mut n = 0usize;
    // Windows centred on the cropped interior never leave the image.
    for top in 0..=(height - win) {
        for left in 0..=(width - win) {
            let s = m.stride;
            let ux = Moments::window(&m.x, s, top, left, win) / np;
            let uy = Moments::window(&m.y, s, top, left, win) / np;
            let uxx = Moments::window(&m.xx, s, top, left, win) / np;
            let uyy = Moments::window(&m.yy, s, top, left, win) / np;
            let uxy = Moments::window(&m.xy, s, top, left, win) / np;

            let vx = cov_norm * (uxx - ux * ux);
            let vy = cov_norm * (uyy - uy * uy);
            let vxy = cov_norm * (uxy - ux * uy);

            let num = (2.0 * ux * uy + c1) * (2.0 * vxy + c2);
            let den = (ux * ux + uy * uy + c1) * (vx + vy + c2);
            sum += num / den;
            n += 1;
        }
    }
    sum / n as f64
}

#[cfg(test)]
#[path = "../../tests/unit/metrics/ssim.rs"]
mod tests;
