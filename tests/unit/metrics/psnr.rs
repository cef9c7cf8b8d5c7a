use image::Rgb;

use super::*;

#[test]
fn identical_samples_are_infinite() {
    assert_eq!(psnr(&[1, 2, 3], &[1, 2, 3], PEAK_8BIT), Some(f64::INFINITY));
}

#[test]
fn empty_or_mismatched_is_none() {
    assert_eq!(psnr(&[], &[], PEAK_8BIT), None);
    assert_eq!(psnr(&[1], &[1, 2], PEAK_8BIT), None);
}

#[test]
fn known_value() {
    // MSE = 100 -> 10 * log10(65025 / 100)
    let v = psnr(&[0, 0], &[10, 10], PEAK_8BIT).unwrap();
    assert!((v - 28.130803608679102).abs() < 1e-9);
}

#[test]
fn data_range_scales_result() {
    let full = psnr(&[0, 0], &[10, 10], 255.0).unwrap();
    let half = psnr(&[0, 0], &[10, 10], 127.5).unwrap();
    assert!((full - half - 20.0 * 2f64.log10()).abs() < 1e-9);
}

#[test]
fn masked_psnr_ignores_background_error() {
    let mut reference = RgbImage::from_pixel(4, 4, Rgb([50, 50, 50]));
    reference.put_pixel(0, 0, Rgb([200, 200, 200]));
    let mut candidate = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
    candidate.put_pixel(0, 0, Rgb([200, 200, 200]));

    let mask = Mask::from_corner_background(&reference);
    assert_eq!(
        masked_psnr(&reference, &candidate, &mask),
        Some(f64::INFINITY)
    );
}
