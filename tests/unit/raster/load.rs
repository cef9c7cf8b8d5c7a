use image::{Rgb, Rgba, RgbaImage};

use super::*;

#[test]
fn rgba_png_keeps_alpha_and_rgb_view_drops_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.png");
    let mut img = RgbaImage::from_pixel(2, 1, Rgba([10, 20, 30, 0]));
    img.put_pixel(1, 0, Rgba([200, 100, 50, 128]));
    img.save(&path).unwrap();

    let r = load_raster(&path).unwrap();
    assert_eq!(r.shape(), (1, 2, 4));
    assert!(r.has_alpha());

    let rgb = r.to_rgb();
    // Alpha is dropped, not used to darken the color.
    assert_eq!(rgb.get_pixel(0, 0), &Rgb([10, 20, 30]));
    assert_eq!(rgb.get_pixel(1, 0), &Rgb([200, 100, 50]));
}

#[test]
fn rgb_png_has_three_channels() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("b.png");
    image::RgbImage::from_pixel(3, 2, Rgb([1, 2, 3]))
        .save(&path)
        .unwrap();

    let r = load_raster(&path).unwrap();
    assert_eq!(r.shape(), (2, 3, 3));
    assert_eq!(r.to_rgb().get_pixel(2, 1), &Rgb([1, 2, 3]));
}

#[test]
fn missing_and_corrupt_files_are_image_errors() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.png");
    assert!(matches!(load_raster(&missing), Err(EvalError::Image(_))));

    let junk = dir.path().join("junk.png");
    std::fs::write(&junk, b"not a png").unwrap();
    assert!(matches!(load_raster(&junk), Err(EvalError::Image(_))));
}
