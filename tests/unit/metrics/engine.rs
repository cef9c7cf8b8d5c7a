use std::path::Path;

use image::{Rgb, RgbImage, Rgba, RgbaImage};

use super::*;
use crate::metrics::perceptual::DisabledPerceptual;

/// Mean absolute difference in [0, 1]; zero for identical inputs.
#[derive(Default)]
struct MeanAbsDiff {
    seen: Vec<(RgbImage, RgbImage)>,
}

impl PerceptualMetric for MeanAbsDiff {
    fn name(&self) -> &str {
        "mean-abs-diff"
    }

    fn distance(&mut self, a: &RgbImage, b: &RgbImage) -> EvalResult<Option<f64>> {
        self.seen.push((a.clone(), b.clone()));
        let n = a.as_raw().len() as f64;
        let sum: f64 = a
            .as_raw()
            .iter()
            .zip(b.as_raw())
            .map(|(&x, &y)| (f64::from(x) - f64::from(y)).abs() / 255.0)
            .sum();
        Ok(Some(sum / n))
    }
}

const BG: Rgba<u8> = Rgba([30, 30, 30, 255]);

fn scene(patch: Rgba<u8>) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(100, 100, BG);
    for y in 20..30 {
        for x in 40..50 {
            img.put_pixel(x, y, patch);
        }
    }
    img
}

fn write(dir: &Path, name: &str, img: &RgbaImage) {
    std::fs::create_dir_all(dir).unwrap();
    img.save(dir.join(name)).unwrap();
}

#[test]
fn identical_directories_are_perfect() {
    let tmp = tempfile::tempdir().unwrap();
    let (r, c) = (tmp.path().join("ref"), tmp.path().join("cand"));
    let img = scene(Rgba([200, 100, 50, 255]));
    write(&r, "a.png", &img);
    write(&c, "a.png", &img);

    let mut lp = MeanAbsDiff::default();
    let s = compare_directories(&r, &c, &mut lp).unwrap();
    assert_eq!(s.pairs.len(), 1);
    assert_eq!(s.psnr.mean, f64::INFINITY);
    assert!((s.ssim.mean - 1.0).abs() < 1e-12);
    assert_eq!(s.lpips.mean, 0.0);
}

#[test]
fn psnr_counts_only_the_foreground_patch() {
    let tmp = tempfile::tempdir().unwrap();
    let (r, c) = (tmp.path().join("ref"), tmp.path().join("cand"));
    write(&r, "a.png", &scene(Rgba([200, 100, 50, 255])));
    write(&c, "a.png", &scene(Rgba([190, 100, 50, 255])));

    let s = compare_directories(&r, &c, &mut DisabledPerceptual).unwrap();
    // 100 patch pixels * 3 channels, one channel off by 10.
    let expected = 10.0 * (255.0f64 * 255.0 / (100.0 * 100.0 / 300.0)).log10();
    assert!((s.psnr.mean - expected).abs() < 1e-9, "{}", s.psnr.mean);
    assert!(s.ssim.mean < 1.0);
    assert!(s.lpips.is_empty());
}

#[test]
fn only_present_candidates_are_scored() {
    let tmp = tempfile::tempdir().unwrap();
    let (r, c) = (tmp.path().join("ref"), tmp.path().join("cand"));
    let img = scene(Rgba([200, 100, 50, 255]));
    for name in ["a.png", "b.png", "c.png"] {
        write(&r, name, &img);
    }
    write(&c, "b.png", &img);
    write(&c, "c.png", &img);

    let s = compare_directories(&r, &c, &mut DisabledPerceptual).unwrap();
    assert_eq!(s.pairs.len(), 2);
    assert_eq!(s.skipped, 1);
    assert_eq!(s.psnr.count, 2);
    assert_eq!(s.pairs[0].filename, "b.png");
}

#[test]
fn auxiliary_rgb_files_are_ignored() {
    let tmp = tempfile::tempdir().unwrap();
    let (r, c) = (tmp.path().join("ref"), tmp.path().join("cand"));
    let img = scene(Rgba([200, 100, 50, 255]));
    write(&r, "a.png", &img);
    write(&r, "rrgb_a.png", &img);
    write(&c, "a.png", &img);

    let s = compare_directories(&r, &c, &mut DisabledPerceptual).unwrap();
    assert_eq!(s.pairs.len(), 1);
    assert_eq!(s.skipped, 0);
}

#[test]
fn shape_mismatch_is_skipped() {
    let tmp = tempfile::tempdir().unwrap();
    let (r, c) = (tmp.path().join("ref"), tmp.path().join("cand"));
    write(&r, "a.png", &scene(Rgba([200, 100, 50, 255])));
    write(&c, "a.png", &RgbaImage::from_pixel(50, 50, BG));

    let mut lp = DisabledPerceptual;
    let out = score_pair(&r.join("a.png"), &c.join("a.png"), &mut lp);
    assert!(matches!(
        out,
        PairOutcome::Skipped(SkipReason::ShapeMismatch { .. })
    ));

    let s = compare_directories(&r, &c, &mut lp).unwrap();
    assert!(s.is_empty());
    assert!(s.psnr.mean.is_nan());
}

#[test]
fn rgba_reference_scores_against_rgb_candidate() {
    let tmp = tempfile::tempdir().unwrap();
    let (r, c) = (tmp.path().join("ref"), tmp.path().join("cand"));
    write(&r, "a.png", &scene(Rgba([200, 100, 50, 255])));
    let rgb = image::DynamicImage::ImageRgba8(scene(Rgba([190, 100, 50, 255]))).to_rgb8();
    std::fs::create_dir_all(&c).unwrap();
    rgb.save(c.join("a.png")).unwrap();

    let s = compare_directories(&r, &c, &mut DisabledPerceptual).unwrap();
    assert_eq!(s.pairs.len(), 1);
    assert_eq!(s.skipped, 0);
    let expected = 10.0 * (255.0f64 * 255.0 / (100.0 * 100.0 / 300.0)).log10();
    assert!((s.psnr.mean - expected).abs() < 1e-9, "{}", s.psnr.mean);
}

#[test]
fn calibration_requires_matching_channel_counts() {
    let tmp = tempfile::tempdir().unwrap();
    let gt = scene(Rgba([200, 100, 50, 255]));
    write(tmp.path(), "gt.png", &gt);
    image::DynamicImage::ImageRgba8(gt)
        .to_rgb8()
        .save(tmp.path().join("cal.png"))
        .unwrap();

    assert!(matches!(
        calibration_psnr(&tmp.path().join("gt.png"), &tmp.path().join("cal.png")),
        Err(SkipReason::ShapeMismatch { .. })
    ));
}

#[test]
fn all_background_reference_is_no_data() {
    let tmp = tempfile::tempdir().unwrap();
    let (r, c) = (tmp.path().join("ref"), tmp.path().join("cand"));
    write(&r, "a.png", &RgbaImage::from_pixel(16, 16, BG));
    write(&c, "a.png", &RgbaImage::from_pixel(16, 16, Rgba([1, 2, 3, 255])));

    let mut lp = DisabledPerceptual;
    let out = score_pair(&r.join("a.png"), &c.join("a.png"), &mut lp);
    assert_eq!(out, PairOutcome::Skipped(SkipReason::EmptyForeground));

    let s = compare_directories(&r, &c, &mut lp).unwrap();
    assert!(s.psnr.mean.is_nan());
    assert!(s.ssim.mean.is_nan());
}

#[test]
fn mask_comes_from_the_reference_only() {
    let tmp = tempfile::tempdir().unwrap();
    let (a, b) = (tmp.path().join("a"), tmp.path().join("b"));
    let patch = Rgba([200, 100, 50, 255]);
    let sparse = scene(patch);
    let mut busy = scene(patch);
    for y in 60..70 {
        for x in 60..70 {
            busy.put_pixel(x, y, Rgba([90, 90, 200, 255]));
        }
    }
    write(&a, "x.png", &sparse);
    write(&b, "x.png", &busy);

    let forward = compare_directories(&a, &b, &mut DisabledPerceptual).unwrap();
    let backward = compare_directories(&b, &a, &mut DisabledPerceptual).unwrap();
    assert_eq!(forward.psnr.mean, f64::INFINITY);
    assert!(backward.psnr.mean.is_finite());
}

#[test]
fn lpips_inputs_are_zeroed_outside_nonzero_reference() {
    let tmp = tempfile::tempdir().unwrap();
    let (r, c) = (tmp.path().join("ref"), tmp.path().join("cand"));
    let mut reference = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255]));
    reference.put_pixel(7, 7, Rgba([5, 5, 5, 255]));
    reference.put_pixel(2, 2, Rgba([50, 60, 70, 255]));
    let candidate = RgbaImage::from_pixel(8, 8, Rgba([99, 99, 99, 255]));
    write(&r, "a.png", &reference);
    write(&c, "a.png", &candidate);

    let mut lp = MeanAbsDiff::default();
    let out = score_pair(&r.join("a.png"), &c.join("a.png"), &mut lp);
    assert!(matches!(out, PairOutcome::Scored(_)));

    let (_, cand_seen) = &lp.seen[0];
    assert_eq!(cand_seen.get_pixel(0, 0), &Rgb([0, 0, 0]));
    assert_eq!(cand_seen.get_pixel(2, 2), &Rgb([99, 99, 99]));
    assert_eq!(cand_seen.get_pixel(7, 7), &Rgb([99, 99, 99]));
}

#[test]
fn missing_directory_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let r = tmp.path().join("ref");
    std::fs::create_dir_all(&r).unwrap();
    let err = compare_directories(&r, &tmp.path().join("nope"), &mut DisabledPerceptual)
        .unwrap_err();
    assert!(err.is_missing_directory());
}

#[test]
fn calibration_psnr_uses_nonzero_mask_and_gt_spread() {
    let tmp = tempfile::tempdir().unwrap();
    let mut gt = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
    gt.put_pixel(0, 0, Rgba([100, 100, 100, 255]));
    gt.put_pixel(1, 0, Rgba([200, 200, 200, 255]));
    let mut cal = gt.clone();
    cal.put_pixel(0, 0, Rgba([110, 100, 100, 255]));
    // Background differences do not count.
    cal.put_pixel(3, 3, Rgba([255, 255, 255, 255]));
    write(tmp.path(), "gt.png", &gt);
    write(tmp.path(), "cal.png", &cal);

    let v = calibration_psnr(&tmp.path().join("gt.png"), &tmp.path().join("cal.png")).unwrap();
    let expected = 10.0 * (100.0f64 * 100.0 / (100.0 / 6.0)).log10();
    assert!((v - expected).abs() < 1e-9);
}

#[test]
fn calibration_psnr_skips_flat_ground_truth() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), "gt.png", &RgbaImage::from_pixel(4, 4, Rgba([7, 7, 7, 255])));
    write(tmp.path(), "black.png", &RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255])));

    let p = |n: &str| tmp.path().join(n);
    assert_eq!(
        calibration_psnr(&p("gt.png"), &p("gt.png")),
        Err(SkipReason::DegenerateRange)
    );
    assert_eq!(
        calibration_psnr(&p("black.png"), &p("gt.png")),
        Err(SkipReason::EmptyForeground)
    );
}

#[test]
fn grid_point_scores_matching_files_only() {
    let tmp = tempfile::tempdir().unwrap();
    let (gt, cal) = (tmp.path().join("gt"), tmp.path().join("cal"));
    let img = scene(Rgba([200, 100, 50, 255]));
    write(&gt, "a.png", &img);
    write(&gt, "b.png", &img);
    write(&cal, "a.png", &scene(Rgba([190, 100, 50, 255])));

    let s = compare_grid_point(&gt, &cal).unwrap();
    assert_eq!(s.count, 1);
    assert!(s.mean.is_finite());
    assert_eq!(s.std, 0.0);
}
