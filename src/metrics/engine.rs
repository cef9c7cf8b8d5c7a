use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{EvalError, EvalResult};
use crate::foundation::stats::Summary;
use crate::metrics::perceptual::PerceptualMetric;
use crate::metrics::psnr::{masked_psnr, psnr};
use crate::metrics::ssim::{SsimParams, ssim};
use crate::raster::{Mask, Raster, load_raster};

/// Reference files whose name contains this are auxiliary outputs, not renders.
///
/// Inferred from the dataset layout rather than a documented contract.
pub const AUX_FILENAME_MARKER: &str = "rgb";

/// Scores for one reference/candidate pair.
#[derive(Clone, Debug, PartialEq)]
pub struct PairScores {
    pub filename: String,
    pub psnr: f64,
    pub ssim: f64,
    pub lpips: Option<f64>,
}

/// Why a pair produced no sample.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    Unreadable(String),
    ShapeMismatch {
        reference: (u32, u32, u8),
        candidate: (u32, u32, u8),
    },
    EmptyForeground,
    DegenerateRange,
    Metric(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum PairOutcome {
    Scored(PairScores),
    Skipped(SkipReason),
}

/// Aggregate of one directory comparison.
#[derive(Clone, Debug, Default)]
pub struct DirectorySummary {
    pub psnr: Summary,
    pub ssim: Summary,
    pub lpips: Summary,
    pub pairs: Vec<PairScores>,
    pub skipped: usize,
}

impl DirectorySummary {
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

fn ensure_dir(path: &Path) -> EvalResult<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(EvalError::missing_directory(path))
    }
}

/// Sorted names of regular files in `dir`, optionally dropping auxiliary outputs.
pub fn list_images(dir: &Path, skip_aux: bool) -> EvalResult<Vec<String>> {
    ensure_dir(dir)?;
    let entries = std::fs::read_dir(dir).with_context(|| format!("read dir '{}'", dir.display()))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("read dir '{}'", dir.display()))?;
        if !entry.path().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            tracing::warn!(path = %entry.path().display(), "skipping non-utf8 filename");
            continue;
        };
        if skip_aux && name.contains(AUX_FILENAME_MARKER) {
            continue;
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}

/// Load both images. With `match_channels` an RGB/RGBA mix is a mismatch; without it only
/// the spatial size has to agree.
fn load_pair(
    reference: &Path,
    candidate: &Path,
    match_channels: bool,
) -> Result<(Raster, Raster), SkipReason> {
    let r = load_raster(reference).map_err(|e| SkipReason::Unreadable(e.to_string()))?;
    let c = load_raster(candidate).map_err(|e| SkipReason::Unreadable(e.to_string()))?;
    let same = if match_channels {
        r.shape() == c.shape()
    } else {
        (r.width, r.height) == (c.width, c.height)
    };
    if !same {
        return Err(SkipReason::ShapeMismatch {
            reference: r.shape(),
            candidate: c.shape(),
        });
    }
    Ok((r, c))
}

/// Score one pair with PSNR, SSIM and LPIPS.
///
/// PSNR selects the foreground pixels; SSIM zeroes the background and scores the full frame.
/// Both use the corner-color mask of the reference. LPIPS uses the non-zero-RGB mask of the
/// reference instead.
pub fn score_pair(
    reference: &Path,
    candidate: &Path,
    lpips: &mut dyn PerceptualMetric,
) -> PairOutcome {
    let (r, c) = match load_pair(reference, candidate, false) {
        Ok(v) => v,
        Err(reason) => return PairOutcome::Skipped(reason),
    };
    let (r, c) = (r.to_rgb(), c.to_rgb());

    let mask = Mask::from_corner_background(&r);
    let Some(psnr) = masked_psnr(&r, &c, &mask) else {
        return PairOutcome::Skipped(SkipReason::EmptyForeground);
    };

    let ssim = match ssim(&mask.apply(&r), &mask.apply(&c), &SsimParams::default()) {
        Ok(v) => v,
        Err(e) => return PairOutcome::Skipped(SkipReason::Metric(e.to_string())),
    };

    let lp_mask = Mask::from_nonzero(&r);
    let lpips = match lpips.distance(&lp_mask.apply(&r), &lp_mask.apply(&c)) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(file = %reference.display(), error = %e, "lpips failed for pair");
            None
        }
    };

    PairOutcome::Scored(PairScores {
        filename: file_label(reference),
        psnr,
        ssim,
        lpips,
    })
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Compare every reference render with the same-named candidate and aggregate the scores.
///
/// Missing directories are an error; everything per-file is skipped and logged.
#[tracing::instrument(skip_all, fields(reference = %reference_dir.display(), candidate = %candidate_dir.display()))]
pub fn compare_directories(
    reference_dir: &Path,
    candidate_dir: &Path,
    lpips: &mut dyn PerceptualMetric,
) -> EvalResult<DirectorySummary> {
    ensure_dir(reference_dir)?;
    ensure_dir(candidate_dir)?;

    let mut out = DirectorySummary::default();
    for name in list_images(reference_dir, true)? {
        let outcome = score_pair(&reference_dir.join(&name), &candidate_dir.join(&name), lpips);
        match outcome {
            PairOutcome::Scored(s) => out.pairs.push(s),
            PairOutcome::Skipped(reason) => {
                tracing::warn!(file = %name, ?reason, "skipping pair");
                out.skipped += 1;
            }
        }
    }

    let psnr: Vec<f64> = out.pairs.iter().map(|p| p.psnr).collect();
    let ssim: Vec<f64> = out.pairs.iter().map(|p| p.ssim).collect();
    let lpips: Vec<f64> = out.pairs.iter().filter_map(|p| p.lpips).collect();
    out.psnr = Summary::from_samples(&psnr);
    out.ssim = Summary::from_samples(&ssim);
    out.lpips = Summary::from_samples(&lpips);

    if out.is_empty() {
        tracing::warn!(skipped = out.skipped, "no valid image pairs; summary is NaN");
    } else {
        tracing::debug!(
            pairs = out.pairs.len(),
            skipped = out.skipped,
            psnr = out.psnr.mean,
            ssim = out.ssim.mean,
            lpips = out.lpips.mean,
            "directory compared"
        );
    }
    Ok(out)
}

/// PSNR of one calibration pair against opaque ground truth.
///
/// The mask keeps non-black ground-truth pixels and the peak is the spread of the masked
/// ground-truth samples.
pub fn calibration_psnr(ground_truth: &Path, candidate: &Path) -> Result<f64, SkipReason> {
    let (g, c) = load_pair(ground_truth, candidate, true)?;
    let (g, c) = (g.to_rgb(), c.to_rgb());

    let mask = Mask::from_nonzero(&g);
    if mask.is_empty() {
        return Err(SkipReason::EmptyForeground);
    }
    let gs = mask.select(&g);
    let cs = mask.select(&c);

    let (lo, hi) = gs
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = f64::from(hi) - f64::from(lo);
    if range == 0.0 {
        return Err(SkipReason::DegenerateRange);
    }

    psnr(&gs, &cs, range).ok_or(SkipReason::EmptyForeground)
}

/// PSNR-only comparison of one calibration output directory against ground truth.
#[tracing::instrument(skip_all, fields(gt = %gt_dir.display(), candidate = %cal_dir.display()))]
pub fn compare_grid_point(gt_dir: &Path, cal_dir: &Path) -> EvalResult<Summary> {
    ensure_dir(gt_dir)?;
    ensure_dir(cal_dir)?;

    let mut samples = Vec::new();
    for name in list_images(gt_dir, false)? {
        let cand = cal_dir.join(&name);
        if !cand.is_file() {
            continue;
        }
        match calibration_psnr(&gt_dir.join(&name), &cand) {
            Ok(v) => samples.push(v),
            Err(SkipReason::Unreadable(e)) => {
                tracing::warn!(file = %name, error = %e, "skipping unreadable calibration pair")
            }
            Err(reason) => tracing::debug!(file = %name, ?reason, "skipping calibration pair"),
        }
    }
    Ok(Summary::from_samples(&samples))
}

#[cfg(test)]
#[path = "../../tests/unit/metrics/engine.rs"]
mod tests;
