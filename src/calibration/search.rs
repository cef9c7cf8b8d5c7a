use std::path::PathBuf;

use indicatif::ProgressBar;

use crate::calibration::grid::{GridPattern, GridPoint, scan_grid};
use crate::config::EvalConfig;
use crate::foundation::error::EvalResult;
use crate::foundation::stats::Summary;
use crate::metrics::compare_grid_point;
use crate::report::CsvSink;
use crate::report::tables::{calibration_header, psnr_cells};

/// PSNR summary of one grid point.
#[derive(Clone, Debug, PartialEq)]
pub struct GridResult {
    pub point: GridPoint,
    pub psnr: Summary,
}

impl GridResult {
    fn row(&self, scene: &str) -> Vec<String> {
        let mut row = vec![
            scene.to_string(),
            self.point.light_label.clone(),
            self.point.ambient_label.clone(),
        ];
        row.extend(psnr_cells(&self.psnr));
        row
    }
}

/// Highest mean PSNR wins; ties go to the lowest light, then the lowest ambient.
///
/// Results with a NaN mean never win. Input order does not matter.
pub fn select_best(results: &[GridResult]) -> Option<&GridResult> {
    let mut ordered: Vec<&GridResult> = results
        .iter()
        .filter(|r| !r.psnr.mean.is_nan())
        .collect();
    ordered.sort_by(|a, b| a.point.cmp_strength(&b.point));

    let mut best: Option<&GridResult> = None;
    for r in ordered {
        match best {
            Some(b) if r.psnr.mean <= b.psnr.mean => {}
            _ => best = Some(r),
        }
    }
    best
}

/// Score every grid point of one scene against its ground truth.
///
/// Grid points without a single valid pair are left out.
#[tracing::instrument(skip(cfg))]
pub fn calibrate_scene(cfg: &EvalConfig, scene: &str) -> EvalResult<Vec<GridResult>> {
    let scene_dir = cfg.scene_dir(scene);
    let ground_truth = scene_dir.join(&cfg.layout.ground_truth);
    let pattern = GridPattern::new(&cfg.calibration.prefix)?;

    let mut results = Vec::new();
    for (point, dir) in scan_grid(&scene_dir.join(&cfg.layout.calibration_root), &pattern)? {
        let psnr = compare_grid_point(&ground_truth, &dir)?;
        if psnr.is_empty() {
            tracing::debug!(dir = %dir.display(), "grid point has no valid pairs");
            continue;
        }
        tracing::debug!(
            light = point.light,
            ambient = point.ambient,
            psnr = psnr.mean,
            "grid point"
        );
        results.push(GridResult { point, psnr });
    }
    Ok(results)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CalibrationReport {
    pub calibrated: Vec<String>,
    /// Scenes with a directory but no valid grid point.
    pub uncalibrated: Vec<String>,
    pub missing_scenes: Vec<String>,
}

pub fn grid_table_path(cfg: &EvalConfig) -> PathBuf {
    cfg.output_dir.join(&cfg.calibration.grid_table)
}

pub fn best_table_path(cfg: &EvalConfig) -> PathBuf {
    cfg.output_dir.join(&cfg.calibration.best_table)
}

/// Sweep every scene and write the grid and best-configuration tables.
pub fn run_calibration(
    cfg: &EvalConfig,
    scenes: &[String],
    progress: &ProgressBar,
) -> EvalResult<CalibrationReport> {
    let header = calibration_header();
    let mut grid = CsvSink::create(&grid_table_path(cfg), &header)?;
    let mut best = CsvSink::create(&best_table_path(cfg), &header)?;
    let mut report = CalibrationReport::default();

    progress.set_length(scenes.len() as u64);
    for scene in scenes {
        progress.set_message(scene.clone());
        calibrate_into(cfg, scene, &mut grid, &mut best, &mut report)?;
        progress.inc(1);
    }

    grid.finish()?;
    best.finish()?;
    progress.finish_and_clear();
    Ok(report)
}

fn calibrate_into(
    cfg: &EvalConfig,
    scene: &str,
    grid: &mut CsvSink,
    best: &mut CsvSink,
    report: &mut CalibrationReport,
) -> EvalResult<()> {
    if !cfg.scene_dir(scene).is_dir() {
        tracing::warn!(scene, "scene directory does not exist; skipping");
        report.missing_scenes.push(scene.to_string());
        return Ok(());
    }

    let results = match calibrate_scene(cfg, scene) {
        Ok(r) => r,
        Err(e) if e.is_missing_directory() => {
            tracing::warn!(scene, error = %e, "cannot calibrate scene");
            report.uncalibrated.push(scene.to_string());
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    for r in &results {
        grid.write_row(&r.row(scene))?;
    }
    match select_best(&results) {
        Some(b) => {
            tracing::info!(
                scene,
                light = %b.point.light_label,
                ambient = %b.point.ambient_label,
                psnr = b.psnr.mean,
                "best calibration"
            );
            best.write_row(&b.row(scene))?;
            report.calibrated.push(scene.to_string());
        }
        None => {
            tracing::warn!(scene, "no valid calibration results");
            report.uncalibrated.push(scene.to_string());
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/calibration/search.rs"]
mod tests;
