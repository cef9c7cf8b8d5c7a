use std::path::{Path, PathBuf};

use regex::Regex;

use crate::foundation::error::{EvalError, EvalResult};

/// One `(light, ambient)` configuration of the calibration sweep.
///
/// The labels keep the directory-name text so tables reproduce it exactly.
#[derive(Clone, Debug, PartialEq)]
pub struct GridPoint {
    pub light: f64,
    pub ambient: f64,
    pub light_label: String,
    pub ambient_label: String,
}

impl GridPoint {
    /// Build a point from numeric values, labelled the way render jobs name their output.
    pub fn from_values(light: f64, ambient: f64) -> Self {
        Self {
            light,
            ambient,
            light_label: strength_label(light),
            ambient_label: strength_label(ambient),
        }
    }

    /// Total order used for sweeps and tie-breaks: light first, then ambient.
    pub fn order_key(&self) -> (f64, f64) {
        (self.light, self.ambient)
    }

    pub fn cmp_strength(&self, other: &Self) -> std::cmp::Ordering {
        self.light
            .total_cmp(&other.light)
            .then(self.ambient.total_cmp(&other.ambient))
    }
}

/// Decimal text for a strength value; whole numbers keep a trailing `.0`.
pub fn strength_label(v: f64) -> String {
    format!("{v:?}")
}

/// Matches `<prefix>_<light>_<ambient>` directory names.
#[derive(Clone, Debug)]
pub struct GridPattern {
    prefix: String,
    re: Regex,
}

impl GridPattern {
    pub fn new(prefix: &str) -> EvalResult<Self> {
        if prefix.is_empty() {
            return Err(EvalError::validation("calibration prefix must be non-empty"));
        }
        let re = Regex::new(&format!(
            r"^{}_(\d+\.?\d*)_(\d+\.?\d*)$",
            regex::escape(prefix)
        ))
        .map_err(|e| EvalError::validation(format!("calibration pattern: {e}")))?;
        Ok(Self {
            prefix: prefix.to_string(),
            re,
        })
    }

    pub fn parse(&self, name: &str) -> Option<GridPoint> {
        let caps = self.re.captures(name)?;
        let light_label = caps.get(1)?.as_str();
        let ambient_label = caps.get(2)?.as_str();
        Some(GridPoint {
            light: light_label.parse().ok()?,
            ambient: ambient_label.parse().ok()?,
            light_label: light_label.to_string(),
            ambient_label: ambient_label.to_string(),
        })
    }

    pub fn dir_name(&self, point: &GridPoint) -> String {
        format!(
            "{}_{}_{}",
            self.prefix, point.light_label, point.ambient_label
        )
    }
}

/// Grid-point directories under `root`, ordered by light then ambient.
///
/// Entries that are not directories or whose names do not match are ignored.
pub fn scan_grid(root: &Path, pattern: &GridPattern) -> EvalResult<Vec<(GridPoint, PathBuf)>> {
    if !root.is_dir() {
        return Err(EvalError::missing_directory(root));
    }
    let entries = std::fs::read_dir(root)
        .map_err(|e| EvalError::io(format!("read dir '{}': {e}", root.display())))?;

    let mut points = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| EvalError::io(format!("read dir entry: {e}")))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        match pattern.parse(&name) {
            Some(point) => points.push((point, path)),
            None => tracing::trace!(dir = %name, "not a calibration directory"),
        }
    }
    points.sort_by(|a, b| a.0.cmp_strength(&b.0));
    Ok(points)
}

#[cfg(test)]
#[path = "../../tests/unit/calibration/grid.rs"]
mod tests;
