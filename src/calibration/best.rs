use std::collections::BTreeMap;
use std::path::Path;

use crate::calibration::grid::GridPoint;
use crate::config::CalibrationConfig;
use crate::foundation::error::{EvalError, EvalResult};

/// Best lighting per scene, read back from the best-configuration table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BestConfigs {
    entries: BTreeMap<String, GridPoint>,
}

impl BestConfigs {
    /// A missing table yields an empty set; every lookup then falls back to defaults.
    pub fn load(path: &Path) -> EvalResult<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "no best-calibration table; using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(EvalError::io(format!(
                    "read best-calibration table '{}': {e}",
                    path.display()
                )));
            }
        };
        Self::parse(&text)
            .map_err(|e| EvalError::validation(format!("{}: {e}", path.display())))
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let header: Vec<&str> = lines
            .next()
            .ok_or("empty table")?
            .split(',')
            .map(str::trim)
            .collect();
        let col = |name: &str| {
            header
                .iter()
                .position(|h| *h == name)
                .ok_or(format!("missing column '{name}'"))
        };
        let (model, light, ambient) = (
            col("model")?,
            col("light_strength")?,
            col("ambient_strength")?,
        );

        let mut entries = BTreeMap::new();
        for (i, line) in lines.enumerate() {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() != header.len() {
                return Err(format!(
                    "row {}: expected {} fields, got {}",
                    i + 1,
                    header.len(),
                    fields.len()
                ));
            }
            let number = |idx: usize| {
                fields[idx]
                    .parse::<f64>()
                    .map_err(|e| format!("row {}: '{}': {e}", i + 1, fields[idx]))
            };
            let point = GridPoint {
                light: number(light)?,
                ambient: number(ambient)?,
                light_label: fields[light].to_string(),
                ambient_label: fields[ambient].to_string(),
            };
            entries.insert(fields[model].to_string(), point);
        }
        Ok(Self { entries })
    }

    pub fn get(&self, scene: &str) -> Option<&GridPoint> {
        self.entries.get(scene)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Calibrated lighting for `scene`, or the configured defaults.
    pub fn lighting(&self, scene: &str, calibration: &CalibrationConfig) -> GridPoint {
        match self.get(scene) {
            Some(p) => p.clone(),
            None => {
                tracing::info!(
                    scene,
                    light = calibration.default_light,
                    ambient = calibration.default_ambient,
                    "no calibrated lighting; using defaults"
                );
                GridPoint::from_values(calibration.default_light, calibration.default_ambient)
            }
        }
    }
}
