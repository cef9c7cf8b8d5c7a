use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::foundation::error::{EvalError, EvalResult};
use crate::variant::{Baseline, Variant};

/// Run configuration, loaded from JSON. Every section has defaults matching the dataset
/// layout the renderers write.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Directory holding one subdirectory per scene.
    pub data_root: PathBuf,
    /// Plain-text scene list, one name per line.
    pub scene_list: PathBuf,
    /// Where result tables and checkpoint lists are written.
    pub output_dir: PathBuf,
    pub variants: Vec<Variant>,
    pub table_layout: TableLayout,
    pub layout: SceneLayout,
    pub lpips: LpipsConfig,
    pub calibration: CalibrationConfig,
    pub renderers: RendererConfig,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            scene_list: PathBuf::from("test_scenes"),
            output_dir: PathBuf::from("results"),
            variants: Variant::ALL.to_vec(),
            table_layout: TableLayout::default(),
            layout: SceneLayout::default(),
            lpips: LpipsConfig::default(),
            calibration: CalibrationConfig::default(),
            renderers: RendererConfig::default(),
        }
    }
}

impl EvalConfig {
    pub fn from_path(path: &Path) -> EvalResult<Self> {
        let f = File::open(path)
            .map_err(|e| EvalError::io(format!("open config '{}': {e}", path.display())))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| EvalError::serde(format!("parse config '{}': {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> EvalResult<()> {
        if self.variants.is_empty() {
            return Err(EvalError::validation("at least one variant is required"));
        }
        let unique: BTreeSet<_> = self.variants.iter().collect();
        if unique.len() != self.variants.len() {
            return Err(EvalError::validation("variants must not repeat"));
        }
        self.calibration.validate()?;
        if self.lpips.command.is_empty() && self.lpips.python.is_empty() {
            return Err(EvalError::validation(
                "lpips needs a scorer command or a python interpreter",
            ));
        }
        if self.lpips.net.is_empty() || self.lpips.version.is_empty() {
            return Err(EvalError::validation(
                "lpips net and version must be non-empty",
            ));
        }
        if !self.renderers.model_scale.is_finite() || self.renderers.model_scale <= 0.0 {
            return Err(EvalError::validation("model_scale must be positive"));
        }
        Ok(())
    }

    pub fn scene_dir(&self, scene: &str) -> PathBuf {
        self.data_root.join(scene)
    }
}

/// Shape of the result tables written by the comparison driver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TableLayout {
    /// One table, one row per scene, metric columns suffixed by variant.
    #[default]
    Wide,
    /// One table per variant with unsuffixed metric columns.
    PerVariant,
}

/// Scene-relative directories.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneLayout {
    /// Captured images with alpha, as shipped with the dataset.
    pub raw_ground_truth: PathBuf,
    /// Alpha-flattened captures; baseline for the rasterizer and PBR variants.
    pub ground_truth: PathBuf,
    /// Baseline for the splatting variant.
    pub splat_ground_truth: PathBuf,
    /// Rendered output directory per variant.
    pub outputs: BTreeMap<Variant, PathBuf>,
    /// Parent of the calibration output directories.
    pub calibration_root: PathBuf,
    /// View/projection matrices consumed by the job builder.
    pub cameras: PathBuf,
    pub point_cloud: PathBuf,
}

impl Default for SceneLayout {
    fn default() -> Self {
        let outputs = BTreeMap::from([
            (Variant::Rasterizer, PathBuf::from("test/rast_output")),
            (Variant::Splatting, PathBuf::from("test/ours_30000/renders")),
            (Variant::Pbr, PathBuf::from("test/pbr_output")),
            (Variant::PbrShadow, PathBuf::from("test/pbr_shadow_output")),
            (Variant::PbrPcf, PathBuf::from("test/pbr_pcf_output")),
        ]);
        Self {
            raw_ground_truth: PathBuf::from("nerf_data/test"),
            ground_truth: PathBuf::from("nerf_data/test/opaque"),
            splat_ground_truth: PathBuf::from("test/ours_30000/gt"),
            outputs,
            calibration_root: PathBuf::from("test"),
            cameras: PathBuf::from("nerf_data/transforms_test_vp.json"),
            point_cloud: PathBuf::from("point_cloud/iteration_30000/point_cloud.ply"),
        }
    }
}

impl SceneLayout {
    pub fn reference_dir(&self, scene_dir: &Path, variant: Variant) -> PathBuf {
        match variant.baseline() {
            Baseline::Opaque => scene_dir.join(&self.ground_truth),
            Baseline::Splatting => scene_dir.join(&self.splat_ground_truth),
        }
    }

    /// Falls back to `test/<variant>_output` for variants missing from `outputs`.
    pub fn candidate_dir(&self, scene_dir: &Path, variant: Variant) -> PathBuf {
        match self.outputs.get(&variant) {
            Some(rel) => scene_dir.join(rel),
            None => scene_dir
                .join("test")
                .join(format!("{}_output", variant.as_str())),
        }
    }
}

/// Where the perceptual network runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    /// GPU when available, CPU otherwise.
    #[default]
    Auto,
    Cpu,
    Cuda,
}

impl Device {
    pub fn as_str(self) -> &'static str {
        match self {
            Device::Auto => "auto",
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
        }
    }
}

/// External LPIPS scorer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LpipsConfig {
    /// When false every LPIPS cell is NaN and no scorer is started.
    pub enabled: bool,
    /// Program followed by its arguments. Empty runs the bundled scorer with `python`.
    pub command: Vec<String>,
    /// Interpreter for the bundled scorer.
    pub python: String,
    pub net: String,
    pub version: String,
    pub device: Device,
}

impl Default for LpipsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: Vec::new(),
            python: "python3".to_string(),
            net: "alex".to_string(),
            version: "0.1".to_string(),
            device: Device::Auto,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Output directories are named `<prefix>_<light>_<ambient>`.
    pub prefix: String,
    pub lights: Vec<f64>,
    pub ambients: Vec<f64>,
    /// Used for scenes without a calibrated entry.
    pub default_light: f64,
    pub default_ambient: f64,
    pub grid_table: String,
    pub best_table: String,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            prefix: "pbr_cal_output".to_string(),
            lights: vec![1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 4.5, 5.0],
            ambients: vec![0.01, 0.02, 0.03, 0.04, 0.05, 0.1, 0.15, 0.2, 0.25],
            default_light: 3.0,
            default_ambient: 0.01,
            grid_table: "calibration_psnr_results.csv".to_string(),
            best_table: "best_calibration_psnr.csv".to_string(),
        }
    }
}

impl CalibrationConfig {
    pub fn validate(&self) -> EvalResult<()> {
        if self.prefix.is_empty() {
            return Err(EvalError::validation("calibration prefix must be non-empty"));
        }
        if self.lights.is_empty() || self.ambients.is_empty() {
            return Err(EvalError::validation(
                "calibration grid must have at least one light and one ambient value",
            ));
        }
        let all = self
            .lights
            .iter()
            .chain(&self.ambients)
            .chain([&self.default_light, &self.default_ambient]);
        for v in all {
            if !v.is_finite() || *v < 0.0 {
                return Err(EvalError::validation(format!(
                    "calibration strength {v} must be finite and non-negative"
                )));
            }
        }
        Ok(())
    }
}

/// Locations of the external renderer binaries and the per-run knobs passed to them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub rasterizer: PathBuf,
    pub pbr: PathBuf,
    pub splatting: PathBuf,
    /// Uniform scale folded into the model matrix.
    pub model_scale: f32,
    /// Run name; outputs land in `<scene>/<run>/<variant>_output`.
    pub run: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            rasterizer: PathBuf::from("rast_pipeline/build/rasterizer"),
            pbr: PathBuf::from("pbr_pipeline/build/pbr_viewer"),
            splatting: PathBuf::from(
                "vk_gaussian_splatting/bin_x64/Release/vk_gaussian_splatting_app",
            ),
            model_scale: 1.0,
            run: "test".to_string(),
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
