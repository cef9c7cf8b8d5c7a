use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::calibration::grid::{GridPattern, GridPoint};
use crate::config::EvalConfig;
use crate::foundation::error::{EvalError, EvalResult};
use crate::jobs::camera::{CameraMatrices, Mat4, frame_stem};
use crate::report::sink::ensure_parent_dir;
use crate::variant::Variant;

/// Shadow technique requested from the PBR renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shadows {
    Off,
    Hard,
    Pcf,
}

/// One renderer invocation producing a single frame.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderJob {
    pub variant: Variant,
    pub program: PathBuf,
    pub model: PathBuf,
    pub view: Mat4,
    pub proj: Mat4,
    /// Not passed to the splatting viewer.
    pub model_matrix: Option<Mat4>,
    pub shadows: Shadows,
    /// PBR renderers only.
    pub lighting: Option<GridPoint>,
    pub output: PathBuf,
}

/// Uniform `scale` followed by a +90° turn about X, transposed and flattened row-major.
pub fn model_matrix(scale: f64) -> Mat4 {
    let s = scale;
    [
        s, 0.0, 0.0, 0.0, //
        0.0, 0.0, s, 0.0, //
        0.0, -s, 0.0, 0.0, //
        0.0, 0.0, 0.0, s,
    ]
}

fn push_matrix(args: &mut Vec<OsString>, flag: &str, m: &Mat4) {
    args.push(flag.into());
    args.extend(m.iter().map(|v| OsString::from(format!("{v:?}"))));
}

impl RenderJob {
    pub fn args(&self) -> Vec<OsString> {
        let mut args = vec![OsString::from("-i"), self.model.clone().into_os_string()];
        push_matrix(&mut args, "-v", &self.view);
        push_matrix(&mut args, "-p", &self.proj);
        if let Some(m) = &self.model_matrix {
            push_matrix(&mut args, "-m", m);
        }

        match self.shadows {
            Shadows::Off => {}
            Shadows::Hard => args.push("--shadow".into()),
            Shadows::Pcf => args.extend([OsString::from("--shadow"), OsString::from("--pcf")]),
        }

        if let Some(l) = &self.lighting {
            args.extend([
                OsString::from("--light"),
                OsString::from(&l.light_label),
                OsString::from("--ambient"),
                OsString::from(&l.ambient_label),
            ]);
        }

        args.extend([OsString::from("-o"), self.output.clone().into_os_string()]);
        args
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args());
        cmd
    }

    /// Program followed by its arguments, space separated.
    pub fn display_line(&self) -> String {
        std::iter::once(self.program.as_os_str().to_os_string())
            .chain(self.args())
            .map(|a| a.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the renderer to completion; a non-zero exit is an error carrying its stderr.
    pub fn run(&self) -> EvalResult<()> {
        ensure_parent_dir(&self.output)?;
        let output = self
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                EvalError::external(format!(
                    "failed to spawn renderer '{}': {e}",
                    self.program.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EvalError::external(format!(
                "renderer '{}' exited with {} while writing '{}': {}",
                self.program.display(),
                output.status,
                self.output.display(),
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// What a batch of jobs renders.
#[derive(Clone, Debug, PartialEq)]
pub enum JobTarget {
    /// Final renders of one variant; PBR variants use `lighting`.
    Variant { variant: Variant, lighting: GridPoint },
    /// One calibration grid point, rendered with PCF shadows.
    Calibration(GridPoint),
}

fn program_for(cfg: &EvalConfig, variant: Variant) -> &Path {
    match variant {
        Variant::Rasterizer => &cfg.renderers.rasterizer,
        Variant::Splatting => &cfg.renderers.splatting,
        Variant::Pbr | Variant::PbrShadow | Variant::PbrPcf => &cfg.renderers.pbr,
    }
}

fn model_for(cfg: &EvalConfig, scene: &str, variant: Variant) -> PathBuf {
    let scene_dir = cfg.scene_dir(scene);
    match variant {
        Variant::Splatting => scene_dir.join(&cfg.layout.point_cloud),
        Variant::Rasterizer => scene_dir.join(format!("{scene}_baked.gltf")),
        Variant::Pbr | Variant::PbrShadow | Variant::PbrPcf => {
            scene_dir.join(format!("{scene}.gltf"))
        }
    }
}

fn shadows_for(variant: Variant) -> Shadows {
    match variant {
        Variant::PbrShadow => Shadows::Hard,
        Variant::PbrPcf => Shadows::Pcf,
        _ => Shadows::Off,
    }
}

/// One job per camera view, in view-key order.
pub fn plan_jobs(
    cfg: &EvalConfig,
    scene: &str,
    cameras: &CameraMatrices,
    target: &JobTarget,
) -> EvalResult<Vec<RenderJob>> {
    let (variant, lighting, out_dir_name) = match target {
        JobTarget::Variant { variant, lighting } => (
            *variant,
            variant.is_pbr().then(|| lighting.clone()),
            format!("{}_output", variant.as_str()),
        ),
        JobTarget::Calibration(point) => {
            let pattern = GridPattern::new(&cfg.calibration.prefix)?;
            (Variant::PbrPcf, Some(point.clone()), pattern.dir_name(point))
        }
    };

    let out_dir = cfg
        .scene_dir(scene)
        .join(&cfg.renderers.run)
        .join(out_dir_name);
    let model_matrix = (variant != Variant::Splatting)
        .then(|| model_matrix(f64::from(cfg.renderers.model_scale)));

    let mut jobs = Vec::with_capacity(cameras.view.len());
    for (key, view) in &cameras.view {
        let stem = frame_stem(key);
        if stem.is_empty() {
            tracing::warn!(view = %key, "view key has no frame name; skipping");
            continue;
        }
        jobs.push(RenderJob {
            variant,
            program: program_for(cfg, variant).to_path_buf(),
            model: model_for(cfg, scene, variant),
            view: *view,
            proj: cameras.proj,
            model_matrix,
            shadows: shadows_for(variant),
            lighting: lighting.clone(),
            output: out_dir.join(format!("{stem}.png")),
        });
    }
    Ok(jobs)
}

/// Every point of the configured sweep, lights outer, ambients inner.
pub fn calibration_targets(cfg: &EvalConfig) -> Vec<JobTarget> {
    let cal = &cfg.calibration;
    cal.lights
        .iter()
        .flat_map(|&l| {
            cal.ambients
                .iter()
                .map(move |&a| JobTarget::Calibration(GridPoint::from_values(l, a)))
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/jobs/job.rs"]
mod tests;
