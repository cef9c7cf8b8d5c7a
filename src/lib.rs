#![forbid(unsafe_code)]

pub mod calibration;
pub mod config;
pub mod driver;
pub mod foundation;
pub mod jobs;
pub mod metrics;
pub mod raster;
pub mod report;
pub mod variant;

pub use calibration::{BestConfigs, GridPoint, GridResult, run_calibration, select_best};
pub use config::{EvalConfig, LpipsConfig, TableLayout};
pub use driver::{BatchReport, SceneResult, evaluate_scene, read_scene_list, run_comparison};
pub use foundation::error::{EvalError, EvalResult};
pub use foundation::stats::Summary;
pub use jobs::{CameraMatrices, JobTarget, RenderJob, plan_jobs};
pub use metrics::{
    DirectorySummary, PairOutcome, PairScores, PerceptualMetric, compare_directories,
    create_perceptual,
};
pub use variant::Variant;
