//! Renderer invocations for producing the images the metrics consume.

pub mod camera;
pub mod job;

pub use camera::{CameraMatrices, Mat4, frame_stem};
pub use job::{JobTarget, RenderJob, Shadows, calibration_targets, model_matrix, plan_jobs};
