pub mod engine;
pub mod perceptual;
pub mod psnr;
pub mod ssim;

pub use engine::{
    DirectorySummary, PairOutcome, PairScores, SkipReason, compare_directories,
    compare_grid_point, score_pair,
};
pub use perceptual::{DisabledPerceptual, LpipsProcess, PerceptualMetric, create_perceptual};
