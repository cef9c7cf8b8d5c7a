pub mod best;
pub mod grid;
pub mod search;

pub use best::BestConfigs;
pub use grid::{GridPattern, GridPoint, scan_grid};
pub use search::{CalibrationReport, GridResult, calibrate_scene, run_calibration, select_best};
