use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{EvalError, EvalResult};

/// Row-major 4×4 matrix as written by the camera converter.
pub type Mat4 = [f64; 16];

/// Shared projection plus one view matrix per test frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraMatrices {
    pub proj: Mat4,
    /// Keyed by the capture's frame path, e.g. `./test/r_0`.
    pub view: BTreeMap<String, Mat4>,
}

impl CameraMatrices {
    pub fn from_path(path: &Path) -> EvalResult<Self> {
        let f = File::open(path)
            .map_err(|e| EvalError::io(format!("open cameras '{}': {e}", path.display())))?;
        let cams: Self = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| EvalError::serde(format!("parse cameras '{}': {e}", path.display())))?;
        if cams.view.is_empty() {
            return Err(EvalError::validation(format!(
                "cameras '{}' contain no views",
                path.display()
            )));
        }
        Ok(cams)
    }
}

/// Output image stem for a view key: last path component up to the first `.`.
pub fn frame_stem(key: &str) -> &str {
    let file = key.rsplit('/').next().unwrap_or(key);
    file.split('.').next().unwrap_or(file)
}
