use std::path::Path;

use anyhow::Context as _;
use image::RgbaImage;

use crate::foundation::error::{EvalError, EvalResult};

/// Multiply straight-alpha RGB by alpha and mark every pixel opaque.
///
/// Channels truncate toward zero: `floor(c * (a / 255))`.
pub fn flatten_to_opaque(img: &RgbaImage) -> RgbaImage {
    let mut out = img.clone();
    for px in out.pixels_mut() {
        let alpha = f64::from(px.0[3]) / 255.0;
        for c in &mut px.0[..3] {
            *c = (f64::from(*c) * alpha) as u8;
        }
        px.0[3] = 255;
    }
    out
}

/// Write an opaque copy of every `.png` in `src_dir` into `dst_dir`, keeping filenames.
///
/// Returns the number of images written. Files that fail to decode are skipped with a warning.
pub fn prepare_opaque_dir(src_dir: &Path, dst_dir: &Path) -> EvalResult<usize> {
    if !src_dir.is_dir() {
        return Err(EvalError::missing_directory(src_dir));
    }
    std::fs::create_dir_all(dst_dir)
        .with_context(|| format!("create opaque dir '{}'", dst_dir.display()))?;

    let mut names = Vec::new();
    let entries = std::fs::read_dir(src_dir)
        .with_context(|| format!("read dir '{}'", src_dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("read dir '{}'", src_dir.display()))?;
        let path = entry.path();
        let is_png = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("png"));
        if path.is_file() && is_png {
            names.push(entry.file_name());
        }
    }
    names.sort();

    let mut written = 0usize;
    for name in names {
        let src = src_dir.join(&name);
        let img = match image::open(&src) {
            Ok(img) => img.to_rgba8(),
            Err(e) => {
                tracing::warn!(path = %src.display(), error = %e, "skipping unreadable image");
                continue;
            }
        };
        let dst = dst_dir.join(&name);
        flatten_to_opaque(&img)
            .save(&dst)
            .map_err(|e| EvalError::image(format!("write '{}': {e}", dst.display())))?;
        written += 1;
    }

    tracing::info!(src = %src_dir.display(), written, "prepared opaque ground truth");
    Ok(written)
}
