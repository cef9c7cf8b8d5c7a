use crate::foundation::stats::Summary;
use crate::metrics::DirectorySummary;
use crate::report::sink::format_value;
use crate::variant::Variant;

const METRICS: [&str; 3] = ["psnr", "ssim", "lpips"];

fn owned(cols: &[&str]) -> Vec<String> {
    cols.iter().map(|c| c.to_string()).collect()
}

/// `model` followed by `<metric>_<variant>, <metric>_std_<variant>` for every variant.
pub fn wide_header(variants: &[Variant]) -> Vec<String> {
    let mut cols = vec!["model".to_string()];
    for v in variants {
        for m in METRICS {
            cols.push(format!("{m}_{v}"));
            cols.push(format!("{m}_std_{v}"));
        }
    }
    cols
}

pub fn variant_header() -> Vec<String> {
    owned(&["model", "psnr", "psnr_std", "ssim", "ssim_std", "lpips", "lpips_std"])
}

pub fn calibration_header() -> Vec<String> {
    owned(&["model", "light_strength", "ambient_strength", "psnr", "psnr_std"])
}

pub fn pair_header() -> Vec<String> {
    owned(&["filename", "psnr", "ssim", "lpips"])
}

fn summary_cells(s: &Summary) -> [String; 2] {
    [format_value(s.mean), format_value(s.std)]
}

/// Six metric cells for one variant; `None` (variant not evaluated) writes NaN.
pub fn metric_cells(summary: Option<&DirectorySummary>) -> Vec<String> {
    let empty = Summary::empty();
    let (p, s, l) = match summary {
        Some(d) => (&d.psnr, &d.ssim, &d.lpips),
        None => (&empty, &empty, &empty),
    };
    [p, s, l].into_iter().flat_map(summary_cells).collect()
}

pub fn psnr_cells(s: &Summary) -> Vec<String> {
    summary_cells(s).to_vec()
}
