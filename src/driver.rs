//! Batch comparison of every scene against every configured variant.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indicatif::ProgressBar;

use crate::config::{EvalConfig, TableLayout};
use crate::foundation::error::{EvalError, EvalResult};
use crate::metrics::{DirectorySummary, PerceptualMetric, compare_directories};
use crate::report::tables::{metric_cells, variant_header, wide_header};
use crate::report::{CsvSink, DoneList};
use crate::variant::Variant;

/// Read a scene list: one name per line, surrounding whitespace and blank lines ignored.
pub fn read_scene_list(path: &Path) -> EvalResult<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| EvalError::io(format!("read scene list '{}': {e}", path.display())))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect())
}

/// Per-variant summaries for one scene. Variants whose directories were missing are absent.
#[derive(Clone, Debug, Default)]
pub struct SceneResult {
    pub scene: String,
    pub variants: BTreeMap<Variant, DirectorySummary>,
}

/// Compare one scene's renders for every configured variant.
///
/// A missing baseline or output directory skips that variant only.
pub fn evaluate_scene(
    cfg: &EvalConfig,
    scene: &str,
    lpips: &mut dyn PerceptualMetric,
) -> EvalResult<SceneResult> {
    let scene_dir = cfg.scene_dir(scene);
    let mut out = SceneResult {
        scene: scene.to_string(),
        ..SceneResult::default()
    };

    for &variant in &cfg.variants {
        let reference = cfg.layout.reference_dir(&scene_dir, variant);
        let candidate = cfg.layout.candidate_dir(&scene_dir, variant);
        match compare_directories(&reference, &candidate, lpips) {
            Ok(summary) => {
                if summary.is_empty() {
                    tracing::warn!(scene, %variant, "no valid image pairs; writing NaN");
                }
                out.variants.insert(variant, summary);
            }
            Err(e) if e.is_missing_directory() => {
                tracing::warn!(scene, %variant, error = %e, "skipping variant");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(out)
}

/// Output tables of one comparison run.
pub enum ResultTables {
    Wide {
        variants: Vec<Variant>,
        sink: CsvSink,
    },
    PerVariant(BTreeMap<Variant, CsvSink>),
}

impl ResultTables {
    pub fn wide_path(output_dir: &Path) -> PathBuf {
        output_dir.join("results.csv")
    }

    pub fn variant_path(output_dir: &Path, variant: Variant) -> PathBuf {
        output_dir.join(format!("results_{variant}.csv"))
    }

    /// `resume` appends to existing tables instead of truncating them.
    pub fn open(cfg: &EvalConfig, resume: bool) -> EvalResult<Self> {
        let open = |path: &Path, header: &[String]| {
            if resume {
                CsvSink::append(path, header)
            } else {
                CsvSink::create(path, header)
            }
        };

        match cfg.table_layout {
            TableLayout::Wide => Ok(Self::Wide {
                variants: cfg.variants.clone(),
                sink: open(
                    &Self::wide_path(&cfg.output_dir),
                    &wide_header(&cfg.variants),
                )?,
            }),
            TableLayout::PerVariant => {
                let mut sinks = BTreeMap::new();
                for &v in &cfg.variants {
                    let sink = open(&Self::variant_path(&cfg.output_dir, v), &variant_header())?;
                    sinks.insert(v, sink);
                }
                Ok(Self::PerVariant(sinks))
            }
        }
    }

    /// Whether every table already has a row for `scene`.
    pub fn is_recorded(&self, scene: &str) -> bool {
        match self {
            Self::Wide { sink, .. } => sink.contains_key(scene),
            Self::PerVariant(sinks) => sinks.values().all(|s| s.contains_key(scene)),
        }
    }

    /// Write the scene's row to each table that does not have one yet.
    pub fn write(&mut self, result: &SceneResult) -> EvalResult<()> {
        match self {
            Self::Wide { variants, sink } => {
                if sink.contains_key(&result.scene) {
                    return Ok(());
                }
                let mut row = vec![result.scene.clone()];
                for v in variants.iter() {
                    row.extend(metric_cells(result.variants.get(v)));
                }
                sink.write_row(&row)
            }
            Self::PerVariant(sinks) => {
                for (v, sink) in sinks.iter_mut() {
                    if sink.contains_key(&result.scene) {
                        continue;
                    }
                    let mut row = vec![result.scene.clone()];
                    row.extend(metric_cells(result.variants.get(v)));
                    sink.write_row(&row)?;
                }
                Ok(())
            }
        }
    }

    pub fn finish(self) -> EvalResult<()> {
        match self {
            Self::Wide { sink, .. } => sink.finish(),
            Self::PerVariant(sinks) => sinks.into_values().try_for_each(CsvSink::finish),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub written: usize,
    pub already_done: usize,
    pub missing_scenes: Vec<String>,
}

pub fn checkpoint_path(output_dir: &Path) -> PathBuf {
    output_dir.join("done_compare.txt")
}

/// Evaluate `scenes` and write one row per scene, resuming after the checkpoint list.
pub fn run_comparison(
    cfg: &EvalConfig,
    scenes: &[String],
    lpips: &mut dyn PerceptualMetric,
    progress: &ProgressBar,
) -> EvalResult<BatchReport> {
    let mut done = DoneList::open(&checkpoint_path(&cfg.output_dir))?;
    if !done.is_empty() {
        tracing::info!(done = done.len(), "resuming comparison run");
    }
    let mut tables = ResultTables::open(cfg, !done.is_empty())?;
    let mut report = BatchReport::default();

    progress.set_length(scenes.len() as u64);
    for scene in scenes {
        progress.set_message(scene.clone());
        if done.contains(scene) {
            report.already_done += 1;
        } else if tables.is_recorded(scene) {
            // Row written, checkpoint not: the previous run stopped between the two.
            tracing::info!(scene = %scene, "scene already in results; checkpointing");
            done.mark(scene)?;
            report.already_done += 1;
        } else if !cfg.scene_dir(scene).is_dir() {
            tracing::warn!(scene = %scene, "scene directory does not exist; skipping");
            report.missing_scenes.push(scene.clone());
        } else {
            let result = evaluate_scene(cfg, scene, lpips)?;
            tables.write(&result)?;
            done.mark(scene)?;
            report.written += 1;
            tracing::info!(scene = %scene, variants = result.variants.len(), "scene written");
        }
        progress.inc(1);
    }

    tables.finish()?;
    progress.finish_and_clear();
    Ok(report)
}
