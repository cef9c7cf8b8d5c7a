use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use renderqa::calibration::BestConfigs;
use renderqa::calibration::search::{best_table_path, grid_table_path};
use renderqa::config::{EvalConfig, TableLayout};
use renderqa::driver::{ResultTables, checkpoint_path, read_scene_list, run_comparison};
use renderqa::jobs::{CameraMatrices, JobTarget, RenderJob, calibration_targets, plan_jobs};
use renderqa::metrics::{
    DisabledPerceptual, PerceptualMetric, compare_directories, create_perceptual,
};
use renderqa::raster::opaque::prepare_opaque_dir;
use renderqa::report::{CsvSink, format_value};
use renderqa::report::tables::pair_header;
use renderqa::variant::Variant;

#[derive(Parser, Debug)]
#[command(name = "renderqa", version)]
struct Cli {
    /// Run configuration JSON. Built-in defaults when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score every scene × variant and write the results tables.
    Compare(CompareArgs),
    /// Sweep calibration output directories and pick the best lighting per scene.
    Calibrate(ScenesArgs),
    /// Compare two image directories directly.
    Pair(PairArgs),
    /// Build (and run) renderer invocations for one scene.
    Jobs(JobsArgs),
    /// Flatten captured ground truth onto black with alpha 255.
    Opaque(ScenesArgs),
}

#[derive(Parser, Debug)]
struct ScenesArgs {
    /// Scenes to process; the configured scene list when omitted.
    #[arg(long = "scene")]
    scenes: Vec<String>,
}

#[derive(Parser, Debug)]
struct CompareArgs {
    #[command(flatten)]
    scenes: ScenesArgs,

    /// Restrict to these variants.
    #[arg(long = "variant", value_enum)]
    variants: Vec<Variant>,

    #[arg(long, value_enum)]
    layout: Option<TableLayout>,

    /// Forget the checkpoint list and rewrite the tables from scratch.
    #[arg(long)]
    restart: bool,

    /// Skip LPIPS even when a scorer is configured.
    #[arg(long)]
    no_lpips: bool,
}

#[derive(Parser, Debug)]
struct PairArgs {
    #[arg(long)]
    reference: PathBuf,

    #[arg(long)]
    candidate: PathBuf,

    /// Also write one row per scored file to this CSV.
    #[arg(long)]
    per_file: Option<PathBuf>,

    #[arg(long)]
    no_lpips: bool,
}

#[derive(Parser, Debug)]
struct JobsArgs {
    #[arg(long)]
    scene: String,

    /// Variant to render; ignored with --calibrate.
    #[arg(long, value_enum, required_unless_present = "calibrate")]
    variant: Option<Variant>,

    /// Render every point of the calibration sweep instead.
    #[arg(long)]
    calibrate: bool,

    /// Print the invocations without running them.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = load_config(cli.config.as_deref())?;
    match cli.cmd {
        Command::Compare(args) => cmd_compare(cfg, args),
        Command::Calibrate(args) => cmd_calibrate(&cfg, args),
        Command::Pair(args) => cmd_pair(&cfg, args),
        Command::Jobs(args) => cmd_jobs(&cfg, args),
        Command::Opaque(args) => cmd_opaque(&cfg, args),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "renderqa=debug" } else { "renderqa=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EvalConfig> {
    let cfg = match path {
        Some(p) => EvalConfig::from_path(p)?,
        None => EvalConfig::default(),
    };
    Ok(cfg)
}

fn scenes(cfg: &EvalConfig, args: &ScenesArgs) -> anyhow::Result<Vec<String>> {
    if !args.scenes.is_empty() {
        return Ok(args.scenes.clone());
    }
    read_scene_list(&cfg.scene_list)
        .with_context(|| format!("scene list '{}'", cfg.scene_list.display()))
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb
}

fn perceptual(cfg: &EvalConfig, disabled: bool) -> anyhow::Result<Box<dyn PerceptualMetric>> {
    if disabled {
        return Ok(Box::new(DisabledPerceptual));
    }
    let backend = create_perceptual(&cfg.lpips)
        .context("starting the lpips scorer (pass --no-lpips to skip lpips)")?;
    Ok(backend)
}

fn cmd_compare(mut cfg: EvalConfig, args: CompareArgs) -> anyhow::Result<()> {
    if !args.variants.is_empty() {
        cfg.variants = args.variants.clone();
    }
    if let Some(layout) = args.layout {
        cfg.table_layout = layout;
    }
    cfg.validate()?;
    let scenes = scenes(&cfg, &args.scenes)?;

    if args.restart {
        let checkpoint = checkpoint_path(&cfg.output_dir);
        if checkpoint.exists() {
            std::fs::remove_file(&checkpoint)
                .with_context(|| format!("remove checkpoint '{}'", checkpoint.display()))?;
        }
    }

    let mut lpips = perceptual(&cfg, args.no_lpips)?;
    tracing::info!(scenes = scenes.len(), lpips = lpips.name(), "starting comparison");

    let pb = progress_bar(scenes.len());
    let report = run_comparison(&cfg, &scenes, lpips.as_mut(), &pb)?;

    match cfg.table_layout {
        TableLayout::Wide => {
            let path = ResultTables::wide_path(&cfg.output_dir);
            eprintln!("wrote {}", path.display());
        }
        TableLayout::PerVariant => {
            for &v in &cfg.variants {
                let path = ResultTables::variant_path(&cfg.output_dir, v);
                eprintln!("wrote {}", path.display());
            }
        }
    }
    eprintln!(
        "{} scenes written, {} already done, {} missing",
        report.written,
        report.already_done,
        report.missing_scenes.len()
    );
    Ok(())
}

fn cmd_calibrate(cfg: &EvalConfig, args: ScenesArgs) -> anyhow::Result<()> {
    let scenes = scenes(cfg, &args)?;
    let pb = progress_bar(scenes.len());
    let report = renderqa::run_calibration(cfg, &scenes, &pb)?;

    eprintln!("wrote {}", grid_table_path(cfg).display());
    eprintln!("wrote {}", best_table_path(cfg).display());
    if !report.uncalibrated.is_empty() {
        eprintln!("no valid grid point: {}", report.uncalibrated.join(", "));
    }
    Ok(())
}

fn cmd_pair(cfg: &EvalConfig, args: PairArgs) -> anyhow::Result<()> {
    let mut lpips = perceptual(cfg, args.no_lpips)?;
    let summary = compare_directories(&args.reference, &args.candidate, lpips.as_mut())?;

    if let Some(path) = &args.per_file {
        let mut sink = CsvSink::create(path, &pair_header())?;
        for p in &summary.pairs {
            sink.write_row(&[
                p.filename.clone(),
                format_value(p.psnr),
                format_value(p.ssim),
                format_value(p.lpips.unwrap_or(f64::NAN)),
            ])?;
        }
        sink.finish()?;
        eprintln!("wrote {}", path.display());
    }

    println!("pairs: {} (skipped {})", summary.pairs.len(), summary.skipped);
    for (name, s) in [
        ("psnr", summary.psnr),
        ("ssim", summary.ssim),
        ("lpips", summary.lpips),
    ] {
        println!("{name}: {} ± {}", format_value(s.mean), format_value(s.std));
    }
    Ok(())
}

fn cmd_jobs(cfg: &EvalConfig, args: JobsArgs) -> anyhow::Result<()> {
    let cameras_path = cfg.scene_dir(&args.scene).join(&cfg.layout.cameras);
    let cameras = CameraMatrices::from_path(&cameras_path)?;

    let targets = if args.calibrate {
        calibration_targets(cfg)
    } else {
        let variant = args
            .variant
            .context("--variant is required unless --calibrate is given")?;
        let best = BestConfigs::load(&best_table_path(cfg))?;
        vec![JobTarget::Variant {
            variant,
            lighting: best.lighting(&args.scene, &cfg.calibration),
        }]
    };

    let mut jobs: Vec<RenderJob> = Vec::new();
    for target in &targets {
        jobs.extend(plan_jobs(cfg, &args.scene, &cameras, target)?);
    }

    if args.dry_run {
        for job in &jobs {
            println!("{}", job.display_line());
        }
        return Ok(());
    }

    let pb = progress_bar(jobs.len());
    for job in &jobs {
        pb.set_message(job.output.display().to_string());
        job.run()?;
        pb.inc(1);
    }
    pb.finish_and_clear();
    eprintln!("rendered {} frames", jobs.len());
    Ok(())
}

fn cmd_opaque(cfg: &EvalConfig, args: ScenesArgs) -> anyhow::Result<()> {
    let scenes = scenes(cfg, &args)?;
    let pb = progress_bar(scenes.len());
    let mut total = 0;
    for scene in &scenes {
        pb.set_message(scene.clone());
        let scene_dir = cfg.scene_dir(scene);
        let src = scene_dir.join(&cfg.layout.raw_ground_truth);
        let dst = scene_dir.join(&cfg.layout.ground_truth);
        match prepare_opaque_dir(&src, &dst) {
            Ok(n) => total += n,
            Err(e) if e.is_missing_directory() => {
                tracing::warn!(scene = %scene, error = %e, "skipping scene");
            }
            Err(e) => return Err(e.into()),
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    eprintln!("flattened {total} images");
    Ok(())
}
