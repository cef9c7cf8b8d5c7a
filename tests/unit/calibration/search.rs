use std::path::Path;

use image::{Rgb, RgbImage};

use super::*;

fn result(light: f64, ambient: f64, mean: f64) -> GridResult {
    GridResult {
        point: GridPoint::from_values(light, ambient),
        psnr: Summary {
            mean,
            std: 0.5,
            count: 4,
        },
    }
}

#[test]
fn picks_highest_mean_psnr() {
    let results = [
        result(1.0, 0.01, 20.3),
        result(2.0, 0.05, 24.7),
        result(3.0, 0.1, 22.1),
    ];
    let best = select_best(&results).unwrap();
    assert_eq!(best.point.order_key(), (2.0, 0.05));
}

#[test]
fn ties_go_to_lowest_light_then_lowest_ambient() {
    let results = [
        result(3.0, 0.01, 25.0),
        result(2.0, 0.1, 25.0),
        result(2.0, 0.05, 25.0),
        result(1.0, 0.01, 19.0),
    ];
    assert_eq!(select_best(&results).unwrap().point.order_key(), (2.0, 0.05));

    let mut reversed = results.clone();
    reversed.reverse();
    assert_eq!(select_best(&reversed).unwrap().point.order_key(), (2.0, 0.05));
}

#[test]
fn nan_means_never_win() {
    let results = [result(1.0, 0.01, f64::NAN), result(2.0, 0.01, 10.0)];
    assert_eq!(select_best(&results).unwrap().point.order_key(), (2.0, 0.01));
    assert!(select_best(&[result(1.0, 0.01, f64::NAN)]).is_none());
    assert!(select_best(&[]).is_none());
}

fn ground_truth() -> RgbImage {
    RgbImage::from_fn(8, 8, |x, y| {
        let v = 10 + (x * 8 + y) as u8;
        Rgb([v, v / 2 + 1, 90 - v])
    })
}

fn offset(img: &RgbImage, by: u8) -> RgbImage {
    let mut out = img.clone();
    for p in out.pixels_mut() {
        p.0 = p.0.map(|c| c.saturating_add(by));
    }
    out
}

fn save(dir: &Path, name: &str, img: &RgbImage) {
    std::fs::create_dir_all(dir).unwrap();
    img.save(dir.join(name)).unwrap();
}

fn config(root: &Path) -> EvalConfig {
    EvalConfig {
        data_root: root.join("data"),
        output_dir: root.join("results"),
        ..EvalConfig::default()
    }
}

#[test]
fn calibration_writes_grid_and_best_tables() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = config(tmp.path());
    let trex = cfg.scene_dir("trex");
    let gt = ground_truth();
    save(&trex.join("nerf_data/test/opaque"), "r_0.png", &gt);
    save(&trex.join("nerf_data/test/opaque"), "r_1.png", &gt);
    for (dir, by) in [
        ("pbr_cal_output_1.0_0.01", 6),
        ("pbr_cal_output_2.0_0.05", 1),
        ("pbr_cal_output_3.0_0.1", 3),
    ] {
        save(&trex.join("test").join(dir), "r_0.png", &offset(&gt, by));
        save(&trex.join("test").join(dir), "r_1.png", &offset(&gt, by));
    }
    // Present but empty: no valid pairs, so no grid row.
    std::fs::create_dir_all(trex.join("test/pbr_cal_output_4.0_0.2")).unwrap();

    // Scene directory without any calibration output.
    save(
        &cfg.scene_dir("amber").join("nerf_data/test/opaque"),
        "r_0.png",
        &gt,
    );
    std::fs::create_dir_all(cfg.scene_dir("amber").join("test")).unwrap();

    let scenes = vec!["trex".to_string(), "amber".to_string(), "ghost".to_string()];
    let report = run_calibration(&cfg, &scenes, &ProgressBar::hidden()).unwrap();
    assert_eq!(report.calibrated, vec!["trex"]);
    assert_eq!(report.uncalibrated, vec!["amber"]);
    assert_eq!(report.missing_scenes, vec!["ghost"]);

    let grid = std::fs::read_to_string(grid_table_path(&cfg)).unwrap();
    let rows: Vec<&str> = grid.lines().collect();
    assert_eq!(rows[0], "model,light_strength,ambient_strength,psnr,psnr_std");
    assert_eq!(rows.len(), 4);
    assert!(rows[1].starts_with("trex,1.0,0.01,"));
    assert!(rows[2].starts_with("trex,2.0,0.05,"));
    assert!(rows[3].starts_with("trex,3.0,0.1,"));

    let best = std::fs::read_to_string(best_table_path(&cfg)).unwrap();
    let rows: Vec<&str> = best.lines().collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[1].starts_with("trex,2.0,0.05,"));
    // Both frames score the same, so the spread is zero.
    assert!(rows[1].ends_with(",0"));
}

#[test]
fn scene_results_follow_grid_order() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = config(tmp.path());
    let trex = cfg.scene_dir("trex");
    let gt = ground_truth();
    save(&trex.join("nerf_data/test/opaque"), "r_0.png", &gt);
    save(&trex.join("test/pbr_cal_output_2.5_0.1"), "r_0.png", &offset(&gt, 2));
    save(&trex.join("test/pbr_cal_output_1.5_0.2"), "r_0.png", &offset(&gt, 2));

    let results = calibrate_scene(&cfg, "trex").unwrap();
    let keys: Vec<_> = results.iter().map(|r| r.point.order_key()).collect();
    assert_eq!(keys, vec![(1.5, 0.2), (2.5, 0.1)]);
    assert_eq!(results[0].psnr, results[1].psnr);
    // Equal scores: the lower light wins.
    assert_eq!(select_best(&results).unwrap().point.order_key(), (1.5, 0.2));
}
