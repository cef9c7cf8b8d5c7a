use super::*;

#[test]
fn defaults_validate() {
    EvalConfig::default().validate().unwrap();
}

#[test]
fn partial_json_fills_defaults() {
    let json = r#"{ "data_root": "/data/DTC", "variants": ["rast", "pbr_pcf"], "lpips": { "device": "cpu" } }"#;
    let cfg: EvalConfig = serde_json::from_str(json).unwrap();
    assert_eq!(cfg.data_root, PathBuf::from("/data/DTC"));
    assert_eq!(cfg.variants, vec![Variant::Rasterizer, Variant::PbrPcf]);
    assert_eq!(cfg.lpips.device, Device::Cpu);
    assert_eq!(cfg.lpips.net, "alex");
    assert_eq!(cfg.calibration.prefix, "pbr_cal_output");
    assert_eq!(cfg.table_layout, TableLayout::Wide);
}

#[test]
fn validation_rejects_bad_values() {
    let mut cfg = EvalConfig::default();
    cfg.variants.clear();
    assert!(cfg.validate().is_err());

    let mut cfg = EvalConfig::default();
    cfg.variants = vec![Variant::Pbr, Variant::Pbr];
    assert!(cfg.validate().is_err());

    let mut cfg = EvalConfig::default();
    cfg.calibration.lights = vec![f64::NAN];
    assert!(cfg.validate().is_err());

    let mut cfg = EvalConfig::default();
    cfg.renderers.model_scale = 0.0;
    assert!(cfg.validate().is_err());
}

#[test]
fn splatting_has_its_own_baseline() {
    let layout = SceneLayout::default();
    let scene = Path::new("/data/trex");
    assert_eq!(
        layout.reference_dir(scene, Variant::Pbr),
        PathBuf::from("/data/trex/nerf_data/test/opaque")
    );
    assert_eq!(
        layout.reference_dir(scene, Variant::Splatting),
        PathBuf::from("/data/trex/test/ours_30000/gt")
    );
    assert_eq!(
        layout.candidate_dir(scene, Variant::PbrShadow),
        PathBuf::from("/data/trex/test/pbr_shadow_output")
    );
}

#[test]
fn missing_output_entry_falls_back_to_variant_name() {
    let mut layout = SceneLayout::default();
    layout.outputs.remove(&Variant::PbrPcf);
    assert_eq!(
        layout.candidate_dir(Path::new("s"), Variant::PbrPcf),
        Path::new("s").join("test").join("pbr_pcf_output")
    );
}

#[test]
fn from_path_reports_parse_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("eval.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        EvalConfig::from_path(&path),
        Err(EvalError::Serde(_))
    ));
    assert!(matches!(
        EvalConfig::from_path(&dir.path().join("missing.json")),
        Err(EvalError::Io(_))
    ));
}

#[test]
fn sample_config_uses_the_bundled_scorer() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("configs/eval.sample.json");
    let cfg = EvalConfig::from_path(&path).unwrap();
    assert!(cfg.lpips.enabled);
    assert!(cfg.lpips.command.is_empty());
    assert_eq!(cfg.lpips.python, "python3");
    assert_eq!(cfg.variants, Variant::ALL.to_vec());
    assert_eq!(cfg, EvalConfig::default());
}

#[test]
fn lpips_is_on_by_default() {
    let cfg: EvalConfig = serde_json::from_str("{}").unwrap();
    assert!(cfg.lpips.enabled);

    let mut cfg = EvalConfig::default();
    cfg.lpips.python.clear();
    assert!(cfg.validate().is_err());
    cfg.lpips.command = vec!["scorer".to_string()];
    cfg.validate().unwrap();
}
