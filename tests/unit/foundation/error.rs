use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        EvalError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(EvalError::image("x").to_string().contains("image error:"));
    assert!(EvalError::metric("x").to_string().contains("metric error:"));
    assert!(EvalError::io("x").to_string().contains("io error:"));
    assert!(
        EvalError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
    assert!(
        EvalError::external("x")
            .to_string()
            .contains("external program error:")
    );
}

#[test]
fn missing_directory_names_the_path() {
    let err = EvalError::missing_directory("/data/trex/test/rast_output");
    assert!(err.is_missing_directory());
    assert!(err.to_string().contains("/data/trex/test/rast_output"));
    assert!(!EvalError::metric("x").is_missing_directory());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = EvalError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
