//! Integration tests for fmsynth-config file handling.

use fmsynth_config::{ConfigError, SynthConfig, ValidationError};
use fmsynth_synth::OperatorLayout;
use tempfile::TempDir;

#[test]
fn save_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("dir").join("config.toml");

    let mut config = SynthConfig::default();
    config.audio.block_size = 64;
    config.engine.layout = "two-op".to_string();
    config.save(&path).unwrap();

    assert!(path.exists());
    let loaded = SynthConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.engine.layout(), Ok(OperatorLayout::TwoOp));
}

#[test]
fn load_missing_file_is_read_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    match SynthConfig::load(&path) {
        Err(ConfigError::ReadFile { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected read error, got {other:?}"),
    }
}

#[test]
fn load_or_default_with_explicit_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[engine]\nvoices = 3\n").unwrap();

    let config = SynthConfig::load_or_default(Some(&path)).unwrap();
    assert_eq!(config.engine.voices, 3);
}

#[test]
fn load_or_default_rejects_missing_explicit_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.toml");
    assert!(matches!(
        SynthConfig::load_or_default(Some(&path)),
        Err(ConfigError::ReadFile { .. })
    ));
}

#[test]
fn load_or_default_validates() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[audio]\nchannels = 0\n").unwrap();

    match SynthConfig::load_or_default(Some(&path)) {
        Err(ConfigError::Validation(ValidationError::OutOfRange { field, value, .. })) => {
            assert_eq!(field, "audio.channels");
            assert_eq!(value, 0);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn malformed_file_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[audio\nsample_rate = ").unwrap();

    assert!(matches!(
        SynthConfig::load(&path),
        Err(ConfigError::TomlParse(_))
    ));
}
