//! Shared CLI helpers used across multiple commands.

use clap::Args;
use fmsynth_config::SynthConfig;
use fmsynth_synth::Engine;
use std::path::Path;

/// Engine settings that override the configuration file.
#[derive(Args, Debug, Default)]
pub struct EngineOverrides {
    /// Sample rate in Hz
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Number of voices
    #[arg(long)]
    pub voices: Option<u32>,

    /// Operator layout: "two-op" or "four-op"
    #[arg(long)]
    pub layout: Option<String>,

    /// Control change applied before the first note (e.g. "3=40")
    #[arg(long = "cc", value_parser = parse_cc, value_name = "NUM=VAL")]
    pub cc: Vec<(u8, u8)>,
}

/// Parse a `num=val` control change for clap's `value_parser`.
pub fn parse_cc(s: &str) -> Result<(u8, u8), String> {
    let (num, val) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid control change: '{}' (expected num=val)", s))?;
    let num: u8 = num
        .trim()
        .parse()
        .map_err(|_| format!("Invalid controller number '{}'", num))?;
    let val: u8 = val
        .trim()
        .parse()
        .map_err(|_| format!("Invalid controller value '{}'", val))?;
    if num > 127 || val > 127 {
        return Err(format!("Control change '{}' out of range 0-127", s));
    }
    Ok((num, val))
}

/// Load the configuration and apply command-line overrides.
pub fn load_config(path: Option<&Path>, overrides: &EngineOverrides) -> anyhow::Result<SynthConfig> {
    let mut config = SynthConfig::load_or_default(path)?;
    if let Some(sample_rate) = overrides.sample_rate {
        config.audio.sample_rate = sample_rate;
    }
    if let Some(voices) = overrides.voices {
        config.engine.voices = voices;
    }
    if let Some(layout) = &overrides.layout {
        config.engine.layout.clone_from(layout);
    }
    config.validate()?;
    Ok(config)
}

/// Build an engine from `config` and apply the override control changes.
pub fn build_engine(config: &SynthConfig, overrides: &EngineOverrides) -> anyhow::Result<Engine> {
    let mut engine = Engine::new(
        config.audio.sample_rate,
        config.engine.voices as usize,
        config.engine.layout()?,
    )?;
    for &(num, val) in &overrides.cc {
        if !engine.control_change(num, val) {
            tracing::warn!(cc = num, value = val, "control change not bound to a parameter");
        }
    }
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmsynth_core::{ParamId, ParamValue};

    #[test]
    fn test_parse_cc() {
        assert_eq!(parse_cc("3=40"), Ok((3, 40)));
        assert_eq!(parse_cc(" 23 = 127 "), Ok((23, 127)));
        assert!(parse_cc("3").is_err());
        assert!(parse_cc("3=128").is_err());
        assert!(parse_cc("x=1").is_err());
    }

    #[test]
    fn test_overrides_apply() {
        let overrides = EngineOverrides {
            cc: vec![(0x17, 127)],
            ..EngineOverrides::default()
        };
        let mut config = SynthConfig::default();
        config.engine.voices = 2;
        config.engine.layout = "two-op".to_string();
        let engine = build_engine(&config, &overrides).unwrap();
        assert_eq!(engine.voice_count(), 2);

        let release = ParamId::ENV_RELEASE | ParamId::GROUP_VCA;
        let param = engine.patch().get(release).unwrap();
        assert_eq!(param.value(), ParamValue::Uint16(127 << 9));
    }

    #[test]
    fn test_load_config_overrides() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[engine]\nvoices = 4\n").unwrap();

        let overrides = EngineOverrides {
            sample_rate: Some(44100),
            layout: Some("two-op".to_string()),
            ..EngineOverrides::default()
        };
        let config = load_config(Some(&path), &overrides).unwrap();
        assert_eq!(config.audio.sample_rate, 44100);
        assert_eq!(config.engine.voices, 4);
        assert_eq!(config.engine.layout, "two-op");

        let bad = EngineOverrides {
            voices: Some(0),
            ..EngineOverrides::default()
        };
        assert!(load_config(Some(&path), &bad).is_err());
    }

    #[test]
    fn test_invalid_layout_is_error() {
        let mut config = SynthConfig::default();
        config.engine.layout = "six-op".to_string();
        assert!(build_engine(&config, &EngineOverrides::default()).is_err());
    }
}
