//! The configuration file format.

use crate::error::ConfigError;
use crate::paths::default_config_path;
use crate::validation::{
    BLOCK_SIZE_RANGE, CHANNELS_RANGE, MIN_QUEUE_BLOCKS, SAMPLE_RATE_RANGE, VOICES_RANGE,
    ValidationError, ValidationResult, check_range, finish,
};
use fmsynth_synth::OperatorLayout;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration.
///
/// Every field has a default, so a file only needs the values it changes.
///
/// # TOML Format
///
/// ```toml
/// [audio]
/// sample_rate = 48000
/// block_size = 256
/// queue_blocks = 8
/// channels = 2
/// device = "USB Audio"
///
/// [engine]
/// voices = 8
/// layout = "four-op"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SynthConfig {
    /// Output stream settings.
    pub audio: AudioConfig,
    /// Synthesis engine settings.
    pub engine: EngineConfig,
}

/// Output stream settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Samples rendered per block.
    pub block_size: u32,
    /// Sample queue length in blocks.
    pub queue_blocks: u32,
    /// Interleaved output channels; the mono signal is copied to each.
    pub channels: u16,
    /// Output device name filter; the system default when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_size: 256,
            queue_blocks: 8,
            channels: 2,
            device: None,
        }
    }
}

impl AudioConfig {
    /// Sample queue capacity in samples.
    pub fn queue_capacity(&self) -> usize {
        self.block_size as usize * self.queue_blocks as usize
    }
}

/// Synthesis engine settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Polyphony.
    pub voices: u32,
    /// Algorithm family, `"two-op"` or `"four-op"`.
    pub layout: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            voices: 8,
            layout: OperatorLayout::default().to_string(),
        }
    }
}

impl EngineConfig {
    /// Parsed operator layout.
    pub fn layout(&self) -> ValidationResult<OperatorLayout> {
        self.layout
            .parse()
            .map_err(|_| ValidationError::UnknownLayout(self.layout.clone()))
    }
}

impl SynthConfig {
    /// Load a configuration from a TOML file. The result is not validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Parse a configuration from a TOML string. The result is not validated.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Convert to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Check every field, reporting all failures together.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();
        let audio = &self.audio;

        check_range(&mut errors, "audio.sample_rate", audio.sample_rate, &SAMPLE_RATE_RANGE);
        check_range(&mut errors, "audio.block_size", audio.block_size, &BLOCK_SIZE_RANGE);
        check_range(&mut errors, "audio.channels", audio.channels, &CHANNELS_RANGE);
        if audio.queue_blocks < MIN_QUEUE_BLOCKS {
            errors.push(ValidationError::QueueTooShort(audio.queue_blocks));
        }

        check_range(&mut errors, "engine.voices", self.engine.voices, &VOICES_RANGE);
        if let Err(e) = self.engine.layout() {
            errors.push(e);
        }

        finish(errors)
    }

    /// Load and validate the configuration for a run.
    ///
    /// An explicit `path` must exist. Without one, the default path is used
    /// if present, otherwise the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::load(path)?
            }
            None => {
                let default = default_config_path();
                if default.is_file() {
                    tracing::debug!(path = %default.display(), "loading default config");
                    Self::load(&default)?
                } else {
                    tracing::debug!("no config file, using defaults");
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SynthConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.engine.layout(), Ok(OperatorLayout::FourOp));
        assert_eq!(config.audio.queue_capacity(), 256 * 8);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = SynthConfig::from_toml("[engine]\nvoices = 16\n").unwrap();
        assert_eq!(config.engine.voices, 16);
        assert_eq!(config.engine.layout, "four-op");
        assert_eq!(config.audio, AudioConfig::default());
    }

    #[test]
    fn test_full_file() {
        let toml = r#"
            [audio]
            sample_rate = 44100
            block_size = 128
            queue_blocks = 4
            channels = 1
            device = "USB"

            [engine]
            voices = 4
            layout = "two-op"
        "#;
        let config = SynthConfig::from_toml(toml).unwrap();
        assert_eq!(config.audio.sample_rate, 44100);
        assert_eq!(config.audio.device.as_deref(), Some("USB"));
        assert_eq!(config.engine.layout(), Ok(OperatorLayout::TwoOp));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = SynthConfig::default();
        config.audio.device = Some("hw:1".to_string());
        config.engine.voices = 12;
        let text = config.to_toml().unwrap();
        assert_eq!(SynthConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_validate_reports_every_failure() {
        let mut config = SynthConfig::default();
        config.audio.sample_rate = 1000;
        config.audio.queue_blocks = 1;
        config.engine.voices = 0;
        config.engine.layout = "six-op".to_string();

        match config.validate() {
            Err(ValidationError::Multiple(errors)) => {
                assert_eq!(errors.len(), 4);
                assert!(errors.contains(&ValidationError::QueueTooShort(1)));
                assert!(errors.contains(&ValidationError::UnknownLayout("six-op".to_string())));
            }
            other => panic!("expected multiple errors, got {other:?}"),
        }
    }

    #[test]
    fn test_range_edges() {
        let mut config = SynthConfig::default();
        config.audio.block_size = 16;
        config.audio.channels = 8;
        config.engine.voices = 64;
        assert!(config.validate().is_ok());

        config.audio.block_size = 4097;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::OutOfRange {
                field: "audio.block_size",
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_field_is_ignored() {
        let config = SynthConfig::from_toml("[audio]\nlatency = 3\n").unwrap();
        assert_eq!(config, SynthConfig::default());
    }

    #[test]
    fn test_type_error_is_parse_error() {
        assert!(matches!(
            SynthConfig::from_toml("[engine]\nvoices = \"many\"\n"),
            Err(ConfigError::TomlParse(_))
        ));
    }
}
