//! Configuration for the fmsynth engine and audio output.
//!
//! # Features
//!
//! - **Config file**: [`SynthConfig`] loaded from and saved to TOML
//! - **Validation**: range checks reporting every failure at once
//! - **Paths**: the platform-specific default config location
//!
//! # Example
//!
//! ```rust
//! use fmsynth_config::SynthConfig;
//!
//! let config = SynthConfig::from_toml(
//!     r#"
//!     [audio]
//!     block_size = 128
//!
//!     [engine]
//!     voices = 16
//!     layout = "two-op"
//!     "#,
//! )
//! .unwrap();
//!
//! config.validate().unwrap();
//! assert_eq!(config.audio.sample_rate, 48000);
//! assert_eq!(config.audio.queue_capacity(), 128 * 8);
//! ```

mod config;
mod error;

/// Platform-specific configuration paths.
pub mod paths;

/// Configuration range checks.
pub mod validation;

pub use config::{AudioConfig, EngineConfig, SynthConfig};
pub use error::ConfigError;
pub use paths::{CONFIG_FILE_NAME, default_config_path, user_config_dir};
pub use validation::{ValidationError, ValidationResult};
