//! Platform-specific configuration paths.
//!
//! - Linux: `~/.config/fmsynth/config.toml`
//! - macOS: `~/Library/Application Support/fmsynth/config.toml`
//! - Windows: `%APPDATA%\fmsynth\config.toml`

use std::path::PathBuf;

/// Application name used for directory paths.
const APP_NAME: &str = "fmsynth";

/// File name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Returns the user-specific configuration directory.
///
/// Falls back to the current directory if the platform config directory
/// cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Path of the configuration file read when none is given.
pub fn default_config_path() -> PathBuf {
    user_config_dir().join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_path_layout() {
        let path = default_config_path();
        assert!(path.ends_with("fmsynth/config.toml"));
        assert_eq!(path.parent(), Some(user_config_dir().as_path()));
    }
}
