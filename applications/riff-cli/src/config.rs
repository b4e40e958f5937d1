//! Renderer configuration
//!
//! Layers, lowest priority first: built-in defaults, an optional TOML file
//! (`--config`, else `riff.toml` in the working directory if present), then
//! `RIFF_` environment variables with `__` between nested keys, e.g.
//! `RIFF_PLAYBACK__SLOWED_RATE=0.7`.

use riff_playback::PlaybackConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "riff.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Engine settings
    pub playback: PlaybackConfig,

    /// JSON file for effect settings; kept in memory when unset
    pub settings_path: Option<PathBuf>,
}

impl CliConfig {
    /// Load configuration from file and environment
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    settings = settings.add_source(config::File::from(default));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("RIFF")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("playback.eq_bands"),
        );

        settings.build()?.try_deserialize()
    }
}
