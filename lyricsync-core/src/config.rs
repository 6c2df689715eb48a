use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LyricsyncConfig {
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Timing behaviour of the lyric player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Lead (positive) or lag (negative) applied to every line, in milliseconds.
    /// Added on top of the lyric's own `[offset:]` tag.
    #[serde(default = "default_offset_ms")]
    pub offset_ms: i64,
    /// Drop timed lines with no text instead of keeping a placeholder
    #[serde(default = "default_true")]
    pub remove_blank_lines: bool,
    /// Below this remaining delay a pending wake polls at frame cadence
    #[serde(default = "default_wake_threshold_ms")]
    pub wake_threshold_ms: u64,
    /// Frame cadence used for the final stretch before a wake
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
}

const fn default_offset_ms() -> i64 {
    150
}

const fn default_true() -> bool {
    true
}

const fn default_wake_threshold_ms() -> u64 {
    200
}

const fn default_frame_rate() -> u32 {
    60
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            offset_ms: default_offset_ms(),
            remove_blank_lines: default_true(),
            wake_threshold_ms: default_wake_threshold_ms(),
            frame_rate: default_frame_rate(),
        }
    }
}

impl PlayerConfig {
    #[must_use]
    pub const fn wake_threshold(&self) -> Duration {
        Duration::from_millis(self.wake_threshold_ms)
    }

    /// Interval between frame polls. A zero frame rate is treated as 1 fps.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate.max(1)
    }
}

/// What the command line player prints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_true")]
    pub show_extended: bool,
    #[serde(default = "default_true")]
    pub show_tags: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_extended: true,
            show_tags: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to ~/.config/lyricsync/lyricsync.log
    #[serde(default)]
    pub enabled: bool,
}

impl LyricsyncConfig {
    /// Get the configuration directory path (~/.config/lyricsync/)
    #[must_use]
    pub fn config_dir() -> PathBuf {
        crate::paths::config_dir()
    }

    /// Get the config file path (~/.config/lyricsync/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from the default path, writing a template on first run.
    ///
    /// When no config exists yet the template is written and defaults are returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read, written, parsed or validated.
    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&config_path, CONFIG_TEMPLATE)?;
            info!("Created config template at {}", config_path.display());
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load config from an explicit path.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] if the file does not exist, or an
    /// error if it cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate config file contents.
    ///
    /// # Errors
    ///
    /// Returns an error on TOML syntax errors or invalid values.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigInvalid`] describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        if self.player.frame_rate == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "player.frame_rate must be greater than 0".to_string(),
            });
        }
        if self.player.frame_rate > 1000 {
            return Err(CoreError::ConfigInvalid {
                message: "player.frame_rate must be at most 1000".to_string(),
            });
        }
        Ok(())
    }
}

pub const CONFIG_TEMPLATE: &str = r#"# lyricsync Configuration
# ~/.config/lyricsync/config.toml

[player]
# Milliseconds every line is shown early (negative = late).
# Added to the lyric file's own [offset:] tag.
offset_ms = 150
# Drop timed lines with no text
remove_blank_lines = true
# Pending wakes closer than this poll at frame cadence instead of sleeping
wake_threshold_ms = 200
frame_rate = 60

[display]
# Print translation / extended lyric lines under each line
show_extended = true
# Print title, artist and album before playback
show_tags = true

[logging]
# Also write logs to ~/.config/lyricsync/lyricsync.log
enabled = false
"#;
