pub mod clock;
pub mod config;
pub mod error;
pub mod locator;
pub mod lrc;
pub mod paths;
pub mod player;
pub mod sync;
pub mod tags;
pub mod time;
pub mod timeline;
pub mod wake;

pub use clock::{Clock, ManualClock, MonotonicClock, PlaybackClock};
pub use config::{DisplayConfig, LoggingConfig, LyricsyncConfig, PlayerConfig};

/// Re-export toml error type for config parsing error handling
pub use toml::de::Error as TomlParseError;
pub use error::CoreError;
pub use locator::find_line_index;
pub use lrc::{normalize_timestamp, parse_timestamp, TimedLine, BLANK_LINE_PLACEHOLDER};
pub use paths::{config_dir, log_file_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME, LOG_FILE_NAME};
pub use player::{LyricEvent, LyricPlayer, PendingWake, PlaybackStatus, PlayerSnapshot};
pub use sync::LyricSyncEngine;
pub use tags::{LyricTags, TagKey};
pub use time::DurationExt;
pub use timeline::{LyricLine, LyricSource, Timeline};
pub use wake::{WakeStep, WakeTimer};
