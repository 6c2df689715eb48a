use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by lyricsync.
///
/// Lyric parsing itself never fails: malformed lines are dropped and a malformed
/// `[offset:]` tag falls back to zero. Only configuration, I/O and engine
/// lifecycle problems are reported here.
#[derive(Debug, Error)]
pub enum CoreError {
    // Configuration errors
    #[error("Config file not found at {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    // Engine errors
    #[error("Lyric sync engine has stopped")]
    EngineStopped,
}

pub type Result<T> = std::result::Result<T, CoreError>;
