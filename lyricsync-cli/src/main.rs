use clap::Parser;
use lyricsync_core::{
    CoreError, DisplayConfig, LyricEvent, LyricLine, LyricPlayer, LyricSource, LyricSyncEngine,
    LyricTags, LyricsyncConfig, MonotonicClock, TagKey, BLANK_LINE_PLACEHOLDER,
};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "lyricsync")]
#[command(about = "Play back an LRC lyric file in time")]
#[command(version)]
struct Args {
    /// LRC lyric file
    lyric: PathBuf,

    /// Extended lyric file (translation, romanization). May be repeated.
    #[arg(short, long)]
    extended: Vec<PathBuf>,

    /// Track position to start from, in milliseconds
    #[arg(short, long, default_value_t = 0)]
    start: i64,

    /// Override the configured offset, in milliseconds
    #[arg(short, long, allow_hyphen_values = true)]
    offset: Option<i64>,

    /// Keep timed lines that have no text
    #[arg(long)]
    keep_blank_lines: bool,

    /// Config file to use instead of ~/.config/lyricsync/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(LyricsyncConfig::config_path);
    init_tracing(check_file_logging_enabled(&config_path));

    let mut config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };
    if let Some(offset_ms) = args.offset {
        config.player.offset_ms = offset_ms;
    }
    if args.keep_blank_lines {
        config.player.remove_blank_lines = false;
    }

    let source = match read_source(&args.lyric, &args.extended) {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to read lyric files: {e}");
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    let cancel_token = CancellationToken::new();

    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {e}");
    }

    runtime.block_on(run(source, config, args.start, cancel_token));
}

fn load_config(path: Option<&Path>) -> Result<LyricsyncConfig, CoreError> {
    match path {
        Some(path) => LyricsyncConfig::load_from(path),
        None => LyricsyncConfig::load_or_create(),
    }
}

fn read_source(lyric: &Path, extended: &[PathBuf]) -> Result<LyricSource, CoreError> {
    let mut source = LyricSource::new(std::fs::read_to_string(lyric)?);
    for path in extended {
        source = source.with_extended(std::fs::read_to_string(path)?);
    }
    Ok(source)
}

async fn run(
    source: LyricSource,
    config: LyricsyncConfig,
    start_ms: i64,
    cancel_token: CancellationToken,
) {
    let display = config.display;
    let player = LyricPlayer::new(source, config.player, MonotonicClock::new());
    let engine = LyricSyncEngine::start(player, Some(cancel_token.clone()));
    let mut rx = engine.subscribe();

    match engine.snapshot().await {
        Ok(snapshot) if snapshot.timeline.is_empty() => {
            warn!("No timed lines found, nothing to play");
            engine.shutdown();
            return;
        }
        Ok(_) => {}
        Err(e) => {
            error!("Lyric sync engine is not running: {e}");
            return;
        }
    }

    if let Err(e) = engine.play(start_ms) {
        error!("Failed to start playback: {e}");
        return;
    }

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => break,
            event = rx.recv() => match event {
                Ok(LyricEvent::LyricsLoaded { timeline, tags }) => {
                    info!("Loaded {} lyric lines", timeline.len());
                    if display.show_tags {
                        print_tags(&tags);
                    }
                }
                Ok(LyricEvent::LineChanged { line, .. }) => print_line(&line, display),
                Ok(LyricEvent::PlaybackEnded) => {
                    info!("Playback ended");
                    break;
                }
                Err(RecvError::Lagged(skipped)) => warn!("Skipped {skipped} lyric events"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    engine.shutdown();
}

fn print_tags(tags: &LyricTags) {
    for key in TagKey::ALL {
        if key == TagKey::Offset {
            continue;
        }
        let value = tags.get(key);
        if !value.is_empty() {
            println!("{key}: {value}");
        }
    }
    if tags.offset != 0 {
        println!("{}: {}ms", TagKey::Offset, tags.offset);
    }
    println!();
}

fn print_line(line: &LyricLine, display: DisplayConfig) {
    println!("{} {}", format_timestamp(line.time_ms()), display_text(&line.text));
    if display.show_extended {
        for extended in &line.extended_lines {
            println!("           {}", display_text(extended));
        }
    }
}

fn display_text(text: &str) -> &str {
    if text == BLANK_LINE_PLACEHOLDER {
        ""
    } else {
        text
    }
}

/// Format milliseconds as `[mm:ss.xx]`
fn format_timestamp(ms: i64) -> String {
    let ms = ms.max(0);
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let hundredths = (ms % 1000) / 10;
    format!("[{minutes:02}:{seconds:02}.{hundredths:02}]")
}

fn check_file_logging_enabled(config_path: &Path) -> bool {
    // Minimal structs to parse just the logging.enabled field
    #[derive(serde::Deserialize)]
    struct PartialConfig {
        #[serde(default)]
        logging: PartialLoggingConfig,
    }
    #[derive(serde::Deserialize, Default)]
    struct PartialLoggingConfig {
        #[serde(default)]
        enabled: bool,
    }

    let Ok(content) = std::fs::read_to_string(config_path) else {
        return false;
    };

    toml::from_str::<PartialConfig>(&content)
        .map(|c| c.logging.enabled)
        .unwrap_or(false)
}

/// Initialize tracing with console output and optional file logging
fn init_tracing(file_logging_enabled: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if file_logging_enabled {
        let log_path = lyricsync_core::log_file_path();

        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
