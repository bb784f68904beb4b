//! keytype: types text into the focused window.
//!
//! # Usage
//!
//! ```text
//! keytype [OPTIONS] [TEXT]
//!
//! echo "hello" | keytype --start-delay-secs 3
//! keytype --tabs-to-spaces --tab-size 2 "$(cat snippet.py)"
//! keytype --dry-run "Hello, World!"
//! ```
//!
//! Settings come from `config.toml` in the platform config directory (see
//! [`keytype::infrastructure::storage::config`]); command-line flags and
//! their environment variables override the file.  Ctrl+C aborts a running
//! session at the next character.
//!
//! # Exit status
//!
//! Zero when every character was typed, non-zero otherwise.  The error
//! message lists every failure kind with its count.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use keytype::application::platform::PlatformInput;
use keytype::infrastructure::platform::{self, mock::MockPlatform};
use keytype::infrastructure::storage::config::{AppConfig, ConfigStore};
use keytype::Typist;
use keytype_core::{TypingOptions, UnmappedPolicy};

// ── CLI argument definitions ──────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name = "keytype",
    about = "Types text into the focused window by synthesizing key events",
    version
)]
struct Cli {
    /// Text to type.  Read from standard input when omitted.
    text: Option<String>,

    /// Config file to use instead of the platform default.
    #[arg(long, env = "KEYTYPE_CONFIG")]
    config: Option<PathBuf>,

    /// Pause between characters, in milliseconds.
    #[arg(long, env = "KEYTYPE_KEY_DELAY_MS")]
    key_delay_ms: Option<u64>,

    /// How long each key is held down, in milliseconds.
    #[arg(long, env = "KEYTYPE_KEY_PRESS_MS")]
    key_press_ms: Option<u64>,

    /// Pause after pressing modifiers, in milliseconds.
    #[arg(long, env = "KEYTYPE_MOD_PRESS_MS")]
    mod_press_ms: Option<u64>,

    /// Reject input longer than this many characters.
    #[arg(long, env = "KEYTYPE_MAX_CHARACTERS")]
    max_characters: Option<usize>,

    /// Give up after this many seconds.
    #[arg(long, env = "KEYTYPE_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Type spaces instead of tabs.
    #[arg(long)]
    tabs_to_spaces: bool,

    /// Spaces per tab with `--tabs-to-spaces`.
    #[arg(long, env = "KEYTYPE_TAB_SIZE")]
    tab_size: Option<usize>,

    /// Refuse the whole text if any character cannot be typed.
    #[arg(long)]
    strict: bool,

    /// Seconds to wait before typing, to focus the target window.
    #[arg(long, default_value_t = 0, env = "KEYTYPE_START_DELAY_SECS")]
    start_delay_secs: u64,

    /// Record key events instead of sending them.
    #[arg(long)]
    dry_run: bool,

    /// Write the effective settings to the config file and exit.
    #[arg(long)]
    write_config: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the configured options.
    fn apply_overrides(&self, options: &mut TypingOptions) {
        if let Some(ms) = self.key_delay_ms {
            options.key_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.key_press_ms {
            options.key_press_duration = Duration::from_millis(ms);
        }
        if let Some(ms) = self.mod_press_ms {
            options.mod_press_duration = Duration::from_millis(ms);
        }
        if let Some(max) = self.max_characters {
            options.max_characters = max;
        }
        if let Some(secs) = self.timeout_secs {
            options.timeout = Duration::from_secs(secs);
        }
        if self.tabs_to_spaces {
            options.tabs_to_spaces = true;
        }
        if let Some(size) = self.tab_size {
            options.tab_size = size;
        }
        if self.strict {
            options.on_unmapped_character = UnmappedPolicy::Abort;
        }
    }

    fn config_store(&self) -> anyhow::Result<ConfigStore> {
        match &self.config {
            Some(path) => Ok(ConfigStore::at(path)),
            None => ConfigStore::default_location().context("locating config file"),
        }
    }
}

/// Drops one trailing line ending, which shells and editors add to piped text.
fn strip_trailing_newline(mut text: String) -> String {
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    text
}

fn read_text(cli_text: Option<String>) -> anyhow::Result<String> {
    match cli_text {
        Some(text) => Ok(text),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("reading text from standard input")?;
            Ok(strip_trailing_newline(text))
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let store = cli.config_store()?;
    let mut app_config: AppConfig = store
        .load()
        .with_context(|| format!("loading config from {}", store.path().display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&app_config.general.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    cli.apply_overrides(&mut app_config.typing);

    if cli.write_config {
        store
            .save(&app_config)
            .with_context(|| format!("writing config to {}", store.path().display()))?;
        info!(path = %store.path().display(), "config written");
        return Ok(());
    }

    let text = read_text(cli.text.clone())?;
    if text.is_empty() {
        warn!("nothing to type");
        return Ok(());
    }

    let recorder = cli.dry_run.then(|| Arc::new(MockPlatform::new()));
    let platform: Arc<dyn PlatformInput> = match &recorder {
        Some(mock) => Arc::clone(mock) as Arc<dyn PlatformInput>,
        None => platform::native().context("opening keyboard backend")?,
    };
    let typist = Typist::new(platform);

    for remaining in (1..=cli.start_delay_secs).rev() {
        info!("typing in {remaining}s");
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    tokio::spawn(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, aborting");
                keytype::request_abort();
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    let result = typist.type_string(&text, &app_config.typing).await;

    if let Some(mock) = recorder {
        info!(events = mock.events().len(), "dry run recorded key events");
    }
    result.context("typing failed")?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        // Arrange: parse with no arguments (all defaults apply)
        let cli = Cli::parse_from(["keytype"]);

        // Assert
        assert!(cli.text.is_none());
        assert_eq!(cli.start_delay_secs, 0);
        assert!(!cli.dry_run);
        assert!(!cli.strict);
    }

    #[test]
    fn test_cli_without_flags_keeps_configured_options() {
        let cli = Cli::parse_from(["keytype", "hello"]);
        let mut options = TypingOptions::default();

        cli.apply_overrides(&mut options);

        assert_eq!(options, TypingOptions::default());
        assert_eq!(cli.text.as_deref(), Some("hello"));
    }

    #[test]
    fn test_cli_overrides_apply_to_options() {
        // Arrange
        let cli = Cli::parse_from([
            "keytype",
            "--key-delay-ms",
            "15",
            "--key-press-ms",
            "7",
            "--mod-press-ms",
            "3",
            "--max-characters",
            "100",
            "--timeout-secs",
            "9",
            "--tabs-to-spaces",
            "--tab-size",
            "2",
            "--strict",
            "text",
        ]);
        let mut options = TypingOptions::default();

        // Act
        cli.apply_overrides(&mut options);

        // Assert
        assert_eq!(options.key_delay, Duration::from_millis(15));
        assert_eq!(options.key_press_duration, Duration::from_millis(7));
        assert_eq!(options.mod_press_duration, Duration::from_millis(3));
        assert_eq!(options.max_characters, 100);
        assert_eq!(options.timeout, Duration::from_secs(9));
        assert!(options.tabs_to_spaces);
        assert_eq!(options.tab_size, 2);
        assert_eq!(options.on_unmapped_character, UnmappedPolicy::Abort);
    }

    #[test]
    fn test_cli_config_path_override() {
        let cli = Cli::parse_from(["keytype", "--config", "/tmp/kt.toml"]);
        let store = cli.config_store().unwrap();
        assert_eq!(store.path(), std::path::Path::new("/tmp/kt.toml"));
    }

    #[test]
    fn test_strip_trailing_newline_removes_one_line_ending() {
        assert_eq!(strip_trailing_newline("abc\n".to_string()), "abc");
        assert_eq!(strip_trailing_newline("abc\r\n".to_string()), "abc");
        assert_eq!(strip_trailing_newline("abc\n\n".to_string()), "abc\n");
        assert_eq!(strip_trailing_newline("abc".to_string()), "abc");
    }

    #[test]
    fn test_read_text_prefers_argument() {
        let text = read_text(Some("typed".to_string())).unwrap();
        assert_eq!(text, "typed");
    }
}
