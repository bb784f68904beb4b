//! `config.toml`: logging level and default typing options.
//!
//! [`ConfigStore::default_location`] resolves the file per OS:
//! - Windows:  `%APPDATA%\keytype\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/keytype/config.toml`, else `~/.config/keytype/`
//! - macOS:    `~/Library/Application Support/keytype/config.toml`
//!
//! ```toml
//! [general]
//! log_level = "keytype=debug"
//!
//! [typing]
//! key_delay_ms = 10
//! tabs_to_spaces = true
//! tab_size = 2
//! ```
//!
//! Sections and fields may be left out.  A store whose file does not exist
//! loads as `AppConfig::default()`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use keytype_core::TypingOptions;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const APP_DIR: &str = "keytype";
const FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no config directory: none of APPDATA, XDG_CONFIG_HOME or HOME is set")]
    NoConfigDir,

    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot encode config: {0}")]
    Encode(#[from] toml::ser::Error),
}

// ── Schema ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    /// Options every typing call starts from; CLI flags override them.
    #[serde(default)]
    pub typing: TypingOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "GeneralConfig::default_log_level")]
    pub log_level: String,
}

impl GeneralConfig {
    fn default_log_level() -> String {
        String::from("info")
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

// ── Store ─────────────────────────────────────────────────────────────────────

/// One config file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The per-user file for this OS.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NoConfigDir`] when the environment names no base
    /// directory.
    pub fn default_location() -> Result<Self, ConfigError> {
        config_dir(|name| std::env::var_os(name))
            .map(|dir| Self::at(dir.join(FILE_NAME)))
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the file; a missing file gives the defaults.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Read`] for I/O failures other than "not found" and
    /// [`ConfigError::Parse`] for malformed TOML.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no config file, using defaults");
                return Ok(AppConfig::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Writes `config`, creating missing parent directories.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Write`] for I/O failures, [`ConfigError::Encode`] if the
    /// config cannot be rendered as TOML.
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(config)?;
        let write_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| ConfigError::Write { path, source }
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err(parent))?;
        }
        std::fs::write(&self.path, text).map_err(write_err(&self.path))
    }
}

/// `<base>/keytype` for this OS, reading environment variables through `var`.
fn config_dir(var: impl Fn(&str) -> Option<OsString>) -> Option<PathBuf> {
    let base = if cfg!(target_os = "windows") {
        PathBuf::from(var("APPDATA")?)
    } else if cfg!(target_os = "macos") {
        PathBuf::from(var("HOME")?)
            .join("Library")
            .join("Application Support")
    } else {
        match var("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
            Some(xdg) => PathBuf::from(xdg),
            None => PathBuf::from(var("HOME")?).join(".config"),
        }
    };
    Some(base.join(APP_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use keytype_core::UnmappedPolicy;

    fn scratch(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("keytype-config-{tag}-{}", std::process::id()))
    }

    fn env<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<OsString> + 'a {
        move |name| {
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| OsString::from(value))
        }
    }

    #[test]
    fn test_empty_document_is_default_config() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.general.log_level, "info");
    }

    #[test]
    fn test_typing_section_overrides_only_given_fields() {
        // Arrange
        let doc = r#"
[general]
log_level = "keytype=trace"

[typing]
key_delay_ms = 25
tabs_to_spaces = true
tab_size = 2
on_unmapped_character = "abort"
"#;

        // Act
        let cfg: AppConfig = toml::from_str(doc).unwrap();

        // Assert
        assert_eq!(cfg.general.log_level, "keytype=trace");
        assert_eq!(cfg.typing.key_delay, Duration::from_millis(25));
        assert!(cfg.typing.tabs_to_spaces);
        assert_eq!(cfg.typing.tab_size, 2);
        assert_eq!(cfg.typing.on_unmapped_character, UnmappedPolicy::Abort);
        assert_eq!(cfg.typing.max_characters, TypingOptions::default().max_characters);
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let store = ConfigStore::at(scratch("missing").join("config.toml"));
        assert_eq!(store.load().unwrap(), AppConfig::default());
    }

    #[test]
    fn test_malformed_file_reports_its_path() {
        // Arrange
        let dir = scratch("malformed");
        std::fs::create_dir_all(&dir).unwrap();
        let store = ConfigStore::at(dir.join("config.toml"));
        std::fs::write(store.path(), "[typing\nkey_delay_ms = ").unwrap();

        // Act
        let err = store.load().unwrap_err();

        // Assert
        assert!(matches!(&err, ConfigError::Parse { path, .. } if path == store.path()));
        assert!(err.to_string().contains("config.toml"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_creates_directories_and_loads_back() {
        // Arrange
        let dir = scratch("save");
        let store = ConfigStore::at(dir.join("a").join("b").join("config.toml"));
        let mut cfg = AppConfig::default();
        cfg.typing.timeout = Duration::from_secs(5);
        cfg.typing.on_unmapped_character = UnmappedPolicy::Abort;

        // Act
        store.save(&cfg).unwrap();

        // Assert
        assert_eq!(store.load().unwrap(), cfg);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_config_dir_prefers_xdg_then_home() {
        let xdg = env(&[("XDG_CONFIG_HOME", "/xdg"), ("HOME", "/home/u")]);
        assert_eq!(config_dir(xdg), Some(PathBuf::from("/xdg/keytype")));

        let home = env(&[("XDG_CONFIG_HOME", ""), ("HOME", "/home/u")]);
        assert_eq!(config_dir(home), Some(PathBuf::from("/home/u/.config/keytype")));

        assert_eq!(config_dir(env(&[])), None);
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn test_config_dir_under_application_support() {
        let home = env(&[("HOME", "/Users/u")]);
        assert_eq!(
            config_dir(home),
            Some(PathBuf::from("/Users/u/Library/Application Support/keytype"))
        );
    }

    #[cfg(target_os = "windows")]
    #[test]
    fn test_config_dir_under_appdata() {
        let appdata = env(&[("APPDATA", r"C:\Users\u\AppData\Roaming")]);
        assert_eq!(
            config_dir(appdata),
            Some(PathBuf::from(r"C:\Users\u\AppData\Roaming\keytype"))
        );
    }
}
