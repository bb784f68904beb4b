//! Typing options.
//!
//! Durations are stored as [`Duration`] in memory and written as whole
//! milliseconds in TOML:
//!
//! ```toml
//! [typing]
//! key_delay_ms = 2
//! key_press_duration_ms = 2
//! mod_press_duration_ms = 2
//! max_characters = 5000
//! timeout_ms = 30000
//! tabs_to_spaces = false
//! tab_size = 4
//! on_unmapped_character = "skip"
//! ```
//!
//! Every field is optional; missing fields take the defaults listed above.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What to do with a character the active layout cannot produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmappedPolicy {
    /// Record a recoverable failure and keep typing the rest of the text.
    #[default]
    Skip,
    /// Refuse the whole string before any key is pressed.
    Abort,
}

/// Snapshot of the knobs a typing session runs with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingOptions {
    /// Pause between the last release of one character and the first press
    /// of the next.
    #[serde(rename = "key_delay_ms", with = "millis", default = "default_key_delay")]
    pub key_delay: Duration,

    /// How long the main key is held down.
    #[serde(
        rename = "key_press_duration_ms",
        with = "millis",
        default = "default_key_press_duration"
    )]
    pub key_press_duration: Duration,

    /// Pause after pressing modifiers, before the main key.
    #[serde(
        rename = "mod_press_duration_ms",
        with = "millis",
        default = "default_mod_press_duration"
    )]
    pub mod_press_duration: Duration,

    /// Longest accepted input, counted in Unicode scalar values.
    #[serde(default = "default_max_characters")]
    pub max_characters: usize,

    /// Wall-clock budget for one `type_string` call.
    #[serde(rename = "timeout_ms", with = "millis", default = "default_timeout")]
    pub timeout: Duration,

    /// Type `tab_size` spaces instead of a tab key.
    #[serde(default)]
    pub tabs_to_spaces: bool,

    #[serde(default = "default_tab_size")]
    pub tab_size: usize,

    #[serde(default)]
    pub on_unmapped_character: UnmappedPolicy,
}

fn default_key_delay() -> Duration {
    Duration::from_millis(2)
}
fn default_key_press_duration() -> Duration {
    Duration::from_millis(2)
}
fn default_mod_press_duration() -> Duration {
    Duration::from_millis(2)
}
fn default_max_characters() -> usize {
    5000
}
fn default_timeout() -> Duration {
    Duration::from_secs(30)
}
fn default_tab_size() -> usize {
    4
}

impl Default for TypingOptions {
    fn default() -> Self {
        Self {
            key_delay: default_key_delay(),
            key_press_duration: default_key_press_duration(),
            mod_press_duration: default_mod_press_duration(),
            max_characters: default_max_characters(),
            timeout: default_timeout(),
            tabs_to_spaces: false,
            tab_size: default_tab_size(),
            on_unmapped_character: UnmappedPolicy::Skip,
        }
    }
}

impl TypingOptions {
    /// Options with every delay set to zero, for tests and dry runs.
    pub fn instant() -> Self {
        Self {
            key_delay: Duration::ZERO,
            key_press_duration: Duration::ZERO,
            mod_press_duration: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Number of space taps one tab expands to, or `None` when tabs are
    /// typed as tab keys.
    pub fn tab_expansion(&self) -> Option<usize> {
        self.tabs_to_spaces.then_some(self.tab_size)
    }
}

/// `Duration` ⇄ integer milliseconds.
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let ms = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(ms)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = TypingOptions::default();
        assert_eq!(options.key_delay, Duration::from_millis(2));
        assert_eq!(options.key_press_duration, Duration::from_millis(2));
        assert_eq!(options.mod_press_duration, Duration::from_millis(2));
        assert_eq!(options.max_characters, 5000);
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert!(!options.tabs_to_spaces);
        assert_eq!(options.tab_size, 4);
        assert_eq!(options.on_unmapped_character, UnmappedPolicy::Skip);
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let options: TypingOptions = toml::from_str("").unwrap();
        assert_eq!(options, TypingOptions::default());
    }

    #[test]
    fn test_partial_toml_overrides_only_given_fields() {
        // Arrange
        let text = r#"
key_delay_ms = 15
timeout_ms = 500
tabs_to_spaces = true
on_unmapped_character = "abort"
"#;

        // Act
        let options: TypingOptions = toml::from_str(text).unwrap();

        // Assert
        assert_eq!(options.key_delay, Duration::from_millis(15));
        assert_eq!(options.timeout, Duration::from_millis(500));
        assert!(options.tabs_to_spaces);
        assert_eq!(options.on_unmapped_character, UnmappedPolicy::Abort);
        assert_eq!(options.tab_size, 4);
        assert_eq!(options.key_press_duration, Duration::from_millis(2));
    }

    #[test]
    fn test_serialized_durations_are_milliseconds() {
        let text = toml::to_string(&TypingOptions::default()).unwrap();
        assert!(text.contains("timeout_ms = 30000"), "{text}");
        assert!(text.contains("on_unmapped_character = \"skip\""), "{text}");
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let result: Result<TypingOptions, _> = toml::from_str("on_unmapped_character = \"ignore\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_tab_expansion() {
        let mut options = TypingOptions::default();
        assert_eq!(options.tab_expansion(), None);
        options.tabs_to_spaces = true;
        options.tab_size = 8;
        assert_eq!(options.tab_expansion(), Some(8));
    }

    #[test]
    fn test_instant_keeps_limits() {
        let options = TypingOptions::instant();
        assert_eq!(options.key_delay, Duration::ZERO);
        assert_eq!(options.max_characters, 5000);
        assert_eq!(options.timeout, Duration::from_secs(30));
    }
}
