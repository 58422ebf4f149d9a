use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::platform::{atomic_write, read_if_exists};

/// User-facing locker settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    /// Seconds a challenge may stay unanswered (0 = built-in default)
    #[serde(default)]
    pub challenge_timeout: u64,

    /// Seconds a solved challenge keeps the app unlocked (0 = until the app is left)
    #[serde(default)]
    pub session_duration: u64,

    /// Play a sound on a wrong answer
    #[serde(default)]
    pub sound_enabled: bool,

    /// Vibrate on a wrong answer
    #[serde(default)]
    pub vibration_enabled: bool,

    /// Correct answers in a row needed to unlock an app
    #[serde(default = "default_challenges_required")]
    pub challenges_required: u32,

    #[serde(default)]
    pub theme: Theme,

    /// Turns all locking off without forgetting the locked apps
    #[serde(default)]
    pub master_disable: bool,
}

fn default_challenges_required() -> u32 {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            challenge_timeout: 0,
            session_duration: 0,
            sound_enabled: false,
            vibration_enabled: false,
            challenges_required: default_challenges_required(),
            theme: Theme::default(),
            master_disable: false,
        }
    }
}

/// Names accepted by [`Settings::set`]
pub const SETTING_KEYS: [&str; 7] = [
    "challenge_timeout",
    "session_duration",
    "sound_enabled",
    "vibration_enabled",
    "challenges_required",
    "theme",
    "master_disable",
];

impl Settings {
    /// Update one setting by name from its string form
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "challenge_timeout" => self.challenge_timeout = parse_value(key, value)?,
            "session_duration" => self.session_duration = parse_value(key, value)?,
            "sound_enabled" => self.sound_enabled = parse_value(key, value)?,
            "vibration_enabled" => self.vibration_enabled = parse_value(key, value)?,
            "challenges_required" => {
                let required: u32 = parse_value(key, value)?;
                if required < 1 {
                    anyhow::bail!("challenges_required must be at least 1");
                }
                self.challenges_required = required;
            }
            "theme" => self.theme = value.parse()?,
            "master_disable" => self.master_disable = parse_value(key, value)?,
            _ => anyhow::bail!(
                "Unknown setting '{}'. Valid settings: {}",
                key,
                SETTING_KEYS.join(", ")
            ),
        }
        Ok(())
    }

    /// Every setting as a name/value pair, in display order
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("challenge_timeout", self.challenge_timeout.to_string()),
            ("session_duration", self.session_duration.to_string()),
            ("sound_enabled", self.sound_enabled.to_string()),
            ("vibration_enabled", self.vibration_enabled.to_string()),
            ("challenges_required", self.challenges_required.to_string()),
            ("theme", self.theme.to_string()),
            ("master_disable", self.master_disable.to_string()),
        ]
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("Invalid value '{}' for {}", value, key))
}

/// App theme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Theme::System => "system",
            Theme::Light => "light",
            Theme::Dark => "dark",
        };
        f.write_str(name)
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "system" => Ok(Theme::System),
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => anyhow::bail!("theme must be one of: system, light, dark (got '{}')", s),
        }
    }
}

/// Validate settings before they are used or written
pub fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.challenges_required < 1 {
        anyhow::bail!(
            "challenges_required must be at least 1, got {}",
            settings.challenges_required
        );
    }

    Ok(())
}

/// Load settings from a TOML file; a missing file yields the defaults
pub fn load_settings(path: &Path) -> Result<Settings> {
    let Some(content) = read_if_exists(path)? else {
        return Ok(Settings::default());
    };

    let settings: Settings = toml::from_str(&content)
        .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;

    validate_settings(&settings)
        .with_context(|| format!("Invalid settings file: {}", path.display()))?;

    Ok(settings)
}

/// Save settings to a TOML file
pub fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    validate_settings(settings)?;

    let content = toml::to_string_pretty(settings)
        .context("Failed to serialize settings to TOML")?;

    atomic_write(path, content.as_bytes())
        .with_context(|| format!("Failed to write settings file: {}", path.display()))?;

    Ok(())
}
