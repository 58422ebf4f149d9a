use anyhow::Result;

use crate::commands::utils::{format_seconds_setting, format_session_duration};
use crate::lock::session::DEFAULT_CHALLENGE_TIMEOUT;
use crate::platform::DataPaths;
use crate::store::{load_settings, save_settings};

/// Print the current settings
pub fn show(paths: &DataPaths) -> Result<()> {
    let settings = load_settings(&paths.settings)?;

    println!("Settings ({}):", paths.settings.display());
    for (key, value) in settings.entries() {
        let value = match key {
            "challenge_timeout" => format_seconds_setting(settings.challenge_timeout, DEFAULT_CHALLENGE_TIMEOUT),
            "session_duration" => format_session_duration(settings.session_duration),
            _ => value,
        };
        println!("  {:<20} {}", key, value);
    }

    Ok(())
}

/// Change one setting and save it
pub fn set(paths: &DataPaths, key: &str, value: &str) -> Result<()> {
    let mut settings = load_settings(&paths.settings)?;
    settings.set(key, value)?;
    save_settings(&paths.settings, &settings)?;

    println!("✓ {} = {}", key, value.trim());

    Ok(())
}
