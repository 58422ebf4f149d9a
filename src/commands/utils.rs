use std::time::Duration;

use crate::lock::{ChallengeOption, StroopChallenge};

/// Initialize logging
pub fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
}

/// Format duration for display
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs == 0 {
        format!("{}ms", duration.as_millis())
    } else if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else {
        format!("{}h", secs / 3600)
    }
}

/// Format a seconds setting where 0 means the built-in default
pub fn format_seconds_setting(secs: u64, default: Duration) -> String {
    if secs == 0 {
        format!("default ({})", format_duration(default))
    } else {
        format_duration(Duration::from_secs(secs))
    }
}

/// Format the session duration setting, where 0 means until the app is left
pub fn format_session_duration(secs: u64) -> String {
    if secs == 0 {
        "until the app is left".to_string()
    } else {
        format_duration(Duration::from_secs(secs))
    }
}

fn format_option(option: &ChallengeOption) -> String {
    format!("{} [{}]", option.label, option.display_color)
}

/// Render a challenge as plain text, options three to a row
pub fn render_challenge(challenge: &StroopChallenge) -> String {
    let mut out = format!(
        "Word: {} (ink: {})\n",
        challenge.word.name().to_uppercase(),
        challenge.ink_color.hex()
    );

    for row in challenge.options.chunks(3) {
        let cells: Vec<String> = row.iter().map(|o| format!("{:<20}", format_option(o))).collect();
        out.push_str("  ");
        out.push_str(cells.join(" ").trim_end());
        out.push('\n');
    }

    out
}
