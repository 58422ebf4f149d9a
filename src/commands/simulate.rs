use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::info;

use crate::commands::utils::{format_duration, render_challenge};
use crate::lock::{
    AppGuard, AttemptOutcome, ChallengeGenerator, ColorName, LockDecision, Palette, SessionConfig,
    SessionTracker, UnlockAttempt,
};
use crate::platform::DataPaths;
use crate::store::{load_settings, load_stats, save_stats, ChallengeStats, JsonLockedAppStore, LockedAppStore};

/// Generators for successive unlock attempts in a seeded run
///
/// Every attempt gets its own generator, so a run is reproducible without
/// each locked app showing the same puzzle.
pub fn seeded_generators(seed: u64) -> impl Iterator<Item = ChallengeGenerator> {
    let mut seeds = StdRng::seed_from_u64(seed);
    std::iter::repeat_with(move || ChallengeGenerator::seeded(Palette::default(), seeds.next_u64()))
}

/// Run a simulation reading from stdin and writing to stdout
pub async fn run_stdin(paths: &DataPaths, seed: Option<u64>, show_journal: bool) -> Result<()> {
    let input = BufReader::new(tokio::io::stdin());
    let mut output = tokio::io::stdout();

    run(paths, seed, show_journal, input, &mut output).await?;
    Ok(())
}

/// Drive the app guard from a stream of lines
///
/// While no challenge is shown, each line is the package that just came to
/// the foreground. While a challenge is shown, each line is an answer or
/// `skip`. `wait <seconds>` lets time pass in either state. Returns the
/// updated statistics, which are also saved.
pub async fn run<R, W>(
    paths: &DataPaths,
    seed: Option<u64>,
    show_journal: bool,
    input: R,
    output: &mut W,
) -> Result<ChallengeStats>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let settings = load_settings(&paths.settings)?;
    let store: Arc<dyn LockedAppStore> = Arc::new(JsonLockedAppStore::new(&paths.locked_apps));
    let tracker = SessionTracker::with_tokio(SessionConfig::from_settings(&settings))?;
    let guard = AppGuard::new(tracker, store, settings);
    guard.on_connected();

    let mut generators: Box<dyn Iterator<Item = ChallengeGenerator>> = match seed {
        Some(seed) => Box::new(seeded_generators(seed)),
        None => Box::new(std::iter::repeat_with(ChallengeGenerator::from_entropy)),
    };

    let mut stats = load_stats(&paths.stats)?;
    let mut attempt: Option<UnlockAttempt> = None;

    say(output, "Enter foreground package names, one per line (Ctrl-D to finish)").await?;

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(secs) = line.strip_prefix("wait ") {
            wait(output, secs).await?;
            continue;
        }

        attempt = match attempt.take() {
            Some(current) => answer(&guard, current, line, &mut stats, output).await?,
            None => foreground(&guard, line, generators.as_mut(), output).await?,
        };
    }

    if let Some(current) = attempt {
        guard.abandon_attempt(&current);
    }

    save_stats(&paths.stats, &stats)?;
    info!(
        "Simulation finished: {} successful, {} unsuccessful",
        stats.successful, stats.unsuccessful
    );

    if show_journal {
        say(output, "\nSession journal:").await?;
        for event in guard.tracker().recent_events() {
            say(output, &format!("  {}", event)).await?;
        }
    }

    Ok(stats)
}

async fn foreground<W>(
    guard: &AppGuard,
    package: &str,
    generators: &mut dyn Iterator<Item = ChallengeGenerator>,
    output: &mut W,
) -> Result<Option<UnlockAttempt>>
where
    W: AsyncWrite + Unpin,
{
    match guard.on_foreground_change(package) {
        LockDecision::Ignored => {
            say(output, &format!("{}: ignored", package)).await?;
            Ok(None)
        }
        LockDecision::Allowed => {
            say(output, &format!("{}: allowed", package)).await?;
            Ok(None)
        }
        LockDecision::Challenge(package) => {
            let generator = generators.next().unwrap_or_else(ChallengeGenerator::from_entropy);
            let attempt = guard.begin_attempt_with(&package, generator);

            say(output, &format!("{}: locked, name the ink color (or 'skip')", package)).await?;
            say(output, render_challenge(attempt.challenge()).trim_end()).await?;
            Ok(Some(attempt))
        }
    }
}

async fn answer<W>(
    guard: &AppGuard,
    mut attempt: UnlockAttempt,
    line: &str,
    stats: &mut ChallengeStats,
    output: &mut W,
) -> Result<Option<UnlockAttempt>>
where
    W: AsyncWrite + Unpin,
{
    if line.eq_ignore_ascii_case("skip") {
        guard.abandon_attempt(&attempt);
        say(output, &format!("Skipped challenge for {}", attempt.package())).await?;
        return Ok(None);
    }

    let color: ColorName = match line.parse() {
        Ok(color) => color,
        Err(e) => {
            say(output, &format!("{:#} (type a color name or 'skip')", e)).await?;
            return Ok(Some(attempt));
        }
    };

    match attempt.submit(color) {
        AttemptOutcome::Next { remaining } => {
            stats.record_success();
            say(output, &format!("✓ Correct, {} more to go", remaining)).await?;
            say(output, render_challenge(attempt.challenge()).trim_end()).await?;
            Ok(Some(attempt))
        }
        AttemptOutcome::Unlocked => {
            stats.record_success();
            if guard.finish_attempt(&attempt) {
                let message = match guard.tracker().config().session_timeout {
                    Some(session) => format!("✓ Unlocked {} for {}", attempt.package(), format_duration(session)),
                    None => format!("✓ Unlocked {} until you leave it", attempt.package()),
                };
                say(output, &message).await?;
            } else {
                say(output, &format!("Challenge for {} is no longer active", attempt.package())).await?;
            }
            Ok(None)
        }
        AttemptOutcome::Wrong(feedback) => {
            stats.record_failure();
            let mut effects = vec!["shake"];
            if feedback.vibrate {
                effects.push("vibrate");
            }
            if feedback.sound {
                effects.push("sound");
            }
            say(output, &format!("✗ Wrong, try again [{}]", effects.join(", "))).await?;
            say(output, render_challenge(attempt.challenge()).trim_end()).await?;
            Ok(Some(attempt))
        }
    }
}

async fn wait<W>(output: &mut W, secs: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let delay = secs
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok());

    match delay {
        Some(delay) => {
            tokio::time::sleep(delay).await;
            say(output, &format!("(waited {})", format_duration(delay))).await
        }
        None => say(output, &format!("Invalid wait time: {}", secs.trim())).await,
    }
}

async fn say<W>(output: &mut W, text: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    output.write_all(text.as_bytes()).await.context("Failed to write output")?;
    output.write_all(b"\n").await.context("Failed to write output")?;
    output.flush().await.context("Failed to flush output")?;
    Ok(())
}
