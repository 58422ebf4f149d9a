use anyhow::Result;

use crate::platform::DataPaths;
use crate::store::{load_stats, save_stats, ChallengeStats};

/// Print challenge statistics, optionally resetting them first
pub fn show(paths: &DataPaths, reset: bool) -> Result<()> {
    if reset {
        save_stats(&paths.stats, &ChallengeStats::default())?;
        println!("✓ Statistics reset");
        return Ok(());
    }

    let stats = load_stats(&paths.stats)?;

    println!("Challenge statistics:");
    println!("  Successful:   {}", stats.successful);
    println!("  Unsuccessful: {}", stats.unsuccessful);
    match stats.success_rate() {
        Some(rate) => println!("  Success rate: {:.1}%", rate * 100.0),
        None => println!("  Success rate: n/a"),
    }

    Ok(())
}
