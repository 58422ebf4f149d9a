use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::platform::{atomic_write, read_if_exists};

/// Running totals of answered challenges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChallengeStats {
    #[serde(default)]
    pub successful: u64,
    #[serde(default)]
    pub unsuccessful: u64,
}

impl ChallengeStats {
    pub fn record_success(&mut self) {
        self.successful = self.successful.saturating_add(1);
    }

    pub fn record_failure(&mut self) {
        self.unsuccessful = self.unsuccessful.saturating_add(1);
    }

    pub fn total(&self) -> u64 {
        self.successful.saturating_add(self.unsuccessful)
    }

    /// Share of correct answers, or `None` before the first answer
    pub fn success_rate(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(self.successful as f64 / total as f64),
        }
    }
}

/// Load stats from a JSON file; a missing file yields zeroes
pub fn load_stats(path: &Path) -> Result<ChallengeStats> {
    let Some(content) = read_if_exists(path)? else {
        return Ok(ChallengeStats::default());
    };

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse stats file: {}", path.display()))
}

/// Save stats to a JSON file
pub fn save_stats(path: &Path, stats: &ChallengeStats) -> Result<()> {
    let content = serde_json::to_string_pretty(stats)
        .context("Failed to serialize stats")?;

    atomic_write(path, content.as_bytes())
        .with_context(|| format!("Failed to write stats file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_recording() {
        let mut stats = ChallengeStats::default();
        assert_eq!(stats.success_rate(), None);

        stats.record_success();
        stats.record_success();
        stats.record_success();
        stats.record_failure();

        assert_eq!(stats.total(), 4);
        assert_eq!(stats.success_rate(), Some(0.75));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stats.json");

        assert_eq!(load_stats(&path).unwrap(), ChallengeStats::default());

        let stats = ChallengeStats {
            successful: 12,
            unsuccessful: 3,
        };
        save_stats(&path, &stats).unwrap();

        assert_eq!(load_stats(&path).unwrap(), stats);
    }
}
