//! Filesystem plumbing shared by the file-backed stores

pub mod common;

pub use common::{atomic_write, ensure_directory_exists, read_if_exists};

use anyhow::Result;
use std::path::{Path, PathBuf};

/// File name of the settings store inside the data directory
pub const SETTINGS_FILE: &str = "settings.toml";

/// File name of the locked-app store inside the data directory
pub const LOCKED_APPS_FILE: &str = "locked-apps.json";

/// File name of the challenge statistics inside the data directory
pub const STATS_FILE: &str = "stats.json";

/// Resolve the directory that holds all persisted locker data
///
/// An explicit override wins; otherwise the per-user data directory for the
/// application is used.
pub fn data_dir(override_dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = override_dir {
        return Ok(dir.to_path_buf());
    }

    match directories::ProjectDirs::from("com", "example", "stroop-locker") {
        Some(dirs) => Ok(dirs.data_local_dir().to_path_buf()),
        None => anyhow::bail!("Could not determine data directory location"),
    }
}

/// Paths of every store file under one data directory
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub settings: PathBuf,
    pub locked_apps: PathBuf,
    pub stats: PathBuf,
}

impl DataPaths {
    pub fn resolve(override_dir: Option<&Path>) -> Result<Self> {
        let dir = data_dir(override_dir)?;
        Ok(Self::under(&dir))
    }

    pub fn under(dir: &Path) -> Self {
        Self {
            settings: dir.join(SETTINGS_FILE),
            locked_apps: dir.join(LOCKED_APPS_FILE),
            stats: dir.join(STATS_FILE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_dir_is_used_verbatim() {
        let dir = data_dir(Some(Path::new("/tmp/stroop"))).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/stroop"));
    }

    #[test]
    fn test_paths_under_dir() {
        let paths = DataPaths::under(Path::new("/data"));
        assert_eq!(paths.settings, PathBuf::from("/data/settings.toml"));
        assert_eq!(paths.locked_apps, PathBuf::from("/data/locked-apps.json"));
        assert_eq!(paths.stats, PathBuf::from("/data/stats.json"));
    }
}
