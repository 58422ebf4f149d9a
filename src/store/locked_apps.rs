use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

use crate::lock::lock_state;
use crate::platform::{atomic_write, read_if_exists};

/// Current locked-apps file version
const LOCKED_APPS_VERSION: &str = "1.0";

/// Persistent set of package names that require a challenge
pub trait LockedAppStore: Send + Sync {
    /// Lock a package; returns false if it was already locked
    fn add(&self, package: &str) -> Result<bool>;

    /// Unlock a package; returns false if it was not locked
    fn remove(&self, package: &str) -> Result<bool>;

    fn get_all(&self) -> Result<BTreeSet<String>>;

    fn is_locked(&self, package: &str) -> Result<bool> {
        Ok(self.get_all()?.contains(package))
    }
}

fn validate_package(package: &str) -> Result<&str> {
    let package = package.trim();
    if package.is_empty() {
        anyhow::bail!("Package name cannot be empty");
    }
    if package.chars().any(char::is_whitespace) {
        anyhow::bail!("Package name cannot contain whitespace: '{}'", package);
    }
    Ok(package)
}

/// Locked apps kept in memory only
#[derive(Debug, Default)]
pub struct MemoryLockedAppStore {
    packages: Mutex<BTreeSet<String>>,
}

impl MemoryLockedAppStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_packages<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            packages: Mutex::new(packages.into_iter().map(Into::into).collect()),
        }
    }
}

impl LockedAppStore for MemoryLockedAppStore {
    fn add(&self, package: &str) -> Result<bool> {
        let package = validate_package(package)?;
        Ok(lock_state(&self.packages).insert(package.to_string()))
    }

    fn remove(&self, package: &str) -> Result<bool> {
        Ok(lock_state(&self.packages).remove(package.trim()))
    }

    fn get_all(&self) -> Result<BTreeSet<String>> {
        Ok(lock_state(&self.packages).clone())
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct LockedAppsFile {
    version: String,
    packages: BTreeSet<String>,
}

/// Locked apps persisted as a JSON file
///
/// Every operation reads the file and every change rewrites it atomically.
/// A process-local mutex serializes read-modify-write cycles.
#[derive(Debug)]
pub struct JsonLockedAppStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLockedAppStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeSet<String>> {
        let Some(content) = read_if_exists(&self.path)? else {
            return Ok(BTreeSet::new());
        };

        let file: LockedAppsFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse locked apps file: {}", self.path.display()))?;

        if file.version != LOCKED_APPS_VERSION {
            anyhow::bail!(
                "Locked apps file version mismatch (expected {}, got {}): {}",
                LOCKED_APPS_VERSION,
                file.version,
                self.path.display()
            );
        }

        Ok(file.packages)
    }

    fn save(&self, packages: BTreeSet<String>) -> Result<()> {
        let file = LockedAppsFile {
            version: LOCKED_APPS_VERSION.to_string(),
            packages,
        };

        let content = serde_json::to_string_pretty(&file)
            .context("Failed to serialize locked apps")?;

        atomic_write(&self.path, content.as_bytes())
            .with_context(|| format!("Failed to write locked apps file: {}", self.path.display()))
    }
}

impl LockedAppStore for JsonLockedAppStore {
    fn add(&self, package: &str) -> Result<bool> {
        let package = validate_package(package)?;
        let _guard = lock_state(&self.write_lock);

        let mut packages = self.load()?;
        if !packages.insert(package.to_string()) {
            debug!("{} is already locked", package);
            return Ok(false);
        }

        self.save(packages)?;
        info!("Locked {}", package);
        Ok(true)
    }

    fn remove(&self, package: &str) -> Result<bool> {
        let package = package.trim();
        let _guard = lock_state(&self.write_lock);

        let mut packages = self.load()?;
        if !packages.remove(package) {
            debug!("{} was not locked", package);
            return Ok(false);
        }

        self.save(packages)?;
        info!("Unlocked {}", package);
        Ok(true)
    }

    fn get_all(&self) -> Result<BTreeSet<String>> {
        self.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_store_enforces_uniqueness() {
        let store = MemoryLockedAppStore::new();

        assert!(store.add("com.instagram.android").unwrap());
        assert!(!store.add("com.instagram.android").unwrap());
        assert_eq!(store.get_all().unwrap().len(), 1);
    }

    #[test]
    fn test_memory_store_remove() {
        let store = MemoryLockedAppStore::with_packages(["com.a", "com.b"]);

        assert!(store.remove("com.a").unwrap());
        assert!(!store.remove("com.a").unwrap());
        assert!(!store.is_locked("com.a").unwrap());
        assert!(store.is_locked("com.b").unwrap());
    }

    #[test]
    fn test_rejects_blank_package() {
        let store = MemoryLockedAppStore::new();
        assert!(store.add("   ").is_err());
        assert!(store.add("com.bad name").is_err());
    }

    #[test]
    fn test_json_store_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = JsonLockedAppStore::new(dir.path().join("locked-apps.json"));

        assert!(store.get_all().unwrap().is_empty());
        assert!(!store.remove("com.a").unwrap());
    }

    #[test]
    fn test_json_store_persists_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locked-apps.json");

        let store = JsonLockedAppStore::new(&path);
        assert!(store.add("com.instagram.android").unwrap());
        assert!(store.add(" com.facebook.katana ").unwrap());
        assert!(!store.add("com.instagram.android").unwrap());

        let reopened = JsonLockedAppStore::new(&path);
        let all: Vec<_> = reopened.get_all().unwrap().into_iter().collect();
        assert_eq!(all, vec!["com.facebook.katana", "com.instagram.android"]);

        assert!(reopened.remove("com.instagram.android").unwrap());
        assert!(!JsonLockedAppStore::new(&path).is_locked("com.instagram.android").unwrap());
    }

    #[test]
    fn test_json_store_rejects_wrong_version() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locked-apps.json");
        std::fs::write(&path, r#"{"version":"9.9","packages":[]}"#).unwrap();

        assert!(JsonLockedAppStore::new(&path).get_all().is_err());
    }

    #[test]
    fn test_json_store_rejects_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locked-apps.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(JsonLockedAppStore::new(&path).get_all().is_err());
    }
}
