use anyhow::Result;

use crate::platform::DataPaths;
use crate::store::{JsonLockedAppStore, LockedAppStore};

/// Add a package to the locked set
pub fn lock(paths: &DataPaths, package: &str) -> Result<()> {
    let store = JsonLockedAppStore::new(&paths.locked_apps);

    if store.add(package)? {
        println!("✓ Locked {}", package.trim());
    } else {
        println!("{} is already locked", package.trim());
    }

    Ok(())
}

/// Remove a package from the locked set
pub fn unlock(paths: &DataPaths, package: &str) -> Result<()> {
    let store = JsonLockedAppStore::new(&paths.locked_apps);

    if store.remove(package)? {
        println!("✓ Unlocked {}", package.trim());
    } else {
        println!("{} was not locked", package.trim());
    }

    Ok(())
}

/// Print every locked package
pub fn list(paths: &DataPaths) -> Result<()> {
    let store = JsonLockedAppStore::new(&paths.locked_apps);
    let packages = store.get_all()?;

    if packages.is_empty() {
        println!("No locked apps");
        println!("\nLock one with: stroop-locker lock <package>");
        return Ok(());
    }

    println!("Locked apps ({}):", packages.len());
    for package in packages {
        println!("  {}", package);
    }

    Ok(())
}
