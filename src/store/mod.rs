/// Persistence collaborators of the lock core
///
/// A set of locked package names, a flat settings file and a pair of
/// counters.

pub mod locked_apps;
pub mod settings;
pub mod stats;

pub use locked_apps::{JsonLockedAppStore, LockedAppStore, MemoryLockedAppStore};
pub use settings::{load_settings, save_settings, validate_settings, Settings, Theme, SETTING_KEYS};
pub use stats::{load_stats, save_stats, ChallengeStats};
