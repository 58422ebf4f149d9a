use rand::Rng;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

use super::attempt::UnlockAttempt;
use super::challenge::ChallengeGenerator;
use super::lock_state;
use super::session::SessionTracker;
use crate::store::{LockedAppStore, Settings};

/// Package name the locker itself runs under
pub const DEFAULT_OWN_PACKAGE: &str = "com.example.strooplocker";

/// What to do about an app that just came to the foreground
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockDecision {
    /// Nothing to do
    Ignored,
    /// Let the app through
    Allowed,
    /// Show a challenge for this package
    Challenge(String),
}

/// Launchers count as the home screen
pub fn is_home_screen(package: &str) -> bool {
    package.contains("launcher") || package.contains("home")
}

/// Turns foreground changes into lock decisions
pub struct AppGuard {
    tracker: SessionTracker,
    store: Arc<dyn LockedAppStore>,
    settings: Settings,
    own_package: String,
    foreground: Mutex<Option<String>>,
}

impl AppGuard {
    pub fn new(tracker: SessionTracker, store: Arc<dyn LockedAppStore>, settings: Settings) -> Self {
        Self {
            tracker,
            store,
            settings,
            own_package: DEFAULT_OWN_PACKAGE.to_string(),
            foreground: Mutex::new(None),
        }
    }

    pub fn with_own_package(mut self, package: impl Into<String>) -> Self {
        self.own_package = package.into();
        self
    }

    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn foreground(&self) -> Option<String> {
        lock_state(&self.foreground).clone()
    }

    /// Start from a clean slate, as when the guard is first connected
    pub fn on_connected(&self) {
        info!("App guard connected");
        lock_state(&self.foreground).take();
        self.tracker.end_all_sessions();
    }

    /// Drop any in-progress challenge, as when the guard is interrupted
    pub fn on_interrupted(&self) {
        warn!("App guard interrupted");
        self.tracker.reset_challenge();
    }

    /// Decide what to do about `package` coming to the foreground
    ///
    /// Only a trip to the home screen ends the previous app's session;
    /// switching straight to another app leaves it to expire on its own.
    pub fn on_foreground_change(&self, package: &str) -> LockDecision {
        let package = package.trim();
        if package.is_empty() || package == self.own_package {
            return LockDecision::Ignored;
        }

        let previous = {
            let mut foreground = lock_state(&self.foreground);
            if foreground.as_deref() == Some(package) {
                return LockDecision::Ignored;
            }
            foreground.replace(package.to_string())
        };

        if is_home_screen(package) {
            debug!("Home screen in foreground");
            if let Some(previous) = previous.filter(|previous| !is_home_screen(previous)) {
                self.tracker.end_session(&previous);
            }
            return LockDecision::Ignored;
        }

        debug!("App switch: {} -> {}", previous.as_deref().unwrap_or("null"), package);

        if self.tracker.is_challenge_in_progress() {
            debug!("Challenge already in progress, ignoring {}", package);
            return LockDecision::Ignored;
        }

        if self.tracker.is_challenge_completed(package) {
            debug!("{} has a valid session", package);
            return LockDecision::Allowed;
        }

        if self.settings.master_disable {
            debug!("Locking disabled, allowing {}", package);
            return LockDecision::Allowed;
        }

        match self.store.is_locked(package) {
            Ok(false) => LockDecision::Allowed,
            Ok(true) => {
                if self.tracker.start_challenge(package) {
                    LockDecision::Challenge(package.to_string())
                } else {
                    LockDecision::Ignored
                }
            }
            Err(e) => {
                error!("Failed to check whether {} is locked: {:#}", package, e);
                self.tracker.reset_challenge();
                LockDecision::Ignored
            }
        }
    }

    /// Attempt for a package whose challenge was just started
    pub fn begin_attempt(&self, package: &str) -> UnlockAttempt {
        self.begin_attempt_with(package, ChallengeGenerator::from_entropy())
    }

    pub fn begin_attempt_with<R: Rng>(&self, package: &str, generator: ChallengeGenerator<R>) -> UnlockAttempt<R> {
        UnlockAttempt::new(package, &self.settings, generator)
    }

    /// Record a finished attempt; returns whether the package is now unlocked
    ///
    /// Fails if the attempt is not solved or if a challenge for a different
    /// package has taken over in the meantime.
    pub fn finish_attempt<R: Rng>(&self, attempt: &UnlockAttempt<R>) -> bool {
        if !attempt.is_unlocked() {
            return false;
        }

        if let Some(active) = self.tracker.current_challenge() {
            if active.package != attempt.package() {
                warn!(
                    "Discarding solved challenge for {}: {} is being challenged now",
                    attempt.package(),
                    active.package
                );
                return false;
            }
        }

        self.tracker.complete_challenge(attempt.package());
        true
    }

    /// Give up on an attempt without unlocking
    pub fn abandon_attempt<R: Rng>(&self, attempt: &UnlockAttempt<R>) {
        let active = self.tracker.current_challenge();
        if active.is_some_and(|active| active.package == attempt.package()) {
            info!("Abandoning challenge for {}", attempt.package());
            self.tracker.reset_challenge();
        }
    }
}
