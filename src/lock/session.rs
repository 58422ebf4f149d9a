use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::clock::{elapsed_between, Clock, SystemClock};
use super::journal::{JournalEvent, JournalEventKind, SessionJournal};
use super::lock_state;
use super::scheduler::{Scheduler, TimerKey, TokioScheduler};
use crate::store::Settings;

/// How long a started challenge may stay unanswered before it is reset
pub const DEFAULT_CHALLENGE_TIMEOUT: Duration = Duration::from_secs(30);

/// How long a solved challenge keeps granting access unless settings say otherwise
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay of the scheduled cleanup that drops completed sessions nobody reads
pub const DEFAULT_EXPIRY_BACKSTOP: Duration = Duration::from_secs(120);

/// Timing knobs for the session tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub challenge_timeout: Duration,
    /// `None` keeps a session until it is ended, with no time limit
    pub session_timeout: Option<Duration>,
    pub expiry_backstop: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            challenge_timeout: DEFAULT_CHALLENGE_TIMEOUT,
            session_timeout: Some(DEFAULT_SESSION_TIMEOUT),
            expiry_backstop: DEFAULT_EXPIRY_BACKSTOP,
        }
    }
}

impl SessionConfig {
    /// Derive timings from user settings
    ///
    /// A zero challenge timeout keeps the default watchdog. A zero session
    /// duration means the session lasts until the user leaves the app.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut config = Self::default();

        if settings.challenge_timeout > 0 {
            config.challenge_timeout = Duration::from_secs(settings.challenge_timeout);
        }
        config.session_timeout = match settings.session_duration {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        config
    }
}

/// The one challenge currently shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveChallenge {
    pub package: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct SessionState {
    active: Option<ActiveChallenge>,
    completed: HashMap<String, DateTime<Utc>>,
}

/// Tracks the in-progress challenge and which packages are unlocked
///
/// All state sits behind a single mutex, so calls from the UI side and from
/// the foreground-event side are serialized. Expiry is checked lazily on
/// read; scheduled callbacks only back that up.
#[derive(Clone)]
pub struct SessionTracker {
    state: Arc<Mutex<SessionState>>,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
    journal: Arc<SessionJournal>,
    config: SessionConfig,
}

impl SessionTracker {
    pub fn new(config: SessionConfig, scheduler: Arc<dyn Scheduler>, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::default())),
            scheduler,
            clock,
            journal: Arc::new(SessionJournal::new()),
            config,
        }
    }

    /// Tracker on the current tokio runtime using the system clock
    pub fn with_tokio(config: SessionConfig) -> Result<Self> {
        let scheduler = Arc::new(TokioScheduler::current()?);
        Ok(Self::new(config, scheduler, Arc::new(SystemClock)))
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    /// Start a challenge for `package`
    ///
    /// Returns false, leaving the current challenge untouched, if one is
    /// already in progress.
    pub fn start_challenge(&self, package: &str) -> bool {
        let now = self.clock.now();
        let mut state = lock_state(&self.state);

        if let Some(active) = &state.active {
            debug!(
                "Cannot start challenge for {}: {} is already being challenged",
                package, active.package
            );
            self.journal.record(
                now,
                JournalEventKind::ChallengeRejected,
                format!("{} (active: {})", package, active.package),
            );
            return false;
        }

        info!("Starting challenge for {}", package);
        state.active = Some(ActiveChallenge {
            package: package.to_string(),
            started_at: now,
        });
        self.journal.record(now, JournalEventKind::ChallengeStarted, package);

        let watchdog = ChallengeWatchdog {
            state: Arc::downgrade(&self.state),
            journal: Arc::clone(&self.journal),
            clock: Arc::clone(&self.clock),
            package: package.to_string(),
            started_at: now,
        };
        self.scheduler.schedule(
            TimerKey::ChallengeTimeout,
            self.config.challenge_timeout,
            Box::new(move || watchdog.fire()),
        );

        true
    }

    /// Record a solved challenge for `package` and clear the active challenge
    pub fn complete_challenge(&self, package: &str) {
        let now = self.clock.now();
        let mut state = lock_state(&self.state);

        info!("Completing challenge for {}", package);
        state.completed.insert(package.to_string(), now);
        state.active = None;
        self.scheduler.cancel(&TimerKey::ChallengeTimeout);
        self.journal.record(now, JournalEventKind::ChallengeCompleted, package);

        // Untimed sessions only end when the user leaves the app
        let Some(session_timeout) = self.config.session_timeout else {
            return;
        };
        let delay = self.config.expiry_backstop.max(session_timeout);

        let backstop = ExpiryBackstop {
            state: Arc::downgrade(&self.state),
            journal: Arc::clone(&self.journal),
            clock: Arc::clone(&self.clock),
            package: package.to_string(),
            completed_at: now,
            session_timeout,
        };
        self.scheduler.schedule(
            TimerKey::SessionExpiry(package.to_string()),
            delay,
            Box::new(move || backstop.fire()),
        );
    }

    /// Whether `package` has a solved challenge that has not expired yet
    ///
    /// An expired entry is removed as a side effect.
    pub fn is_challenge_completed(&self, package: &str) -> bool {
        let now = self.clock.now();
        let mut state = lock_state(&self.state);

        let Some(completed_at) = state.completed.get(package).copied() else {
            self.journal.record(now, JournalEventKind::SessionChecked, format!("{}: none", package));
            return false;
        };

        let Some(session_timeout) = self.config.session_timeout else {
            self.journal.record(now, JournalEventKind::SessionChecked, format!("{}: valid until ended", package));
            return true;
        };

        let elapsed = elapsed_between(completed_at, now);
        if elapsed >= session_timeout {
            state.completed.remove(package);
            self.scheduler.cancel(&TimerKey::SessionExpiry(package.to_string()));
            debug!(
                "Session for {} expired after {}ms",
                package,
                elapsed.as_millis()
            );
            self.journal.record(
                now,
                JournalEventKind::SessionExpired,
                format!("{} after {}ms", package, elapsed.as_millis()),
            );
            return false;
        }

        self.journal.record(
            now,
            JournalEventKind::SessionChecked,
            format!("{}: valid for {}ms more", package, (session_timeout - elapsed).as_millis()),
        );
        true
    }

    /// Switching away from a package always locks it again
    pub fn handle_app_switch(&self, from: Option<&str>, to: &str) {
        let now = self.clock.now();
        let mut state = lock_state(&self.state);

        self.journal.record(
            now,
            JournalEventKind::AppSwitch,
            format!("{} -> {}", from.unwrap_or("null"), to),
        );

        if let Some(from) = from.filter(|from| *from != to) {
            self.end_session_locked(&mut state, from, now);
        }
    }

    /// Drop the session for one package so it must be challenged again
    pub fn end_session(&self, package: &str) {
        let now = self.clock.now();
        let mut state = lock_state(&self.state);
        self.end_session_locked(&mut state, package, now);
    }

    fn end_session_locked(&self, state: &mut SessionState, package: &str, now: DateTime<Utc>) {
        if state.completed.remove(package).is_some() {
            debug!("Ending session for {}", package);
        }
        self.scheduler.cancel(&TimerKey::SessionExpiry(package.to_string()));
        self.journal.record(now, JournalEventKind::SessionEnded, package);
    }

    /// Abandon the in-progress challenge without completing it
    pub fn reset_challenge(&self) {
        let now = self.clock.now();
        let mut state = lock_state(&self.state);

        if let Some(active) = state.active.take() {
            debug!("Resetting challenge for {}", active.package);
        }
        self.scheduler.cancel(&TimerKey::ChallengeTimeout);
        self.journal.record(now, JournalEventKind::Reset, "challenge");
    }

    /// Forget every session and the in-progress challenge
    pub fn end_all_sessions(&self) {
        let now = self.clock.now();
        let mut state = lock_state(&self.state);

        info!("Ending all sessions");
        state.completed.clear();
        state.active = None;
        self.scheduler.cancel_all();
        self.journal.record(now, JournalEventKind::Reset, "all sessions");
    }

    pub fn is_challenge_in_progress(&self) -> bool {
        lock_state(&self.state).active.is_some()
    }

    pub fn current_challenge(&self) -> Option<ActiveChallenge> {
        lock_state(&self.state).active.clone()
    }

    /// Packages with a recorded completion, including ones that have expired
    /// but were not read since
    pub fn completed_packages(&self) -> Vec<String> {
        let mut packages: Vec<String> = lock_state(&self.state).completed.keys().cloned().collect();
        packages.sort();
        packages
    }

    pub fn recent_events(&self) -> Vec<JournalEvent> {
        self.journal.events()
    }
}

struct ChallengeWatchdog {
    state: Weak<Mutex<SessionState>>,
    journal: Arc<SessionJournal>,
    clock: Arc<dyn Clock>,
    package: String,
    started_at: DateTime<Utc>,
}

impl ChallengeWatchdog {
    fn fire(self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let mut state = lock_state(&state);

        let same_challenge = state
            .active
            .as_ref()
            .is_some_and(|a| a.package == self.package && a.started_at == self.started_at);

        if same_challenge {
            warn!("Challenge timed out for {}", self.package);
            state.active = None;
            self.journal.record(self.clock.now(), JournalEventKind::ChallengeTimedOut, self.package);
        }
    }
}

struct ExpiryBackstop {
    state: Weak<Mutex<SessionState>>,
    journal: Arc<SessionJournal>,
    clock: Arc<dyn Clock>,
    package: String,
    completed_at: DateTime<Utc>,
    session_timeout: Duration,
}

impl ExpiryBackstop {
    fn fire(self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let mut state = lock_state(&state);
        let now = self.clock.now();

        let stale = state.completed.get(&self.package) == Some(&self.completed_at)
            && elapsed_between(self.completed_at, now) >= self.session_timeout;

        if stale {
            state.completed.remove(&self.package);
            debug!("Backstop removed expired session for {}", self.package);
            self.journal.record(now, JournalEventKind::SessionExpired, format!("{} (backstop)", self.package));
        }
    }
}
