/// Lock core: deciding when a locked app needs a Stroop challenge
///
/// This module provides:
/// - The session/challenge tracker (single active challenge, expiring sessions)
/// - The Stroop challenge generator
/// - Keyed timers with a tokio implementation and a manual one for tests
/// - The app guard that turns foreground changes into lock decisions
/// - Unlock attempts that require several correct answers in a row

pub mod attempt;
pub mod challenge;
pub mod clock;
pub mod guard;
pub mod journal;
pub mod scheduler;
pub mod session;

pub use attempt::{AttemptOutcome, Feedback, UnlockAttempt};
pub use challenge::{ChallengeGenerator, ChallengeOption, ColorName, Palette, StroopChallenge, GRID_SIZE};
pub use clock::{Clock, ManualClock, SystemClock};
pub use guard::{AppGuard, LockDecision};
pub use journal::{JournalEvent, JournalEventKind, SessionJournal};
pub use scheduler::{ManualScheduler, Scheduler, TimerKey, TokioScheduler};
pub use session::{ActiveChallenge, SessionConfig, SessionTracker};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a previous holder panicked
pub(crate) fn lock_state<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
