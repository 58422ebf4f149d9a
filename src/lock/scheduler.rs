use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

use super::clock::{add_duration, Clock, ManualClock};
use super::lock_state;

/// Identifies a pending callback so it can be replaced or removed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerKey {
    /// Watchdog that resets a challenge nobody finished
    ChallengeTimeout,
    /// Backstop removal of a completed session
    SessionExpiry(String),
}

pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Delayed-callback mechanism used by the session tracker
///
/// Scheduling under a key that is already pending replaces the old callback.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, key: TimerKey, delay: Duration, callback: Callback);

    fn cancel(&self, key: &TimerKey);

    fn cancel_all(&self);
}

/// Scheduler backed by tokio tasks
pub struct TokioScheduler {
    handle: Handle,
    pending: Arc<Mutex<HashMap<TimerKey, (u64, JoinHandle<()>)>>>,
    next_id: AtomicU64,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Scheduler on the runtime the caller is running in
    pub fn current() -> Result<Self> {
        let handle = Handle::try_current()
            .context("TokioScheduler must be created inside a tokio runtime")?;
        Ok(Self::new(handle))
    }

    pub fn pending_count(&self) -> usize {
        lock_state(&self.pending).len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, key: TimerKey, delay: Duration, callback: Callback) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        // Held across spawn so the task cannot look itself up before it is
        // registered.
        let mut pending = lock_state(&self.pending);

        let registry = Arc::clone(&self.pending);
        let task_key = key.clone();
        let task = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;

            let still_pending = {
                let mut registry = lock_state(&registry);
                match registry.get(&task_key) {
                    Some((pending_id, _)) if *pending_id == id => {
                        registry.remove(&task_key);
                        true
                    }
                    _ => false,
                }
            };

            if still_pending {
                debug!("Timer fired: {:?}", task_key);
                callback();
            }
        });

        if let Some((_, previous)) = pending.insert(key, (id, task)) {
            previous.abort();
        }
    }

    fn cancel(&self, key: &TimerKey) {
        if let Some((_, task)) = lock_state(&self.pending).remove(key) {
            task.abort();
        }
    }

    fn cancel_all(&self) {
        for (_, (_, task)) in lock_state(&self.pending).drain() {
            task.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

struct PendingTimer {
    key: TimerKey,
    due: DateTime<Utc>,
    seq: u64,
    callback: Callback,
}

/// Scheduler for tests: callbacks only run when time is advanced
///
/// Shares a `ManualClock` and moves it forward to each callback's due time
/// before running it, so callbacks observe the time they were scheduled for.
pub struct ManualScheduler {
    clock: Arc<ManualClock>,
    pending: Mutex<Vec<PendingTimer>>,
    next_seq: AtomicU64,
}

impl ManualScheduler {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            pending: Mutex::new(Vec::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Move time forward, firing every callback that comes due on the way
    pub fn advance(&self, by: Duration) {
        let target = add_duration(self.clock.now(), by);

        loop {
            let next = {
                let mut pending = lock_state(&self.pending);
                let earliest = pending
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due <= target)
                    .min_by_key(|(_, t)| (t.due, t.seq))
                    .map(|(i, _)| i);
                earliest.map(|i| pending.remove(i))
            };

            match next {
                Some(timer) => {
                    self.clock.set(timer.due);
                    (timer.callback)();
                }
                None => break,
            }
        }

        self.clock.set(target);
    }

    pub fn is_pending(&self, key: &TimerKey) -> bool {
        lock_state(&self.pending).iter().any(|t| &t.key == key)
    }

    pub fn pending_count(&self) -> usize {
        lock_state(&self.pending).len()
    }

    /// Time left until the callback under `key` fires
    pub fn remaining(&self, key: &TimerKey) -> Option<Duration> {
        let now = self.clock.now();
        lock_state(&self.pending)
            .iter()
            .find(|t| &t.key == key)
            .map(|t| super::clock::elapsed_between(now, t.due))
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, key: TimerKey, delay: Duration, callback: Callback) {
        let due = add_duration(self.clock.now(), delay);
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);

        let mut pending = lock_state(&self.pending);
        pending.retain(|t| t.key != key);
        pending.push(PendingTimer {
            key,
            due,
            seq,
            callback,
        });
    }

    fn cancel(&self, key: &TimerKey) {
        lock_state(&self.pending).retain(|t| &t.key != key);
    }

    fn cancel_all(&self) {
        lock_state(&self.pending).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter_callback(counter: &Arc<AtomicUsize>) -> Callback {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_manual_scheduler_fires_when_due() {
        let clock = Arc::new(ManualClock::default());
        let scheduler = ManualScheduler::new(Arc::clone(&clock));
        let fired = Arc::new(AtomicUsize::new(0));

        scheduler.schedule(
            TimerKey::ChallengeTimeout,
            Duration::from_secs(30),
            counter_callback(&fired),
        );

        scheduler.advance(Duration::from_secs(29));
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        scheduler.advance(Duration::from_secs(1));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_manual_scheduler_replaces_same_key() {
        let clock = Arc::new(ManualClock::default());
        let scheduler = ManualScheduler::new(Arc::clone(&clock));
        let fired = Arc::new(AtomicUsize::new(0));

        scheduler.schedule(TimerKey::ChallengeTimeout, Duration::from_secs(10), counter_callback(&fired));
        scheduler.schedule(TimerKey::ChallengeTimeout, Duration::from_secs(20), counter_callback(&fired));

        assert_eq!(scheduler.pending_count(), 1);
        assert_eq!(scheduler.remaining(&TimerKey::ChallengeTimeout), Some(Duration::from_secs(20)));

        scheduler.advance(Duration::from_secs(60));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_manual_scheduler_cancel() {
        let clock = Arc::new(ManualClock::default());
        let scheduler = ManualScheduler::new(Arc::clone(&clock));
        let fired = Arc::new(AtomicUsize::new(0));

        let key = TimerKey::SessionExpiry("com.example.app".to_string());
        scheduler.schedule(key.clone(), Duration::from_secs(5), counter_callback(&fired));
        scheduler.cancel(&key);

        scheduler.advance(Duration::from_secs(10));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_manual_scheduler_moves_clock_to_due_time() {
        let clock = Arc::new(ManualClock::default());
        let scheduler = ManualScheduler::new(Arc::clone(&clock));
        let start = clock.now();
        let seen = Arc::new(Mutex::new(None));

        let observer_clock = Arc::clone(&clock);
        let observed = Arc::clone(&seen);
        scheduler.schedule(
            TimerKey::ChallengeTimeout,
            Duration::from_secs(3),
            Box::new(move || {
                *observed.lock().unwrap() = Some(observer_clock.now());
            }),
        );

        scheduler.advance(Duration::from_secs(10));

        let fired_at = seen.lock().unwrap().unwrap();
        assert_eq!(fired_at, add_duration(start, Duration::from_secs(3)));
        assert_eq!(clock.now(), add_duration(start, Duration::from_secs(10)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_fires_after_delay() {
        let scheduler = TokioScheduler::current().unwrap();
        let fired = Arc::new(AtomicUsize::new(0));

        scheduler.schedule(TimerKey::ChallengeTimeout, Duration::from_secs(30), counter_callback(&fired));

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_cancel_prevents_callback() {
        let scheduler = TokioScheduler::current().unwrap();
        let fired = Arc::new(AtomicUsize::new(0));

        scheduler.schedule(TimerKey::ChallengeTimeout, Duration::from_secs(5), counter_callback(&fired));
        scheduler.cancel(&TimerKey::ChallengeTimeout);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_reschedule_replaces() {
        let scheduler = TokioScheduler::current().unwrap();
        let fired = Arc::new(AtomicUsize::new(0));

        scheduler.schedule(TimerKey::ChallengeTimeout, Duration::from_secs(5), counter_callback(&fired));
        scheduler.schedule(TimerKey::ChallengeTimeout, Duration::from_secs(50), counter_callback(&fired));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(45)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tokio_scheduler_requires_runtime() {
        assert!(TokioScheduler::current().is_err());
    }
}
