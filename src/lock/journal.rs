use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;
use tracing::debug;

use super::lock_state;

/// How many events the journal keeps before dropping the oldest
pub const MAX_JOURNAL_ENTRIES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalEventKind {
    ChallengeStarted,
    ChallengeRejected,
    ChallengeCompleted,
    ChallengeTimedOut,
    SessionChecked,
    SessionExpired,
    SessionEnded,
    AppSwitch,
    Reset,
}

impl JournalEventKind {
    fn tag(&self) -> &'static str {
        match self {
            JournalEventKind::ChallengeStarted => "CHALLENGE_START",
            JournalEventKind::ChallengeRejected => "CHALLENGE_REJECTED",
            JournalEventKind::ChallengeCompleted => "CHALLENGE_COMPLETE",
            JournalEventKind::ChallengeTimedOut => "CHALLENGE_TIMEOUT",
            JournalEventKind::SessionChecked => "SESSION_CHECK",
            JournalEventKind::SessionExpired => "SESSION_EXPIRED",
            JournalEventKind::SessionEnded => "SESSION_END",
            JournalEventKind::AppSwitch => "APP_SWITCH",
            JournalEventKind::Reset => "RESET",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JournalEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: JournalEventKind,
    pub details: String,
}

impl fmt::Display for JournalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.kind.tag(),
            self.details
        )
    }
}

/// Bounded log of recent session events for debugging lock behavior
#[derive(Debug, Default)]
pub struct SessionJournal {
    events: Mutex<VecDeque<JournalEvent>>,
}

impl SessionJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, timestamp: DateTime<Utc>, kind: JournalEventKind, details: impl Into<String>) {
        let event = JournalEvent {
            timestamp,
            kind,
            details: details.into(),
        };
        debug!("{}", event);

        let mut events = lock_state(&self.events);
        events.push_back(event);
        while events.len() > MAX_JOURNAL_ENTRIES {
            events.pop_front();
        }
    }

    /// Snapshot of the retained events, oldest first
    pub fn events(&self) -> Vec<JournalEvent> {
        lock_state(&self.events).iter().cloned().collect()
    }

    pub fn clear(&self) {
        lock_state(&self.events).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_journal_keeps_most_recent_entries() {
        let journal = SessionJournal::new();
        let now = Utc::now();

        for i in 0..(MAX_JOURNAL_ENTRIES + 20) {
            journal.record(now, JournalEventKind::SessionChecked, format!("check {}", i));
        }

        let events = journal.events();
        assert_eq!(events.len(), MAX_JOURNAL_ENTRIES);
        assert_eq!(events[0].details, "check 20");
        assert_eq!(events.last().unwrap().details, format!("check {}", MAX_JOURNAL_ENTRIES + 19));
    }

    #[test]
    fn test_event_display() {
        let event = JournalEvent {
            timestamp: "2025-11-16T10:20:30.123Z".parse().unwrap(),
            kind: JournalEventKind::AppSwitch,
            details: "com.a -> com.b".to_string(),
        };

        assert_eq!(event.to_string(), "[10:20:30.123] APP_SWITCH: com.a -> com.b");
    }
}
