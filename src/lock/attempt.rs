use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

use super::challenge::{ChallengeGenerator, ColorName, StroopChallenge};
use crate::store::Settings;

/// What the presentation layer should do after a wrong answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feedback {
    pub shake: bool,
    pub vibrate: bool,
    pub sound: bool,
}

impl Feedback {
    pub fn for_wrong_answer(settings: &Settings) -> Self {
        Self {
            shake: true,
            vibrate: settings.vibration_enabled,
            sound: settings.sound_enabled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Correct, but more correct answers are needed; a new challenge is ready
    Next { remaining: u32 },
    /// Enough correct answers in a row
    Unlocked,
    /// Wrong answer; progress starts over with a new challenge
    Wrong(Feedback),
}

/// One try at unlocking a package
///
/// The user has to answer `challenges_required` challenges correctly in a
/// row. A wrong answer resets the count.
pub struct UnlockAttempt<R: Rng = StdRng> {
    package: String,
    required: u32,
    remaining: u32,
    wrong_answers: u32,
    feedback: Feedback,
    generator: ChallengeGenerator<R>,
    current: StroopChallenge,
}

impl<R: Rng> UnlockAttempt<R> {
    pub fn new(package: impl Into<String>, settings: &Settings, mut generator: ChallengeGenerator<R>) -> Self {
        let required = settings.challenges_required.max(1);
        let current = generator.generate();

        Self {
            package: package.into(),
            required,
            remaining: required,
            wrong_answers: 0,
            feedback: Feedback::for_wrong_answer(settings),
            generator,
            current,
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn challenge(&self) -> &StroopChallenge {
        &self.current
    }

    /// Correct answers still needed
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn wrong_answers(&self) -> u32 {
        self.wrong_answers
    }

    pub fn is_unlocked(&self) -> bool {
        self.remaining == 0
    }

    pub fn submit(&mut self, answer: ColorName) -> AttemptOutcome {
        if self.is_unlocked() {
            return AttemptOutcome::Unlocked;
        }

        if !self.current.check_answer(answer) {
            debug!(
                "Incorrect answer for {}: {}, expected {}",
                self.package, answer, self.current.ink_color
            );
            self.wrong_answers += 1;
            self.remaining = self.required;
            self.current = self.generator.generate();
            return AttemptOutcome::Wrong(self.feedback);
        }

        self.remaining -= 1;
        if self.remaining == 0 {
            debug!("Unlock attempt for {} succeeded", self.package);
            return AttemptOutcome::Unlocked;
        }

        self.current = self.generator.generate();
        AttemptOutcome::Next {
            remaining: self.remaining,
        }
    }
}
