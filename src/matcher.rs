use crate::note::Note;

/// Maximum gap between presses before the in-progress attempt is discarded
/// and the next press starts a fresh one.
pub const DEFAULT_ATTEMPT_TIMEOUT_MS: u64 = 2000;

/// How long a wrong note stays visible before the attempt clears itself
/// (lenient policy only).
pub const DEFAULT_ERROR_DISPLAY_MS: u64 = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Wrong,
}

/// Result of processing one press. `sequence_id` is timestamp-derived and
/// strictly increasing within a matcher's lifetime; consumers deduplicate
/// by ignoring any event whose id is not greater than the last one they
/// acted on.
#[derive(Clone, Debug, PartialEq)]
pub struct Interaction {
    pub note: Note,
    pub outcome: Outcome,
    pub sequence_id: u64,
}

/// What happens to the attempt when a wrong note arrives.
///
/// Lenient keeps the mismatched note visible for `error_display_ms` (or
/// until the next press) before wiping the attempt, so the player sees it
/// flash red. Strict wipes the attempt immediately. Lenient is the
/// default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Policy {
    #[default]
    Lenient,
    Strict,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatcherError {
    #[error("target melody is empty")]
    EmptyMelody,
}

/// The melody-matching state machine. Owns the attempt in progress, the
/// inter-press timing gate, and the comparison against the target melody.
///
/// Timestamps come in with each press (milliseconds, from a [`crate::clock::Clock`]);
/// the matcher itself never reads a clock. The two deferred behaviors are
/// modeled without timers: the lenient error clear is a deadline polled by
/// `on_tick`, and success is queued and drained by the caller via
/// `take_success` so a success handler never runs inside the state update
/// that produced it.
#[derive(Debug)]
pub struct Matcher {
    melody: Vec<Note>,
    policy: Policy,
    attempt_timeout_ms: u64,
    error_display_ms: u64,
    progress: Vec<Note>,
    last_event_at: Option<u64>,
    error: bool,
    error_clear_at: Option<u64>,
    last_interaction: Option<Interaction>,
    last_sequence_id: u64,
    pending_success: bool,
}

impl Matcher {
    pub fn new(melody: Vec<Note>, policy: Policy) -> Result<Self, MatcherError> {
        if melody.is_empty() {
            return Err(MatcherError::EmptyMelody);
        }
        Ok(Self {
            melody,
            policy,
            attempt_timeout_ms: DEFAULT_ATTEMPT_TIMEOUT_MS,
            error_display_ms: DEFAULT_ERROR_DISPLAY_MS,
            progress: vec![],
            last_event_at: None,
            error: false,
            error_clear_at: None,
            last_interaction: None,
            last_sequence_id: 0,
            pending_success: false,
        })
    }

    pub fn with_timing(mut self, attempt_timeout_ms: u64, error_display_ms: u64) -> Self {
        self.attempt_timeout_ms = attempt_timeout_ms;
        self.error_display_ms = error_display_ms;
        self
    }

    /// Processes one press at time `t_ms`. Runs to completion; the only
    /// mutating entry point besides [`Matcher::reset`] and the tick poll.
    pub fn process(&mut self, note: Note, t_ms: u64) -> Interaction {
        let gap = self.last_event_at.map(|last| t_ms.saturating_sub(last));
        self.last_event_at = Some(t_ms);

        // A gap at or past the timeout segments attempts: the previous
        // presses are stale, this press starts a new attempt. Not an error.
        if gap.map_or(true, |g| g >= self.attempt_timeout_ms) {
            self.progress.clear();
        }

        // An error state absorbs fully on the next press, regardless of
        // timing, and supersedes any scheduled clear.
        if self.error {
            self.error = false;
            self.error_clear_at = None;
            self.progress.clear();
        }

        let sequence_id = self.next_sequence_id(t_ms);
        let expected = &self.melody[self.progress.len()];

        let outcome = if note == *expected {
            self.progress.push(note.clone());
            if self.progress.len() == self.melody.len() {
                self.pending_success = true;
                self.progress.clear();
            }
            Outcome::Correct
        } else {
            self.error = true;
            match self.policy {
                Policy::Lenient => {
                    // Keep the mismatch visible until the clear deadline or
                    // the next press, whichever comes first.
                    self.progress.push(note.clone());
                    self.error_clear_at = Some(t_ms + self.error_display_ms);
                }
                Policy::Strict => {
                    self.progress.clear();
                }
            }
            Outcome::Wrong
        };

        let interaction = Interaction {
            note,
            outcome,
            sequence_id,
        };
        self.last_interaction = Some(interaction.clone());
        interaction
    }

    /// Polls the scheduled lenient error clear. A deadline superseded by a
    /// later press or a reset has already been cancelled, so a stale tick
    /// is a no-op.
    pub fn on_tick(&mut self, now_ms: u64) {
        if let Some(deadline) = self.error_clear_at {
            if now_ms >= deadline {
                self.error = false;
                self.error_clear_at = None;
                self.progress.clear();
            }
        }
    }

    /// Drains the deferred success signal. The caller checks this after
    /// `process` has returned, on its own turn of the event loop.
    pub fn take_success(&mut self) -> bool {
        std::mem::take(&mut self.pending_success)
    }

    /// Returns the matcher to idle: attempt, timing gate, error flag,
    /// scheduled clear, and pending success are all dropped. Emits
    /// nothing; callable at any time, including mid-attempt. The sequence
    /// id floor survives so consumers never see a repeated id.
    pub fn reset(&mut self) {
        self.progress.clear();
        self.last_event_at = None;
        self.error = false;
        self.error_clear_at = None;
        self.last_interaction = None;
        self.pending_success = false;
    }

    /// Notes matched so far. Under the lenient policy this transiently
    /// includes the most recent wrong note while the error is displayed.
    pub fn progress(&self) -> &[Note] {
        &self.progress
    }

    pub fn last_interaction(&self) -> Option<&Interaction> {
        self.last_interaction.as_ref()
    }

    pub fn is_error(&self) -> bool {
        self.error
    }

    pub fn is_idle(&self) -> bool {
        self.progress.is_empty() && !self.error
    }

    pub fn melody(&self) -> &[Note] {
        &self.melody
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    // Derived from the press timestamp, but forced strictly increasing so
    // two presses in the same millisecond still order.
    fn next_sequence_id(&mut self, t_ms: u64) -> u64 {
        let id = t_ms.max(self.last_sequence_id + 1);
        self.last_sequence_id = id;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn play_melody() -> Vec<Note> {
        vec![
            Note::from("C4"),
            Note::from("E4"),
            Note::from("G4"),
            Note::from("C5"),
        ]
    }

    fn matcher(policy: Policy) -> Matcher {
        Matcher::new(play_melody(), policy).unwrap()
    }

    #[test]
    fn test_empty_melody_rejected() {
        let result = Matcher::new(vec![], Policy::Lenient);
        assert_matches!(result, Err(MatcherError::EmptyMelody));
    }

    #[test]
    fn test_full_melody_completes_once() {
        let mut m = matcher(Policy::Lenient);
        let mut outcomes = vec![];
        for (i, note) in play_melody().into_iter().enumerate() {
            let ev = m.process(note, 1000 + i as u64 * 100);
            outcomes.push(ev.outcome);
        }
        assert_eq!(outcomes, vec![Outcome::Correct; 4]);
        assert!(m.take_success());
        // Drained exactly once
        assert!(!m.take_success());
        assert!(m.is_idle());
        assert!(m.progress().is_empty());
    }

    #[test]
    fn test_success_is_deferred_not_inline() {
        let mut m = matcher(Policy::Lenient);
        for (i, note) in play_melody().into_iter().enumerate() {
            let ev = m.process(note, 1000 + i as u64 * 100);
            assert_eq!(ev.outcome, Outcome::Correct);
        }
        // Nothing ran during process; the signal is sitting in the queue.
        assert!(m.take_success());
    }

    #[test]
    fn test_session_restarts_after_success() {
        let mut m = matcher(Policy::Lenient);
        let mut t = 1000;
        for _ in 0..2 {
            for note in play_melody() {
                m.process(note, t);
                t += 100;
            }
            assert!(m.take_success());
        }
    }

    #[test]
    fn test_wrong_note_emits_wrong_and_no_success() {
        let mut m = matcher(Policy::Lenient);
        assert_eq!(m.process(Note::from("C4"), 1000).outcome, Outcome::Correct);
        assert_eq!(m.process(Note::from("E4"), 1100).outcome, Outcome::Correct);
        assert_eq!(m.process(Note::from("G4"), 1200).outcome, Outcome::Correct);
        // Expected C5
        assert_eq!(m.process(Note::from("C4"), 1300).outcome, Outcome::Wrong);
        assert!(!m.take_success());
        assert!(m.is_error());
    }

    #[test]
    fn test_lenient_keeps_wrong_note_visible() {
        let mut m = matcher(Policy::Lenient);
        m.process(Note::from("C4"), 1000);
        m.process(Note::from("G4"), 1100); // expected E4
        assert_eq!(
            m.progress(),
            &[Note::from("C4"), Note::from("G4")],
            "wrong note stays appended during the error display window"
        );
    }

    #[test]
    fn test_lenient_clears_on_next_press() {
        let mut m = matcher(Policy::Lenient);
        m.process(Note::from("C4"), 1000);
        m.process(Note::from("G4"), 1100); // wrong
        let ev = m.process(Note::from("C4"), 1200);
        // The error absorbed the old attempt; this press starts fresh and
        // matches index 0.
        assert_eq!(ev.outcome, Outcome::Correct);
        assert_eq!(m.progress(), &[Note::from("C4")]);
        assert!(!m.is_error());
    }

    #[test]
    fn test_lenient_clears_after_display_delay() {
        let mut m = matcher(Policy::Lenient);
        m.process(Note::from("C4"), 1000);
        m.process(Note::from("G4"), 1100); // wrong, clear scheduled at 1600
        m.on_tick(1599);
        assert!(m.is_error());
        assert!(!m.progress().is_empty());
        m.on_tick(1600);
        assert!(!m.is_error());
        assert!(m.progress().is_empty());
    }

    #[test]
    fn test_superseded_clear_deadline_is_a_noop() {
        let mut m = matcher(Policy::Lenient);
        m.process(Note::from("G4"), 1000); // wrong, clear scheduled at 1500
        m.process(Note::from("C4"), 1100); // absorbs the error, cancels the clear
        assert_eq!(m.progress(), &[Note::from("C4")]);
        // The old deadline firing now must not wipe the fresh attempt.
        m.on_tick(1500);
        assert_eq!(m.progress(), &[Note::from("C4")]);
    }

    #[test]
    fn test_strict_clears_immediately() {
        let mut m = matcher(Policy::Strict);
        m.process(Note::from("C4"), 1000);
        let ev = m.process(Note::from("G4"), 1100); // expected E4
        assert_eq!(ev.outcome, Outcome::Wrong);
        assert!(m.progress().is_empty());
        assert!(m.is_error());
    }

    #[test]
    fn test_recovery_after_wrong_note() {
        for policy in [Policy::Lenient, Policy::Strict] {
            let mut m = matcher(policy);
            let mut t = 1000;
            m.process(Note::from("C4"), t);
            t += 100;
            m.process(Note::from("C5"), t); // wrong
            for note in play_melody() {
                t += 100;
                assert_eq!(m.process(note, t).outcome, Outcome::Correct);
            }
            assert!(m.take_success(), "policy {policy:?} should still complete");
        }
    }

    #[test]
    fn test_timeout_boundary() {
        let timeout = DEFAULT_ATTEMPT_TIMEOUT_MS;
        for (gap, discarded) in [(timeout - 1, false), (timeout, true), (timeout + 1, true)] {
            let mut m = matcher(Policy::Lenient);
            m.process(Note::from("C4"), 1000);
            m.process(Note::from("E4"), 1000 + gap);
            if discarded {
                // E4 was evaluated as a first note (expected C4) and missed
                assert!(m.is_error(), "gap {gap} should have segmented");
            } else {
                assert_eq!(m.progress(), &[Note::from("C4"), Note::from("E4")]);
            }
        }
    }

    #[test]
    fn test_first_press_has_infinite_gap() {
        let mut m = matcher(Policy::Lenient);
        // Far beyond any timeout; still just the start of the first attempt.
        let ev = m.process(Note::from("C4"), u64::MAX / 2);
        assert_eq!(ev.outcome, Outcome::Correct);
    }

    #[test]
    fn test_stale_press_does_not_count() {
        // Press, wait out the timeout, then play the full melody:
        // exactly one success.
        let mut m = Matcher::new(
            vec![Note::from("A4"), Note::from("B4"), Note::from("C5")],
            Policy::Lenient,
        )
        .unwrap();
        m.process(Note::from("A4"), 1000);
        let mut t = 1000 + DEFAULT_ATTEMPT_TIMEOUT_MS + 500;
        for note in ["A4", "B4", "C5"] {
            m.process(Note::from(note), t);
            t += 100;
        }
        assert!(m.take_success());
        assert!(!m.take_success());
    }

    #[test]
    fn test_sequence_ids_strictly_increase() {
        let mut m = matcher(Policy::Lenient);
        let mut last = 0;
        // Includes two presses in the same millisecond
        for (note, t) in [("C4", 1000), ("E4", 1000), ("G4", 1100), ("C4", 1100)] {
            let ev = m.process(Note::from(note), t);
            assert!(ev.sequence_id > last);
            last = ev.sequence_id;
        }
    }

    #[test]
    fn test_sequence_ids_survive_reset() {
        let mut m = matcher(Policy::Lenient);
        let before = m.process(Note::from("C4"), 5000).sequence_id;
        m.reset();
        let after = m.process(Note::from("C4"), 1000).sequence_id;
        assert!(after > before);
    }

    #[test]
    fn test_reset_clears_everything_and_emits_nothing() {
        let mut m = matcher(Policy::Lenient);
        m.process(Note::from("C4"), 1000);
        m.process(Note::from("G4"), 1100); // wrong, schedules a clear
        m.reset();
        assert!(m.is_idle());
        assert!(m.progress().is_empty());
        assert!(m.last_interaction().is_none());
        assert!(!m.take_success());
        // The scheduled clear was cancelled, not left dangling
        m.on_tick(u64::MAX);
        assert!(m.is_idle());
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut m = matcher(Policy::Lenient);
        m.process(Note::from("C4"), 1000);
        m.reset();
        m.reset();
        assert!(m.is_idle());
        assert!(m.last_interaction().is_none());
    }

    #[test]
    fn test_reset_discards_pending_success() {
        let mut m = matcher(Policy::Lenient);
        for (i, note) in play_melody().into_iter().enumerate() {
            m.process(note, 1000 + i as u64 * 100);
        }
        m.reset();
        assert!(!m.take_success());
    }

    #[test]
    fn test_progress_is_always_a_melody_prefix_when_not_in_error() {
        let mut m = matcher(Policy::Lenient);
        let presses = [
            ("C4", 1000),
            ("E4", 1100),
            ("C4", 1200), // wrong
            ("C4", 1300),
            ("E4", 1400),
            ("G4", 1500),
        ];
        for (note, t) in presses {
            m.process(Note::from(note), t);
            if !m.is_error() {
                let len = m.progress().len();
                assert_eq!(m.progress(), &m.melody()[..len]);
            }
        }
    }

    #[test]
    fn test_last_interaction_snapshot() {
        let mut m = matcher(Policy::Lenient);
        assert!(m.last_interaction().is_none());
        m.process(Note::from("C4"), 1000);
        let last = m.last_interaction().unwrap();
        assert_eq!(last.note, Note::from("C4"));
        assert_eq!(last.outcome, Outcome::Correct);
    }
}
