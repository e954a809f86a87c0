use crate::config::Config;
use crate::moves::Move;
use crate::TICK_RATE_MS;
use std::time::{Duration, SystemTime};
use tracing::info;

#[derive(Clone, Debug, Copy, PartialEq)]
pub enum Outcome {
    Correct,
    Incorrect,
}

/// One accepted input slot, with its position-wise verdict.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Entry {
    pub mv: Move,
    pub outcome: Outcome,
    pub timestamp: SystemTime,
}

/// Validation screen lifecycle. `Verdict` holds the comparison result while
/// the status message stays on screen; `Expired` is the countdown running out.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Phase {
    Idle,
    Entering,
    Verdict { valid: bool },
    Expired,
}

/// Terminal outcome of a session, mapped to the process exit code.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SessionEnd {
    Unlocked,
    Rejected,
}

/// Represents one secret-code challenge being presented to the player.
#[derive(Debug)]
pub struct Session {
    pub game: String,
    pub expected: Vec<Move>,
    pub entered: Vec<Entry>,
    pub phase: Phase,
    pub seconds_remaining: f64,
    pub entry_timeout_secs: u64,
    verdict_delay_secs: f64,
    verdict_remaining: f64,
    debounce: Duration,
    last_accepted: Option<SystemTime>,
}

impl Session {
    pub fn new(game: String, expected: Vec<Move>, cfg: &Config) -> Self {
        Self {
            game,
            expected,
            entered: vec![],
            phase: Phase::Idle,
            seconds_remaining: cfg.entry_timeout_secs as f64,
            entry_timeout_secs: cfg.entry_timeout_secs,
            verdict_delay_secs: cfg.verdict_delay_ms as f64 / 1000.0,
            verdict_remaining: 0.0,
            debounce: cfg.debounce(),
            last_accepted: None,
        }
    }

    pub fn start(&mut self) {
        if self.phase == Phase::Idle {
            info!(game = %self.game, len = self.expected.len(), "code entry started");
            self.phase = Phase::Entering;
        }
    }

    /// Whether the input device should still be polled.
    pub fn polling_active(&self) -> bool {
        matches!(self.phase, Phase::Idle | Phase::Entering)
    }

    pub fn is_finished(&self) -> bool {
        !self.polling_active()
    }

    pub fn accept(&mut self, mv: Move) -> bool {
        self.accept_at(mv, SystemTime::now())
    }

    /// Offer one input to the session. Returns true if it was accepted.
    ///
    /// Inputs are dropped while a verdict is showing, once the buffer is
    /// full, and inside the debounce window after the previous acceptance.
    pub fn accept_at(&mut self, mv: Move, now: SystemTime) -> bool {
        self.start();
        if self.phase != Phase::Entering || self.entered.len() >= self.expected.len() {
            return false;
        }
        if let Some(last) = self.last_accepted {
            match now.duration_since(last) {
                Ok(gap) if gap < self.debounce => return false,
                Ok(_) => {}
                // clock went backwards; treat as within the window
                Err(_) => return false,
            }
        }
        self.last_accepted = Some(now);

        let idx = self.entered.len();
        let outcome = if self.expected[idx] == mv {
            Outcome::Correct
        } else {
            Outcome::Incorrect
        };
        self.entered.push(Entry {
            mv,
            outcome,
            timestamp: now,
        });

        if self.entered.len() == self.expected.len() {
            self.complete();
        }
        true
    }

    fn complete(&mut self) {
        let valid = self
            .entered
            .iter()
            .all(|e| e.outcome == Outcome::Correct);
        info!(game = %self.game, valid, "code entry complete");
        self.phase = Phase::Verdict { valid };
        self.verdict_remaining = self.verdict_delay_secs;
    }

    /// Advance the session by one fixed tick. Returns the terminal outcome
    /// once the closing delay of a success or expiry has elapsed.
    pub fn on_tick(&mut self) -> Option<SessionEnd> {
        let step = TICK_RATE_MS as f64 / 1000.0;
        match self.phase {
            Phase::Idle | Phase::Entering => {
                self.seconds_remaining -= step;
                if self.seconds_remaining <= 0.0 {
                    info!(game = %self.game, "entry window expired");
                    self.phase = Phase::Expired;
                    self.verdict_remaining = self.verdict_delay_secs;
                }
                None
            }
            Phase::Verdict { valid } => {
                self.verdict_remaining -= step;
                if self.verdict_remaining > 0.0 {
                    return None;
                }
                if valid {
                    Some(SessionEnd::Unlocked)
                } else {
                    self.reset_entry();
                    None
                }
            }
            Phase::Expired => {
                self.verdict_remaining -= step;
                if self.verdict_remaining <= 0.0 {
                    Some(SessionEnd::Rejected)
                } else {
                    None
                }
            }
        }
    }

    /// Clear the entered buffer for another attempt at the same code.
    pub fn reset_entry(&mut self) {
        self.entered.clear();
        self.last_accepted = None;
        self.phase = Phase::Entering;
    }

    /// Whole seconds left, as shown next to the countdown gauge.
    pub fn seconds_display(&self) -> u64 {
        self.seconds_remaining.max(0.0).ceil() as u64
    }

    /// Fraction of the entry window remaining, for the gauge.
    pub fn time_fraction(&self) -> f64 {
        if self.entry_timeout_secs == 0 {
            return 0.0;
        }
        (self.seconds_remaining / self.entry_timeout_secs as f64).clamp(0.0, 1.0)
    }

    pub fn status_text(&self) -> String {
        match self.phase {
            Phase::Idle => "ENTER FIRST MOVE...".to_string(),
            Phase::Entering => {
                if self.entered.is_empty() {
                    "ENTER FIRST MOVE...".to_string()
                } else {
                    format!(
                        "ENTER NEXT MOVE ({}/{})",
                        self.entered.len() + 1,
                        self.expected.len()
                    )
                }
            }
            Phase::Verdict { valid: true } => "CODE CORRECT! LAUNCHING GAME...".to_string(),
            Phase::Verdict { valid: false } => "INCORRECT CODE! TRY AGAIN.".to_string(),
            Phase::Expired => "TIME'S UP! CODE EXPIRED.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::FALLBACK_SEQUENCE;

    fn cfg() -> Config {
        Config::default()
    }

    fn fast_cfg() -> Config {
        Config {
            entry_timeout_secs: 1,
            verdict_delay_ms: 100,
            ..Config::default()
        }
    }

    fn session(expected: &[Move]) -> Session {
        Session::new("galaga".into(), expected.to_vec(), &cfg())
    }

    /// Feed moves spaced far enough apart that debounce never interferes.
    fn enter_all(s: &mut Session, moves: &[Move]) {
        let mut now = SystemTime::UNIX_EPOCH;
        for &mv in moves {
            now += Duration::from_secs(1);
            s.accept_at(mv, now);
        }
    }

    fn tick_until_end(s: &mut Session, max_ticks: u32) -> Option<SessionEnd> {
        for _ in 0..max_ticks {
            if let Some(end) = s.on_tick() {
                return Some(end);
            }
        }
        None
    }

    #[test]
    fn test_new_session_is_idle() {
        let s = session(&[Move::Up, Move::A]);
        assert_eq!(s.phase, Phase::Idle);
        assert_eq!(s.entered.len(), 0);
        assert_eq!(s.seconds_display(), 60);
        assert!(s.polling_active());
    }

    #[test]
    fn test_first_input_starts_session() {
        let mut s = session(&[Move::Up, Move::A]);
        assert!(s.accept_at(Move::Up, SystemTime::UNIX_EPOCH));
        assert_eq!(s.phase, Phase::Entering);
        assert_eq!(s.entered.len(), 1);
        assert_eq!(s.entered[0].outcome, Outcome::Correct);
    }

    #[test]
    fn test_positionwise_verdicts() {
        let mut s = session(&[Move::Up, Move::Down, Move::A]);
        enter_all(&mut s, &[Move::Up, Move::Left, Move::A]);
        assert_eq!(s.entered[0].outcome, Outcome::Correct);
        assert_eq!(s.entered[1].outcome, Outcome::Incorrect);
        assert_eq!(s.entered[2].outcome, Outcome::Correct);
    }

    #[test]
    fn test_exact_sequence_is_valid() {
        let mut s = session(&FALLBACK_SEQUENCE);
        enter_all(&mut s, &FALLBACK_SEQUENCE);
        assert_eq!(s.phase, Phase::Verdict { valid: true });
        assert!(s.is_finished());
    }

    #[test]
    fn test_any_wrong_position_is_invalid() {
        let expected = [Move::Up, Move::Down, Move::Left, Move::Right];
        for wrong_at in 0..expected.len() {
            let mut entered = expected;
            entered[wrong_at] = Move::B;
            let mut s = session(&expected);
            enter_all(&mut s, &entered);
            assert_eq!(
                s.phase,
                Phase::Verdict { valid: false },
                "differing at position {wrong_at} must fail"
            );
        }
    }

    #[test]
    fn test_debounce_drops_rapid_second_input() {
        let mut s = session(&[Move::Up, Move::Up]);
        let t0 = SystemTime::UNIX_EPOCH;
        assert!(s.accept_at(Move::Up, t0));
        assert!(!s.accept_at(Move::Up, t0 + Duration::from_millis(100)));
        assert_eq!(s.entered.len(), 1);

        // past the window the next input lands
        assert!(s.accept_at(Move::Up, t0 + Duration::from_millis(301)));
        assert_eq!(s.entered.len(), 2);
    }

    #[test]
    fn test_debounce_window_is_exactly_300ms() {
        let mut s = session(&[Move::Up, Move::Up, Move::Up]);
        let t0 = SystemTime::UNIX_EPOCH;
        assert!(s.accept_at(Move::Up, t0));
        assert!(!s.accept_at(Move::Up, t0 + Duration::from_millis(299)));
        assert!(s.accept_at(Move::Up, t0 + Duration::from_millis(300)));
    }

    #[test]
    fn test_input_ignored_when_buffer_full() {
        let mut s = session(&[Move::Up]);
        enter_all(&mut s, &[Move::Up]);
        assert!(!s.accept_at(Move::A, SystemTime::UNIX_EPOCH + Duration::from_secs(60)));
        assert_eq!(s.entered.len(), 1);
    }

    #[test]
    fn test_input_ignored_during_verdict() {
        let mut s = session(&[Move::Up]);
        enter_all(&mut s, &[Move::Down]);
        assert_eq!(s.phase, Phase::Verdict { valid: false });
        assert!(!s.accept_at(Move::Up, SystemTime::UNIX_EPOCH + Duration::from_secs(60)));
    }

    #[test]
    fn test_valid_verdict_unlocks_after_delay() {
        let mut s = Session::new("galaga".into(), vec![Move::A], &fast_cfg());
        enter_all(&mut s, &[Move::A]);
        assert_eq!(s.phase, Phase::Verdict { valid: true });

        // 100ms delay at 50ms ticks: not done after one tick
        assert_eq!(s.on_tick(), None);
        assert_eq!(tick_until_end(&mut s, 10), Some(SessionEnd::Unlocked));
    }

    #[test]
    fn test_invalid_verdict_resets_to_entering() {
        let mut s = Session::new("galaga".into(), vec![Move::A], &fast_cfg());
        enter_all(&mut s, &[Move::B]);
        assert_eq!(s.phase, Phase::Verdict { valid: false });

        assert_eq!(tick_until_end(&mut s, 10), None);
        assert_eq!(s.phase, Phase::Entering);
        assert_eq!(s.entered.len(), 0);
        assert!(s.polling_active());
    }

    #[test]
    fn test_retry_after_reset_can_succeed() {
        let mut s = Session::new("galaga".into(), vec![Move::A, Move::B], &fast_cfg());
        enter_all(&mut s, &[Move::A, Move::X]);
        assert_eq!(tick_until_end(&mut s, 10), None);

        let mut now = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        for mv in [Move::A, Move::B] {
            now += Duration::from_secs(1);
            assert!(s.accept_at(mv, now));
        }
        assert_eq!(s.phase, Phase::Verdict { valid: true });
    }

    #[test]
    fn test_countdown_reaches_expiry() {
        let mut s = Session::new("galaga".into(), vec![Move::A], &fast_cfg());
        s.start();
        // 1s window at 50ms ticks = 20 ticks to zero
        for _ in 0..20 {
            assert_eq!(s.on_tick(), None);
        }
        assert_eq!(s.phase, Phase::Expired);
        assert!(!s.polling_active());
    }

    #[test]
    fn test_expiry_overrides_partial_correct_entry() {
        let mut s = Session::new("galaga".into(), vec![Move::A, Move::B], &fast_cfg());
        s.accept_at(Move::A, SystemTime::UNIX_EPOCH);
        assert_eq!(s.entered[0].outcome, Outcome::Correct);

        let end = tick_until_end(&mut s, 100);
        assert_eq!(end, Some(SessionEnd::Rejected));
    }

    #[test]
    fn test_countdown_paused_during_verdict() {
        let mut s = Session::new("galaga".into(), vec![Move::A], &cfg());
        enter_all(&mut s, &[Move::A]);
        let before = s.seconds_remaining;
        s.on_tick();
        assert_eq!(s.seconds_remaining, before);
    }

    #[test]
    fn test_seconds_display_rounds_up() {
        let mut s = session(&[Move::A]);
        s.seconds_remaining = 59.2;
        assert_eq!(s.seconds_display(), 60);
        s.seconds_remaining = 0.04;
        assert_eq!(s.seconds_display(), 1);
        s.seconds_remaining = -0.5;
        assert_eq!(s.seconds_display(), 0);
    }

    #[test]
    fn test_time_fraction_clamped() {
        let mut s = session(&[Move::A]);
        assert!((s.time_fraction() - 1.0).abs() < 1e-9);
        s.seconds_remaining = 30.0;
        assert!((s.time_fraction() - 0.5).abs() < 1e-9);
        s.seconds_remaining = -5.0;
        assert_eq!(s.time_fraction(), 0.0);
    }

    #[test]
    fn test_status_text_progression() {
        let mut s = session(&[Move::Up, Move::Down]);
        assert_eq!(s.status_text(), "ENTER FIRST MOVE...");
        s.accept_at(Move::Up, SystemTime::UNIX_EPOCH);
        assert_eq!(s.status_text(), "ENTER NEXT MOVE (2/2)");
        s.accept_at(Move::Down, SystemTime::UNIX_EPOCH + Duration::from_secs(1));
        assert_eq!(s.status_text(), "CODE CORRECT! LAUNCHING GAME...");
    }

    #[test]
    fn test_status_text_failure_and_expiry() {
        let mut s = session(&[Move::Up]);
        s.accept_at(Move::Down, SystemTime::UNIX_EPOCH);
        assert_eq!(s.status_text(), "INCORRECT CODE! TRY AGAIN.");

        let mut s = session(&[Move::Up]);
        s.phase = Phase::Expired;
        assert_eq!(s.status_text(), "TIME'S UP! CODE EXPIRED.");
    }
}
