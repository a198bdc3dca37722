//! SM-2 spaced-repetition scheduling.
//!
//! `schedule_next` is a pure function from prior scheduling state and
//! a recall quality to the next schedule. All I/O and persistence live
//! in the progress aggregator (`crate::review`).
//!
//! Quality scale (0-5): below 3 is a lapse, 3 and up is a pass.
//! Learner feedback maps onto it as hard=2, good=4, easy=5, so "hard"
//! counts as an incorrect recall.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Ease factor never drops below this.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Ease factor for a card that has never been reviewed.
pub const INITIAL_EASE_FACTOR: f64 = 2.5;

/// Learner feedback on a single review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Hard,
    Good,
    Easy,
}

impl Feedback {
    /// SM-2 quality for this feedback.
    #[must_use]
    pub const fn quality(self) -> u8 {
        match self {
            Feedback::Hard => 2,
            Feedback::Good => 4,
            Feedback::Easy => 5,
        }
    }

    /// A pass is quality 3 or better.
    #[must_use]
    pub const fn is_pass(self) -> bool {
        self.quality() >= 3
    }
}

/// Scheduling state carried on a progress row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SrsState {
    pub repetitions: i32,
    pub interval_days: i32,
    pub ease_factor: f64,
}

/// Output of one scheduling step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Schedule {
    pub repetitions: i32,
    pub interval_days: i32,
    pub ease_factor: f64,
    pub next_review_at: DateTime<Utc>,
}

/// Advances the SM-2 recurrence by one review.
///
/// A lapse (quality < 3) resets repetitions to 0 and the interval to
/// one day. A pass increments repetitions; the interval is 1 day for
/// the first repetition, 6 for the second, and prior interval times
/// ease factor after that. The ease factor updates on every review,
/// pass or fail, floored at [`MIN_EASE_FACTOR`].
#[must_use]
pub fn schedule_next(prior: Option<&SrsState>, quality: u8, now: DateTime<Utc>) -> Schedule {
    let quality = quality.min(5);
    let (prior_repetitions, prior_interval, prior_ease) = match prior {
        Some(s) => (s.repetitions, s.interval_days, s.ease_factor),
        None => (0, 0, INITIAL_EASE_FACTOR),
    };

    let miss = f64::from(5 - quality);
    let ease_factor = (prior_ease + 0.1 - miss * (0.08 + miss * 0.02)).max(MIN_EASE_FACTOR);

    let (repetitions, interval_days) = if quality < 3 {
        (0, 1)
    } else {
        let repetitions = prior_repetitions + 1;
        let interval_days = match repetitions {
            1 => 1,
            2 => 6,
            _ => (f64::from(prior_interval) * ease_factor).round() as i32,
        };
        (repetitions, interval_days)
    };

    Schedule {
        repetitions,
        interval_days,
        ease_factor,
        next_review_at: now + Duration::days(i64::from(interval_days)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(repetitions: i32, interval_days: i32, ease_factor: f64) -> SrsState {
        SrsState {
            repetitions,
            interval_days,
            ease_factor,
        }
    }

    #[test]
    fn test_deterministic() {
        let now = Utc::now();
        let prior = state(3, 14, 2.2);
        let a = schedule_next(Some(&prior), 4, now);
        let b = schedule_next(Some(&prior), 4, now);
        assert_eq!(a, b);
    }

    #[test]
    fn test_first_review_pass() {
        let now = Utc::now();
        let result = schedule_next(None, Feedback::Good.quality(), now);
        assert_eq!(result.repetitions, 1);
        assert_eq!(result.interval_days, 1);
        // good leaves the ease factor unchanged: 0.1 - 1*(0.08+0.02) = 0
        assert!((result.ease_factor - INITIAL_EASE_FACTOR).abs() < 1e-9);
        assert_eq!(result.next_review_at, now + Duration::days(1));
    }

    #[test]
    fn test_second_repetition_interval_is_six() {
        let now = Utc::now();
        let result = schedule_next(Some(&state(1, 1, 2.5)), 4, now);
        assert_eq!(result.repetitions, 2);
        assert_eq!(result.interval_days, 6);
    }

    #[test]
    fn test_multiplicative_branch() {
        let now = Utc::now();
        let result = schedule_next(Some(&state(2, 6, 2.5)), 4, now);
        assert_eq!(result.repetitions, 3);
        // 6 * 2.5 = 15
        assert_eq!(result.interval_days, 15);
    }

    #[test]
    fn test_lapse_resets() {
        let now = Utc::now();
        for prior in [state(0, 0, 2.5), state(5, 120, 2.8), state(1, 1, 1.3)] {
            let result = schedule_next(Some(&prior), Feedback::Hard.quality(), now);
            assert_eq!(result.repetitions, 0);
            assert_eq!(result.interval_days, 1);
        }
    }

    #[test]
    fn test_ease_factor_never_below_floor() {
        let now = Utc::now();
        let mut current = state(0, 0, INITIAL_EASE_FACTOR);
        for quality in [0, 1, 2, 0, 2, 1, 0, 0] {
            let result = schedule_next(Some(&current), quality, now);
            assert!(result.ease_factor >= MIN_EASE_FACTOR);
            current = state(result.repetitions, result.interval_days, result.ease_factor);
        }
    }

    #[test]
    fn test_easy_raises_ease_factor() {
        let now = Utc::now();
        let result = schedule_next(Some(&state(2, 6, 2.5)), Feedback::Easy.quality(), now);
        assert!((result.ease_factor - 2.6).abs() < 1e-9);
    }

    #[test]
    fn test_feedback_quality_mapping() {
        assert_eq!(Feedback::Hard.quality(), 2);
        assert_eq!(Feedback::Good.quality(), 4);
        assert_eq!(Feedback::Easy.quality(), 5);
        assert!(!Feedback::Hard.is_pass());
        assert!(Feedback::Good.is_pass());
        assert!(Feedback::Easy.is_pass());
    }
}
