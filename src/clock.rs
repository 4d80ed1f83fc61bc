//! Maps a program start timestamp and the current time to a program day and
//! an elapsed-time breakdown.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Mutex;

pub const PROGRAM_DAYS: u32 = 60;

const MS_PER_DAY: i64 = 86_400_000;
const MS_PER_MINUTE: i64 = 60_000;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct Elapsed {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
}

/// 1-indexed program day, clamped to `1..=PROGRAM_DAYS`. A missing start is day 1.
pub fn current_day(start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u32 {
    let Some(start) = start else {
        return 1;
    };

    let days = (now - start).num_milliseconds().div_euclid(MS_PER_DAY) + 1;
    days.clamp(1, i64::from(PROGRAM_DAYS)) as u32
}

pub fn elapsed(start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Elapsed {
    let Some(start) = start else {
        return Elapsed::default();
    };

    let total_minutes = (now - start).num_milliseconds().div_euclid(MS_PER_MINUTE).max(0) as u64;
    let days = total_minutes / (60 * 24);
    let hours = (total_minutes - days * 60 * 24) / 60;

    Elapsed {
        days,
        hours,
        minutes: total_minutes % 60,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, minute, 0).unwrap()
    }

    #[test]
    fn three_days_ago_is_day_four() {
        let now = at(10, 12, 0);
        assert_eq!(current_day(Some(now - Duration::days(3)), now), 4);
    }

    #[test]
    fn day_is_clamped_to_program_length() {
        let now = at(10, 12, 0);
        assert_eq!(current_day(Some(now - Duration::days(100)), now), 60);
        assert_eq!(current_day(Some(now + Duration::days(2)), now), 1);
    }

    #[test]
    fn missing_start_is_day_one() {
        assert_eq!(current_day(None, at(1, 0, 0)), 1);
        assert_eq!(elapsed(None, at(1, 0, 0)), Elapsed::default());
    }

    #[test]
    fn day_is_monotonic_and_bounded() {
        let start = at(1, 8, 30);
        let mut previous = 0;
        for step in 0..(70 * 24) {
            let day = current_day(Some(start), start + Duration::hours(step));
            assert!((1..=PROGRAM_DAYS).contains(&day));
            assert!(day >= previous);
            previous = day;
        }
        assert_eq!(previous, PROGRAM_DAYS);
    }

    #[test]
    fn day_rolls_over_exactly_after_24_hours() {
        let start = at(1, 8, 30);
        assert_eq!(current_day(Some(start), start + Duration::milliseconds(MS_PER_DAY - 1)), 1);
        assert_eq!(current_day(Some(start), start + Duration::days(1)), 2);
    }

    #[test]
    fn elapsed_breaks_down_minutes() {
        let start = at(1, 0, 0);
        let now = start + Duration::days(2) + Duration::hours(5) + Duration::minutes(7) + Duration::seconds(59);
        assert_eq!(
            elapsed(Some(start), now),
            Elapsed {
                days: 2,
                hours: 5,
                minutes: 7
            }
        );
    }

    #[test]
    fn negative_elapsed_is_zero() {
        let now = at(5, 0, 0);
        assert_eq!(elapsed(Some(now + Duration::hours(3)), now), Elapsed::default());
    }

    #[test]
    fn fixed_clock_advances() {
        let clock = FixedClock::new(at(1, 0, 0));
        clock.advance(Duration::hours(25));
        assert_eq!(clock.now(), at(2, 1, 0));
        clock.set(at(3, 0, 0));
        assert_eq!(clock.now(), at(3, 0, 0));
    }
}
