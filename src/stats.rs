use crate::clock::PROGRAM_DAYS;
use serde::Serialize;
use std::collections::BTreeSet;

const CIGARETTES_PER_DAY: u64 = 12;
const PRICE_PER_PACK: f64 = 70.0;
const CIGARETTES_PER_PACK: f64 = 20.0;
const MINUTES_PER_CIGARETTE: u64 = 6;
const LIFE_MINUTES_PER_CIGARETTE: f64 = 11.0;

/// Display estimates derived from elapsed whole days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyStats {
    pub money_saved: u64,
    pub cigarettes_skipped: u64,
    pub time_saved_minutes: u64,
    pub life_gained_minutes: u64,
}

pub fn build_stats(elapsed_days: u64) -> JourneyStats {
    let cigarettes = elapsed_days.max(1) * CIGARETTES_PER_DAY;
    let per_cigarette = PRICE_PER_PACK / CIGARETTES_PER_PACK;

    JourneyStats {
        money_saved: (cigarettes as f64 * per_cigarette).round() as u64,
        cigarettes_skipped: cigarettes,
        time_saved_minutes: cigarettes * MINUTES_PER_CIGARETTE,
        life_gained_minutes: (cigarettes as f64 * LIFE_MINUTES_PER_CIGARETTE).round() as u64,
    }
}

/// Longest run of consecutive completed days inside the program window.
pub fn longest_streak(completed: &BTreeSet<u32>) -> u32 {
    let mut longest = 0;
    let mut current = 0;
    for day in 1..=PROGRAM_DAYS {
        if completed.contains(&day) {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}
