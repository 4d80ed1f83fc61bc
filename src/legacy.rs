//! Progress kept by older app builds under individual `appInside:*` keys.

use crate::clock::current_day;
use crate::models::{ProgramState, parse_timestamp};
use crate::storage::{KvStore, LEGACY_COMPLETED_DAYS_KEY, LEGACY_QUIT_START_KEY, LEGACY_TRIGGERS_KEY};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LegacyProgress {
    pub quit_start: Option<DateTime<Utc>>,
    pub completed_days: Vec<u32>,
    pub triggers_count: u64,
}

/// `None` when no legacy key is present at all.
pub async fn read_legacy_progress(store: &KvStore) -> Option<LegacyProgress> {
    let quit_start = store.get(LEGACY_QUIT_START_KEY).await;
    let completed = store.get(LEGACY_COMPLETED_DAYS_KEY).await;
    let triggers = store.get(LEGACY_TRIGGERS_KEY).await;
    if quit_start.is_none() && completed.is_none() && triggers.is_none() {
        return None;
    }

    Some(LegacyProgress {
        quit_start: quit_start.as_deref().and_then(parse_timestamp),
        completed_days: completed.as_deref().map(parse_day_list).unwrap_or_default(),
        triggers_count: triggers.as_deref().map(parse_count).unwrap_or(0),
    })
}

// Non-integer entries are dropped; anything that is not an array reads as empty.
fn parse_day_list(raw: &str) -> Vec<u32> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_u64())
            .filter_map(|day| u32::try_from(day).ok())
            .collect(),
        _ => Vec::new(),
    }
}

fn parse_count(raw: &str) -> u64 {
    let raw = raw.trim();
    raw.parse::<u64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|n| n.is_finite() && *n >= 0.0).map(|n| n as u64))
        .unwrap_or(0)
}

impl LegacyProgress {
    pub fn into_program_state(self, now: DateTime<Utc>) -> ProgramState {
        let mut state = ProgramState::started_at(self.quit_start.unwrap_or(now));
        let today = current_day(state.start_date, now);
        state.completed_days = self
            .completed_days
            .into_iter()
            .filter(|day| (1..=today).contains(day))
            .collect::<BTreeSet<_>>();
        state.tracker_counts.urges = self.triggers_count;
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn no_keys_means_no_legacy_progress() {
        let store = KvStore::in_memory();
        assert_eq!(read_legacy_progress(&store).await, None);
    }

    #[tokio::test]
    async fn legacy_keys_are_parsed_leniently() {
        let store = KvStore::in_memory();
        store
            .multi_set(&[
                (LEGACY_QUIT_START_KEY, "2026-02-01T09:00:00.000Z".into()),
                (LEGACY_COMPLETED_DAYS_KEY, r#"[1, 2, "x", 2, 75, 0]"#.into()),
                (LEGACY_TRIGGERS_KEY, "4".into()),
            ])
            .await
            .unwrap();

        let progress = read_legacy_progress(&store).await.unwrap();
        assert_eq!(progress.quit_start, Some(Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap()));
        assert_eq!(progress.completed_days, vec![1, 2, 2, 75, 0]);
        assert_eq!(progress.triggers_count, 4);

        let now = Utc.with_ymd_and_hms(2026, 2, 10, 0, 0, 0).unwrap();
        let state = progress.into_program_state(now);
        assert_eq!(state.completed_days.into_iter().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(state.tracker_counts.urges, 4);
    }

    #[test]
    fn garbage_values_read_as_empty() {
        assert!(parse_day_list("{\"a\":1}").is_empty());
        assert!(parse_day_list("not json").is_empty());
        assert_eq!(parse_count("abc"), 0);
        assert_eq!(parse_count("7.0"), 7);
    }

    #[test]
    fn future_legacy_days_are_dropped() {
        let now = Utc.with_ymd_and_hms(2026, 2, 10, 12, 0, 0).unwrap();
        let progress = LegacyProgress {
            quit_start: Some(now - chrono::Duration::days(1)),
            completed_days: (1..=7).collect(),
            triggers_count: 0,
        };
        let state = progress.into_program_state(now);
        assert_eq!(state.completed_days.into_iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn missing_quit_start_uses_now() {
        let now = Utc.with_ymd_and_hms(2026, 2, 10, 0, 0, 0).unwrap();
        let state = LegacyProgress::default().into_program_state(now);
        assert_eq!(state.start_date, Some(now));
    }
}
