//! Per-day tally of craving sessions (breathing exercises and quick wins),
//! kept apart from the journey blob.

use crate::clock::Clock;
use crate::storage::{KvStore, PersistQueue, TRIGGERED_STATS_KEY};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggeredStats {
    #[serde(default)]
    pub today_count: u64,
    #[serde(default)]
    pub total_sessions: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_session_at: Option<DateTime<Utc>>,
    pub date: NaiveDate,
}

impl TriggeredStats {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today_count: 0,
            total_sessions: 0,
            last_session_at: None,
            date: today,
        }
    }

    /// A new UTC day clears the daily tally; the lifetime session count stays.
    pub fn roll_over(&mut self, today: NaiveDate) {
        if self.date != today {
            *self = Self {
                total_sessions: self.total_sessions,
                ..Self::new(today)
            };
        }
    }

    /// A finished breathing session.
    pub fn record_session(&mut self, now: DateTime<Utc>) {
        self.roll_over(now.date_naive());
        self.today_count += 1;
        self.total_sessions += 1;
        self.last_session_at = Some(now);
    }

    /// Counts toward today only.
    pub fn quick_win(&mut self, now: DateTime<Utc>) {
        self.roll_over(now.date_naive());
        self.today_count += 1;
        self.last_session_at = Some(now);
    }
}

pub struct TriggeredTracker {
    stats: Mutex<TriggeredStats>,
    clock: Arc<dyn Clock>,
    queue: PersistQueue,
}

impl TriggeredTracker {
    pub async fn hydrate(store: Arc<KvStore>, clock: Arc<dyn Clock>) -> Self {
        let today = clock.now().date_naive();
        let mut stats = match store.get(TRIGGERED_STATS_KEY).await {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                error!("failed to parse stored triggered stats: {err}");
                TriggeredStats::new(today)
            }),
            None => TriggeredStats::new(today),
        };
        stats.roll_over(today);

        Self {
            stats: Mutex::new(stats),
            clock,
            queue: PersistQueue::spawn(store),
        }
    }

    pub async fn snapshot(&self) -> TriggeredStats {
        let mut stats = self.stats.lock().await.clone();
        stats.roll_over(self.clock.now().date_naive());
        stats
    }

    pub async fn record_session(&self) -> TriggeredStats {
        self.update(TriggeredStats::record_session).await
    }

    pub async fn quick_win(&self) -> TriggeredStats {
        self.update(TriggeredStats::quick_win).await
    }

    pub async fn flush(&self) {
        self.queue.flush().await;
    }

    async fn update(&self, apply: fn(&mut TriggeredStats, DateTime<Utc>)) -> TriggeredStats {
        let now = self.clock.now();
        let mut stats = self.stats.lock().await;
        apply(&mut *stats, now);
        match serde_json::to_string(&*stats) {
            Ok(payload) => self.queue.schedule(TRIGGERED_STATS_KEY, payload),
            Err(err) => warn!("failed to serialize triggered stats: {err}"),
        }
        stats.clone()
    }
}
