//! The 60-day program progress: reducers over `ProgramState` and the
//! `Journey` aggregate that owns the live state.

use crate::clock::{Clock, current_day, elapsed};
use crate::legacy::read_legacy_progress;
use crate::models::{
    DailyTasks, JourneySnapshot, Mood, Note, ProgramState, TaskKey, TriggerLog, Weekday, next_mood,
};
use crate::paywall::PaywallGate;
use crate::stats::{build_stats, longest_streak};
use crate::storage::{JOURNEY_KEY, KvStore, PersistQueue};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

const MAX_INTENSITY: i64 = 10;

impl ProgramState {
    /// Past and current days only; completing a day twice changes nothing.
    pub fn complete_day(&mut self, day: u32, current_day: u32) -> bool {
        if day == 0 || day > current_day {
            return false;
        }
        self.completed_days.insert(day)
    }

    pub fn record_trigger(&mut self, intensity: i64, emotion: &str, situation: &str, at: DateTime<Utc>) {
        self.trigger_logs.push(TriggerLog {
            intensity: intensity.clamp(0, MAX_INTENSITY) as u8,
            emotion: emotion.to_string(),
            situation: situation.to_string(),
            created_at: at,
        });
        self.tracker_counts.urges += 1;
    }

    pub fn record_crisis_win(&mut self) {
        self.tracker_counts.wins += 1;
    }

    pub fn record_smoked(&mut self) {
        self.tracker_counts.smoked += 1;
    }

    pub fn record_breath(&mut self) {
        self.tracker_counts.breath += 1;
    }

    /// Stores the trimmed text; blank notes are ignored.
    pub fn add_note(&mut self, text: &str, at: DateTime<Utc>) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        self.notes.push(Note {
            text: text.to_string(),
            created_at: at,
        });
        self.tracker_counts.notes += 1;
        true
    }

    pub fn set_mood(&mut self, day: Weekday, mood: Option<Mood>) {
        self.moods.insert(day, mood);
    }

    pub fn cycle_mood(&mut self, day: Weekday) -> Mood {
        let next = next_mood(self.moods.get(&day).and_then(Option::as_ref));
        self.moods.insert(day, Some(next.clone()));
        next
    }

    /// Returns the flag's new value.
    pub fn toggle_task(&mut self, task: TaskKey) -> bool {
        let flag = self.daily_tasks.flag_mut(task);
        *flag = !*flag;
        *flag
    }

    pub fn reset_daily_tasks(&mut self) {
        self.daily_tasks = DailyTasks::default();
    }

    pub fn restart(&mut self, now: DateTime<Utc>) {
        self.start_date = Some(now);
        self.completed_days.clear();
    }

    /// Drops completed days outside `1..=current_day`.
    pub fn normalize(&mut self, now: DateTime<Utc>) {
        let today = current_day(self.start_date, now);
        self.completed_days.retain(|day| (1..=today).contains(day));
    }
}

/// What a mutation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Outcome {
    pub applied: bool,
    pub show_paywall: bool,
}

pub struct Journey {
    state: Mutex<ProgramState>,
    clock: Arc<dyn Clock>,
    queue: PersistQueue,
    gate: Arc<PaywallGate>,
    paywall_trigger_id: AtomicU64,
}

impl Journey {
    /// Loads the stored program (migrating legacy keys when no program is
    /// stored yet) and writes the result back.
    pub async fn hydrate(store: Arc<KvStore>, gate: Arc<PaywallGate>, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        let mut state = load_state(&store, now).await;
        state.normalize(now);

        let queue = PersistQueue::spawn(store);
        schedule_persist(&queue, &state);

        Self {
            state: Mutex::new(state),
            clock,
            queue,
            gate,
            paywall_trigger_id: AtomicU64::new(0),
        }
    }

    pub async fn snapshot(&self) -> JourneySnapshot {
        let state = self.state.lock().await.clone();
        let now = self.clock.now();
        let elapsed = elapsed(state.start_date, now);

        JourneySnapshot {
            current_day: current_day(state.start_date, now),
            stats: build_stats(elapsed.days),
            longest_streak: longest_streak(&state.completed_days),
            elapsed,
            paywall_trigger_id: self.paywall_trigger_id.load(Ordering::SeqCst),
            state,
        }
    }

    pub async fn current_day(&self) -> u32 {
        let start = self.state.lock().await.start_date;
        current_day(start, self.clock.now())
    }

    pub fn paywall_trigger_id(&self) -> u64 {
        self.paywall_trigger_id.load(Ordering::SeqCst)
    }

    pub async fn mark_day_complete(&self, day: u32) -> Outcome {
        let applied = self
            .mutate(|state, now| {
                let today = current_day(state.start_date, now);
                state.complete_day(day, today)
            })
            .await;
        Outcome {
            applied,
            show_paywall: false,
        }
    }

    pub async fn log_trigger(&self, intensity: i64, emotion: &str, situation: &str) -> Outcome {
        self.mutate(|state, now| {
            state.record_trigger(intensity, emotion, situation, now);
            true
        })
        .await;
        self.non_member_action("trigger").await
    }

    pub async fn log_crisis_win(&self) -> Outcome {
        self.mutate(|state, _| {
            state.record_crisis_win();
            true
        })
        .await;
        self.non_member_action("crisisWin").await
    }

    pub async fn log_smoked(&self) -> Outcome {
        self.mutate(|state, _| {
            state.record_smoked();
            true
        })
        .await;
        self.non_member_action("smoked").await
    }

    pub async fn add_note(&self, text: &str) -> Outcome {
        if !self.mutate(|state, now| state.add_note(text, now)).await {
            return Outcome::default();
        }
        self.non_member_action("note").await
    }

    pub async fn increment_breath(&self) -> Outcome {
        self.mutate(|state, _| {
            state.record_breath();
            true
        })
        .await;
        self.non_member_action("breath").await
    }

    /// Unknown weekday keys are ignored.
    pub async fn set_mood_for_day(&self, weekday: &str, mood: Option<Mood>) -> Outcome {
        let Some(day) = Weekday::from_key(weekday) else {
            return Outcome::default();
        };
        let applied = self
            .mutate(|state, _| {
                state.set_mood(day, mood);
                true
            })
            .await;
        Outcome {
            applied,
            show_paywall: false,
        }
    }

    pub async fn cycle_mood(&self, weekday: &str) -> Option<Mood> {
        let day = Weekday::from_key(weekday)?;
        let mut next = None;
        self.mutate(|state, _| {
            next = Some(state.cycle_mood(day));
            true
        })
        .await;
        next
    }

    pub async fn toggle_task(&self, task: TaskKey) -> Outcome {
        self.mutate(|state, _| {
            state.toggle_task(task);
            true
        })
        .await;
        self.non_member_action(&format!("task:{task}")).await
    }

    pub async fn reset_daily_tasks(&self) -> Outcome {
        let applied = self
            .mutate(|state, _| {
                state.reset_daily_tasks();
                true
            })
            .await;
        Outcome {
            applied,
            show_paywall: false,
        }
    }

    pub async fn set_start_today(&self) -> Outcome {
        let applied = self
            .mutate(|state, now| {
                state.restart(now);
                true
            })
            .await;
        info!("program restarted");
        Outcome {
            applied,
            show_paywall: false,
        }
    }

    /// Waits for every persist scheduled so far.
    pub async fn flush(&self) {
        self.queue.flush().await;
    }

    async fn mutate<F>(&self, update: F) -> bool
    where
        F: FnOnce(&mut ProgramState, DateTime<Utc>) -> bool,
    {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        if !update(&mut *state, now) {
            return false;
        }
        // Scheduled under the lock so snapshots reach storage in mutation order.
        schedule_persist(&self.queue, &state);
        true
    }

    async fn non_member_action(&self, reason: &str) -> Outcome {
        let show_paywall = self.gate.record_non_member_action(reason).await;
        if show_paywall {
            self.paywall_trigger_id.fetch_add(1, Ordering::SeqCst);
        }
        Outcome {
            applied: true,
            show_paywall,
        }
    }
}

fn schedule_persist(queue: &PersistQueue, state: &ProgramState) {
    match serde_json::to_string(state) {
        Ok(payload) => queue.schedule(JOURNEY_KEY, payload),
        Err(err) => warn!("failed to serialize journey: {err}"),
    }
}

async fn load_state(store: &KvStore, now: DateTime<Utc>) -> ProgramState {
    if let Some(raw) = store.get(JOURNEY_KEY).await {
        return match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(err) => {
                error!("failed to parse stored journey, starting fresh: {err}");
                ProgramState::started_at(now)
            }
        };
    }

    match read_legacy_progress(store).await {
        Some(progress) => {
            info!("migrating legacy progress");
            progress.into_program_state(now)
        }
        None => ProgramState::started_at(now),
    }
}
