//! Randomized gate that turns a stream of non-member actions into an
//! occasional "show the paywall" signal.

use crate::errors::AppError;
use crate::membership::get_membership_status;
use crate::storage::{KvStore, PAYWALL_COUNT_KEY, PAYWALL_THRESHOLD_KEY};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const THRESHOLD_RANGE: RangeInclusive<u32> = 3..=5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateDecision {
    pub should_trigger: bool,
    pub next_count: u32,
    pub next_threshold: u32,
}

/// Pure gate step. `draw` supplies a fresh threshold when one is missing or
/// has just been reached. Members pass through untouched.
pub fn decide(
    count: u32,
    threshold: Option<u32>,
    is_member: bool,
    mut draw: impl FnMut() -> u32,
) -> GateDecision {
    let threshold = threshold.unwrap_or_else(&mut draw);
    if is_member {
        return GateDecision {
            should_trigger: false,
            next_count: count,
            next_threshold: threshold,
        };
    }

    let next_count = count.saturating_add(1);
    if next_count >= threshold {
        GateDecision {
            should_trigger: true,
            next_count: 0,
            next_threshold: draw(),
        }
    } else {
        GateDecision {
            should_trigger: false,
            next_count,
            next_threshold: threshold,
        }
    }
}

pub struct PaywallGate {
    store: Arc<KvStore>,
    // Held across each read-modify-write so counter updates never interleave.
    rng: Mutex<StdRng>,
}

impl PaywallGate {
    pub fn new(store: Arc<KvStore>) -> Self {
        Self::with_rng(store, StdRng::from_entropy())
    }

    pub fn with_rng(store: Arc<KvStore>, rng: StdRng) -> Self {
        Self {
            store,
            rng: Mutex::new(rng),
        }
    }

    /// Returns `true` when the paywall should be shown now. Storage failures
    /// never surface: they read as "do not show".
    pub async fn record_non_member_action(&self, reason: &str) -> bool {
        match self.try_record(reason).await {
            Ok(show) => show,
            Err(err) => {
                warn!(reason, "paywall gate check failed: {}", err.message);
                false
            }
        }
    }

    async fn try_record(&self, reason: &str) -> Result<bool, AppError> {
        let membership = get_membership_status(&self.store).await;
        if membership.is_some_and(|status| status.is_active) {
            return Ok(false);
        }

        let mut rng = self.rng.lock().await;
        let count = read_number(&self.store, PAYWALL_COUNT_KEY).await.unwrap_or(0);
        let threshold = read_number(&self.store, PAYWALL_THRESHOLD_KEY)
            .await
            .filter(|value| *value > 0);

        let decision = decide(count, threshold, false, || rng.gen_range(THRESHOLD_RANGE));
        self.store
            .multi_set(&[
                (PAYWALL_COUNT_KEY, decision.next_count.to_string()),
                (PAYWALL_THRESHOLD_KEY, decision.next_threshold.to_string()),
            ])
            .await?;

        if decision.should_trigger {
            info!(reason, count = count.saturating_add(1), "paywall triggered");
        } else {
            debug!(
                reason,
                count = decision.next_count,
                threshold = decision.next_threshold,
                "paywall counter"
            );
        }
        Ok(decision.should_trigger)
    }

    /// Clears the stored counter and threshold.
    pub async fn reset(&self) -> Result<(), AppError> {
        let _guard = self.rng.lock().await;
        self.store
            .multi_remove(&[PAYWALL_COUNT_KEY, PAYWALL_THRESHOLD_KEY])
            .await
    }

    /// Current `(count, threshold)` as stored.
    pub async fn counter(&self) -> (Option<u32>, Option<u32>) {
        (
            read_number(&self.store, PAYWALL_COUNT_KEY).await,
            read_number(&self.store, PAYWALL_THRESHOLD_KEY).await,
        )
    }
}

async fn read_number(store: &KvStore, key: &str) -> Option<u32> {
    store.get(key).await?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::set_membership_status;
    use crate::models::{MembershipSource, MembershipStatus};

    fn gate_with_seed(store: &Arc<KvStore>, seed: u64) -> PaywallGate {
        PaywallGate::with_rng(Arc::clone(store), StdRng::seed_from_u64(seed))
    }

    #[test]
    fn decide_triggers_at_threshold() {
        let decision = decide(2, Some(3), false, || 5);
        assert_eq!(
            decision,
            GateDecision {
                should_trigger: true,
                next_count: 0,
                next_threshold: 5,
            }
        );
    }

    #[test]
    fn decide_counts_below_threshold() {
        let decision = decide(0, Some(4), false, || unreachable!());
        assert!(!decision.should_trigger);
        assert_eq!(decision.next_count, 1);
        assert_eq!(decision.next_threshold, 4);
    }

    #[test]
    fn decide_draws_missing_threshold() {
        let mut draws = vec![3, 4].into_iter();
        let decision = decide(0, None, false, || draws.next().unwrap());
        assert_eq!(decision.next_threshold, 3);
        assert_eq!(decision.next_count, 1);
    }

    #[test]
    fn decide_never_triggers_for_members() {
        for count in 0..10 {
            for threshold in [None, Some(1), Some(3), Some(5)] {
                let decision = decide(count, threshold, true, || 3);
                assert!(!decision.should_trigger);
                assert_eq!(decision.next_count, count);
            }
        }
    }

    #[test]
    fn decide_keeps_count_below_threshold() {
        let mut count = 0;
        let mut threshold = None;
        let mut next = 3;
        for _ in 0..100 {
            let decision = decide(count, threshold, false, || {
                next = if next == 5 { 3 } else { next + 1 };
                next
            });
            assert!(decision.next_count < decision.next_threshold);
            count = decision.next_count;
            threshold = Some(decision.next_threshold);
        }
    }

    #[tokio::test]
    async fn gate_resets_counter_on_trigger() {
        let store = Arc::new(KvStore::in_memory());
        store
            .multi_set(&[
                (PAYWALL_COUNT_KEY, "2".into()),
                (PAYWALL_THRESHOLD_KEY, "3".into()),
            ])
            .await
            .unwrap();
        let gate = gate_with_seed(&store, 7);

        assert!(gate.record_non_member_action("note").await);
        let (count, threshold) = gate.counter().await;
        assert_eq!(count, Some(0));
        assert!(THRESHOLD_RANGE.contains(&threshold.unwrap()));
    }

    #[tokio::test]
    async fn saturated_counter_triggers_with_logging_enabled() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        let _default = tracing::subscriber::set_default(subscriber);

        let store = Arc::new(KvStore::in_memory());
        store
            .multi_set(&[
                (PAYWALL_COUNT_KEY, u32::MAX.to_string()),
                (PAYWALL_THRESHOLD_KEY, "3".into()),
            ])
            .await
            .unwrap();
        let gate = gate_with_seed(&store, 13);

        assert!(gate.record_non_member_action("smoked").await);
        assert_eq!(gate.counter().await.0, Some(0));
    }

    #[tokio::test]
    async fn gate_triggers_within_five_actions() {
        let store = Arc::new(KvStore::in_memory());
        let gate = gate_with_seed(&store, 42);

        let mut triggers = 0;
        for step in 1..=5 {
            if gate.record_non_member_action("breath").await {
                triggers += 1;
                assert!(step >= 3);
            }
        }
        assert_eq!(triggers, 1);
    }

    #[tokio::test]
    async fn members_are_never_gated() {
        let store = Arc::new(KvStore::in_memory());
        set_membership_status(
            &store,
            MembershipStatus {
                is_active: true,
                source: MembershipSource::Revenuecat,
            },
        )
        .await
        .unwrap();
        let gate = gate_with_seed(&store, 1);

        for _ in 0..20 {
            assert!(!gate.record_non_member_action("trigger").await);
        }
        assert_eq!(gate.counter().await, (None, None));
    }

    #[tokio::test]
    async fn unreadable_counter_starts_over() {
        let store = Arc::new(KvStore::in_memory());
        store
            .multi_set(&[
                (PAYWALL_COUNT_KEY, "many".into()),
                (PAYWALL_THRESHOLD_KEY, "NaN".into()),
            ])
            .await
            .unwrap();
        let gate = gate_with_seed(&store, 3);

        assert!(!gate.record_non_member_action("smoked").await);
        let (count, threshold) = gate.counter().await;
        assert_eq!(count, Some(1));
        assert!(THRESHOLD_RANGE.contains(&threshold.unwrap()));
    }

    #[tokio::test]
    async fn storage_failure_reads_as_no_paywall() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(KvStore::open(dir.path().join("absent").join("state.json")).await);
        let gate = gate_with_seed(&store, 9);

        for _ in 0..10 {
            assert!(!gate.record_non_member_action("note").await);
        }
    }

    #[tokio::test]
    async fn reset_clears_counter() {
        let store = Arc::new(KvStore::in_memory());
        let gate = gate_with_seed(&store, 5);
        gate.record_non_member_action("note").await;
        assert_eq!(gate.counter().await.0, Some(1));

        gate.reset().await.unwrap();
        assert_eq!(gate.counter().await, (None, None));
    }
}
