use crate::clock::{Clock, SystemClock};
use crate::errors::AppError;
use crate::journey::Journey;
use crate::membership::set_membership_status;
use crate::models::MembershipStatus;
use crate::paywall::PaywallGate;
use crate::storage::KvStore;
use crate::triggered::TriggeredTracker;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<KvStore>,
    pub gate: Arc<PaywallGate>,
    pub journey: Arc<Journey>,
    pub triggered: Arc<TriggeredTracker>,
}

impl AppState {
    pub async fn new(store: KvStore) -> Self {
        let store = Arc::new(store);
        let gate = Arc::new(PaywallGate::new(Arc::clone(&store)));
        Self::with_parts(store, gate, Arc::new(SystemClock)).await
    }

    pub async fn with_parts(store: Arc<KvStore>, gate: Arc<PaywallGate>, clock: Arc<dyn Clock>) -> Self {
        let journey = Journey::hydrate(Arc::clone(&store), Arc::clone(&gate), Arc::clone(&clock)).await;
        let triggered = TriggeredTracker::hydrate(Arc::clone(&store), clock).await;
        Self {
            store,
            gate,
            journey: Arc::new(journey),
            triggered: Arc::new(triggered),
        }
    }

    /// Waits for every scheduled journey and session write.
    pub async fn flush(&self) {
        self.journey.flush().await;
        self.triggered.flush().await;
    }

    /// Drops membership and starts the paywall counter over.
    pub async fn sign_out(&self) -> Result<(), AppError> {
        set_membership_status(&self.store, MembershipStatus::default()).await?;
        self.gate.reset().await?;
        info!("signed out");
        Ok(())
    }
}
