use crate::errors::AppError;
use crate::models::MembershipStatus;
use crate::storage::{KvStore, MEMBERSHIP_KEY};
use tracing::warn;

/// Stored membership, or `None` when nothing usable is stored.
pub async fn get_membership_status(store: &KvStore) -> Option<MembershipStatus> {
    let raw = store.get(MEMBERSHIP_KEY).await?;
    match serde_json::from_str(&raw) {
        Ok(status) => Some(status),
        Err(err) => {
            warn!("ignoring unreadable membership record: {err}");
            None
        }
    }
}

pub async fn set_membership_status(store: &KvStore, status: MembershipStatus) -> Result<(), AppError> {
    let payload = serde_json::to_string(&status)?;
    store.set(MEMBERSHIP_KEY, payload).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MembershipSource;

    #[tokio::test]
    async fn missing_or_corrupt_status_is_none() {
        let store = KvStore::in_memory();
        assert_eq!(get_membership_status(&store).await, None);

        store.set(MEMBERSHIP_KEY, "{oops".into()).await.unwrap();
        assert_eq!(get_membership_status(&store).await, None);
    }

    #[tokio::test]
    async fn stored_status_is_read_back() {
        let store = KvStore::in_memory();
        let status = MembershipStatus {
            is_active: true,
            source: MembershipSource::Web,
        };
        set_membership_status(&store, status).await.unwrap();
        assert_eq!(get_membership_status(&store).await, Some(status));
    }
}
