//! String key-value storage persisted as a single JSON object on disk.

use crate::errors::AppError;
use std::{collections::BTreeMap, path::Path, path::PathBuf, sync::Arc};
use tokio::fs;
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, error, warn};

pub const JOURNEY_KEY: &str = "dumanless:journey";
pub const MEMBERSHIP_KEY: &str = "dumanless:membership";
pub const PAYWALL_COUNT_KEY: &str = "dumanless:paywall:count";
pub const PAYWALL_THRESHOLD_KEY: &str = "dumanless:paywall:threshold";
pub const TRIGGERED_STATS_KEY: &str = "dumanless:triggered-stats";
pub const LEGACY_QUIT_START_KEY: &str = "appInside:quitStartDate";
pub const LEGACY_COMPLETED_DAYS_KEY: &str = "appInside:completedDays";
pub const LEGACY_TRIGGERS_KEY: &str = "appInside:triggersCount";

type Entries = BTreeMap<String, String>;

#[derive(Debug)]
pub struct KvStore {
    path: Option<PathBuf>,
    entries: Mutex<Entries>,
}

impl KvStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(Entries::new()),
        }
    }

    pub async fn open(path: PathBuf) -> Self {
        let entries = load_entries(&path).await;
        Self {
            path: Some(path),
            entries: Mutex::new(entries),
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().await.get(key).cloned()
    }

    pub async fn set(&self, key: &str, value: String) -> Result<(), AppError> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value);
        self.persist(&entries).await
    }

    pub async fn multi_set(&self, pairs: &[(&str, String)]) -> Result<(), AppError> {
        let mut entries = self.entries.lock().await;
        for (key, value) in pairs {
            entries.insert((*key).to_string(), value.clone());
        }
        self.persist(&entries).await
    }

    pub async fn multi_remove(&self, keys: &[&str]) -> Result<(), AppError> {
        let mut entries = self.entries.lock().await;
        for key in keys {
            entries.remove(*key);
        }
        self.persist(&entries).await
    }

    // Called with the entries lock held so file writes never interleave.
    async fn persist(&self, entries: &Entries) -> Result<(), AppError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let payload = serde_json::to_vec_pretty(entries).map_err(AppError::internal)?;
        fs::write(path, payload).await.map_err(AppError::internal)?;
        Ok(())
    }
}

async fn load_entries(path: &Path) -> Entries {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(entries) => entries,
            Err(err) => {
                error!("failed to parse data file: {err}");
                Entries::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Entries::default(),
        Err(err) => {
            error!("failed to read data file: {err}");
            Entries::default()
        }
    }
}

enum WriteOp {
    Set { key: &'static str, value: String },
    Flush(oneshot::Sender<()>),
}

/// Fire-and-forget writes applied by one background task in the order they
/// were scheduled.
#[derive(Clone)]
pub struct PersistQueue {
    tx: mpsc::UnboundedSender<WriteOp>,
}

impl PersistQueue {
    /// Must be called from within a tokio runtime.
    pub fn spawn(store: Arc<KvStore>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(op) = rx.recv().await {
                match op {
                    WriteOp::Set { key, value } => {
                        if let Err(err) = store.set(key, value).await {
                            warn!(key, "persist failed: {}", err.message);
                        } else {
                            debug!(key, "persisted");
                        }
                    }
                    WriteOp::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });
        Self { tx }
    }

    pub fn schedule(&self, key: &'static str, value: String) {
        if self.tx.send(WriteOp::Set { key, value }).is_err() {
            warn!(key, "persist queue closed, dropping write");
        }
    }

    /// Resolves once every write scheduled before this call has been attempted.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(WriteOp::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = KvStore::open(path.clone()).await;
        store.set("a", "1".into()).await.unwrap();
        store
            .multi_set(&[("b", "2".into()), ("c", "3".into())])
            .await
            .unwrap();
        store.multi_remove(&["c"]).await.unwrap();

        let reopened = KvStore::open(path).await;
        assert_eq!(reopened.get("a").await.as_deref(), Some("1"));
        assert_eq!(reopened.get("b").await.as_deref(), Some("2"));
        assert_eq!(reopened.get("c").await, None);
    }

    #[tokio::test]
    async fn corrupt_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let store = KvStore::open(path).await;
        assert_eq!(store.get(JOURNEY_KEY).await, None);
    }

    #[tokio::test]
    async fn failed_write_keeps_value_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::open(dir.path().join("missing").join("state.json")).await;

        assert!(store.set("a", "1".into()).await.is_err());
        assert_eq!(store.get("a").await.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn queue_applies_writes_in_order() {
        let store = Arc::new(KvStore::in_memory());
        let queue = PersistQueue::spawn(Arc::clone(&store));
        for n in 0..50 {
            queue.schedule(JOURNEY_KEY, n.to_string());
        }
        queue.flush().await;
        assert_eq!(store.get(JOURNEY_KEY).await.as_deref(), Some("49"));
    }
}
