//! Local file-based state storage backend.
//!
//! State lives in `.azad/state.json` next to the configuration file, with a
//! sibling `state.lock` guarding concurrent runs.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{AzadError, Result, StateError};

use super::lock::{generate_holder_id, LockInfo, LOCK_EXPIRY_SECS};
use super::store::StateStore;
use super::types::{ProviderState, STATE_VERSION};

/// Default state directory name.
pub const STATE_DIR: &str = ".azad";

/// State file name.
const STATE_FILE: &str = "state.json";

/// Lock file name.
const LOCK_FILE: &str = "state.lock";

/// Local file-based state store.
#[derive(Debug)]
pub struct LocalStateStore {
    /// Base directory for state files.
    base_dir: PathBuf,
    /// Path to the state file.
    state_path: PathBuf,
    /// Path to the lock file.
    lock_path: PathBuf,
}

impl LocalStateStore {
    /// Creates a store under `.azad` in the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined.
    pub fn new() -> Result<Self> {
        let base_dir = std::env::current_dir()
            .map_err(|e| AzadError::internal(format!("Cannot determine current directory: {e}")))?
            .join(STATE_DIR);

        Ok(Self::with_base_dir(base_dir))
    }

    /// Creates a store with a custom base directory.
    #[must_use]
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let state_path = base_dir.join(STATE_FILE);
        let lock_path = base_dir.join(LOCK_FILE);

        Self {
            base_dir,
            state_path,
            lock_path,
        }
    }

    /// Path of the state file.
    #[must_use]
    pub const fn state_path(&self) -> &PathBuf {
        &self.state_path
    }

    async fn ensure_dir(&self) -> Result<()> {
        if !self.base_dir.exists() {
            debug!("Creating state directory: {}", self.base_dir.display());
            fs::create_dir_all(&self.base_dir).await.map_err(|e| {
                AzadError::State(StateError::WriteFailed {
                    message: format!("Failed to create state directory: {e}"),
                })
            })?;
        }
        Ok(())
    }

    async fn read_lock_file(&self) -> Result<Option<LockInfo>> {
        if !self.lock_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.lock_path)
            .await
            .map_err(|e| StateError::corrupted(format!("Failed to read lock file: {e}")))?;

        let lock_info: LockInfo = serde_json::from_str(&content)
            .map_err(|e| StateError::corrupted(format!("Failed to parse lock file: {e}")))?;

        Ok(Some(lock_info))
    }

    async fn write_lock_file(&self, lock_info: &LockInfo) -> Result<()> {
        self.ensure_dir().await?;

        let content = serde_json::to_string_pretty(lock_info)
            .map_err(|e| StateError::serialization(format!("Failed to serialize lock: {e}")))?;

        let lock_failed = |e: std::io::Error, what: &str| {
            AzadError::State(StateError::LockFailed {
                message: format!("Failed to {what} lock file: {e}"),
            })
        };

        let mut file = fs::File::create(&self.lock_path)
            .await
            .map_err(|e| lock_failed(e, "create"))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| lock_failed(e, "write"))?;
        file.sync_all().await.map_err(|e| lock_failed(e, "sync"))?;

        Ok(())
    }

    async fn delete_lock_file(&self) -> Result<()> {
        if self.lock_path.exists() {
            fs::remove_file(&self.lock_path).await.map_err(|e| {
                AzadError::State(StateError::LockFailed {
                    message: format!("Failed to delete lock file: {e}"),
                })
            })?;
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for LocalStateStore {
    async fn load(&self) -> Result<Option<ProviderState>> {
        if !self.state_path.exists() {
            debug!("State file does not exist: {}", self.state_path.display());
            return Ok(None);
        }

        info!("Loading state from: {}", self.state_path.display());

        let content = fs::read_to_string(&self.state_path)
            .await
            .map_err(|e| StateError::corrupted(format!("Failed to read state file: {e}")))?;

        let state: ProviderState = serde_json::from_str(&content)
            .map_err(|e| StateError::corrupted(format!("Failed to parse state file: {e}")))?;

        if state.version != STATE_VERSION {
            return Err(StateError::VersionMismatch {
                expected: STATE_VERSION.to_string(),
                found: state.version,
            }
            .into());
        }

        Ok(Some(state))
    }

    async fn save(&self, state: &ProviderState) -> Result<()> {
        self.ensure_dir().await?;

        info!("Saving state to: {}", self.state_path.display());

        let content = serde_json::to_string_pretty(state)
            .map_err(|e| StateError::serialization(format!("Failed to serialize state: {e}")))?;

        let write_failed = |e: std::io::Error, what: &str| {
            AzadError::State(StateError::WriteFailed {
                message: format!("Failed to {what} state file: {e}"),
            })
        };

        // Write to a temporary file first, then rename
        let temp_path = self.state_path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| write_failed(e, "create temp"))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| write_failed(e, "write"))?;
        file.sync_all().await.map_err(|e| write_failed(e, "sync"))?;

        fs::rename(&temp_path, &self.state_path)
            .await
            .map_err(|e| write_failed(e, "rename"))?;

        debug!("State saved successfully");
        Ok(())
    }

    async fn exists(&self) -> Result<bool> {
        Ok(self.state_path.exists())
    }

    async fn acquire_lock(&self, holder: &str) -> Result<LockInfo> {
        if let Some(existing) = self.read_lock_file().await? {
            if !existing.is_expired() {
                return Err(AzadError::State(StateError::LockedByOther {
                    holder: existing.holder.clone(),
                    since: existing.acquired_at.to_rfc3339(),
                }));
            }
            warn!("Taking over expired state lock held by {}", existing.holder);
        }

        let holder_id = if holder.is_empty() {
            generate_holder_id()
        } else {
            holder.to_string()
        };

        let lock_info = LockInfo::new(&holder_id);
        self.write_lock_file(&lock_info).await?;

        info!(
            "Acquired state lock: {} (expires in {}s)",
            lock_info.lock_id, LOCK_EXPIRY_SECS
        );

        Ok(lock_info)
    }

    async fn refresh_lock(&self, lock_id: &str) -> Result<LockInfo> {
        match self.read_lock_file().await? {
            Some(mut lock) if lock.lock_id == lock_id => {
                lock.refresh();
                self.write_lock_file(&lock).await?;
                Ok(lock)
            }
            _ => Err(StateError::LockLost {
                lock_id: lock_id.to_string(),
            }
            .into()),
        }
    }

    async fn release_lock(&self, lock_id: &str) -> Result<()> {
        if let Some(existing) = self.read_lock_file().await? {
            if existing.lock_id == lock_id {
                self.delete_lock_file().await?;
                info!("Released state lock: {lock_id}");
            } else {
                debug!(
                    "Lock ID mismatch: expected {lock_id}, found {}",
                    existing.lock_id
                );
            }
        }
        Ok(())
    }

    async fn force_unlock(&self) -> Result<Option<LockInfo>> {
        let existing = self.read_lock_file().await?;
        self.delete_lock_file().await?;
        if let Some(lock) = &existing {
            warn!("Force-released state lock {} held by {}", lock.lock_id, lock.holder);
        }
        Ok(existing)
    }

    async fn get_lock_info(&self) -> Result<Option<LockInfo>> {
        self.read_lock_file().await
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{hold_lock, ResourceKind, ResourceRecord};
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_test_store() -> (LocalStateStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = LocalStateStore::with_base_dir(temp_dir.path().join(STATE_DIR));
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (store, _temp) = create_test_store();

        let mut state = ProviderState::new("sub");
        state.set(
            "corp",
            ResourceRecord::new(
                ResourceKind::DomainServices,
                "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.AAD/domainServices/corp.example.com",
                "fp",
                serde_json::json!({"domain_name": "corp.example.com"}),
            ),
        );
        store.save(&state).await.expect("Failed to save state");

        let loaded = store
            .load()
            .await
            .expect("Failed to load state")
            .expect("State should exist");

        assert_eq!(loaded, state);
        assert!(store.state_path().ends_with(".azad/state.json"));
    }

    #[tokio::test]
    async fn test_load_nonexistent() {
        let (store, _temp) = create_test_store();

        let result = store.load().await.expect("Load should not fail");
        assert!(result.is_none());
        assert!(!store.exists().await.expect("exists check failed"));
    }

    #[tokio::test]
    async fn test_load_rejects_other_versions() {
        let (store, _temp) = create_test_store();
        let mut state = ProviderState::new("sub");
        state.version = String::from("0");
        store.save(&state).await.expect("Failed to save state");

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, AzadError::State(StateError::VersionMismatch { .. })));
    }

    #[tokio::test]
    async fn test_load_corrupted() {
        let (store, _temp) = create_test_store();
        store.ensure_dir().await.expect("dir");
        fs::write(store.state_path(), "{not json").await.expect("write");

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, AzadError::State(StateError::Corrupted { .. })));
    }

    #[tokio::test]
    async fn test_lock_acquire_release() {
        let (store, _temp) = create_test_store();

        let lock = store
            .acquire_lock("test-holder")
            .await
            .expect("Failed to acquire lock");
        assert!(store.get_lock_info().await.expect("lock info").is_some());

        store
            .release_lock("someone-else")
            .await
            .expect("Mismatched release is not an error");
        assert!(store.get_lock_info().await.expect("lock info").is_some());

        store
            .release_lock(&lock.lock_id)
            .await
            .expect("Failed to release lock");
        assert!(store.get_lock_info().await.expect("lock info").is_none());
    }

    #[tokio::test]
    async fn test_lock_conflict_and_force_unlock() {
        let (store, _temp) = create_test_store();

        let _lock1 = store
            .acquire_lock("holder-1")
            .await
            .expect("Failed to acquire first lock");

        let err = store.acquire_lock("holder-2").await.unwrap_err();
        assert!(matches!(err, AzadError::State(StateError::LockedByOther { ref holder, .. }) if holder == "holder-1"));

        let removed = store.force_unlock().await.expect("force unlock");
        assert_eq!(removed.map(|l| l.holder), Some(String::from("holder-1")));
        store.acquire_lock("holder-2").await.expect("lock is free again");
    }

    /// Makes the lock on disk look about to lapse.
    async fn age_lock(store: &LocalStateStore) {
        let mut lock = store.get_lock_info().await.expect("lock info").expect("locked");
        lock.expires_at = chrono::Utc::now() - chrono::Duration::seconds(1);
        store.write_lock_file(&lock).await.expect("write aged lock");
    }

    #[tokio::test]
    async fn test_lock_held_through_long_work_is_not_taken_over() {
        let (store, _temp) = create_test_store();
        let lock = store.acquire_lock("long-run").await.expect("acquire");

        let outcome = hold_lock(&store, &lock.lock_id, Duration::from_millis(20), async {
            age_lock(&store).await;
            tokio::time::sleep(Duration::from_millis(100)).await;
            store.acquire_lock("second-run").await
        })
        .await;

        let err = outcome.expect_err("lock stays with the long run");
        assert!(matches!(err, AzadError::State(StateError::LockedByOther { ref holder, .. }) if holder == "long-run"));
        let on_disk = store.get_lock_info().await.expect("lock info").expect("locked");
        assert_eq!(on_disk.lock_id, lock.lock_id);
        assert!(!on_disk.is_expired());
    }

    #[tokio::test]
    async fn test_lost_lock_abandons_work() {
        let (store, _temp) = create_test_store();
        let lock = store.acquire_lock("first-run").await.expect("acquire");

        let outcome: Result<()> = hold_lock(&store, &lock.lock_id, Duration::from_millis(20), async {
            store.force_unlock().await?;
            store.acquire_lock("second-run").await?;
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        let err = outcome.expect_err("renewal notices the takeover");
        assert!(matches!(err, AzadError::State(StateError::LockLost { .. })));
    }

    #[tokio::test]
    async fn test_refresh_of_foreign_lock_fails() {
        let (store, _temp) = create_test_store();
        store.acquire_lock("holder-1").await.expect("acquire");

        let err = store.refresh_lock("not-mine").await.unwrap_err();
        assert!(matches!(err, AzadError::State(StateError::LockLost { .. })));
    }

    #[tokio::test]
    async fn test_expired_lock_is_taken_over() {
        let (store, _temp) = create_test_store();

        let mut stale = LockInfo::new("crashed-run");
        stale.expires_at = chrono::Utc::now() - chrono::Duration::seconds(1);
        store.write_lock_file(&stale).await.expect("write stale lock");

        let lock = store.acquire_lock("").await.expect("takeover");
        assert_ne!(lock.lock_id, stale.lock_id);
        assert!(lock.holder.contains(&std::process::id().to_string()));
    }
}
