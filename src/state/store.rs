//! State store trait definition.
//!
//! This module defines the common interface for state storage backends.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::Result;
use super::types::ProviderState;
use super::lock::LockInfo;

/// Trait for state storage backends.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the provider state.
    ///
    /// Returns `None` if no state exists yet.
    async fn load(&self) -> Result<Option<ProviderState>>;

    /// Saves the provider state.
    async fn save(&self, state: &ProviderState) -> Result<()>;

    /// Checks if state exists.
    async fn exists(&self) -> Result<bool>;

    /// Acquires a lock on the state.
    ///
    /// An expired lock held by someone else is taken over.
    async fn acquire_lock(&self, holder: &str) -> Result<LockInfo>;

    /// Extends the expiry of the lock with `lock_id`.
    ///
    /// Fails with [`StateError::LockLost`](crate::error::StateError::LockLost) if that lock is no longer the
    /// one on the state.
    async fn refresh_lock(&self, lock_id: &str) -> Result<LockInfo>;

    /// Releases a lock on the state. A lock with another ID is left alone.
    async fn release_lock(&self, lock_id: &str) -> Result<()>;

    /// Removes any lock regardless of holder.
    async fn force_unlock(&self) -> Result<Option<LockInfo>>;

    /// Gets current lock information if locked.
    async fn get_lock_info(&self) -> Result<Option<LockInfo>>;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;
}

#[async_trait]
impl StateStore for Box<dyn StateStore> {
    async fn load(&self) -> Result<Option<ProviderState>> {
        (**self).load().await
    }

    async fn save(&self, state: &ProviderState) -> Result<()> {
        (**self).save(state).await
    }

    async fn exists(&self) -> Result<bool> {
        (**self).exists().await
    }

    async fn acquire_lock(&self, holder: &str) -> Result<LockInfo> {
        (**self).acquire_lock(holder).await
    }

    async fn refresh_lock(&self, lock_id: &str) -> Result<LockInfo> {
        (**self).refresh_lock(lock_id).await
    }

    async fn release_lock(&self, lock_id: &str) -> Result<()> {
        (**self).release_lock(lock_id).await
    }

    async fn force_unlock(&self) -> Result<Option<LockInfo>> {
        (**self).force_unlock().await
    }

    async fn get_lock_info(&self) -> Result<Option<LockInfo>> {
        (**self).get_lock_info().await
    }

    fn backend_type(&self) -> &'static str {
        (**self).backend_type()
    }
}

/// Runs `work` while renewing the lock `lock_id` every `period`.
///
/// The lock is renewed once before `work` starts, so a lock that lapsed
/// while waiting (for example at a prompt) is caught before any change is
/// made. Transient renewal failures are logged; losing the lock abandons
/// `work` and returns the error.
///
/// # Errors
///
/// Returns the error of `work`, or the renewal error if the lock was lost.
pub async fn hold_lock<S, F, T>(store: &S, lock_id: &str, period: Duration, work: F) -> Result<T>
where
    S: StateStore + ?Sized,
    F: Future<Output = Result<T>>,
{
    store.refresh_lock(lock_id).await?;

    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tokio::pin!(work);

    loop {
        tokio::select! {
            result = &mut work => return result,
            _ = ticker.tick() => match store.refresh_lock(lock_id).await {
                Ok(lock) => debug!("Renewed state lock {} until {}", lock.lock_id, lock.expires_at),
                Err(e) if e.is_retryable() => warn!("Failed to renew state lock: {e}"),
                Err(e) => return Err(e),
            },
        }
    }
}
