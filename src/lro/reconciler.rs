//! Long-running operation reconciler.
//!
//! Drives an asynchronous remote operation to completion: the initiator is
//! invoked exactly once, then the handle is polled on a bounded interval
//! until the remote side reports a terminal outcome, the deadline passes,
//! or the cancellation token fires.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{AzadError, OperationError, Result};

use super::operation::{OperationHandle, OperationStatus, PollOutcome};

/// Default interval between polls in seconds.
const DEFAULT_INTERVAL_SECS: u64 = 10;

/// Default upper bound on a server-suggested poll delay in seconds.
const DEFAULT_MAX_INTERVAL_SECS: u64 = 60;

/// Default overall deadline in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60 * 60;

/// Polls an operation handle for its current outcome.
#[async_trait]
pub trait OperationPoller: Send + Sync {
    /// The terminal result produced on success.
    type Output: Send;

    /// Polls once. The poller may update the handle's status and
    /// retry-after hint.
    async fn poll(&self, handle: &mut OperationHandle) -> Result<PollOutcome<Self::Output>>;
}

/// Names the operation and resource for errors and log lines.
#[derive(Debug, Clone)]
pub struct OperationContext {
    /// Operation name, e.g. `creating/updating`.
    pub operation: String,
    /// Resource description.
    pub resource: String,
}

impl OperationContext {
    /// Creates a new operation context.
    #[must_use]
    pub fn new(operation: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            resource: resource.into(),
        }
    }
}

/// Poll timing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Interval between polls.
    pub interval: Duration,
    /// Upper bound on a server-suggested delay.
    pub max_interval: Duration,
    /// Overall deadline measured from acceptance.
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            max_interval: Duration::from_secs(DEFAULT_MAX_INTERVAL_SECS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl PollSettings {
    /// Computes the delay before the next poll.
    fn next_delay(&self, handle: &OperationHandle, remaining: Duration) -> Duration {
        let ceiling = self.max_interval.max(self.interval);
        handle
            .retry_after()
            .unwrap_or(self.interval)
            .max(self.interval)
            .min(ceiling)
            .min(remaining)
    }
}

/// Drives long-running operations to completion.
///
/// Holds no per-operation state; one reconciler may serve any number of
/// sequential or concurrent calls.
#[derive(Debug, Clone)]
pub struct LroReconciler {
    settings: PollSettings,
    cancel: CancellationToken,
}

impl LroReconciler {
    /// Creates a reconciler with the given settings and cancellation token.
    #[must_use]
    pub const fn new(settings: PollSettings, cancel: CancellationToken) -> Self {
        Self { settings, cancel }
    }

    /// Returns the poll settings.
    #[must_use]
    pub const fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Returns the cancellation token observed before each poll.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Initiates an operation and waits for its terminal outcome.
    ///
    /// # Errors
    ///
    /// - [`OperationError::RequestRejected`] if the initiator fails; no poll
    ///   is attempted.
    /// - [`OperationError::OperationFailed`] on the first `Failed` outcome.
    /// - [`OperationError::Timeout`] if the deadline passes or the token is
    ///   cancelled first; the remote operation may still be running. A token
    ///   cancelled before the call means nothing is initiated.
    /// - [`OperationError::PollFailed`] if a poll fails with a non-transient
    ///   error.
    pub async fn reconcile<P, F, Fut>(
        &self,
        context: &OperationContext,
        initiate: F,
        poller: &P,
    ) -> Result<P::Output>
    where
        P: OperationPoller + ?Sized,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<OperationHandle>> + Send,
    {
        if self.cancel.is_cancelled() {
            warn!("Not starting {} {}: cancelled", context.operation, context.resource);
            return Err(OperationError::Timeout {
                operation: context.operation.clone(),
                resource: context.resource.clone(),
                elapsed: Duration::ZERO,
                cancelled: true,
            }
            .into());
        }

        info!("Started {} {}", context.operation, context.resource);

        let mut handle = initiate().await.map_err(|e| OperationError::RequestRejected {
            operation: context.operation.clone(),
            resource: context.resource.clone(),
            source: Box::new(e),
        })?;

        let deadline = handle.started() + self.settings.timeout;

        loop {
            if self.cancel.is_cancelled() {
                return Err(Self::timed_out(context, &handle, true));
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(Self::timed_out(context, &handle, false));
            }

            handle.record_poll();
            match poller.poll(&mut handle).await {
                Ok(PollOutcome::Succeeded(result)) => {
                    handle.set_status(OperationStatus::Succeeded);
                    info!(
                        "Finished {} {} after {} poll(s)",
                        context.operation,
                        context.resource,
                        handle.poll_count()
                    );
                    return Ok(result);
                }
                Ok(PollOutcome::Failed(failure)) => {
                    handle.set_status(OperationStatus::Failed);
                    return Err(OperationError::OperationFailed {
                        operation: context.operation.clone(),
                        resource: context.resource.clone(),
                        code: failure.code,
                        message: failure.message,
                    }
                    .into());
                }
                Ok(PollOutcome::InProgress) => {
                    handle.set_status(OperationStatus::InProgress);
                    debug!(
                        "Still {} {} ({:?} elapsed)",
                        context.operation,
                        context.resource,
                        handle.elapsed()
                    );
                }
                Err(e) if e.is_retryable() => {
                    warn!("Transient error polling {}: {}", context.resource, e);
                    if let Some(secs) = e.retry_delay_secs() {
                        handle.set_retry_after(Some(Duration::from_secs(secs)));
                    }
                }
                Err(e) => {
                    return Err(OperationError::PollFailed {
                        operation: context.operation.clone(),
                        resource: context.resource.clone(),
                        source: Box::new(e),
                    }
                    .into());
                }
            }

            let delay = self
                .settings
                .next_delay(&handle, deadline.saturating_duration_since(Instant::now()));

            tokio::select! {
                () = self.cancel.cancelled() => {
                    return Err(Self::timed_out(context, &handle, true));
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn timed_out(context: &OperationContext, handle: &OperationHandle, cancelled: bool) -> AzadError {
        warn!(
            "Gave up on {} {} after {} poll(s), last status {}",
            context.operation,
            context.resource,
            handle.poll_count(),
            handle.status()
        );
        OperationError::Timeout {
            operation: context.operation.clone(),
            resource: context.resource.clone(),
            elapsed: handle.elapsed(),
            cancelled,
        }
        .into()
    }
}
