//! Operation handles and poll outcomes.
//!
//! An [`OperationHandle`] is the in-flight token for one asynchronous remote
//! action. It is deliberately neither `Clone` nor serializable: it lives only
//! for the duration of a single reconcile call.

use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// How a poller should interpret the handle's poll URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollKind {
    /// A status-monitor URL returning `{ "status": ... }` bodies.
    StatusMonitor,
    /// A location URL answering 202 while the operation runs.
    Location,
    /// The resource URL itself, carrying `properties.provisioningState`.
    ProvisioningState,
    /// The operation finished synchronously; nothing to wait for.
    Immediate,
}

/// Last known status of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationStatus {
    /// Accepted but not polled yet.
    #[default]
    Accepted,
    /// Remote side reported the operation as running.
    InProgress,
    /// Completed successfully.
    Succeeded,
    /// Completed with a failure.
    Failed,
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Accepted => "Accepted",
            Self::InProgress => "InProgress",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
        };
        write!(f, "{s}")
    }
}

/// Handle to an in-flight long-running operation.
#[derive(Debug)]
pub struct OperationHandle {
    poll_url: String,
    kind: PollKind,
    status: OperationStatus,
    started: Instant,
    polls: u32,
    retry_after: Option<Duration>,
}

impl OperationHandle {
    /// Creates a handle for an accepted operation.
    #[must_use]
    pub fn new(poll_url: impl Into<String>, kind: PollKind) -> Self {
        Self {
            poll_url: poll_url.into(),
            kind,
            status: OperationStatus::Accepted,
            started: Instant::now(),
            polls: 0,
            retry_after: None,
        }
    }

    /// Creates a handle for an operation that completed synchronously.
    #[must_use]
    pub fn completed(resource_url: impl Into<String>) -> Self {
        let mut handle = Self::new(resource_url, PollKind::Immediate);
        handle.status = OperationStatus::Succeeded;
        handle
    }

    /// Sets the server-suggested delay before the next poll.
    #[must_use]
    pub const fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    /// The URL (or opaque token) to poll.
    #[must_use]
    pub fn poll_url(&self) -> &str {
        &self.poll_url
    }

    /// How the poll URL should be interpreted.
    #[must_use]
    pub const fn kind(&self) -> PollKind {
        self.kind
    }

    /// Last known status.
    #[must_use]
    pub const fn status(&self) -> OperationStatus {
        self.status
    }

    /// Records the latest status observed by a poller.
    pub const fn set_status(&mut self, status: OperationStatus) {
        self.status = status;
    }

    /// Server-suggested delay before the next poll, if any.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// Records a server-suggested delay before the next poll.
    pub const fn set_retry_after(&mut self, retry_after: Option<Duration>) {
        self.retry_after = retry_after;
    }

    /// When the operation was accepted.
    #[must_use]
    pub const fn started(&self) -> Instant {
        self.started
    }

    /// Time spent waiting so far.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Number of polls issued against this handle.
    #[must_use]
    pub const fn poll_count(&self) -> u32 {
        self.polls
    }

    pub(crate) const fn record_poll(&mut self) {
        self.polls = self.polls.saturating_add(1);
    }
}

/// A failure reported by the remote side, carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFailure {
    /// Remote error code.
    pub code: String,
    /// Remote error message.
    pub message: String,
}

impl OperationFailure {
    /// Creates a failure from a code and message.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Outcome of a single poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The operation completed with this result.
    Succeeded(T),
    /// The operation failed remotely; it will not be retried.
    Failed(OperationFailure),
    /// Still running.
    InProgress,
}

impl<T> PollOutcome<T> {
    /// Returns true if this outcome ends the operation.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_handle_is_succeeded() {
        let handle = OperationHandle::completed("https://management.azure.com/x");
        assert_eq!(handle.kind(), PollKind::Immediate);
        assert_eq!(handle.status(), OperationStatus::Succeeded);
        assert_eq!(handle.poll_count(), 0);
    }

    #[test]
    fn test_terminal_outcomes() {
        assert!(PollOutcome::Succeeded(1).is_terminal());
        assert!(PollOutcome::<u8>::Failed(OperationFailure::new("Conflict", "busy")).is_terminal());
        assert!(!PollOutcome::<u8>::InProgress.is_terminal());
    }
}
