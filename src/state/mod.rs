//! State management module for the azad provisioning system.
//!
//! This module provides persistent state storage for tracking managed
//! resources: their ARM IDs, fingerprints, and last observed attributes.

mod store;
mod local;
mod lock;
mod types;

pub use store::{hold_lock, StateStore};
pub use local::{LocalStateStore, STATE_DIR};
pub use lock::{generate_holder_id, LockInfo, LOCK_EXPIRY_SECS, LOCK_REFRESH_INTERVAL};
pub use types::{ProviderState, ResourceKind, ResourceRecord, STATE_VERSION};
