//! Error types for airboard-sync

use crate::types::Domain;
use std::time::Duration;

/// Shared-state store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{domain} lock not acquired within {waited:?}")]
    LockTimeout { domain: Domain, waited: Duration },
}

/// A producer failed to obtain a reading from its collaborator.
///
/// Every variant is transient: the producer logs it and skips the cycle.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AcquisitionError {
    #[error("driver error: {0}")]
    Driver(String),

    #[error("measurement not ready")]
    NotReady,

    #[error("time source not synchronized")]
    Unsynced,

    #[error("http error: {0}")]
    Http(String),

    #[error("setup failed: {0}")]
    Setup(String),
}
