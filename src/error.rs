use std::io;

use thiserror::Error;

/// Failure kinds of a single wake request.
#[derive(Debug, Error)]
pub enum WakeError {
    #[error("invalid MAC address '{0}'")]
    InvalidMacFormat(String),

    #[error("no eligible network interface to broadcast from")]
    NoEligibleInterfaces,

    #[error("{failed} of {attempted} sends failed")]
    PartialOrTotalSendFailure { failed: usize, attempted: usize },
}

impl WakeError {
    /// True when the caller can fix the request and retry.
    pub fn is_client_error(&self) -> bool {
        matches!(self, WakeError::InvalidMacFormat(_))
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("address book i/o: {0}")]
    Io(#[from] io::Error),

    #[error("address book is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid MAC address '{0}'")]
    InvalidMac(String),

    #[error("device {0} already exists")]
    Exists(String),

    #[error("device {0} not found")]
    NotFound(String),
}

impl StoreError {
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidMac(_) | StoreError::Exists(_) | StoreError::NotFound(_)
        )
    }
}
