//! Error types for supervisor operations

use std::time::Duration;
use thiserror::Error;

/// Result type for supervisor operations
pub type Result<T> = std::result::Result<T, SupervisorError>;

/// Error types for supervisor
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Invalid supervisor configuration: {0}")]
    InvalidConfig(String),

    /// A round found no reachable node; the ring will never finish
    #[error("Ring stalled in round {round}: no unvisited node is reachable")]
    Stalled { round: u64 },

    /// The run did not finish in time. Nothing inside the ring recovers a
    /// lost token, so this is reported rather than retried.
    #[error("Run did not complete within {0:?}")]
    Timeout(Duration),

    #[error("Agent failed: {0}")]
    AgentFailed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<mtsp_core::error::MtspError> for SupervisorError {
    fn from(err: mtsp_core::error::MtspError) -> Self {
        SupervisorError::Other(anyhow::anyhow!("{}", err))
    }
}
