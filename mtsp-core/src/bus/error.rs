//! Error types for bus operations

use crate::error::MtspError;
use thiserror::Error;

/// Bus specific errors
#[derive(Debug, Error)]
pub enum BusError {
    /// Receiver is not registered
    #[error("Unknown recipient: {0}")]
    UnknownRecipient(String),

    /// Name is already registered
    #[error("Agent already registered: {0}")]
    AlreadyRegistered(String),

    /// Point-to-point send without a receiver
    #[error("Message has no receiver")]
    MissingReceiver,

    /// Receiver's mailbox has been dropped
    #[error("Mailbox closed: {0}")]
    MailboxClosed(String),

    /// Invalid agent name
    #[error("Invalid agent name: {0}")]
    InvalidName(String),
}

impl From<BusError> for MtspError {
    fn from(err: BusError) -> Self {
        match err {
            BusError::InvalidName(name) => MtspError::InvalidAgentName(name),
            other => MtspError::Bus(other.to_string()),
        }
    }
}
