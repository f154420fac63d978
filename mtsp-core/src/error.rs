//! Error types for MTSP operations

use crate::graph::NodeId;

/// Result type for MTSP operations
pub type Result<T> = std::result::Result<T, MtspError>;

/// Error types for the MTSP core
#[derive(Debug, thiserror::Error)]
pub enum MtspError {
    /// Agent-related errors
    #[error("Agent error: {0}")]
    Agent(String),

    /// Agent name could not be resolved to an id
    #[error("Invalid agent name: {0}")]
    InvalidAgentName(String),

    /// Node id outside the graph
    #[error("Node {node} is outside a graph of {num_nodes} nodes")]
    InvalidNode { node: NodeId, num_nodes: usize },

    /// Graph construction error
    #[error("Graph error: {0}")]
    Graph(String),

    /// Message could not be decoded into a protocol message
    #[error("Decode error: {0}")]
    Decode(String),

    /// Message bus error
    #[error("Bus error: {0}")]
    Bus(String),

    /// Directory service error
    #[error("Directory error: {0}")]
    Directory(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for MtspError {
    fn from(s: String) -> Self {
        MtspError::Other(s)
    }
}

impl From<&str> for MtspError {
    fn from(s: &str) -> Self {
        MtspError::Other(s.to_string())
    }
}

impl From<anyhow::Error> for MtspError {
    fn from(err: anyhow::Error) -> Self {
        MtspError::Other(err.to_string())
    }
}

impl MtspError {
    /// Errors caused by the content or sender of a single message. The
    /// agent drops the message and keeps serving.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MtspError::Agent(_)
                | MtspError::InvalidAgentName(_)
                | MtspError::InvalidNode { .. }
                | MtspError::Decode(_)
                | MtspError::Bus(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_errors_are_recoverable() {
        assert!(MtspError::InvalidNode { node: 99, num_nodes: 5 }.is_recoverable());
        assert!(MtspError::Bus("no mailbox for Ghost".into()).is_recoverable());
        assert!(MtspError::Agent("negative cost".into()).is_recoverable());
        assert!(!MtspError::Directory("closed".into()).is_recoverable());
        assert!(!MtspError::Graph("empty".into()).is_recoverable());
    }
}
