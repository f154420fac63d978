//! Wire envelope carried by the bus

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Communicative act of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Performative {
    Propose,
    AcceptProposal,
    Inform,
    Confirm,
    Request,
    Cancel,
}

impl fmt::Display for Performative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Performative::Propose => "PROPOSE",
            Performative::AcceptProposal => "ACCEPT_PROPOSAL",
            Performative::Inform => "INFORM",
            Performative::Confirm => "CONFIRM",
            Performative::Request => "REQUEST",
            Performative::Cancel => "CANCEL",
        };
        f.write_str(name)
    }
}

/// Envelope exchanged between agents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AclMessage {
    /// Communicative act
    pub performative: Performative,

    /// Conversation the message belongs to (selects the handler)
    pub conversation_id: String,

    /// Sender agent name
    pub sender: String,

    /// Receiver agent name; unset for broadcasts until delivery
    #[serde(default)]
    pub receiver: Option<String>,

    /// String payload
    pub content: String,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl AclMessage {
    /// Create a new message without a receiver
    pub fn new(
        performative: Performative,
        conversation_id: impl Into<String>,
        sender: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            performative,
            conversation_id: conversation_id.into(),
            sender: sender.into(),
            receiver: None,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Address the message to a single receiver
    pub fn to(mut self, receiver: impl Into<String>) -> Self {
        self.receiver = Some(receiver.into());
        self
    }
}

impl fmt::Display for AclMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] {} -> {}",
            self.performative,
            self.conversation_id,
            self.sender,
            self.receiver.as_deref().unwrap_or("*")
        )
    }
}
