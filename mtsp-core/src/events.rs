//! Run events for observers
//!
//! Agents emit structured events at round, move and termination boundaries.
//! Nothing in the protocol reads them back; they exist for supervisors,
//! consoles and tests that need an independent view of the run.
//!
//! # Example
//!
//! ```rust,ignore
//! use mtsp_core::events::{event_channel, RunEvent};
//!
//! let (tx, mut rx) = event_channel();
//!
//! tokio::spawn(async move {
//!     while let Some(event) = rx.recv().await {
//!         if let RunEvent::MoveIssued { node, cost, .. } = event {
//!             println!("move to {} for {}", node, cost);
//!         }
//!     }
//! });
//! ```

use crate::graph::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// An agent finished its startup handshake
    AgentReady {
        agent_name: String,
        start_node: NodeId,
        timestamp: DateTime<Utc>,
    },

    /// A leader originated a token
    RoundStarted {
        round: u64,
        agent_name: String,
        /// Nodes offered in the fresh token
        candidates: usize,
        timestamp: DateTime<Utc>,
    },

    /// A non-leader refined and forwarded the token
    TokenRelayed {
        round: u64,
        agent_name: String,
        /// Offers this agent replaced
        improved: usize,
        timestamp: DateTime<Utc>,
    },

    /// A leader selected a winner
    MoveIssued {
        round: u64,
        /// Leader that completed the round
        agent_name: String,
        winner: String,
        node: NodeId,
        cost: f64,
        timestamp: DateTime<Utc>,
    },

    /// The winner applied its move and the barrier released
    NodeVisited {
        agent_name: String,
        node: NodeId,
        accumulated_distance: f64,
        timestamp: DateTime<Utc>,
    },

    /// A round ended without any reachable node; the ring is now idle for good
    RoundStalled {
        round: u64,
        agent_name: String,
        timestamp: DateTime<Utc>,
    },

    /// The termination collector produced the global total
    RunCompleted {
        agent_name: String,
        global_total: f64,
        incomplete_agents: Vec<String>,
        timestamp: DateTime<Utc>,
    },
}

impl RunEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            RunEvent::AgentReady { .. } => "agent_ready",
            RunEvent::RoundStarted { .. } => "round_started",
            RunEvent::TokenRelayed { .. } => "token_relayed",
            RunEvent::MoveIssued { .. } => "move_issued",
            RunEvent::NodeVisited { .. } => "node_visited",
            RunEvent::RoundStalled { .. } => "round_stalled",
            RunEvent::RunCompleted { .. } => "run_completed",
        }
    }

    /// Agent that emitted the event
    pub fn agent_name(&self) -> &str {
        match self {
            RunEvent::AgentReady { agent_name, .. }
            | RunEvent::RoundStarted { agent_name, .. }
            | RunEvent::TokenRelayed { agent_name, .. }
            | RunEvent::MoveIssued { agent_name, .. }
            | RunEvent::NodeVisited { agent_name, .. }
            | RunEvent::RoundStalled { agent_name, .. }
            | RunEvent::RunCompleted { agent_name, .. } => agent_name,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            RunEvent::AgentReady { timestamp, .. }
            | RunEvent::RoundStarted { timestamp, .. }
            | RunEvent::TokenRelayed { timestamp, .. }
            | RunEvent::MoveIssued { timestamp, .. }
            | RunEvent::NodeVisited { timestamp, .. }
            | RunEvent::RoundStalled { timestamp, .. }
            | RunEvent::RunCompleted { timestamp, .. } => *timestamp,
        }
    }
}

/// Sender half of an event channel
pub type EventSender = mpsc::UnboundedSender<RunEvent>;

/// Receiver half of an event channel
pub type EventReceiver = mpsc::UnboundedReceiver<RunEvent>;

/// Creates a new event channel.
///
/// The channel is unbounded so that emitting never suspends a handler.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Per-agent emitter; a missing or dropped receiver silently discards events
#[derive(Debug, Clone)]
pub struct EventEmitter {
    sender: Option<EventSender>,
    agent_name: String,
}

impl EventEmitter {
    pub fn new(sender: Option<EventSender>, agent_name: impl Into<String>) -> Self {
        Self {
            sender,
            agent_name: agent_name.into(),
        }
    }

    fn emit(&self, event: RunEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }

    pub fn agent_ready(&self, start_node: NodeId) {
        self.emit(RunEvent::AgentReady {
            agent_name: self.agent_name.clone(),
            start_node,
            timestamp: Utc::now(),
        });
    }

    pub fn round_started(&self, round: u64, candidates: usize) {
        self.emit(RunEvent::RoundStarted {
            round,
            agent_name: self.agent_name.clone(),
            candidates,
            timestamp: Utc::now(),
        });
    }

    pub fn token_relayed(&self, round: u64, improved: usize) {
        self.emit(RunEvent::TokenRelayed {
            round,
            agent_name: self.agent_name.clone(),
            improved,
            timestamp: Utc::now(),
        });
    }

    pub fn move_issued(&self, round: u64, winner: &str, node: NodeId, cost: f64) {
        self.emit(RunEvent::MoveIssued {
            round,
            agent_name: self.agent_name.clone(),
            winner: winner.to_string(),
            node,
            cost,
            timestamp: Utc::now(),
        });
    }

    pub fn node_visited(&self, node: NodeId, accumulated_distance: f64) {
        self.emit(RunEvent::NodeVisited {
            agent_name: self.agent_name.clone(),
            node,
            accumulated_distance,
            timestamp: Utc::now(),
        });
    }

    pub fn round_stalled(&self, round: u64) {
        self.emit(RunEvent::RoundStalled {
            round,
            agent_name: self.agent_name.clone(),
            timestamp: Utc::now(),
        });
    }

    pub fn run_completed(&self, global_total: f64, incomplete_agents: Vec<String>) {
        self.emit(RunEvent::RunCompleted {
            agent_name: self.agent_name.clone(),
            global_total,
            incomplete_agents,
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emitter_tags_agent() {
        let (tx, mut rx) = event_channel();
        let emitter = EventEmitter::new(Some(tx), "Salesman-2");

        emitter.move_issued(3, "Salesman-0", 5, 18.0);
        let event = rx.try_recv().unwrap();

        assert_eq!(event.event_type(), "move_issued");
        assert_eq!(event.agent_name(), "Salesman-2");
        match event {
            RunEvent::MoveIssued { round, winner, node, cost, .. } => {
                assert_eq!((round, winner.as_str(), node, cost), (3, "Salesman-0", 5, 18.0));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_emit_without_receiver_is_silent() {
        let (tx, rx) = event_channel();
        drop(rx);
        EventEmitter::new(Some(tx), "a").round_stalled(1);
        EventEmitter::new(None, "b").round_stalled(1);
    }

    #[test]
    fn test_serialized_tag() {
        let event = RunEvent::RoundStalled {
            round: 2,
            agent_name: "Salesman-0".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "round_stalled");
        assert_eq!(json["round"], 2);
    }
}
