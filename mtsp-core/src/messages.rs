//! Protocol messages and their wire encoding
//!
//! Handlers match on [`Message`] variants. On the bus every message travels
//! as an [`AclMessage`] whose performative and conversation id select the
//! variant and whose string content carries the payload:
//!
//! | Variant          | Performative      | Conversation   | Content                      |
//! |------------------|-------------------|----------------|------------------------------|
//! | `Propose`        | `PROPOSE`         | `mtsp-round`   | proposal as JSON             |
//! | `AcceptProposal` | `ACCEPT_PROPOSAL` | `mtsp-move`    | `targetNode,cost`            |
//! | `NodeVisited`    | `INFORM`          | `node-visited` | node id                      |
//! | `VisitedAck`     | `CONFIRM`         | `node-visited` | node id                      |
//! | `Ready`          | `INFORM`          | `ready`        | empty                        |
//! | `StatsRequest`   | `REQUEST`         | `stats`        | empty                        |
//! | `StatsReply`     | `INFORM`          | `stats`        | `distance` or `distance,remaining` |
//! | `Shutdown`       | `CANCEL`          | `lifecycle`    | empty                        |

use crate::bus::{AclMessage, Performative};
use crate::error::{MtspError, Result};
use crate::graph::NodeId;
use crate::protocol::Proposal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const CONVERSATION_ROUND: &str = "mtsp-round";
pub const CONVERSATION_MOVE: &str = "mtsp-move";
pub const CONVERSATION_VISITED: &str = "node-visited";
pub const CONVERSATION_READY: &str = "ready";
pub const CONVERSATION_STATS: &str = "stats";
pub const CONVERSATION_LIFECYCLE: &str = "lifecycle";

/// Instruction to the round's winner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveCommand {
    pub target_node: NodeId,
    pub cost: f64,
}

/// A node has been claimed by some agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitedNotice {
    pub node: NodeId,
}

/// Receipt of a [`VisitedNotice`], returned to its sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitedAck {
    pub node: NodeId,
}

/// Answer to a stats request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsReply {
    /// Replier's accumulated distance
    pub distance: f64,
    /// Nodes still unvisited from the replier's point of view
    pub remaining: usize,
}

/// Every message an agent understands
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Propose(Proposal),
    AcceptProposal(MoveCommand),
    NodeVisited(VisitedNotice),
    VisitedAck(VisitedAck),
    Ready,
    StatsRequest,
    StatsReply(StatsReply),
    Shutdown,
}

impl Message {
    /// Short variant name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Propose(_) => "propose",
            Message::AcceptProposal(_) => "accept_proposal",
            Message::NodeVisited(_) => "node_visited",
            Message::VisitedAck(_) => "visited_ack",
            Message::Ready => "ready",
            Message::StatsRequest => "stats_request",
            Message::StatsReply(_) => "stats_reply",
            Message::Shutdown => "shutdown",
        }
    }

    /// Encode into an unaddressed envelope from `sender`
    pub fn encode(&self, sender: &str) -> Result<AclMessage> {
        let (performative, conversation, content) = match self {
            Message::Propose(proposal) => (
                Performative::Propose,
                CONVERSATION_ROUND,
                serde_json::to_string(proposal)?,
            ),
            Message::AcceptProposal(command) => (
                Performative::AcceptProposal,
                CONVERSATION_MOVE,
                format!("{},{}", command.target_node, command.cost),
            ),
            Message::NodeVisited(notice) => (
                Performative::Inform,
                CONVERSATION_VISITED,
                notice.node.to_string(),
            ),
            Message::VisitedAck(ack) => (
                Performative::Confirm,
                CONVERSATION_VISITED,
                ack.node.to_string(),
            ),
            Message::Ready => (Performative::Inform, CONVERSATION_READY, String::new()),
            Message::StatsRequest => (Performative::Request, CONVERSATION_STATS, String::new()),
            Message::StatsReply(reply) => (
                Performative::Inform,
                CONVERSATION_STATS,
                format!("{},{}", reply.distance, reply.remaining),
            ),
            Message::Shutdown => (Performative::Cancel, CONVERSATION_LIFECYCLE, String::new()),
        };

        Ok(AclMessage::new(performative, conversation, sender, content))
    }

    /// Decode an envelope; unknown or malformed messages are errors
    pub fn decode(envelope: &AclMessage) -> Result<Self> {
        let content = envelope.content.trim();
        match (envelope.performative, envelope.conversation_id.as_str()) {
            (Performative::Propose, CONVERSATION_ROUND) => serde_json::from_str(content)
                .map(Message::Propose)
                .map_err(|e| MtspError::Decode(format!("proposal: {}", e))),
            (Performative::AcceptProposal, CONVERSATION_MOVE) => {
                let (node, cost) = split_pair(content)?;
                Ok(Message::AcceptProposal(MoveCommand {
                    target_node: parse_field(node, "targetNode")?,
                    cost: parse_field(cost, "cost")?,
                }))
            }
            (Performative::Inform, CONVERSATION_VISITED) => Ok(Message::NodeVisited(VisitedNotice {
                node: parse_field(content, "node")?,
            })),
            (Performative::Confirm, CONVERSATION_VISITED) => Ok(Message::VisitedAck(VisitedAck {
                node: parse_field(content, "node")?,
            })),
            (Performative::Inform, CONVERSATION_READY) => Ok(Message::Ready),
            (Performative::Request, CONVERSATION_STATS) => Ok(Message::StatsRequest),
            (Performative::Inform, CONVERSATION_STATS) => {
                let reply = match content.split_once(',') {
                    Some((distance, remaining)) => StatsReply {
                        distance: parse_field(distance, "distance")?,
                        remaining: parse_field(remaining, "remaining")?,
                    },
                    None => StatsReply {
                        distance: parse_field(content, "distance")?,
                        remaining: 0,
                    },
                };
                Ok(Message::StatsReply(reply))
            }
            (Performative::Cancel, CONVERSATION_LIFECYCLE) => Ok(Message::Shutdown),
            (performative, conversation) => Err(MtspError::Decode(format!(
                "no handler for {}[{}]",
                performative, conversation
            ))),
        }
    }
}

fn split_pair(content: &str) -> Result<(&str, &str)> {
    content
        .split_once(',')
        .ok_or_else(|| MtspError::Decode(format!("expected two comma-separated fields, got {:?}", content)))
}

fn parse_field<T: FromStr>(raw: &str, field: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| MtspError::Decode(format!("invalid {}: {:?}", field, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentId;
    use crate::protocol::Offer;

    fn roundtrip(message: Message) -> Message {
        let envelope = message.encode("Salesman-0").unwrap();
        Message::decode(&envelope).unwrap()
    }

    #[test]
    fn test_accept_proposal_wire_format() {
        let envelope = Message::AcceptProposal(MoveCommand { target_node: 7, cost: 23.0 })
            .encode("Salesman-1")
            .unwrap();
        assert_eq!(envelope.performative, Performative::AcceptProposal);
        assert_eq!(envelope.content, "7,23");
        assert_eq!(envelope.sender, "Salesman-1");
        assert!(envelope.receiver.is_none());
    }

    #[test]
    fn test_visited_wire_format() {
        let envelope = Message::NodeVisited(VisitedNotice { node: 4 }).encode("a").unwrap();
        assert_eq!(envelope.performative, Performative::Inform);
        assert_eq!(envelope.conversation_id, CONVERSATION_VISITED);
        assert_eq!(envelope.content, "4");
    }

    #[test]
    fn test_proposal_survives_encoding() {
        let mut proposal = Proposal::new(2, AgentId(1));
        proposal.best_offers.insert(3, Offer { agent: AgentId(0), distance: 17.0 });
        proposal.best_offers.insert(5, Offer { agent: AgentId(1), distance: f64::INFINITY });
        let message = Message::Propose(proposal);
        assert_eq!(roundtrip(message.clone()), message);
    }

    #[test]
    fn test_stats_reply_accepts_bare_distance() {
        let envelope = AclMessage::new(Performative::Inform, CONVERSATION_STATS, "a", "42.5");
        assert_eq!(
            Message::decode(&envelope).unwrap(),
            Message::StatsReply(StatsReply { distance: 42.5, remaining: 0 })
        );

        let reply = Message::StatsReply(StatsReply { distance: 10.0, remaining: 2 });
        assert_eq!(roundtrip(reply.clone()), reply);
    }

    #[test]
    fn test_control_messages() {
        for message in [Message::Ready, Message::StatsRequest, Message::Shutdown] {
            assert_eq!(roundtrip(message.clone()), message);
        }
        let ack = Message::VisitedAck(VisitedAck { node: 9 });
        assert_eq!(roundtrip(ack.clone()), ack);
    }

    #[test]
    fn test_malformed_content_is_decode_error() {
        let cases = [
            AclMessage::new(Performative::AcceptProposal, CONVERSATION_MOVE, "a", "7"),
            AclMessage::new(Performative::AcceptProposal, CONVERSATION_MOVE, "a", "x,1.0"),
            AclMessage::new(Performative::AcceptProposal, CONVERSATION_MOVE, "a", "1,cheap"),
            AclMessage::new(Performative::Inform, CONVERSATION_VISITED, "a", "-1"),
            AclMessage::new(Performative::Propose, CONVERSATION_ROUND, "a", "{not json"),
            AclMessage::new(Performative::Request, "weather", "a", ""),
        ];
        for envelope in cases {
            assert!(
                matches!(Message::decode(&envelope), Err(MtspError::Decode(_))),
                "{} should not decode",
                envelope
            );
        }
    }
}
