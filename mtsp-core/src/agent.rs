//! Agent identity and per-agent state
//!
//! An [`AgentState`] is owned by exactly one agent task and is only mutated by
//! that agent's own handlers. Other agents learn about it exclusively through
//! messages.

use crate::error::{MtspError, Result};
use crate::graph::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Default prefix for agent names (`Salesman-0`, `Salesman-1`, ...)
pub const DEFAULT_AGENT_PREFIX: &str = "Salesman";

/// Agent identifier (`0..total_agents`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub usize);

impl AgentId {
    /// Symbolic address of the agent, `<prefix>-<id>`
    pub fn name(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.0)
    }

    /// Parse a symbolic address back into an id
    pub fn from_name(prefix: &str, name: &str) -> Result<Self> {
        name.strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('-'))
            .and_then(|id| id.parse::<usize>().ok())
            .map(AgentId)
            .ok_or_else(|| MtspError::InvalidAgentName(name.to_string()))
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of an agent in the ring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentIdentity {
    /// This agent
    pub id: AgentId,
    /// Next agent in ascending id order, wrapping to agent 0
    pub successor: AgentId,
    /// Ring size
    pub total_agents: usize,
}

impl AgentIdentity {
    /// Create the identity of `id` in a ring of `total_agents`
    pub fn new(id: usize, total_agents: usize) -> Result<Self> {
        if total_agents == 0 {
            return Err(MtspError::Agent("ring must contain at least one agent".to_string()));
        }
        if id >= total_agents {
            return Err(MtspError::Agent(format!(
                "agent id {} outside a ring of {} agents",
                id, total_agents
            )));
        }

        Ok(Self {
            id: AgentId(id),
            successor: AgentId((id + 1) % total_agents),
            total_agents,
        })
    }

    /// Number of agents other than this one
    pub fn peers(&self) -> usize {
        self.total_agents - 1
    }
}

/// Mutable per-agent state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub identity: AgentIdentity,
    pub current_location: NodeId,
    pub unvisited: BTreeSet<NodeId>,
    pub accumulated_distance: f64,
}

impl AgentState {
    /// Initial state: every node except the start node is unvisited
    pub fn new(identity: AgentIdentity, num_nodes: usize, start_node: NodeId) -> Result<Self> {
        if start_node >= num_nodes {
            return Err(MtspError::InvalidNode {
                node: start_node,
                num_nodes,
            });
        }

        Ok(Self {
            identity,
            current_location: start_node,
            unvisited: (0..num_nodes).filter(|&n| n != start_node).collect(),
            accumulated_distance: 0.0,
        })
    }

    pub fn id(&self) -> AgentId {
        self.identity.id
    }

    /// Whether every node has been visited
    pub fn is_exhausted(&self) -> bool {
        self.unvisited.is_empty()
    }

    /// Remove a node from the unvisited set; returns whether it was present
    pub fn mark_visited(&mut self, node: NodeId) -> bool {
        self.unvisited.remove(&node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successor_wraps() {
        let ids: Vec<_> = (0..4)
            .map(|i| AgentIdentity::new(i, 4).unwrap().successor)
            .collect();
        assert_eq!(ids, vec![AgentId(1), AgentId(2), AgentId(3), AgentId(0)]);
    }

    #[test]
    fn test_single_agent_is_own_successor() {
        let identity = AgentIdentity::new(0, 1).unwrap();
        assert_eq!(identity.successor, AgentId(0));
        assert_eq!(identity.peers(), 0);
    }

    #[test]
    fn test_identity_rejects_out_of_range() {
        assert!(AgentIdentity::new(3, 3).is_err());
        assert!(AgentIdentity::new(0, 0).is_err());
    }

    #[test]
    fn test_name_roundtrip() {
        let id = AgentId(17);
        assert_eq!(id.name("Salesman"), "Salesman-17");
        assert_eq!(AgentId::from_name("Salesman", "Salesman-17").unwrap(), id);
        assert!(AgentId::from_name("Salesman", "Salesman17").is_err());
        assert!(AgentId::from_name("Salesman", "Other-1").is_err());
        assert!(AgentId::from_name("Salesman", "Salesman-x").is_err());
    }

    #[test]
    fn test_initial_state_excludes_start() {
        let identity = AgentIdentity::new(1, 2).unwrap();
        let state = AgentState::new(identity, 4, 2).unwrap();
        assert_eq!(state.current_location, 2);
        assert_eq!(state.unvisited, BTreeSet::from([0, 1, 3]));
        assert_eq!(state.accumulated_distance, 0.0);
        assert!(AgentState::new(identity, 4, 4).is_err());
    }

    #[test]
    fn test_mark_visited_is_idempotent() {
        let identity = AgentIdentity::new(0, 1).unwrap();
        let mut state = AgentState::new(identity, 3, 0).unwrap();
        assert!(state.mark_visited(1));
        assert!(!state.mark_visited(1));
        assert!(!state.mark_visited(0));
        assert_eq!(state.unvisited, BTreeSet::from([2]));
    }
}
