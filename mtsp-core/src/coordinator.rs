//! Executing the winning move
//!
//! The winner of a round applies the move to its own state, tells every
//! other agent which node was claimed, and only starts the next round once
//! all of them have acknowledged the notice.

use crate::agent::AgentState;
use crate::error::{MtspError, Result};
use crate::graph::NodeId;
use crate::messages::{MoveCommand, VisitedNotice};
use tracing::{debug, info};

/// Applies move commands to an agent's state
pub struct MoveCoordinator;

impl MoveCoordinator {
    /// Apply a move addressed to this agent.
    ///
    /// Adds the cost, relocates the agent, drops the target from the
    /// unvisited set (a no-op if it is already gone) and returns the notice
    /// to broadcast. A command naming a node outside the graph or carrying
    /// a non-finite or negative cost leaves the state untouched.
    pub fn apply(
        state: &mut AgentState,
        command: &MoveCommand,
        num_nodes: usize,
    ) -> Result<VisitedNotice> {
        if command.target_node >= num_nodes {
            return Err(MtspError::InvalidNode {
                node: command.target_node,
                num_nodes,
            });
        }
        if !command.cost.is_finite() || command.cost < 0.0 {
            return Err(MtspError::Agent(format!(
                "refusing move to node {} with cost {}",
                command.target_node, command.cost
            )));
        }

        state.accumulated_distance += command.cost;
        let from = state.current_location;
        state.current_location = command.target_node;
        let was_unvisited = state.mark_visited(command.target_node);

        info!(
            agent = %state.id(),
            from,
            to = command.target_node,
            cost = command.cost,
            total = state.accumulated_distance,
            "Moved"
        );
        if !was_unvisited {
            debug!(node = command.target_node, "Move target was already marked visited");
        }

        Ok(VisitedNotice {
            node: command.target_node,
        })
    }
}

/// Waits for every peer to acknowledge a visited notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckBarrier {
    node: NodeId,
    pending: usize,
}

impl AckBarrier {
    /// Barrier for `node` expecting `peers` acknowledgements
    pub fn new(node: NodeId, peers: usize) -> Self {
        Self {
            node,
            pending: peers,
        }
    }

    pub fn is_released(&self) -> bool {
        self.pending == 0
    }

    /// Count an acknowledgement; returns `true` once all have arrived.
    ///
    /// Acknowledgements for another node are ignored.
    pub fn acknowledge(&mut self, node: NodeId) -> bool {
        if node == self.node && self.pending > 0 {
            self.pending -= 1;
        }
        self.is_released()
    }
}
