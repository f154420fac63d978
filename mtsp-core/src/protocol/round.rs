//! Round state machine
//!
//! Leader side: `Idle -> Leading -> Completing -> Idle`.
//! Non-leader side: `Idle -> Relaying -> Idle` for each token passing through.

use super::proposal::Proposal;
use crate::agent::AgentId;
use crate::error::{MtspError, Result};
use crate::messages::MoveCommand;
use serde::{Deserialize, Serialize};

/// Phase of the current round as seen by one agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundState {
    /// Not leading a round
    Idle,
    /// Refining and forwarding another leader's token for `round`
    Relaying { round: u64 },
    /// Token for `round` is circulating
    Leading { round: u64 },
    /// Token for `round` has returned and a winner is being selected
    Completing { round: u64 },
}

/// Result of completing a round
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoundOutcome {
    /// Move `winner` to `command.target_node`
    Move { winner: AgentId, command: MoveCommand },
    /// No reachable node was offered; nothing resumes the ring after this
    NoMove,
}

impl RoundOutcome {
    /// Select the winner of a returned token
    pub fn select(proposal: &Proposal) -> Self {
        match proposal.best() {
            Some((node, offer)) => RoundOutcome::Move {
                winner: offer.agent,
                command: MoveCommand {
                    target_node: node,
                    cost: offer.distance,
                },
            },
            None => RoundOutcome::NoMove,
        }
    }
}

/// Tracks round numbering and the round state of one agent
#[derive(Debug, Clone)]
pub struct RoundTracker {
    state: RoundState,
    last_round: u64,
}

impl RoundTracker {
    pub fn new() -> Self {
        Self {
            state: RoundState::Idle,
            last_round: 0,
        }
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    /// Highest round number this agent has seen
    pub fn last_round(&self) -> u64 {
        self.last_round
    }

    /// Record a round seen while relaying
    pub fn observe(&mut self, round: u64) {
        self.last_round = self.last_round.max(round);
    }

    /// `Idle -> Leading`; returns the new round number
    pub fn begin(&mut self) -> Result<u64> {
        match self.state {
            RoundState::Idle => {
                self.last_round += 1;
                self.state = RoundState::Leading {
                    round: self.last_round,
                };
                Ok(self.last_round)
            }
            other => Err(MtspError::Agent(format!(
                "cannot start a round while {:?}",
                other
            ))),
        }
    }

    /// `Idle -> Relaying` while another leader's token passes through
    pub fn relay(&mut self, round: u64) -> Result<()> {
        match self.state {
            RoundState::Idle => {
                self.observe(round);
                self.state = RoundState::Relaying { round };
                Ok(())
            }
            other => Err(MtspError::Agent(format!(
                "cannot relay round {} while {:?}",
                round, other
            ))),
        }
    }

    /// `Leading -> Completing` when this round's token comes back
    pub fn token_returned(&mut self, round: u64) -> Result<()> {
        match self.state {
            RoundState::Leading { round: leading } if leading == round => {
                self.state = RoundState::Completing { round };
                Ok(())
            }
            other => Err(MtspError::Agent(format!(
                "token for round {} returned while {:?}",
                round, other
            ))),
        }
    }

    /// `Completing -> Idle` or `Relaying -> Idle`
    pub fn finish(&mut self) {
        self.state = RoundState::Idle;
    }
}

impl Default for RoundTracker {
    fn default() -> Self {
        Self::new()
    }
}
