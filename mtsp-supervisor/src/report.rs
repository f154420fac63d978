//! Outcome of a completed run

use chrono::{DateTime, Utc};
use mtsp_core::agent::AgentState;
use mtsp_core::graph::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// One move issued by a round leader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub round: u64,
    pub winner: String,
    pub node: NodeId,
    pub cost: f64,
}

/// Everything the supervisor learned about a finished run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub run_id: Uuid,
    pub seed: u64,
    pub agents: usize,
    pub nodes: usize,
    /// Start node of each agent, indexed by agent id
    pub start_nodes: Vec<NodeId>,
    /// Total reported by the termination collector
    pub global_total: f64,
    /// Agents that still had unvisited nodes when totals were collected
    pub incomplete_agents: Vec<String>,
    /// Rounds that produced a move
    pub rounds: u64,
    /// Moves in issue order
    pub moves: Vec<MoveRecord>,
    /// Agents found in the directory once the ring was ready
    pub discovered_agents: Vec<String>,
    /// Final state of each agent, indexed by agent id
    pub final_states: Vec<AgentState>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SimulationReport {
    /// Wall-clock duration of the run
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// Sum of the costs of every issued move
    pub fn issued_total(&self) -> f64 {
        self.moves.iter().map(|m| m.cost).sum()
    }

    /// Accumulated distance per agent
    pub fn per_agent_distance(&self) -> BTreeMap<String, f64> {
        self.moves.iter().fold(BTreeMap::new(), |mut totals, m| {
            *totals.entry(m.winner.clone()).or_insert(0.0) += m.cost;
            totals
        })
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {}", self.run_id)?;
        writeln!(
            f,
            "  seed {}, {} agents, {} nodes, start nodes {:?}",
            self.seed, self.agents, self.nodes, self.start_nodes
        )?;
        writeln!(
            f,
            "  {} rounds in {} ms",
            self.rounds,
            self.duration().num_milliseconds()
        )?;
        for m in &self.moves {
            writeln!(f, "  round {:>3}: {} -> node {} ({})", m.round, m.winner, m.node, m.cost)?;
        }
        for state in &self.final_states {
            writeln!(
                f,
                "  agent {}: at node {}, travelled {}",
                state.id(),
                state.current_location,
                state.accumulated_distance
            )?;
        }
        if !self.incomplete_agents.is_empty() {
            writeln!(f, "  incomplete: {}", self.incomplete_agents.join(", "))?;
        }
        write!(f, "  global total: {}", self.global_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_agent_distance() {
        let now = Utc::now();
        let report = SimulationReport {
            run_id: Uuid::new_v4(),
            seed: 1,
            agents: 2,
            nodes: 4,
            start_nodes: vec![0, 2],
            global_total: 45.0,
            incomplete_agents: vec![],
            rounds: 3,
            moves: vec![
                MoveRecord { round: 1, winner: "Salesman-0".into(), node: 1, cost: 10.0 },
                MoveRecord { round: 2, winner: "Salesman-1".into(), node: 3, cost: 20.0 },
                MoveRecord { round: 3, winner: "Salesman-0".into(), node: 5, cost: 15.0 },
            ],
            discovered_agents: vec![],
            final_states: vec![],
            started_at: now,
            finished_at: now,
        };

        assert_eq!(report.issued_total(), 45.0);
        let per_agent = report.per_agent_distance();
        assert_eq!(per_agent["Salesman-0"], 25.0);
        assert_eq!(per_agent["Salesman-1"], 20.0);
        assert!(report.to_string().ends_with("global total: 45"));
    }
}
