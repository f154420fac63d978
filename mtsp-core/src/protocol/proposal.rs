//! The circulating token

use crate::agent::{AgentId, AgentState};
use crate::error::Result;
use crate::graph::{Graph, NodeId, UNREACHABLE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Best known offer for one node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    /// Agent that can reach the node at `distance`
    pub agent: AgentId,
    /// Shortest-path distance, `+inf` when unreachable
    #[serde(with = "distance")]
    pub distance: f64,
}

/// Candidate-assignment record passed around the ring once per round.
///
/// The proposal is moved by value from hop to hop; only its current holder
/// may refine it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    /// Round number, starting at 1
    pub round: u64,
    /// Agent that originated the token and will complete the round
    pub round_leader: AgentId,
    /// Best offer per node, iterated in ascending node order
    pub best_offers: BTreeMap<NodeId, Offer>,
}

impl Proposal {
    /// Empty token for a round
    pub fn new(round: u64, round_leader: AgentId) -> Self {
        Self {
            round,
            round_leader,
            best_offers: BTreeMap::new(),
        }
    }

    /// Originate a round's token at the leader.
    ///
    /// Every node in the leader's unvisited set gets the leader's offer,
    /// unreachable nodes included.
    pub fn originate(round: u64, leader: &AgentState, graph: &Graph) -> Result<Self> {
        let mut proposal = Self::new(round, leader.id());
        for &node in &leader.unvisited {
            let distance = graph.shortest_path(leader.current_location, node)?;
            proposal.best_offers.insert(
                node,
                Offer {
                    agent: leader.id(),
                    distance,
                },
            );
        }
        Ok(proposal)
    }

    /// Apply one relay hop from `agent`.
    ///
    /// Only nodes already in the token that the agent has not visited are
    /// considered. An offer is replaced only when the agent's distance is
    /// strictly smaller, so the incumbent keeps exact ties. Returns the
    /// number of replaced offers.
    pub fn refine(&mut self, agent: &AgentState, graph: &Graph) -> Result<usize> {
        let mut improved = 0;
        for (node, offer) in self.best_offers.iter_mut() {
            if !agent.unvisited.contains(node) {
                continue;
            }
            let distance = graph.shortest_path(agent.current_location, *node)?;
            if offer.distance > distance {
                *offer = Offer {
                    agent: agent.id(),
                    distance,
                };
                improved += 1;
            }
        }
        Ok(improved)
    }

    /// Globally cheapest finite offer.
    ///
    /// Entries are scanned in ascending node order and only a strictly
    /// smaller distance displaces the current best, so on exact ties the
    /// lowest node id wins.
    pub fn best(&self) -> Option<(NodeId, Offer)> {
        let mut best: Option<(NodeId, Offer)> = None;
        for (&node, &offer) in &self.best_offers {
            if offer.distance == UNREACHABLE {
                continue;
            }
            match best {
                Some((_, current)) if current.distance <= offer.distance => {}
                _ => best = Some((node, offer)),
            }
        }
        best
    }

    /// Whether the token is back at the agent that originated it
    pub fn has_returned_to(&self, agent: AgentId) -> bool {
        self.round_leader == agent
    }
}

/// JSON has no infinity; unreachable distances travel as `null`.
mod distance {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentIdentity;

    fn agent(id: usize, total: usize, nodes: usize, at: NodeId) -> AgentState {
        AgentState::new(AgentIdentity::new(id, total).unwrap(), nodes, at).unwrap()
    }

    fn line_graph() -> Graph {
        // 0 -10- 1 -10- 2 -10- 3
        Graph::from_edges(4, &[(0, 1, 10.0), (1, 2, 10.0), (2, 3, 10.0)]).unwrap()
    }

    #[test]
    fn test_originate_offers_every_unvisited_node() {
        let graph = line_graph();
        let leader = agent(0, 2, 4, 0);
        let proposal = Proposal::originate(1, &leader, &graph).unwrap();

        assert_eq!(proposal.round_leader, AgentId(0));
        assert_eq!(proposal.best_offers.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(proposal.best_offers[&3].distance, 30.0);
        assert!(proposal.best_offers.values().all(|o| o.agent == AgentId(0)));
    }

    #[test]
    fn test_originate_keeps_unreachable_offers() {
        let graph = Graph::from_edges(3, &[(0, 1, 10.0)]).unwrap();
        let leader = agent(0, 1, 3, 0);
        let proposal = Proposal::originate(1, &leader, &graph).unwrap();
        assert!(proposal.best_offers[&2].distance.is_infinite());
    }

    #[test]
    fn test_refine_only_strictly_better() {
        let graph = line_graph();
        let leader = agent(0, 3, 4, 0);
        let mut proposal = Proposal::originate(1, &leader, &graph).unwrap();

        // Agent 1 at node 2: node 1 is a tie (10 vs 10), node 3 improves (30 -> 10)
        let relay = agent(1, 3, 4, 2);
        let improved = proposal.refine(&relay, &graph).unwrap();

        assert_eq!(improved, 1);
        assert_eq!(proposal.best_offers[&1].agent, AgentId(0));
        assert_eq!(proposal.best_offers[&3].agent, AgentId(1));
        assert_eq!(proposal.best_offers[&3].distance, 10.0);
    }

    #[test]
    fn test_refine_skips_nodes_visited_by_relay() {
        let graph = line_graph();
        let leader = agent(0, 2, 4, 0);
        let mut proposal = Proposal::originate(1, &leader, &graph).unwrap();

        let mut relay = agent(1, 2, 4, 3);
        relay.mark_visited(2);
        proposal.refine(&relay, &graph).unwrap();

        assert_eq!(proposal.best_offers[&2].agent, AgentId(0));
        assert_eq!(proposal.best_offers[&2].distance, 20.0);
    }

    #[test]
    fn test_refine_is_monotonic_across_hops() {
        let graph = Graph::build(10, 5);
        let agents: Vec<_> = (0..4).map(|i| agent(i, 4, 10, i * 2)).collect();
        let mut proposal = Proposal::originate(1, &agents[0], &graph).unwrap();

        for relay in &agents[1..] {
            let before = proposal.best_offers.clone();
            proposal.refine(relay, &graph).unwrap();
            for (node, offer) in &proposal.best_offers {
                let prior = before[node];
                assert!(offer.distance <= prior.distance);
                if offer.agent != prior.agent {
                    assert!(offer.distance < prior.distance);
                    assert_eq!(offer.agent, relay.id());
                }
            }
        }
    }

    #[test]
    fn test_best_picks_global_minimum() {
        let mut proposal = Proposal::new(1, AgentId(0));
        proposal.best_offers.insert(4, Offer { agent: AgentId(0), distance: 30.0 });
        proposal.best_offers.insert(7, Offer { agent: AgentId(2), distance: 12.0 });
        proposal.best_offers.insert(9, Offer { agent: AgentId(1), distance: 25.0 });

        let (node, offer) = proposal.best().unwrap();
        assert_eq!(node, 7);
        assert_eq!(offer.agent, AgentId(2));
    }

    #[test]
    fn test_best_tie_goes_to_first_in_traversal_order() {
        let mut proposal = Proposal::new(1, AgentId(0));
        proposal.best_offers.insert(8, Offer { agent: AgentId(0), distance: 15.0 });
        proposal.best_offers.insert(3, Offer { agent: AgentId(1), distance: 15.0 });
        proposal.best_offers.insert(5, Offer { agent: AgentId(2), distance: 15.0 });

        let (node, offer) = proposal.best().unwrap();
        assert_eq!(node, 3);
        assert_eq!(offer.agent, AgentId(1));
    }

    #[test]
    fn test_best_ignores_unreachable() {
        let mut proposal = Proposal::new(1, AgentId(0));
        proposal.best_offers.insert(1, Offer { agent: AgentId(0), distance: UNREACHABLE });
        assert!(proposal.best().is_none());
        assert!(Proposal::new(2, AgentId(0)).best().is_none());

        proposal.best_offers.insert(2, Offer { agent: AgentId(1), distance: 90.0 });
        assert_eq!(proposal.best().unwrap().0, 2);
    }

    #[test]
    fn test_unreachable_survives_json() {
        let mut proposal = Proposal::new(3, AgentId(1));
        proposal.best_offers.insert(0, Offer { agent: AgentId(1), distance: UNREACHABLE });
        proposal.best_offers.insert(2, Offer { agent: AgentId(0), distance: 41.0 });

        let json = serde_json::to_string(&proposal).unwrap();
        let decoded: Proposal = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, proposal);
    }
}
