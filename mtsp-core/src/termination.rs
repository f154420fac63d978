//! Aggregating the final distance total
//!
//! The agent that finds nothing left to visit when it is about to lead a
//! round asks every other agent for its accumulated distance and sums the
//! replies with its own.

use crate::messages::StatsReply;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Final aggregate of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalTotal {
    /// Sum of every agent's accumulated distance
    pub total: f64,
    /// Distance per agent name, the collector included
    pub per_agent: BTreeMap<String, f64>,
    /// Agents that still had unvisited nodes when they replied
    pub incomplete_agents: Vec<String>,
}

/// Collects stats replies until every peer has answered
#[derive(Debug, Clone)]
pub struct TerminationCollector {
    own_name: String,
    own_distance: f64,
    expected: usize,
    replies: BTreeMap<String, StatsReply>,
}

impl TerminationCollector {
    /// Start collecting `expected` replies for an agent with `own_distance`
    pub fn new(own_name: impl Into<String>, own_distance: f64, expected: usize) -> Self {
        Self {
            own_name: own_name.into(),
            own_distance,
            expected,
            replies: BTreeMap::new(),
        }
    }

    /// Replies still outstanding
    pub fn outstanding(&self) -> usize {
        self.expected.saturating_sub(self.replies.len())
    }

    /// Record one reply; returns the total once the last one arrives.
    ///
    /// A second reply from the same agent is ignored.
    pub fn record(&mut self, from: &str, reply: StatsReply) -> Option<GlobalTotal> {
        if from == self.own_name || self.replies.contains_key(from) {
            warn!(from, "Ignoring duplicate stats reply");
            return None;
        }
        if self.outstanding() == 0 {
            warn!(from, "Ignoring stats reply after collection finished");
            return None;
        }

        self.replies.insert(from.to_string(), reply);
        self.total()
    }

    /// The total, if nothing is outstanding
    pub fn total(&self) -> Option<GlobalTotal> {
        if self.outstanding() > 0 {
            return None;
        }

        let mut per_agent: BTreeMap<String, f64> = self
            .replies
            .iter()
            .map(|(name, reply)| (name.clone(), reply.distance))
            .collect();
        per_agent.insert(self.own_name.clone(), self.own_distance);

        let incomplete_agents = self
            .replies
            .iter()
            .filter(|(_, reply)| reply.remaining > 0)
            .map(|(name, _)| name.clone())
            .collect();

        Some(GlobalTotal {
            total: self.own_distance + self.replies.values().map(|r| r.distance).sum::<f64>(),
            per_agent,
            incomplete_agents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(distance: f64) -> StatsReply {
        StatsReply { distance, remaining: 0 }
    }

    #[test]
    fn test_total_after_all_replies() {
        let mut collector = TerminationCollector::new("Salesman-1", 30.0, 2);
        assert!(collector.record("Salesman-0", reply(12.0)).is_none());
        assert_eq!(collector.outstanding(), 1);

        let total = collector.record("Salesman-2", reply(8.5)).unwrap();
        assert_eq!(total.total, 50.5);
        assert_eq!(total.per_agent.len(), 3);
        assert_eq!(total.per_agent["Salesman-1"], 30.0);
        assert!(total.incomplete_agents.is_empty());
    }

    #[test]
    fn test_single_agent_needs_no_replies() {
        let collector = TerminationCollector::new("Salesman-0", 77.0, 0);
        assert_eq!(collector.total().unwrap().total, 77.0);
    }

    #[test]
    fn test_duplicates_do_not_count() {
        let mut collector = TerminationCollector::new("a", 0.0, 2);
        collector.record("b", reply(5.0));
        assert!(collector.record("b", reply(5.0)).is_none());
        assert!(collector.record("a", reply(5.0)).is_none());
        assert_eq!(collector.outstanding(), 1);
        assert_eq!(collector.record("c", reply(1.0)).unwrap().total, 6.0);
        assert!(collector.record("d", reply(1.0)).is_none());
    }

    #[test]
    fn test_incomplete_agents_are_reported() {
        let mut collector = TerminationCollector::new("a", 10.0, 1);
        let total = collector
            .record("b", StatsReply { distance: 4.0, remaining: 2 })
            .unwrap();
        assert_eq!(total.total, 14.0);
        assert_eq!(total.incomplete_agents, vec!["b".to_string()]);
    }
}
