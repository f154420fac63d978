//! Keeping the unvisited set in step with other agents' moves

use crate::agent::AgentState;
use crate::messages::{VisitedAck, VisitedNotice};
use tracing::debug;

/// Applies visited notices from other agents
pub struct SyncListener;

impl SyncListener {
    /// Drop the notified node if still present and acknowledge the notice
    pub fn on_visited(state: &mut AgentState, notice: &VisitedNotice) -> VisitedAck {
        if state.mark_visited(notice.node) {
            debug!(agent = %state.id(), node = notice.node, remaining = state.unvisited.len(), "Node visited elsewhere");
        }
        VisitedAck { node: notice.node }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentIdentity;

    #[test]
    fn test_notices_converge_regardless_of_membership() {
        let mut states: Vec<_> = (0..3)
            .map(|i| AgentState::new(AgentIdentity::new(i, 3).unwrap(), 6, i).unwrap())
            .collect();
        // Agent 1 already knows about node 4
        states[1].mark_visited(4);

        for state in &mut states {
            let ack = SyncListener::on_visited(state, &VisitedNotice { node: 4 });
            assert_eq!(ack, VisitedAck { node: 4 });
        }
        assert!(states.iter().all(|s| !s.unvisited.contains(&4)));
    }

    #[test]
    fn test_repeated_notice_is_noop() {
        let mut state = AgentState::new(AgentIdentity::new(0, 2).unwrap(), 3, 0).unwrap();
        SyncListener::on_visited(&mut state, &VisitedNotice { node: 1 });
        let snapshot = state.clone();
        SyncListener::on_visited(&mut state, &VisitedNotice { node: 1 });
        assert_eq!(state, snapshot);
    }
}
