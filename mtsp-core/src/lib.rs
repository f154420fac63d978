//! # mtsp-core - token-ring coordination for a multiple travelling salesman heuristic
//!
//! A fixed number of agents, each starting at its own node of a shared
//! weighted graph, repeatedly agree on the single cheapest next move in the
//! whole system and apply it, until every node has been visited:
//! - Seeded graph construction and Dijkstra shortest paths
//! - A token that circulates the ring once per round, collecting each
//!   agent's cheapest offer per unvisited node
//! - Visited-node broadcast with an acknowledgement barrier between rounds
//! - Termination with an aggregated global distance total
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mtsp_core::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let bus: Arc<dyn MessageBus> = Arc::new(LocalBus::new());
//!     let (events, _rx) = event_channel();
//!
//!     let agent = SalesmanAgent::builder(0)
//!         .bootstrap(BootstrapArgs { seed: 42, num_nodes: 10, total_agents: 1, start_node: 0 })
//!         .bus(bus)
//!         .events(events)
//!         .build()
//!         .await?;
//!
//!     let state = agent.run().await?;
//!     println!("travelled {}", state.accumulated_distance);
//!     Ok(())
//! }
//! ```
//!
//! Multi-agent runs are normally driven by `mtsp-supervisor`, which builds
//! every agent before any of them starts.

pub mod agent;
pub mod bootstrap;
pub mod bus;
pub mod config;
pub mod coordinator;
pub mod directory;
pub mod error;
pub mod events;
pub mod graph;
pub mod messages;
pub mod protocol;
pub mod runtime;
pub mod sync;
pub mod termination;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::agent::{AgentId, AgentIdentity, AgentState, DEFAULT_AGENT_PREFIX};
    pub use crate::bootstrap::{BootstrapArgs, LaunchArgs};
    pub use crate::bus::{AclMessage, BusError, LocalBus, Mailbox, MessageBus, Performative};
    pub use crate::config::{DirectoryConfig, MtspConfig, RuntimeConfig, SimulationConfig};
    pub use crate::coordinator::{AckBarrier, MoveCoordinator};
    pub use crate::directory::{Directory, InMemoryDirectory, ServiceDescription};
    pub use crate::error::{MtspError, Result};
    pub use crate::events::{EventEmitter, EventReceiver, EventSender, RunEvent, event_channel};
    pub use crate::graph::{Graph, NodeId, UNREACHABLE};
    pub use crate::messages::{Message, MoveCommand, StatsReply, VisitedAck, VisitedNotice};
    pub use crate::protocol::{Offer, Proposal, RoundOutcome, RoundState, RoundTracker};
    pub use crate::runtime::{SalesmanAgent, SalesmanAgentBuilder};
    pub use crate::sync::SyncListener;
    pub use crate::termination::{GlobalTotal, TerminationCollector};
}
