//! Task-based supervisor: one tokio task per agent

use crate::report::{MoveRecord, SimulationReport};
use crate::{Result, SupervisorError};
use chrono::Utc;
use mtsp_core::agent::{AgentState, DEFAULT_AGENT_PREFIX};
use mtsp_core::bootstrap::BootstrapArgs;
use mtsp_core::bus::{LocalBus, MessageBus};
use mtsp_core::config::{DEFAULT_AGENTS, DEFAULT_NODES, MtspConfig};
use mtsp_core::directory::{Directory, InMemoryDirectory, ServiceDescription};
use mtsp_core::events::{EventReceiver, RunEvent, event_channel};
use mtsp_core::graph::{Graph, NodeId};
use mtsp_core::messages::Message;
use mtsp_core::runtime::SalesmanAgent;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Sender name used for supervisor-originated messages
pub const SUPERVISOR_NAME: &str = "supervisor";

/// Configuration for the simulation supervisor
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Agents in the ring
    pub agents: usize,

    /// Graph nodes
    pub nodes: usize,

    /// Shared seed for the graph and the start node draws
    pub seed: u64,

    /// Agent name prefix
    pub prefix: String,

    /// Capability agents advertise in the directory
    pub service: ServiceDescription,

    /// How long to wait for the run to complete
    pub run_timeout: Duration,

    /// How long to wait for each agent task after shutdown
    pub shutdown_timeout: Duration,

    /// Explicit start nodes instead of seeded draws
    pub start_nodes: Option<Vec<NodeId>>,

    /// Shared graph instead of one built from the seed
    pub graph: Option<Arc<Graph>>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            agents: DEFAULT_AGENTS,
            nodes: DEFAULT_NODES,
            seed: seed_from_clock(),
            prefix: DEFAULT_AGENT_PREFIX.to_string(),
            service: ServiceDescription::default(),
            run_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(5),
            start_nodes: None,
            graph: None,
        }
    }
}

impl SupervisorConfig {
    /// Build from loaded configuration; an unset seed is taken from the clock
    pub fn from_config(config: &MtspConfig) -> Self {
        Self {
            agents: config.simulation.agents,
            nodes: config.simulation.nodes,
            seed: config.simulation.seed.unwrap_or_else(seed_from_clock),
            prefix: config.simulation.prefix.clone(),
            service: ServiceDescription {
                service_type: config.directory.service.clone(),
                name: config.directory.name.clone(),
            },
            run_timeout: config.runtime.timeout,
            shutdown_timeout: config.runtime.shutdown,
            start_nodes: None,
            graph: None,
        }
    }
}

/// Milliseconds since the epoch, the launcher's default seed
pub fn seed_from_clock() -> u64 {
    Utc::now().timestamp_millis().unsigned_abs()
}

/// Draw one start node per agent from the shared seed
pub fn draw_start_nodes(seed: u64, agents: usize, nodes: usize) -> Vec<NodeId> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..agents).map(|_| rng.gen_range(0..nodes)).collect()
}

/// How the event stream ended
#[derive(Debug)]
enum Outcome {
    Completed {
        global_total: f64,
        incomplete_agents: Vec<String>,
    },
    Stalled {
        round: u64,
    },
    /// Every event sender is gone, so every agent has stopped
    Closed,
}

/// What the supervisor tallies from run events
#[derive(Debug, Default)]
struct Tally {
    moves: Vec<MoveRecord>,
    ready: usize,
    discovered: Vec<String>,
}

/// Launches a ring of agents and watches it to completion
#[derive(Debug)]
pub struct SimulationSupervisor {
    config: SupervisorConfig,
    start_nodes: Vec<NodeId>,
}

impl SimulationSupervisor {
    /// Create a supervisor, drawing start nodes unless the config fixes them
    pub fn new(config: SupervisorConfig) -> Result<Self> {
        if config.agents == 0 || config.nodes == 0 {
            return Err(SupervisorError::InvalidConfig(format!(
                "need at least one agent and one node, got {} agents and {} nodes",
                config.agents, config.nodes
            )));
        }
        if let Some(graph) = &config.graph
            && graph.num_nodes() != config.nodes
        {
            return Err(SupervisorError::InvalidConfig(format!(
                "graph has {} nodes, config says {}",
                graph.num_nodes(),
                config.nodes
            )));
        }

        let start_nodes = match &config.start_nodes {
            Some(starts) => {
                if starts.len() != config.agents {
                    return Err(SupervisorError::InvalidConfig(format!(
                        "{} start nodes given for {} agents",
                        starts.len(),
                        config.agents
                    )));
                }
                if let Some(node) = starts.iter().find(|&&n| n >= config.nodes) {
                    return Err(SupervisorError::InvalidConfig(format!(
                        "start node {} is outside a graph of {} nodes",
                        node, config.nodes
                    )));
                }
                starts.clone()
            }
            None => draw_start_nodes(config.seed, config.agents, config.nodes),
        };

        Ok(Self {
            config,
            start_nodes,
        })
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Start node of each agent, indexed by agent id
    pub fn start_nodes(&self) -> &[NodeId] {
        &self.start_nodes
    }

    /// Argument list agent `id` is started with
    pub fn agent_args(&self, id: usize) -> Vec<String> {
        BootstrapArgs {
            seed: self.config.seed,
            num_nodes: self.config.nodes,
            total_agents: self.config.agents,
            start_node: self.start_nodes[id],
        }
        .to_args()
    }

    /// Run the ring to completion.
    ///
    /// Agents are shut down on every exit path. A stalled ring, an agent
    /// failure and the run timeout are all reported as errors.
    pub async fn run(&self) -> Result<SimulationReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let bus = Arc::new(LocalBus::new());
        let directory = Arc::new(InMemoryDirectory::new());
        let (tx, mut rx) = event_channel();

        info!(
            %run_id,
            agents = self.config.agents,
            nodes = self.config.nodes,
            seed = self.config.seed,
            start_nodes = ?self.start_nodes,
            "Launching agents"
        );

        // Build every agent (and its mailbox) before any of them runs
        let mut agents = Vec::with_capacity(self.config.agents);
        for id in 0..self.config.agents {
            let args = BootstrapArgs::from_args(&self.agent_args(id), self.config.seed);
            let mut builder = SalesmanAgent::builder(id)
                .bootstrap(args)
                .bus(bus.clone())
                .directory(directory.clone())
                .events(tx.clone())
                .prefix(self.config.prefix.clone())
                .service(self.config.service.clone());
            if let Some(graph) = &self.config.graph {
                builder = builder.graph(graph.clone());
            }
            agents.push(builder.build().await?);
        }
        drop(tx);

        let handles: Vec<(String, JoinHandle<mtsp_core::error::Result<AgentState>>)> = agents
            .into_iter()
            .map(|agent| (agent.name().to_string(), tokio::spawn(agent.run())))
            .collect();

        let mut tally = Tally::default();
        let outcome = timeout(
            self.config.run_timeout,
            self.watch(&mut rx, &mut tally, directory.as_ref()),
        )
        .await;

        let shutdown = Message::Shutdown.encode(SUPERVISOR_NAME)?;
        let reached = bus.broadcast(shutdown).await?;
        debug!(reached, "Shutdown broadcast");

        let (final_states, failures) = self.join(handles).await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(_) if !failures.is_empty() => Outcome::Closed,
            Err(_) => {
                warn!(timeout = ?self.config.run_timeout, "Run timed out");
                return Err(SupervisorError::Timeout(self.config.run_timeout));
            }
        };

        match outcome {
            Outcome::Completed {
                global_total,
                incomplete_agents,
            } => {
                if let Some(failure) = failures.into_iter().next() {
                    return Err(SupervisorError::AgentFailed(failure));
                }
                let report = SimulationReport {
                    run_id,
                    seed: self.config.seed,
                    agents: self.config.agents,
                    nodes: self.config.nodes,
                    start_nodes: self.start_nodes.clone(),
                    global_total,
                    incomplete_agents,
                    rounds: tally.moves.len() as u64,
                    moves: tally.moves,
                    discovered_agents: tally.discovered,
                    final_states,
                    started_at,
                    finished_at: Utc::now(),
                };
                info!(%run_id, global_total, rounds = report.rounds, "Run complete");
                Ok(report)
            }
            Outcome::Stalled { round } => Err(SupervisorError::Stalled { round }),
            Outcome::Closed => Err(SupervisorError::AgentFailed(
                failures
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| "all agents stopped before the run completed".to_string()),
            )),
        }
    }

    async fn watch(
        &self,
        rx: &mut EventReceiver,
        tally: &mut Tally,
        directory: &dyn Directory,
    ) -> Outcome {
        while let Some(event) = rx.recv().await {
            debug!(event = event.event_type(), agent = event.agent_name(), "Run event");
            match event {
                RunEvent::AgentReady { .. } => {
                    tally.ready += 1;
                    if tally.ready == self.config.agents {
                        match directory.search(&self.config.service.service_type).await {
                            Ok(found) => tally.discovered = found,
                            Err(e) => warn!(error = %e, "Directory search failed"),
                        }
                    }
                }
                RunEvent::MoveIssued {
                    round,
                    winner,
                    node,
                    cost,
                    ..
                } => tally.moves.push(MoveRecord {
                    round,
                    winner,
                    node,
                    cost,
                }),
                RunEvent::RoundStalled { round, .. } => return Outcome::Stalled { round },
                RunEvent::RunCompleted {
                    global_total,
                    incomplete_agents,
                    ..
                } => {
                    return Outcome::Completed {
                        global_total,
                        incomplete_agents,
                    };
                }
                _ => {}
            }
        }
        Outcome::Closed
    }

    /// Wait for every agent task; returns final states and failure messages
    async fn join(
        &self,
        handles: Vec<(String, JoinHandle<mtsp_core::error::Result<AgentState>>)>,
    ) -> (Vec<AgentState>, Vec<String>) {
        let mut states = Vec::with_capacity(handles.len());
        let mut failures = Vec::new();

        for (name, mut handle) in handles {
            match timeout(self.config.shutdown_timeout, &mut handle).await {
                Ok(Ok(Ok(state))) => states.push(state),
                Ok(Ok(Err(e))) => {
                    warn!(agent = %name, error = %e, "Agent returned an error");
                    failures.push(format!("{}: {}", name, e));
                }
                Ok(Err(e)) => {
                    warn!(agent = %name, error = %e, "Agent task panicked or was cancelled");
                    failures.push(format!("{}: {}", name, e));
                }
                Err(_) => {
                    warn!(agent = %name, "Agent did not stop in time, aborting");
                    handle.abort();
                    failures.push(format!("{}: shutdown timed out", name));
                }
            }
        }

        (states, failures)
    }
}
