//! The salesman agent task
//!
//! A [`SalesmanAgent`] owns its state, its copy of the graph and its mailbox.
//! [`SalesmanAgent::run`] takes one message at a time and runs its handler to
//! completion before looking at the next one, so no locking is needed around
//! the agent's state.
//!
//! Startup: every agent announces its start node, waits until all peers have
//! acknowledged it, then reports `Ready` to agent 0. Agent 0 leads the first
//! round once the whole ring is ready.
//!
//! ```rust,ignore
//! let bus: Arc<dyn MessageBus> = Arc::new(LocalBus::new());
//! let agent = SalesmanAgent::builder(0)
//!     .bootstrap(BootstrapArgs { seed: 7, num_nodes: 10, total_agents: 1, start_node: 0 })
//!     .bus(bus)
//!     .build()
//!     .await?;
//! let final_state = agent.run().await?;
//! ```

use crate::agent::{AgentId, AgentIdentity, AgentState, DEFAULT_AGENT_PREFIX};
use crate::bootstrap::BootstrapArgs;
use crate::bus::{AclMessage, Mailbox, MessageBus};
use crate::coordinator::{AckBarrier, MoveCoordinator};
use crate::directory::{Directory, InMemoryDirectory, ServiceDescription};
use crate::error::{MtspError, Result};
use crate::events::{EventEmitter, EventSender};
use crate::graph::Graph;
use crate::messages::{Message, MoveCommand, StatsReply, VisitedAck, VisitedNotice};
use crate::protocol::{Proposal, RoundOutcome, RoundTracker};
use crate::sync::SyncListener;
use crate::termination::{GlobalTotal, TerminationCollector};
use std::sync::Arc;
use tracing::{Instrument, debug, info, info_span, warn};

/// Where the agent is in its lifetime
#[derive(Debug)]
enum Phase {
    /// Waiting for peers to acknowledge the start-node announcement
    Announcing(AckBarrier),
    /// Relaying tokens, or leading a round
    Active,
    /// Applied a move; waiting for peers to acknowledge the visited notice
    Moving(AckBarrier),
    /// Collecting stats replies for the final total
    Collecting(TerminationCollector),
    /// A round ended with no reachable node
    Stalled,
    /// Global total produced
    Finished,
}

/// One autonomous agent of the ring
pub struct SalesmanAgent {
    name: String,
    prefix: String,
    state: AgentState,
    graph: Arc<Graph>,
    mailbox: Mailbox,
    bus: Arc<dyn MessageBus>,
    directory: Arc<dyn Directory>,
    service: ServiceDescription,
    events: EventEmitter,
    rounds: RoundTracker,
    phase: Phase,
    /// Ready reports received (agent 0 only)
    ready: usize,
}

impl std::fmt::Debug for SalesmanAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesmanAgent")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("phase", &self.phase)
            .finish()
    }
}

impl SalesmanAgent {
    /// Create a builder for agent `id`
    pub fn builder(id: usize) -> SalesmanAgentBuilder {
        SalesmanAgentBuilder::new(id)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Run until shutdown or until the mailbox closes; returns the final state
    pub async fn run(mut self) -> Result<AgentState> {
        let span = info_span!("agent", name = %self.name);
        async move {
            let result = self.serve().await;
            self.withdraw().await;
            result.map(|_| self.state)
        }
        .instrument(span)
        .await
    }

    async fn serve(&mut self) -> Result<()> {
        self.directory
            .register(&self.name, vec![self.service.clone()])
            .await?;
        self.announce_start().await?;

        loop {
            let Some(envelope) = self.mailbox.recv().await else {
                debug!("Mailbox closed");
                return Ok(());
            };

            if envelope.receiver.as_deref() != Some(self.name.as_str()) {
                warn!(%envelope, "Dropping message addressed elsewhere");
                continue;
            }

            let message = match Message::decode(&envelope) {
                Ok(message) => message,
                Err(e) => {
                    warn!(%envelope, error = %e, "Dropping undecodable message");
                    continue;
                }
            };

            let kind = message.kind();
            debug!(kind, from = %envelope.sender, "Received");
            if matches!(message, Message::Shutdown) {
                info!(
                    distance = self.state.accumulated_distance,
                    remaining = self.state.unvisited.len(),
                    "Shutting down"
                );
                return Ok(());
            }

            if let Err(e) = self.handle(&envelope.sender, message).await {
                if !e.is_recoverable() {
                    return Err(e);
                }
                warn!(kind, from = %envelope.sender, error = %e, "Dropping message the agent could not handle");
            }
        }
    }

    async fn withdraw(&self) {
        if let Err(e) = self.directory.deregister(&self.name).await {
            warn!(error = %e, "Directory deregistration failed");
        }
        if let Err(e) = self.bus.deregister(&self.name).await {
            debug!(error = %e, "Bus deregistration failed");
        }
    }

    async fn handle(&mut self, from: &str, message: Message) -> Result<()> {
        match message {
            Message::Propose(proposal) => self.on_proposal(proposal).await,
            Message::AcceptProposal(command) => self.on_move(command).await,
            Message::NodeVisited(notice) => {
                let ack = SyncListener::on_visited(&mut self.state, &notice);
                self.send_to(from, Message::VisitedAck(ack)).await
            }
            Message::VisitedAck(ack) => self.on_ack(ack).await,
            Message::Ready => self.on_ready().await,
            Message::StatsRequest => {
                let reply = StatsReply {
                    distance: self.state.accumulated_distance,
                    remaining: self.state.unvisited.len(),
                };
                if reply.remaining > 0 {
                    debug!(remaining = reply.remaining, "Answering stats request before exhausting nodes");
                }
                self.send_to(from, Message::StatsReply(reply)).await
            }
            Message::StatsReply(reply) => {
                self.on_stats(from, reply);
                Ok(())
            }
            Message::Shutdown => Ok(()),
        }
    }

    async fn announce_start(&mut self) -> Result<()> {
        let start = self.state.current_location;
        let barrier = AckBarrier::new(start, self.state.identity.peers());

        if barrier.is_released() {
            self.phase = Phase::Active;
            return self.report_ready().await;
        }

        self.phase = Phase::Announcing(barrier);
        self.broadcast(Message::NodeVisited(VisitedNotice { node: start }))
            .await
    }

    async fn report_ready(&mut self) -> Result<()> {
        debug!(remaining = self.state.unvisited.len(), "Ready");
        self.events.agent_ready(self.state.current_location);
        let first_leader = AgentId(0).name(&self.prefix);
        self.send_to(&first_leader, Message::Ready).await
    }

    async fn on_ready(&mut self) -> Result<()> {
        if self.state.id() != AgentId(0) {
            warn!("Ready report sent to an agent that does not lead the first round");
            return Ok(());
        }

        self.ready += 1;
        if self.ready == self.state.identity.total_agents {
            info!(agents = self.ready, "Ring ready");
            self.start_round().await?;
        }
        Ok(())
    }

    async fn on_ack(&mut self, ack: VisitedAck) -> Result<()> {
        let released = match &mut self.phase {
            Phase::Announcing(barrier) | Phase::Moving(barrier) => barrier.acknowledge(ack.node),
            _ => {
                debug!(node = ack.node, "Unexpected visited ack");
                return Ok(());
            }
        };
        if !released {
            return Ok(());
        }

        match std::mem::replace(&mut self.phase, Phase::Active) {
            Phase::Announcing(_) => self.report_ready().await,
            Phase::Moving(_) => self.start_round().await,
            _ => Ok(()),
        }
    }

    /// Begin a round as leader, or collect totals if nothing is left
    async fn start_round(&mut self) -> Result<()> {
        if self.state.is_exhausted() {
            return self.begin_termination().await;
        }

        let round = self.rounds.begin()?;
        let proposal = Proposal::originate(round, &self.state, &self.graph)?;

        info!(
            round,
            location = self.state.current_location,
            candidates = proposal.best_offers.len(),
            "Starting round"
        );
        self.events.round_started(round, proposal.best_offers.len());

        let successor = self.state.identity.successor.name(&self.prefix);
        self.send_to(&successor, Message::Propose(proposal)).await
    }

    async fn on_proposal(&mut self, proposal: Proposal) -> Result<()> {
        self.rounds.observe(proposal.round);

        if !proposal.has_returned_to(self.state.id()) {
            self.rounds.relay(proposal.round)?;
            let relayed = self.relay(proposal).await;
            self.rounds.finish();
            return relayed;
        }

        if let Err(e) = self.rounds.token_returned(proposal.round) {
            warn!(error = %e, "Dropping stale token");
            return Ok(());
        }
        let outcome = RoundOutcome::select(&proposal);
        self.rounds.finish();

        match outcome {
            RoundOutcome::Move { winner, command } => {
                let winner_name = winner.name(&self.prefix);
                info!(
                    round = proposal.round,
                    winner = %winner_name,
                    node = command.target_node,
                    cost = command.cost,
                    "Round complete"
                );
                self.events
                    .move_issued(proposal.round, &winner_name, command.target_node, command.cost);
                self.send_to(&winner_name, Message::AcceptProposal(command))
                    .await
            }
            RoundOutcome::NoMove => {
                warn!(
                    round = proposal.round,
                    offers = proposal.best_offers.len(),
                    "No reachable node offered; the ring stalls"
                );
                self.events.round_stalled(proposal.round);
                self.phase = Phase::Stalled;
                Ok(())
            }
        }
    }

    async fn relay(&mut self, mut proposal: Proposal) -> Result<()> {
        let improved = proposal.refine(&self.state, &self.graph)?;
        debug!(round = proposal.round, improved, "Relaying token");
        self.events.token_relayed(proposal.round, improved);

        let successor = self.state.identity.successor.name(&self.prefix);
        self.send_to(&successor, Message::Propose(proposal)).await
    }

    async fn on_move(&mut self, command: MoveCommand) -> Result<()> {
        let notice = MoveCoordinator::apply(&mut self.state, &command, self.graph.num_nodes())?;
        self.events
            .node_visited(notice.node, self.state.accumulated_distance);

        let barrier = AckBarrier::new(notice.node, self.state.identity.peers());
        if barrier.is_released() {
            return self.start_round().await;
        }

        self.phase = Phase::Moving(barrier);
        self.broadcast(Message::NodeVisited(notice)).await
    }

    async fn begin_termination(&mut self) -> Result<()> {
        info!(
            distance = self.state.accumulated_distance,
            "All nodes visited; collecting totals"
        );
        let collector = TerminationCollector::new(
            self.name.clone(),
            self.state.accumulated_distance,
            self.state.identity.peers(),
        );

        if let Some(total) = collector.total() {
            self.finish(total);
            return Ok(());
        }

        self.phase = Phase::Collecting(collector);
        self.broadcast(Message::StatsRequest).await
    }

    fn on_stats(&mut self, from: &str, reply: StatsReply) {
        let total = match &mut self.phase {
            Phase::Collecting(collector) => collector.record(from, reply),
            _ => {
                debug!(from, "Stats reply outside collection");
                None
            }
        };
        if let Some(total) = total {
            self.finish(total);
        }
    }

    fn finish(&mut self, total: GlobalTotal) {
        info!(global_total = total.total, agents = total.per_agent.len(), "Run complete");
        if !total.incomplete_agents.is_empty() {
            warn!(agents = ?total.incomplete_agents, "Some agents still had unvisited nodes");
        }
        self.events
            .run_completed(total.total, total.incomplete_agents);
        self.phase = Phase::Finished;
    }

    async fn send_to(&self, receiver: &str, message: Message) -> Result<()> {
        let envelope: AclMessage = message.encode(&self.name)?.to(receiver);
        self.bus.send(envelope).await
    }

    async fn broadcast(&self, message: Message) -> Result<()> {
        let envelope = message.encode(&self.name)?;
        let delivered = self.bus.broadcast(envelope).await?;
        if delivered < self.state.identity.peers() {
            warn!(
                delivered,
                peers = self.state.identity.peers(),
                kind = message.kind(),
                "Broadcast reached fewer agents than the ring holds"
            );
        }
        Ok(())
    }
}

/// Builder for [`SalesmanAgent`]
pub struct SalesmanAgentBuilder {
    id: usize,
    args: Option<BootstrapArgs>,
    graph: Option<Arc<Graph>>,
    bus: Option<Arc<dyn MessageBus>>,
    directory: Option<Arc<dyn Directory>>,
    events: Option<EventSender>,
    prefix: String,
    service: ServiceDescription,
}

impl SalesmanAgentBuilder {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            args: None,
            graph: None,
            bus: None,
            directory: None,
            events: None,
            prefix: DEFAULT_AGENT_PREFIX.to_string(),
            service: ServiceDescription::default(),
        }
    }

    /// Set bootstrap arguments
    pub fn bootstrap(mut self, args: BootstrapArgs) -> Self {
        self.args = Some(args);
        self
    }

    /// Use a prebuilt graph instead of building one from the seed
    pub fn graph(mut self, graph: Arc<Graph>) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Set the bus (required)
    pub fn bus(mut self, bus: Arc<dyn MessageBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Set the directory; a private in-memory one is used otherwise
    pub fn directory(mut self, directory: Arc<dyn Directory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Emit run events to a channel
    pub fn events(mut self, sender: EventSender) -> Self {
        self.events = Some(sender);
        self
    }

    /// Agent name prefix
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Capability advertised in the directory
    pub fn service(mut self, service: ServiceDescription) -> Self {
        self.service = service;
        self
    }

    /// Build the agent and register its mailbox on the bus.
    ///
    /// Every agent of a ring must be built before any of them runs, so that
    /// no message is sent to a name that is not registered yet.
    pub async fn build(self) -> Result<SalesmanAgent> {
        let args = self
            .args
            .ok_or_else(|| MtspError::Agent("bootstrap arguments are required".to_string()))?;
        let bus = self
            .bus
            .ok_or_else(|| MtspError::Agent("a message bus is required".to_string()))?;

        let graph = match self.graph {
            Some(graph) if graph.num_nodes() != args.num_nodes => {
                return Err(MtspError::Graph(format!(
                    "graph has {} nodes, bootstrap says {}",
                    graph.num_nodes(),
                    args.num_nodes
                )));
            }
            Some(graph) => graph,
            None => Arc::new(Graph::build(args.num_nodes, args.seed)),
        };

        let identity = AgentIdentity::new(self.id, args.total_agents)?;
        let state = AgentState::new(identity, args.num_nodes, args.start_node)?;
        let name = identity.id.name(&self.prefix);
        let mailbox = bus.register(&name).await?;

        Ok(SalesmanAgent {
            events: EventEmitter::new(self.events, name.clone()),
            name,
            prefix: self.prefix,
            state,
            graph,
            mailbox,
            bus,
            directory: self
                .directory
                .unwrap_or_else(|| Arc::new(InMemoryDirectory::new())),
            service: self.service,
            rounds: RoundTracker::new(),
            phase: Phase::Active,
            ready: 0,
        })
    }
}
