//! MTSP Supervisor - launches and watches a ring of salesman agents
//!
//! Takes over the job an agent platform would otherwise do for the ring:
//! - Draw start nodes from the shared seed
//! - Hand every agent its bootstrap argument list
//! - Spawn one task per agent over a shared bus and directory
//! - Watch run events until completion or a stall, then shut agents down
//!
//! ```rust,no_run
//! use mtsp_supervisor::{SimulationSupervisor, SupervisorConfig};
//!
//! # async fn demo() -> mtsp_supervisor::Result<()> {
//! let supervisor = SimulationSupervisor::new(SupervisorConfig {
//!     agents: 4,
//!     nodes: 20,
//!     seed: 42,
//!     ..Default::default()
//! })?;
//! let report = supervisor.run().await?;
//! println!("{}", report);
//! # Ok(())
//! # }
//! ```

mod error;
mod process;
mod report;

pub use error::{Result, SupervisorError};
pub use process::{
    SUPERVISOR_NAME, SimulationSupervisor, SupervisorConfig, draw_start_nodes, seed_from_clock,
};
pub use report::{MoveRecord, SimulationReport};
