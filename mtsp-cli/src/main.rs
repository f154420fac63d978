//! MTSP CLI - launch token-ring simulations and inspect seeded graphs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mtsp_core::bootstrap::LaunchArgs;
use mtsp_core::config::MtspConfig;
use mtsp_core::graph::Graph;
use mtsp_supervisor::{SimulationSupervisor, SupervisorConfig};
use std::path::PathBuf;
use tracing::warn;

#[derive(Parser)]
#[command(name = "mtsp")]
#[command(about = "Distributed multiple travelling salesman simulation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch a ring of agents and run it to completion
    Run {
        /// `<num_agents> <num_nodes>`; malformed values fall back to defaults
        #[arg(num_args = 0..=2, allow_hyphen_values = true)]
        sizes: Vec<String>,

        /// Shared graph seed (defaults to the current time in milliseconds)
        #[arg(short, long, env = "MTSP_SEED")]
        seed: Option<u64>,

        /// Configuration file (otherwise mtsp.toml and MTSP_* variables)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the weight table of a seeded graph
    Graph {
        /// Number of nodes
        #[arg(short, long, default_value_t = mtsp_core::config::DEFAULT_NODES)]
        nodes: usize,

        /// Graph seed
        #[arg(short, long)]
        seed: u64,
    },
    /// Version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("mtsp {}", env!("CARGO_PKG_VERSION"));
            println!("mtsp-core {}", mtsp_core::VERSION);
        }
        Commands::Run {
            sizes,
            seed,
            config,
            json,
        } => {
            let mut config = match config {
                Some(path) => MtspConfig::from_file(&path)
                    .with_context(|| format!("Failed to load {}", path.display()))?,
                None => MtspConfig::load().context("Failed to load configuration")?,
            };

            match sizes.len() {
                0 => {}
                1 => warn!("Both <num_agents> and <num_nodes> are needed; using defaults"),
                _ => {
                    let launch = LaunchArgs::from_args(&sizes);
                    config.simulation.agents = launch.agents;
                    config.simulation.nodes = launch.nodes;
                }
            }
            if let Some(seed) = seed {
                config.simulation.seed = Some(seed);
            }

            let supervisor = SimulationSupervisor::new(SupervisorConfig::from_config(&config))?;
            let report = supervisor.run().await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report);
            }
        }
        Commands::Graph { nodes, seed } => {
            let graph = Graph::build(nodes, seed);
            println!("seed {}, {} nodes", seed, graph.num_nodes());
            for (a, b, weight) in graph.edges() {
                println!("{:>4} {:>4} {:>6}", a, b, weight);
            }
        }
    }

    Ok(())
}
