//! Launch and per-agent bootstrap arguments
//!
//! Both argument lists arrive as strings. A missing or malformed field falls
//! back to its documented default with a warning instead of aborting the
//! launch.

use crate::config::{DEFAULT_AGENTS, DEFAULT_NODES, DEFAULT_START_NODE};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

/// Launcher arguments: `<num_agents> <num_nodes>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchArgs {
    pub agents: usize,
    pub nodes: usize,
}

impl Default for LaunchArgs {
    fn default() -> Self {
        Self {
            agents: DEFAULT_AGENTS,
            nodes: DEFAULT_NODES,
        }
    }
}

impl LaunchArgs {
    /// Parse launcher arguments; both are required together, as in `launch 4 20`
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Self {
        let defaults = Self::default();
        if args.len() < 2 {
            return defaults;
        }

        Self {
            agents: positive_or(args[0].as_ref(), "num_agents", defaults.agents),
            nodes: positive_or(args[1].as_ref(), "num_nodes", defaults.nodes),
        }
    }
}

/// Arguments handed to each agent: `[seed, num_nodes, total_agents, start_node]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapArgs {
    pub seed: u64,
    pub num_nodes: usize,
    pub total_agents: usize,
    pub start_node: usize,
}

impl BootstrapArgs {
    /// Encode as the string list an agent is started with
    pub fn to_args(&self) -> Vec<String> {
        vec![
            self.seed.to_string(),
            self.num_nodes.to_string(),
            self.total_agents.to_string(),
            self.start_node.to_string(),
        ]
    }

    /// Parse an agent's argument list.
    ///
    /// `fallback_seed` is used when the seed is missing or malformed; agents
    /// that fall back will generally not agree on the graph, which the
    /// warning calls out.
    pub fn from_args<S: AsRef<str>>(args: &[S], fallback_seed: u64) -> Self {
        let field = |i: usize| args.get(i).map(|s| s.as_ref()).unwrap_or("");

        let seed = field(0).trim().parse::<u64>().unwrap_or_else(|_| {
            warn!(raw = field(0), fallback_seed, "Malformed seed; graph agreement is not guaranteed");
            fallback_seed
        });
        let num_nodes = positive_or(field(1), "num_nodes", DEFAULT_NODES);
        let total_agents = positive_or(field(2), "total_agents", DEFAULT_AGENTS);
        let mut start_node = parse_or(field(3), "start_node", DEFAULT_START_NODE);

        if start_node >= num_nodes {
            warn!(start_node, num_nodes, "Start node outside graph, using default");
            start_node = DEFAULT_START_NODE;
        }

        Self {
            seed,
            num_nodes,
            total_agents,
            start_node,
        }
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(raw: &str, field: &str, default: T) -> T {
    raw.trim().parse().unwrap_or_else(|_| {
        warn!(field, raw, %default, "Malformed argument, using default");
        default
    })
}

fn positive_or(raw: &str, field: &str, default: usize) -> usize {
    match parse_or(raw, field, default) {
        0 => {
            warn!(field, %default, "Argument must be positive, using default");
            default
        }
        n => n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_args() {
        assert_eq!(LaunchArgs::from_args(&["4", "20"]), LaunchArgs { agents: 4, nodes: 20 });
        assert_eq!(LaunchArgs::from_args::<&str>(&[]), LaunchArgs::default());
        assert_eq!(LaunchArgs::from_args(&["4"]), LaunchArgs::default());
        assert_eq!(LaunchArgs::from_args(&["four", "20"]), LaunchArgs { agents: 3, nodes: 20 });
        assert_eq!(LaunchArgs::from_args(&["0", "-2"]), LaunchArgs { agents: 3, nodes: 10 });
    }

    #[test]
    fn test_bootstrap_roundtrip() {
        let args = BootstrapArgs {
            seed: 1_700_000_000_123,
            num_nodes: 8,
            total_agents: 3,
            start_node: 5,
        };
        assert_eq!(BootstrapArgs::from_args(&args.to_args(), 0), args);
    }

    #[test]
    fn test_bootstrap_fallbacks() {
        let args = BootstrapArgs::from_args(&["seed?", "x", "", "2"], 77);
        assert_eq!(
            args,
            BootstrapArgs {
                seed: 77,
                num_nodes: 10,
                total_agents: 3,
                start_node: 2,
            }
        );
    }

    #[test]
    fn test_start_node_outside_graph() {
        let args = BootstrapArgs::from_args(&["1", "4", "2", "9"], 0);
        assert_eq!(args.start_node, 0);
    }
}
